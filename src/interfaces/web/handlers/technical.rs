use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::agents::{ResearchKind, ResearchScope, comprehensive_subjects};

use super::super::AppState;
use super::super::error::ApiError;
use super::agents::agent_response;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct RepositorySearchRequest {
    pub search_terms: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

impl RepositorySearchRequest {
    fn subject(&self) -> String {
        let mut subject = self.search_terms.trim().to_string();
        if let Some(org) = &self.organization {
            subject.push_str(&format!("\nOrganization: {}", org));
        }
        if let Some(language) = &self.language {
            subject.push_str(&format!("\nLanguage: {}", language));
        }
        subject.push_str(&format!("\nReturn at most {} repositories.", self.limit));
        subject
    }
}

#[derive(Deserialize)]
pub struct IssuesRequest {
    pub repository_urls: Vec<String>,
    #[serde(default = "default_issue_states")]
    pub issue_states: Vec<String>,
    #[serde(default = "default_since_days")]
    pub since_days: u32,
}

fn default_issue_states() -> Vec<String> {
    vec!["open".to_string()]
}

fn default_since_days() -> u32 {
    30
}

#[derive(Deserialize)]
pub struct DocumentationRequest {
    pub project_names: Vec<String>,
    #[serde(default = "default_doc_types")]
    pub doc_types: Vec<String>,
}

fn default_doc_types() -> Vec<String> {
    vec!["api".to_string(), "guide".to_string()]
}

#[derive(Deserialize)]
pub struct TechnologyStackRequest {
    pub repository_info: String,
    #[serde(default)]
    pub focus_areas: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct ComprehensiveRequest {
    pub calendar_context: String,
    #[serde(default)]
    pub focus_areas: Option<Vec<String>>,
    #[serde(default = "default_depth")]
    pub research_depth: String,
    #[serde(default = "default_true")]
    pub include_github: bool,
    #[serde(default = "default_true")]
    pub include_docs: bool,
    #[serde(default = "default_true")]
    pub include_tech_stack: bool,
}

fn default_depth() -> String {
    "standard".to_string()
}

pub async fn search_repositories(
    State(state): State<AppState>,
    Json(payload): Json<RepositorySearchRequest>,
) -> Result<Json<Value>, ApiError> {
    let run = state
        .agents
        .research(ResearchKind::GithubRepository, payload.subject())
        .await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "search_terms": payload.search_terms,
        "filters": {
            "organization": payload.organization,
            "language": payload.language,
            "limit": payload.limit,
        },
    });
    Ok(agent_response(run, data))
}

pub async fn analyze_issues(
    State(state): State<AppState>,
    Json(payload): Json<IssuesRequest>,
) -> Result<Json<Value>, ApiError> {
    let subject = format!(
        "Repositories: {}\nIssue states: {}\nLast {} days.",
        payload.repository_urls.join(", "),
        payload.issue_states.join(", "),
        payload.since_days
    );
    let run = state
        .agents
        .research(ResearchKind::GithubIssues, subject)
        .await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "repositories": payload.repository_urls,
        "filters": {
            "issue_states": payload.issue_states,
            "since_days": payload.since_days,
        },
    });
    Ok(agent_response(run, data))
}

pub async fn search_documentation(
    State(state): State<AppState>,
    Json(payload): Json<DocumentationRequest>,
) -> Result<Json<Value>, ApiError> {
    let subject = format!(
        "Projects: {}\nDocument types: {}",
        payload.project_names.join(", "),
        payload.doc_types.join(", ")
    );
    let run = state
        .agents
        .research(ResearchKind::Documentation, subject)
        .await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "projects": payload.project_names,
        "filters": {"doc_types": payload.doc_types},
    });
    Ok(agent_response(run, data))
}

pub async fn analyze_tech_stack(
    State(state): State<AppState>,
    Json(payload): Json<TechnologyStackRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut subject = payload.repository_info.clone();
    if let Some(areas) = payload.focus_areas.as_ref().filter(|a| !a.is_empty()) {
        subject.push_str(&format!("\nFocus areas: {}", areas.join(", ")));
    }
    let run = state
        .agents
        .research(ResearchKind::TechnologyStack, subject)
        .await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "repository_info": payload.repository_info,
        "focus_areas": payload.focus_areas,
    });
    Ok(agent_response(run, data))
}

pub async fn comprehensive_analysis(
    State(state): State<AppState>,
    Json(payload): Json<ComprehensiveRequest>,
) -> Result<Json<Value>, ApiError> {
    let scope = ResearchScope {
        github: payload.include_github,
        docs: payload.include_docs,
        tech_stack: payload.include_tech_stack,
    };
    let subjects = comprehensive_subjects(
        &payload.calendar_context,
        payload.focus_areas.as_deref().unwrap_or_default(),
        scope,
    );
    let run = state.agents.comprehensive_research(subjects).await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "calendar_context": payload.calendar_context,
        "settings": {
            "research_depth": payload.research_depth,
            "focus_areas": payload.focus_areas,
        },
    });
    Ok(agent_response(run, data))
}
