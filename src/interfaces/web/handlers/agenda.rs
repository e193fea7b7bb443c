use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::agents::{DEFAULT_RELEVANCE_THRESHOLD, FocusMode};

use super::super::AppState;
use super::super::error::ApiError;
use super::agents::agent_response;

#[derive(Deserialize)]
pub struct AgendaBuildRequest {
    pub meeting_context: Value,
    #[serde(default)]
    pub focus_mode: Option<String>,
}

#[derive(Deserialize)]
pub struct PreReadRequest {
    pub meeting_context: Value,
    #[serde(default = "default_sources")]
    pub document_sources: Vec<String>,
    #[serde(default = "default_threshold")]
    pub relevance_threshold: u8,
}

fn default_sources() -> Vec<String> {
    ["github", "notion", "slack"].map(String::from).to_vec()
}

fn default_threshold() -> u8 {
    DEFAULT_RELEVANCE_THRESHOLD
}

#[derive(Deserialize)]
pub struct BriefingRequest {
    pub meeting_data: Value,
    pub participant_roles: BTreeMap<String, String>,
    #[serde(default = "default_personalization")]
    pub personalization_level: String,
}

fn default_personalization() -> String {
    "standard".to_string()
}

#[derive(Deserialize)]
pub struct ComprehensiveAgendaRequest {
    pub meeting_context: Value,
    #[serde(default)]
    pub focus_mode: Option<String>,
    #[serde(default)]
    pub participant_roles: Option<BTreeMap<String, String>>,
}

pub async fn build_agenda(
    State(state): State<AppState>,
    Json(payload): Json<AgendaBuildRequest>,
) -> Result<Json<Value>, ApiError> {
    let focus_mode = FocusMode::parse(payload.focus_mode.as_deref());
    let run = state
        .agents
        .build_agenda(payload.meeting_context.clone(), focus_mode)
        .await?;
    let data = json!({
        "agenda": run.output,
        "execution_time": run.execution_time,
        "focus_mode": focus_mode,
        "meeting_context": payload.meeting_context,
    });
    Ok(agent_response(run, data))
}

pub async fn collect_preread(
    State(state): State<AppState>,
    Json(payload): Json<PreReadRequest>,
) -> Result<Json<Value>, ApiError> {
    let run = state
        .agents
        .collect_preread(
            payload.meeting_context,
            payload.relevance_threshold,
            payload.document_sources.clone(),
        )
        .await?;
    let data = json!({
        "preread_packet": run.output,
        "execution_time": run.execution_time,
        "document_sources": payload.document_sources,
        "relevance_threshold": payload.relevance_threshold,
    });
    Ok(agent_response(run, data))
}

pub async fn context_briefing(
    State(state): State<AppState>,
    Json(payload): Json<BriefingRequest>,
) -> Result<Json<Value>, ApiError> {
    let run = state
        .agents
        .context_briefing(
            payload.meeting_data,
            payload.participant_roles.clone(),
            payload.personalization_level.clone(),
        )
        .await?;
    let data = json!({
        "briefings": run.output,
        "execution_time": run.execution_time,
        "participant_roles": payload.participant_roles,
        "personalization_level": payload.personalization_level,
    });
    Ok(agent_response(run, data))
}

/// Agenda, pre-read packet and, when roles are given, role briefings for one
/// meeting. Reports `fallback` when any part fell back.
pub async fn comprehensive(
    State(state): State<AppState>,
    Json(payload): Json<ComprehensiveAgendaRequest>,
) -> Result<Json<Value>, ApiError> {
    let focus_mode = FocusMode::parse(payload.focus_mode.as_deref());
    let agenda = state
        .agents
        .build_agenda(payload.meeting_context.clone(), focus_mode)
        .await?;
    let preread = state
        .agents
        .collect_preread(
            payload.meeting_context.clone(),
            DEFAULT_RELEVANCE_THRESHOLD,
            default_sources(),
        )
        .await?;
    let briefing = match payload.participant_roles.filter(|roles| !roles.is_empty()) {
        Some(roles) => Some(
            state
                .agents
                .context_briefing(payload.meeting_context.clone(), roles, default_personalization())
                .await?,
        ),
        None => None,
    };

    let reasons: Vec<String> = [Some(&agenda), Some(&preread), briefing.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|run| {
            run.fallback_reason
                .as_ref()
                .map(|reason| format!("{}: {}", run.agent, reason))
        })
        .collect();

    let status = if reasons.is_empty() { "success" } else { "fallback" };
    let mut body = json!({
        "agent": "comprehensive_agenda",
        "status": status,
        "data": {
            "agenda": agenda.output,
            "preread_documents": preread.output,
            "context_briefings": briefing.map(|run| run.output),
            "focus_mode": focus_mode,
            "meeting_context": payload.meeting_context,
        },
        "timestamp": chrono::Utc::now(),
    });
    if !reasons.is_empty() {
        body["fallback_reason"] = json!(reasons.join("; "));
    }
    Ok(Json(body))
}

/// Agenda for an explicit focus mode taken from the path.
pub async fn quick_agenda(
    Path(mode): Path<String>,
    State(state): State<AppState>,
    Json(meeting_context): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let focus_mode = FocusMode::from_name(&mode)
        .ok_or_else(|| ApiError::BadRequest("Invalid focus mode".to_string()))?;
    let run = state
        .agents
        .build_agenda(meeting_context.clone(), focus_mode)
        .await?;
    let data = json!({
        "agenda": run.output,
        "execution_time": run.execution_time,
        "meeting_context": meeting_context,
    });
    let Json(mut body) = agent_response(run, data);
    body["agent"] = json!("quick_agenda");
    body["focus_mode"] = json!(focus_mode);
    Ok(Json(body))
}
