use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::agents::{AgentOutput, FocusMode, StepContext, StepName};
use crate::core::service::AgentRun;

use super::super::AppState;
use super::super::error::ApiError;

/// Inputs for a single direct agent call. Every field is optional; missing
/// upstream data is treated as empty.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub meeting_context: Option<String>,
    #[serde(default)]
    pub focus_mode: Option<String>,
    #[serde(default)]
    pub user_preferences: Option<Map<String, Value>>,
    #[serde(default)]
    pub calendar_data: Option<Value>,
    #[serde(default)]
    pub people_data: Option<Value>,
    #[serde(default)]
    pub technical_data: Option<Value>,
    #[serde(default)]
    pub slack_data: Option<Value>,
    #[serde(default)]
    pub agenda_data: Option<Value>,
}

impl AgentRequest {
    fn to_context(&self) -> StepContext {
        let seed = |value: &Option<Value>| {
            value
                .clone()
                .filter(|v| !v.is_null())
                .map(AgentOutput::from_value)
        };
        StepContext {
            meeting_context: self.meeting_context.clone(),
            focus_mode: FocusMode::parse(self.focus_mode.as_deref()),
            user_preferences: self.user_preferences.clone().unwrap_or_default(),
            calendar: seed(&self.calendar_data),
            people: seed(&self.people_data),
            technical: seed(&self.technical_data),
            slack: seed(&self.slack_data),
            agenda: seed(&self.agenda_data),
            coordinator: None,
        }
    }
}

/// URL slug (`people-research`) to step.
fn step_from_slug(slug: &str) -> Option<StepName> {
    StepName::from_name(&slug.replace('-', "_"))
}

pub(crate) fn agent_response(run: AgentRun, data: Value) -> Json<Value> {
    let mut body = json!({
        "agent": run.agent,
        "status": run.status,
        "data": data,
        "timestamp": run.timestamp,
    });
    if let Some(reason) = run.fallback_reason {
        body["fallback_reason"] = json!(reason);
    }
    Json(body)
}

pub async fn run_agent(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<Value>, ApiError> {
    let step = step_from_slug(&slug)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown agent: {}", slug)))?;

    let run = state
        .agents
        .run_step_timed(step, request.to_context())
        .await?;
    let data = json!({
        "output": run.output,
        "execution_time": run.execution_time,
        "request_context": request,
    });
    Ok(agent_response(run, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_map_to_steps() {
        assert_eq!(step_from_slug("people-research"), Some(StepName::PeopleResearch));
        assert_eq!(step_from_slug("slack-context"), Some(StepName::SlackContext));
        assert_eq!(step_from_slug("agenda-builder"), Some(StepName::AgendaBuilder));
        assert_eq!(step_from_slug("github"), None);
    }
}
