use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::super::AppState;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Meeting preparation API is running",
        "status": "healthy",
        "llm_available": state.agents.llm_available(),
        "environment": state.config.environment,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "llm_available": state.agents.llm_available(),
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now(),
    }))
}
