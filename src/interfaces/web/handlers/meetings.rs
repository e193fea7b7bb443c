use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::info;

use crate::core::agents::StepName;
use crate::core::jobs::Job;
use crate::core::pipeline::{CustomMeetingPrepRequest, MeetingPrepRequest, resolve_custom_steps};

use super::super::AppState;
use super::super::error::ApiError;

fn started(job: &Job, message: &str) -> Json<Value> {
    Json(json!({
        "job_id": job.job_id,
        "status": "started",
        "message": message,
        "created_at": job.created_at,
    }))
}

pub async fn prepare_meeting(
    State(state): State<AppState>,
    Json(payload): Json<MeetingPrepRequest>,
) -> Result<Json<Value>, ApiError> {
    let job = state.pipeline.spawn_full(payload).await?;
    info!(job_id = %job.job_id, "Accepted full preparation request");
    Ok(started(&job, "Meeting preparation started"))
}

pub async fn prepare_custom(
    State(state): State<AppState>,
    Json(payload): Json<CustomMeetingPrepRequest>,
) -> Result<Json<Value>, ApiError> {
    let (_, unknown) = resolve_custom_steps(&payload.agents);
    if !unknown.is_empty() {
        let valid: Vec<&str> = StepName::ALL.iter().map(|s| s.as_str()).collect();
        return Err(ApiError::BadRequest(format!(
            "Unknown agents: {}. Valid agents: {}",
            unknown.join(", "),
            valid.join(", ")
        )));
    }

    let job = state.pipeline.spawn_custom(payload).await?;
    info!(job_id = %job.job_id, "Accepted custom preparation request");
    Ok(started(&job, "Custom meeting preparation started"))
}

pub async fn get_job(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Job>, ApiError> {
    let job = state.pipeline.jobs().get(&job_id).await?;
    Ok(Json(job))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Value> {
    let jobs = state.pipeline.jobs().list().await;
    Json(json!({ "jobs": jobs }))
}

pub async fn delete_job(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    if !state.pipeline.delete(&job_id).await {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }
    Ok(Json(json!({ "job_id": job_id, "deleted": true })))
}

pub async fn cancel_job(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let job = state.pipeline.cancel(&job_id).await?;
    Ok(Json(json!({ "job_id": job.job_id, "status": job.status })))
}
