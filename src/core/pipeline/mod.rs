//! Drives agent steps against a job record.
//!
//! One task per job; steps run strictly in order. Every step boundary checks
//! the job's cancellation token, and a step may be bounded by a timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::agents::{AgentOutput, FocusMode, StepContext, StepName};
use crate::core::jobs::{Job, JobRepository, JobStoreError, JobUpdate};
use crate::core::service::AgentService;

pub const CANCELLED_REASON: &str = "Cancelled by request";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingPrepRequest {
    #[serde(default)]
    pub meeting_context: Option<String>,
    #[serde(default)]
    pub user_preferences: Option<Map<String, Value>>,
    /// Defaults to true when absent or null.
    #[serde(default)]
    pub include_slack: Option<bool>,
    #[serde(default)]
    pub include_agenda: Option<bool>,
    #[serde(default)]
    pub focus_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomMeetingPrepRequest {
    pub agents: Vec<String>,
    #[serde(default)]
    pub meeting_context: Option<String>,
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
    #[serde(default)]
    pub focus_mode: Option<String>,
    #[serde(default)]
    pub user_preferences: Option<Map<String, Value>>,
}

/// Steps of the full pipeline, in execution order.
pub fn full_plan(include_slack: bool, include_agenda: bool) -> Vec<StepName> {
    let mut steps = vec![
        StepName::Calendar,
        StepName::PeopleResearch,
        StepName::TechnicalContext,
    ];
    if include_slack {
        steps.push(StepName::SlackContext);
    }
    if include_agenda {
        steps.push(StepName::AgendaBuilder);
    }
    steps.push(StepName::Coordinator);
    steps
}

/// Split caller-supplied names into recognised steps (caller order kept) and
/// unknown names.
pub fn resolve_custom_steps(names: &[String]) -> (Vec<StepName>, Vec<String>) {
    let mut steps = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match StepName::from_name(name) {
            Some(step) => steps.push(step),
            None => unknown.push(name.clone()),
        }
    }
    (steps, unknown)
}

/// Steps plus the initial context for one run.
struct Plan {
    steps: Vec<StepName>,
    ctx: StepContext,
}

impl Plan {
    fn full(request: MeetingPrepRequest) -> Self {
        Self {
            steps: full_plan(
                request.include_slack.unwrap_or(true),
                request.include_agenda.unwrap_or(false),
            ),
            ctx: StepContext {
                meeting_context: request.meeting_context,
                focus_mode: FocusMode::parse(request.focus_mode.as_deref()),
                user_preferences: request.user_preferences.unwrap_or_default(),
                ..StepContext::default()
            },
        }
    }

    fn custom(request: CustomMeetingPrepRequest) -> Self {
        let (steps, unknown) = resolve_custom_steps(&request.agents);
        if !unknown.is_empty() {
            warn!("Skipping unknown steps: {}", unknown.join(", "));
        }
        let seed = |value: Option<Value>| {
            value
                .filter(|v| !v.is_null())
                .map(AgentOutput::from_value)
        };
        Self {
            steps,
            ctx: StepContext {
                meeting_context: request.meeting_context,
                focus_mode: FocusMode::parse(request.focus_mode.as_deref()),
                user_preferences: request.user_preferences.unwrap_or_default(),
                calendar: seed(request.calendar_data),
                people: seed(request.people_data),
                technical: seed(request.technical_data),
                slack: seed(request.slack_data),
                agenda: seed(request.agenda_data),
                coordinator: None,
            },
        }
    }
}

pub struct MeetingPreparationPipeline {
    jobs: Arc<dyn JobRepository>,
    agents: Arc<AgentService>,
    step_timeout: Option<Duration>,
    cancellations: Mutex<HashMap<String, CancellationToken>>,
}

impl MeetingPreparationPipeline {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        agents: Arc<AgentService>,
        step_timeout: Option<Duration>,
    ) -> Self {
        Self {
            jobs,
            agents,
            step_timeout,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    pub fn jobs(&self) -> &Arc<dyn JobRepository> {
        &self.jobs
    }

    /// Run the full pipeline to completion and return the final record.
    pub async fn run_full(&self, job_id: &str, request: MeetingPrepRequest) -> Result<Job, JobStoreError> {
        let plan = Plan::full(request);
        let token = self.register(job_id, plan.steps.len(), Vec::new()).await?;
        self.execute(job_id, plan, token).await;
        self.jobs.get(job_id).await
    }

    pub async fn run_custom(
        &self,
        job_id: &str,
        request: CustomMeetingPrepRequest,
    ) -> Result<Job, JobStoreError> {
        let requested = request.agents.clone();
        let plan = Plan::custom(request);
        let token = self.register(job_id, plan.steps.len(), requested).await?;
        self.execute(job_id, plan, token).await;
        self.jobs.get(job_id).await
    }

    /// Create the job record and run the full pipeline in the background.
    pub async fn spawn_full(self: &Arc<Self>, request: MeetingPrepRequest) -> Result<Job, JobStoreError> {
        let plan = Plan::full(request);
        self.spawn(plan, Vec::new()).await
    }

    pub async fn spawn_custom(
        self: &Arc<Self>,
        request: CustomMeetingPrepRequest,
    ) -> Result<Job, JobStoreError> {
        let requested = request.agents.clone();
        let plan = Plan::custom(request);
        self.spawn(plan, requested).await
    }

    /// Stop a running job. The record is marked cancelled immediately; the
    /// running step's result, if any, is discarded.
    pub async fn cancel(&self, job_id: &str) -> Result<Job, JobStoreError> {
        let job = self
            .jobs
            .update(
                job_id,
                JobUpdate::Cancel {
                    reason: CANCELLED_REASON.to_string(),
                },
            )
            .await?;
        if let Some(token) = self.cancellations.lock().await.remove(job_id) {
            token.cancel();
        }
        info!(job_id, "Job cancelled");
        Ok(job)
    }

    /// Remove a job record, stopping its run if still active.
    pub async fn delete(&self, job_id: &str) -> bool {
        if let Some(token) = self.cancellations.lock().await.remove(job_id) {
            token.cancel();
        }
        self.jobs.delete(job_id).await
    }

    async fn spawn(self: &Arc<Self>, plan: Plan, requested: Vec<String>) -> Result<Job, JobStoreError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let token = self.register(&job_id, plan.steps.len(), requested).await?;
        let job = self.jobs.get(&job_id).await?;

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.execute(&job_id, plan, token).await;
        });
        Ok(job)
    }

    async fn register(
        &self,
        job_id: &str,
        total_steps: usize,
        requested: Vec<String>,
    ) -> Result<CancellationToken, JobStoreError> {
        self.jobs.create(job_id, total_steps, requested).await?;
        let token = CancellationToken::new();
        self.cancellations
            .lock()
            .await
            .insert(job_id.to_string(), token.clone());
        info!(job_id, total_steps, "Job started");
        Ok(token)
    }

    async fn execute(&self, job_id: &str, plan: Plan, token: CancellationToken) {
        self.drive(job_id, plan, &token).await;
        self.cancellations.lock().await.remove(job_id);
    }

    async fn drive(&self, job_id: &str, plan: Plan, token: &CancellationToken) {
        let Plan { steps, mut ctx } = plan;

        for step in &steps {
            let step = *step;
            if token.is_cancelled() {
                info!(job_id, step = step.as_str(), "Stopping cancelled job");
                return;
            }
            if let Err(e) = self.jobs.update(job_id, JobUpdate::StartStep(step)).await {
                abandon(job_id, e);
                return;
            }

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(job_id, step = step.as_str(), "Job cancelled during step");
                    return;
                }
                outcome = self.agents.run_step_within(step, ctx.clone(), self.step_timeout) => outcome,
            };

            match outcome {
                Ok(result) => {
                    let (output, fallback_reason) = result.into_parts();
                    ctx.set_output(step, output.clone());
                    let update = JobUpdate::CompleteStep {
                        step,
                        output,
                        fallback_reason,
                    };
                    if let Err(e) = self.jobs.update(job_id, update).await {
                        abandon(job_id, e);
                        return;
                    }
                }
                Err(e) => {
                    error!(job_id, step = step.as_str(), "Step failed: {}", e);
                    let update = JobUpdate::Fail {
                        error: e.to_string(),
                    };
                    if let Err(e) = self.jobs.update(job_id, update).await {
                        abandon(job_id, e);
                    }
                    return;
                }
            }
        }

        let final_briefing = if steps.contains(&StepName::Coordinator) {
            ctx.output(StepName::Coordinator).cloned()
        } else {
            None
        };
        match self
            .jobs
            .update(job_id, JobUpdate::Complete { final_briefing })
            .await
        {
            Ok(job) => info!(
                job_id,
                steps = job.progress.completed_steps.len(),
                fallbacks = job.fallbacks.len(),
                "Job completed"
            ),
            Err(e) => abandon(job_id, e),
        }
    }
}

/// The record was cancelled or deleted underneath the run.
fn abandon(job_id: &str, err: JobStoreError) {
    match err {
        JobStoreError::NotFound(_) | JobStoreError::InvalidTransition { .. } => {
            info!(job_id, "Abandoning run: {}", err)
        }
        other => warn!(job_id, "Abandoning run: {}", other),
    }
}

#[cfg(test)]
mod tests;
