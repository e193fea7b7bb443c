//! Job records for preparation runs and the repository that holds them.

mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::agents::{AgentOutput, StepName};

pub use memory::InMemoryJobStore;

/// Result key aliasing the coordinator output once a run completes.
pub const FINAL_BRIEFING_KEY: &str = "final_briefing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    if from == to {
        return true;
    }
    match from {
        JobStatus::Started => matches!(
            to,
            JobStatus::Running | JobStatus::Failed | JobStatus::Cancelled
        ),
        JobStatus::Running => matches!(
            to,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        ),
        JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current_step: Option<StepName>,
    pub completed_steps: Vec<StepName>,
    pub total_steps: usize,
    /// Step names exactly as the caller sent them, recognised or not.
    pub requested_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: JobProgress,
    pub results: BTreeMap<String, AgentOutput>,
    /// Steps whose agent used canned output, with the reason.
    pub fallbacks: BTreeMap<String, String>,
    pub error: Option<String>,
}

/// List entry for `GET /meetings/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_step: Option<StepName>,
    pub completed_steps: usize,
    pub total_steps: usize,
}

/// One atomic change applied to a job record.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    StartStep(StepName),
    CompleteStep {
        step: StepName,
        output: AgentOutput,
        fallback_reason: Option<String>,
    },
    Complete {
        final_briefing: Option<AgentOutput>,
    },
    Fail {
        error: String,
    },
    Cancel {
        reason: String,
    },
}

impl JobUpdate {
    fn target_status(&self) -> JobStatus {
        match self {
            JobUpdate::StartStep(_) | JobUpdate::CompleteStep { .. } => JobStatus::Running,
            JobUpdate::Complete { .. } => JobStatus::Completed,
            JobUpdate::Fail { .. } => JobStatus::Failed,
            JobUpdate::Cancel { .. } => JobStatus::Cancelled,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("Job {0} not found")]
    NotFound(String),
    #[error("Job {0} already exists")]
    AlreadyExists(String),
    #[error("Job cannot move from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl Job {
    pub fn new(
        job_id: impl Into<String>,
        total_steps: usize,
        requested_steps: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Running,
            created_at: now,
            updated_at: now,
            progress: JobProgress {
                current_step: None,
                completed_steps: Vec::new(),
                total_steps,
                requested_steps,
            },
            results: BTreeMap::new(),
            fallbacks: BTreeMap::new(),
            error: None,
        }
    }

    /// Validate and apply `update`. The record is untouched on error.
    pub fn apply(&mut self, update: JobUpdate, now: DateTime<Utc>) -> Result<(), JobStoreError> {
        let to = update.target_status();
        if !can_transition(self.status, to) {
            return Err(JobStoreError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        match update {
            JobUpdate::StartStep(step) => {
                self.progress.current_step = Some(step);
            }
            JobUpdate::CompleteStep {
                step,
                output,
                fallback_reason,
            } => {
                self.progress.completed_steps.push(step);
                self.results.insert(step.as_str().to_string(), output);
                match fallback_reason {
                    Some(reason) => {
                        self.fallbacks.insert(step.as_str().to_string(), reason);
                    }
                    None => {
                        self.fallbacks.remove(step.as_str());
                    }
                }
            }
            JobUpdate::Complete { final_briefing } => {
                if let Some(briefing) = final_briefing {
                    self.results
                        .insert(FINAL_BRIEFING_KEY.to_string(), briefing);
                }
                self.progress.current_step = None;
            }
            JobUpdate::Fail { error } => {
                self.error = Some(error);
                self.progress.current_step = None;
            }
            JobUpdate::Cancel { reason } => {
                self.error = Some(reason);
                self.progress.current_step = None;
            }
        }
        self.status = to;
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            current_step: self.progress.current_step,
            completed_steps: self.progress.completed_steps.len(),
            total_steps: self.progress.total_steps,
        }
    }
}

/// Storage for job records. Implementations serialise updates per job so a
/// single update is observed either fully or not at all.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(
        &self,
        job_id: &str,
        total_steps: usize,
        requested_steps: Vec<String>,
    ) -> Result<Job, JobStoreError>;

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobStoreError>;

    async fn get(&self, job_id: &str) -> Result<Job, JobStoreError>;

    /// Returns `false` when no such job exists.
    async fn delete(&self, job_id: &str) -> bool;

    /// Summaries ordered by creation time, oldest first.
    async fn list(&self) -> Vec<JobSummary>;
}

#[cfg(test)]
mod tests;
