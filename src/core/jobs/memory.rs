use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::{Job, JobRepository, JobStoreError, JobSummary, JobUpdate};

/// Process-local job store. The map lock is only held to insert, look up or
/// remove an entry; each job is then mutated under its own mutex.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Arc<Mutex<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, job_id: &str) -> Result<Arc<Mutex<Job>>, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }
}

#[async_trait]
impl JobRepository for InMemoryJobStore {
    async fn create(
        &self,
        job_id: &str,
        total_steps: usize,
        requested_steps: Vec<String>,
    ) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job_id) {
            return Err(JobStoreError::AlreadyExists(job_id.to_string()));
        }
        let job = Job::new(job_id, total_steps, requested_steps, Utc::now());
        jobs.insert(job_id.to_string(), Arc::new(Mutex::new(job.clone())));
        Ok(job)
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job, JobStoreError> {
        let entry = self.entry(job_id).await?;
        let mut job = entry.lock().await;
        job.apply(update, Utc::now())?;
        Ok(job.clone())
    }

    async fn get(&self, job_id: &str) -> Result<Job, JobStoreError> {
        let entry = self.entry(job_id).await?;
        let job = entry.lock().await;
        Ok(job.clone())
    }

    async fn delete(&self, job_id: &str) -> bool {
        self.jobs.write().await.remove(job_id).is_some()
    }

    async fn list(&self) -> Vec<JobSummary> {
        let entries: Vec<Arc<Mutex<Job>>> = self.jobs.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        summaries
    }
}
