mod full_pipeline;

use std::sync::Arc;
use std::time::Duration;

use crate::core::agents::{Agent, AgentResult, StepContext, StepName};
use crate::core::jobs::{InMemoryJobStore, Job};
use crate::core::llm::SharedInvoker;
use crate::core::pipeline::MeetingPreparationPipeline;
use crate::core::service::{AgentRoster, AgentService};

pub(super) fn pipeline_with(
    roster: AgentRoster,
    invoker: Option<SharedInvoker>,
    step_timeout: Option<Duration>,
) -> Arc<MeetingPreparationPipeline> {
    pipeline_with_permits(roster, invoker, step_timeout, 4)
}

pub(super) fn pipeline_with_permits(
    roster: AgentRoster,
    invoker: Option<SharedInvoker>,
    step_timeout: Option<Duration>,
    permits: usize,
) -> Arc<MeetingPreparationPipeline> {
    let agents = Arc::new(AgentService::with_roster(roster, invoker, permits));
    Arc::new(MeetingPreparationPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        agents,
        step_timeout,
    ))
}

pub(super) fn offline_pipeline() -> Arc<MeetingPreparationPipeline> {
    pipeline_with(AgentRoster::new(None), None, None)
}

pub(super) fn live_pipeline(invoker: SharedInvoker) -> Arc<MeetingPreparationPipeline> {
    pipeline_with(AgentRoster::new(Some(invoker.clone())), Some(invoker), None)
}

pub(super) async fn wait_for_terminal(pipeline: &MeetingPreparationPipeline, job_id: &str) -> Job {
    for _ in 0..500 {
        let job = pipeline.jobs().get(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}

/// Errors out of `execute`, as malformed input would.
pub(super) struct FailingAgent(pub StepName);

impl Agent for FailingAgent {
    fn step(&self) -> StepName {
        self.0
    }

    fn execute(&self, _ctx: &StepContext) -> anyhow::Result<AgentResult> {
        Err(anyhow::anyhow!("upstream payload was not an object"))
    }
}

/// Blocks its worker thread before answering.
pub(super) struct SlowAgent {
    pub step: StepName,
    pub delay: Duration,
}

impl Agent for SlowAgent {
    fn step(&self) -> StepName {
        self.step
    }

    fn execute(&self, _ctx: &StepContext) -> anyhow::Result<AgentResult> {
        std::thread::sleep(self.delay);
        Ok(AgentResult::Success("slow output".into()))
    }
}
