//! Async facade over the blocking agents.
//!
//! Each call runs on a `spawn_blocking` worker while holding a semaphore
//! permit, so at most `max_concurrent_agent_calls` model calls are in flight.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::info;

use crate::core::agents::{
    Agent, AgendaBuilderAgent, AgentError, AgentOutput, AgentResult, CalendarAgent,
    ContextBriefingAgent, CoordinatorAgent, FocusMode, PeopleResearchAgent,
    PreReadCollectorAgent, ResearchAgent, ResearchKind, SlackAgent, StepContext, StepName,
    TechnicalContextAgent, combine_research,
};
use crate::core::llm::SharedInvoker;

/// One agent per pipeline step.
#[derive(Clone)]
pub struct AgentRoster {
    agents: HashMap<StepName, Arc<dyn Agent>>,
}

impl AgentRoster {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        let agents: [Arc<dyn Agent>; 6] = [
            Arc::new(CalendarAgent::new(invoker.clone())),
            Arc::new(PeopleResearchAgent::new(invoker.clone())),
            Arc::new(TechnicalContextAgent::new(invoker.clone())),
            Arc::new(SlackAgent::new(invoker.clone())),
            Arc::new(AgendaBuilderAgent::new(invoker.clone())),
            Arc::new(CoordinatorAgent::new(invoker)),
        ];
        Self {
            agents: agents.into_iter().map(|a| (a.step(), a)).collect(),
        }
    }

    /// Replace the agent registered for `agent.step()`.
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.step(), agent);
        self
    }

    pub fn get(&self, step: StepName) -> Option<Arc<dyn Agent>> {
        self.agents.get(&step).cloned()
    }
}

/// A timed agent call, as reported by the direct agent endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub agent: String,
    pub status: &'static str,
    pub output: AgentOutput,
    pub fallback_reason: Option<String>,
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl AgentRun {
    fn new(agent: &str, result: AgentResult, started: Instant) -> Self {
        let status = result.status_label();
        let (output, fallback_reason) = result.into_parts();
        Self {
            agent: agent.to_string(),
            status,
            output,
            fallback_reason,
            execution_time: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }
}

pub struct AgentService {
    roster: AgentRoster,
    agenda: Arc<AgendaBuilderAgent>,
    preread: Arc<PreReadCollectorAgent>,
    briefing: Arc<ContextBriefingAgent>,
    research: Vec<Arc<ResearchAgent>>,
    permits: Arc<Semaphore>,
    llm_available: bool,
}

impl AgentService {
    pub fn new(invoker: Option<SharedInvoker>, max_concurrent_calls: usize) -> Self {
        Self::with_roster(
            AgentRoster::new(invoker.clone()),
            invoker,
            max_concurrent_calls,
        )
    }

    pub fn with_roster(
        roster: AgentRoster,
        invoker: Option<SharedInvoker>,
        max_concurrent_calls: usize,
    ) -> Self {
        Self {
            roster,
            agenda: Arc::new(AgendaBuilderAgent::new(invoker.clone())),
            preread: Arc::new(PreReadCollectorAgent::new(invoker.clone())),
            briefing: Arc::new(ContextBriefingAgent::new(invoker.clone())),
            research: ResearchKind::ALL
                .iter()
                .map(|kind| Arc::new(ResearchAgent::new(*kind, invoker.clone())))
                .collect(),
            permits: Arc::new(Semaphore::new(max_concurrent_calls.max(1))),
            llm_available: invoker.is_some(),
        }
    }

    pub fn llm_available(&self) -> bool {
        self.llm_available
    }

    /// Run the agent registered for `step` against a snapshot of the context.
    pub async fn run_step(&self, step: StepName, ctx: StepContext) -> Result<AgentResult> {
        self.run_step_within(step, ctx, None).await
    }

    /// Like [`run_step`](Self::run_step), failing with [`AgentError::Timeout`]
    /// when the agent call exceeds `limit`. Waiting for a worker permit does not
    /// count toward the limit.
    pub async fn run_step_within(
        &self,
        step: StepName,
        ctx: StepContext,
        limit: Option<Duration>,
    ) -> Result<AgentResult> {
        let agent = self
            .roster
            .get(step)
            .ok_or_else(|| anyhow::anyhow!("No agent registered for step {}", step))?;
        info!(step = step.as_str(), "Running agent");
        self.blocking(step.as_str(), limit, move || agent.execute(&ctx))
            .await
    }

    pub async fn run_step_timed(&self, step: StepName, ctx: StepContext) -> Result<AgentRun> {
        let started = Instant::now();
        let result = self.run_step(step, ctx).await?;
        Ok(AgentRun::new(step.as_str(), result, started))
    }

    pub async fn build_agenda(&self, context: Value, focus_mode: FocusMode) -> Result<AgentRun> {
        let started = Instant::now();
        let agent = self.agenda.clone();
        let result = self
            .blocking("agenda_builder", None, move || agent.build(&context, focus_mode))
            .await?;
        Ok(AgentRun::new("agenda_builder", result, started))
    }

    pub async fn collect_preread(
        &self,
        meeting_context: Value,
        relevance_threshold: u8,
        document_sources: Vec<String>,
    ) -> Result<AgentRun> {
        let started = Instant::now();
        let agent = self.preread.clone();
        let result = self
            .blocking("preread_collector", None, move || {
                agent.execute(&meeting_context, relevance_threshold, &document_sources)
            })
            .await?;
        Ok(AgentRun::new("preread_collector", result, started))
    }

    pub async fn context_briefing(
        &self,
        meeting_data: Value,
        participant_roles: BTreeMap<String, String>,
        personalization_level: String,
    ) -> Result<AgentRun> {
        let started = Instant::now();
        let agent = self.briefing.clone();
        let result = self
            .blocking("context_briefing", None, move || {
                agent.execute(&meeting_data, &participant_roles, &personalization_level)
            })
            .await?;
        Ok(AgentRun::new("context_briefing", result, started))
    }

    pub async fn research(&self, kind: ResearchKind, subject: String) -> Result<AgentRun> {
        let started = Instant::now();
        let agent = self
            .research
            .iter()
            .find(|agent| agent.kind() == kind)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No research agent for {}", kind.as_str()))?;
        let result = self
            .blocking(kind.as_str(), None, move || Ok(agent.execute(&subject)))
            .await?;
        Ok(AgentRun::new(kind.as_str(), result, started))
    }

    /// Run each sub-agent in order and merge their outputs into one report. The
    /// combined run is a fallback when any part fell back.
    pub async fn comprehensive_research(
        &self,
        subjects: Vec<(ResearchKind, String)>,
    ) -> Result<AgentRun> {
        let started = Instant::now();
        let mut sections = Vec::with_capacity(subjects.len());
        let mut reasons = Vec::new();
        for (kind, subject) in subjects {
            let run = self.research(kind, subject).await?;
            if let Some(reason) = run.fallback_reason {
                reasons.push(format!("{}: {}", kind.as_str(), reason));
            }
            sections.push((kind, run.output));
        }

        let output = AgentOutput::Text(combine_research(&sections));
        let result = if reasons.is_empty() {
            AgentResult::Success(output)
        } else {
            AgentResult::Fallback {
                output,
                reason: reasons.join("; "),
            }
        };
        Ok(AgentRun::new("technical_context_comprehensive", result, started))
    }

    /// The clock for `limit` starts once the permit is held. A timed-out worker
    /// keeps its permit until the blocking call returns.
    async fn blocking<F>(&self, label: &str, limit: Option<Duration>, work: F) -> Result<AgentResult>
    where
        F: FnOnce() -> Result<AgentResult> + Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await?;
        let worker = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        });
        let joined = match limit {
            None => worker.await,
            Some(limit) => match tokio::time::timeout(limit, worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(AgentError::Timeout {
                        step: label.to_string(),
                        limit,
                    }
                    .into());
                }
            },
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(AgentError::WorkerPanicked {
                agent: label.to_string(),
                message: panic_message(e.into_panic()),
            }
            .into()),
            Err(e) => Err(anyhow::anyhow!("{} agent worker was cancelled: {}", label, e)),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Panicking;

    impl Agent for Panicking {
        fn step(&self) -> StepName {
            StepName::TechnicalContext
        }

        fn execute(&self, _ctx: &StepContext) -> Result<AgentResult> {
            panic!("model client exploded");
        }
    }

    #[tokio::test]
    async fn steps_without_invoker_fall_back() {
        let service = AgentService::new(None, 2);
        assert!(!service.llm_available());

        let run = service
            .run_step_timed(StepName::Calendar, StepContext::default())
            .await
            .unwrap();
        assert_eq!(run.agent, "calendar");
        assert_eq!(run.status, "fallback");
        assert_eq!(run.fallback_reason.as_deref(), Some("LLM invoker not configured"));
        assert!(run.execution_time >= 0.0);
    }

    #[tokio::test]
    async fn panics_become_errors() {
        let roster = AgentRoster::new(None).with_agent(Arc::new(Panicking));
        let service = AgentService::with_roster(roster, None, 1);

        let err = service
            .run_step(StepName::TechnicalContext, StepContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model client exploded"));

        // The permit was released by the panicking worker.
        let ok = service
            .run_step(StepName::Calendar, StepContext::default())
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn comprehensive_research_merges_sections() {
        let service = AgentService::new(None, 2);
        let run = service
            .comprehensive_research(vec![
                (ResearchKind::Documentation, "Projects: ledger".to_string()),
                (ResearchKind::TechnologyStack, "Rust workers".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(run.agent, "technical_context_comprehensive");
        assert_eq!(run.status, "fallback");
        assert_eq!(
            run.fallback_reason.as_deref(),
            Some(
                "documentation: LLM invoker not configured; technology_stack: LLM invoker not configured"
            )
        );
        let report = run.output.as_text().unwrap();
        assert!(report.contains("## Documentation\n**Technical Documentation Found:**"));
        assert!(report.contains("## Technology Stack\n"));
        assert!(!report.contains("## Repository Analysis"));
    }

    #[tokio::test]
    async fn direct_agents_report_invalid_input() {
        let service = AgentService::new(None, 1);
        assert!(service.build_agenda(json!(null), FocusMode::Balanced).await.is_err());

        let run = service
            .collect_preread(json!({"meeting_title": "Sync"}), 9, vec![])
            .await
            .unwrap();
        assert_eq!(run.agent, "preread_collector");
        let AgentOutput::Structured(packet) = &run.output else {
            panic!("expected structured packet");
        };
        assert_eq!(packet["documents"].as_array().map(Vec::len), Some(1));
    }
}
