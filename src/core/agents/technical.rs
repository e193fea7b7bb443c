use super::{Agent, AgentOutput, AgentResult, LlmCall, StepContext, StepName, invoke_or_fallback};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Technical Context Agent. Your task is to gather relevant technical context for the meeting.

Based on the calendar data and attendee information:
1. Research recent technical developments related to the meeting topic
2. Look for relevant documentation, code repositories, or technical discussions
3. Identify key technical concepts or technologies that might be discussed
4. Gather information about current project status, recent changes, or technical challenges
5. Use web search tools to find recent news, blog posts, or technical articles related to the topic

Focus on providing technical background that would be useful for meeting preparation.
Present the information in a structured format with key technical insights.";

const FALLBACK: &str = "Here is the technical context for the meeting:

**Technical Context for the Ledger Sync Project:**

**Project Overview:**
- Ledger Sync: a replication service keeping regional ledgers consistent
- Focus on ordered, idempotent delivery of ledger entries
- Runs on managed Kubernetes with a Postgres primary per region

**Key Technical Areas:**
1. **Replication:**
   - Change capture from the primary write-ahead log
   - Ordering guarantees across partitions
   - Conflict detection and replay
2. **System Architecture:**
   - Event-driven services behind a message broker
   - Stateless workers with leased partitions
3. **Recent Developments:**
   - New batching strategy for cross-region shipping
   - Tracing added to the replay path

**Technical Challenges:**
- Bounding replication lag under burst load
- Safe schema migrations while replicas lag
- Recovery time after a regional failover

**Technologies Involved:**
- Languages: Rust, Go
- Infrastructure: Kafka, Kubernetes, PostgreSQL
- Monitoring: Prometheus, Grafana

This context should help frame technical discussions during the meeting.";

pub struct TechnicalContextAgent {
    invoker: Option<SharedInvoker>,
}

impl TechnicalContextAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn fallback_output() -> AgentOutput {
        AgentOutput::from(FALLBACK)
    }
}

impl Agent for TechnicalContextAgent {
    fn step(&self) -> StepName {
        StepName::TechnicalContext
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        let prompt = format!(
            "{}\n\nHere is the calendar data to base your research on:\n{}{}\n\nPlease research and provide relevant technical context for this meeting.",
            PROMPT,
            ctx.rendered(StepName::Calendar),
            ctx.meeting_context_section(),
        );
        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "technical_context",
                end_user: "technical_context_agent",
                prompt: &prompt,
                tools: &["web_search"],
                required_tool: None,
            },
            AgentOutput::Text,
            Self::fallback_output,
        ))
    }
}
