use super::{Agent, AgentOutput, AgentResult, LlmCall, StepContext, StepName, invoke_or_fallback};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Calendar Data Retrieval Agent. Your task is to:

1. Use the available tools to retrieve calendar events for the current user
2. Extract key information from each event including:
   - Meeting title
   - Date and time
   - Attendee email addresses
   - Meeting location (if available)
   - Meeting description/context (if available)
3. Present the information in a clear, structured format

Focus on upcoming meetings and recent meetings that might be relevant for preparation.
Return the data in a structured format that can be easily processed by other agents.";

const FALLBACK: &str = "Here is the extracted information from the calendar events in a clear, structured format:

**Meeting 1:**
  Title: Ledger Sync Architecture Review
  Date: 2025-05-16
  Time: 18:30
  Attendees: maya.lind@example.com, oskar.veld@example.org, priya.nair@example.com, lead.reviewer@example.net
  Location: Virtual Meeting
  Context: Review of the ledger synchronisation service design

**Meeting 2:**
  Title: Ledger Sync Follow-up
  Date: 2025-08-25
  Time: 18:00
  Attendees: maya.lind@example.com, oskar.veld@example.org, priya.nair@example.com, lead.reviewer@example.net
  Location: Virtual Meeting
  Context: Follow-up discussion on the replication rollout";

/// Retrieves upcoming meetings. Needs a calendar tool on the invoker.
pub struct CalendarAgent {
    invoker: Option<SharedInvoker>,
}

impl CalendarAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn fallback_output() -> AgentOutput {
        AgentOutput::from(FALLBACK)
    }
}

impl Agent for CalendarAgent {
    fn step(&self) -> StepName {
        StepName::Calendar
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        let prompt = format!("{}{}", PROMPT, ctx.meeting_context_section());
        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "calendar",
                end_user: "calendar_agent",
                prompt: &prompt,
                tools: &["calendar"],
                required_tool: Some("calendar"),
            },
            AgentOutput::Text,
            Self::fallback_output,
        ))
    }
}
