use super::{Agent, AgentOutput, AgentResult, LlmCall, StepContext, StepName, invoke_or_fallback};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Slack Context Agent. Your task is to gather relevant Slack communications for meeting preparation.

Based on the calendar data and attendee information:
1. Search for recent messages and conversations involving the meeting attendees
2. Look for discussions related to the meeting topic or project
3. Find relevant channels where the attendees are active
4. Gather context from recent conversations that might be relevant to the meeting
5. Identify any action items, decisions, or important updates shared in Slack

Use the available Slack tools to:
- List conversations/channels
- Search for specific messages
- Get conversation history from relevant channels
- Find messages from/to specific attendees

Focus on gathering context that would be useful for meeting preparation.
Present the information in a structured format with key insights from Slack communications.";

const FALLBACK: &str = "Here is the relevant Slack context for the meeting:

**Slack Communication Context:**

**#ledger-sync-dev Channel:**
- **Replication batching design** (last 3 days)
  - @maya.lind: \"We need to settle the batch size before the rollout\"
  - @priya.nair: \"The replay path now has tracing, numbers look stable\"
  - @oskar.veld: \"Failover drills showed a 4 minute recovery, we can do better\"

**#platform-updates Channel:**
- Weekly status posts and milestone tracking
- Incident follow-ups from the last failover drill

**Key Topics Discussed:**
1. **Performance:** replication lag under burst load
2. **Architecture:** partition leasing versus static assignment
3. **Operations:** schema migration ordering while replicas lag
4. **Timeline:** rollout date for the second region

**Action Items from Slack:**
- [ ] Review the batching proposal (due this week)
- [ ] Finish the code review for the lease manager
- [ ] Prepare failover drill results for the meeting
- [ ] Update the runbook

**Recent Shared Resources:**
- Design document for cross-region batching
- Dashboard links for replication lag";

/// Summarises chat history relevant to the meeting. Needs a Slack tool.
pub struct SlackAgent {
    invoker: Option<SharedInvoker>,
}

impl SlackAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn fallback_output() -> AgentOutput {
        AgentOutput::from(FALLBACK)
    }
}

impl Agent for SlackAgent {
    fn step(&self) -> StepName {
        StepName::SlackContext
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        let prompt = format!(
            "{}\n\nHere is the calendar data with meeting information:\n{}\n\nHere is the people research data with attendee information:\n{}\n\nPlease search Slack for relevant conversations and context related to this meeting and its attendees.",
            PROMPT,
            ctx.rendered(StepName::Calendar),
            ctx.rendered(StepName::PeopleResearch),
        );
        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "slack_context",
                end_user: "slack_agent",
                prompt: &prompt,
                tools: &["slack"],
                required_tool: Some("slack"),
            },
            AgentOutput::Text,
            Self::fallback_output,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::agents::tests::ScriptedInvoker;

    #[test]
    fn prompt_carries_calendar_and_people() {
        let invoker = Arc::new(ScriptedInvoker::replying("slack digest"));
        let agent = SlackAgent::new(Some(invoker.clone()));
        let mut ctx = StepContext::default();
        ctx.set_output(StepName::Calendar, "Title: Sync".into());
        ctx.set_output(
            StepName::PeopleResearch,
            AgentOutput::from_value(serde_json::json!({"attendees": [{"name": "Ana"}]})),
        );

        agent.execute(&ctx).unwrap();
        let prompt = invoker.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Title: Sync"));
        assert!(prompt.contains("\"name\": \"Ana\""));
    }

    #[test]
    fn without_slack_tool_falls_back() {
        let mut invoker = ScriptedInvoker::replying("live");
        invoker.tools = vec!["calendar"];
        let agent = SlackAgent::new(Some(Arc::new(invoker)));
        let result = agent.execute(&StepContext::default()).unwrap();
        assert_eq!(result.fallback_reason(), Some("no slack tools available"));
    }
}
