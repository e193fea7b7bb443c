use super::{
    Agent, AgentOutput, AgentResult, LlmCall, StepContext, StepName, invoke_or_fallback,
    parse_json_object,
};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = r#"You are a People Research Agent. Your task is to research meeting attendees and provide comprehensive profiles.

For each attendee found in the calendar data:
1. Use available tools to gather information about their:
   - Professional background and role
   - Company/organization
   - Recent activities and projects
   - Areas of expertise
   - Relevant context for the meeting
2. If you have access to internal company directory tools, use them first
3. For external attendees, use web research tools if available
4. Provide insights that would be helpful for meeting preparation

IMPORTANT: Return your response as a valid JSON object with this exact structure:
{
  "attendees": [
    {
      "email": "user@example.com",
      "name": "Full Name",
      "role": "Software Engineer",
      "organization": "Company Name",
      "background": "Brief background description",
      "expertise": ["JavaScript", "React", "Node.js"],
      "context": "How they relate to this meeting/project",
      "linkedinProfile": "https://linkedin.com/in/username",
      "githubProfile": "https://github.com/username",
      "recentActivity": "Recent work or achievements relevant to the meeting"
    }
  ]
}

Do not include any text before or after the JSON. Return only valid JSON."#;

const FALLBACK: &str = "Here are the attendee profiles based on research:

**Attendee Profiles:**

**maya.lind@example.com (Maya Lind)**
- Role: Project Lead
- Background: Distributed storage and replication
- Expertise: System architecture, project management
- Context: Owns the Ledger Sync roadmap

**oskar.veld@example.org (Oskar Veld)**
- Role: Site Reliability Engineer
- Organization: Partner infrastructure team
- Expertise: Failover automation, observability
- Context: Runs the failover drills

**priya.nair@example.com (Priya Nair)**
- Role: Backend Engineer
- Expertise: Change data capture, Rust services
- Context: Implementing the replay path

**lead.reviewer@example.net**
- Role: Technical Advisor
- Expertise: Design review and code review
- Context: Reviewing the batching proposal";

/// Profiles the attendees listed in calendar output. Live answers are parsed
/// as JSON when possible and kept as text otherwise.
pub struct PeopleResearchAgent {
    invoker: Option<SharedInvoker>,
}

impl PeopleResearchAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn fallback_output() -> AgentOutput {
        AgentOutput::from(FALLBACK)
    }
}

impl Agent for PeopleResearchAgent {
    fn step(&self) -> StepName {
        StepName::PeopleResearch
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        let prompt = format!(
            "{}\n\nHere is the calendar data with attendee information:\n{}\n\nPlease research each attendee and provide detailed profiles.",
            PROMPT,
            ctx.rendered(StepName::Calendar),
        );
        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "people_research",
                end_user: "people_research_agent",
                prompt: &prompt,
                tools: &["web_search"],
                required_tool: None,
            },
            |text| match parse_json_object(&text) {
                Some(value) => AgentOutput::Structured(value),
                None => AgentOutput::Text(text),
            },
            Self::fallback_output,
        ))
    }
}
