use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    Agent, AgentError, AgentOutput, AgentResult, FocusMode, LlmCall, StepContext, StepName,
    extract_attendees, extract_meeting_title, invoke_or_fallback, parse_json_object, preview,
};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are an AI Agenda Builder Agent. Your task is to intelligently create meeting agendas.

Based on the provided context data:
1. Analyze calendar information (meeting title, participants, previous meetings)
2. Review recent engineering activity (pull requests, issues, commits)
3. Examine Slack/communication patterns
4. Identify current blockers and open tasks
5. Consider stakeholder priorities and recent updates

Generate a prioritized agenda with:
- High-priority items (blockers, urgent decisions)
- Medium-priority items (updates, progress reviews)
- Low-priority items (planning, discussions)

For each agenda item, provide:
- Title and brief description
- Priority level (High/Medium/Low)
- Estimated time allocation
- Relevant context/background
- Key stakeholders involved

Output format: JSON structure with prioritized agenda items.";

const DEFAULT_TITLE: &str = "Team Meeting";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaPlan {
    pub meeting_title: String,
    pub estimated_duration: String,
    pub focus_mode: FocusMode,
    pub agenda_items: Vec<AgendaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub time_allocation: String,
    pub stakeholders: Vec<String>,
    pub context: String,
}

impl AgendaItem {
    fn new(
        title: &str,
        description: &str,
        priority: &str,
        minutes: u32,
        stakeholders: Vec<String>,
        context: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            priority: priority.to_string(),
            time_allocation: format!("{} minutes", minutes),
            stakeholders,
            context: context.to_string(),
        }
    }
}

impl AgendaPlan {
    /// Canned agenda for a focus mode. Only the title and participant list
    /// vary with the input.
    pub fn canned(meeting_title: &str, participants: &[String], focus_mode: FocusMode) -> Self {
        let all = participants.to_vec();
        let first_two = |fallback: &str| -> Vec<String> {
            if participants.is_empty() {
                vec![fallback.to_string()]
            } else {
                participants.iter().take(2).cloned().collect()
            }
        };
        let matching = |needles: &[&str]| -> Vec<String> {
            participants
                .iter()
                .filter(|p| {
                    let lower = p.to_lowercase();
                    needles.iter().any(|n| lower.contains(n))
                })
                .cloned()
                .collect()
        };

        let agenda_items = match focus_mode {
            FocusMode::Blockers => vec![
                AgendaItem::new(
                    "Critical Blockers Review",
                    "Review and resolve current technical blockers",
                    "High",
                    20,
                    first_two("Team Lead"),
                    "Address immediate issues preventing progress",
                ),
                AgendaItem::new(
                    "Resource Allocation",
                    "Assign resources to unblock development",
                    "High",
                    15,
                    all.clone(),
                    "Ensure proper resource allocation for critical items",
                ),
            ],
            FocusMode::Design => {
                let mut designers = matching(&["design"]);
                if designers.is_empty() {
                    designers = first_two("Design Lead");
                }
                vec![
                    AgendaItem::new(
                        "Design System Updates",
                        "Review latest design system changes and guidelines",
                        "High",
                        25,
                        designers,
                        "Align team on design standards and new components",
                    ),
                    AgendaItem::new(
                        "UI/UX Feedback Session",
                        "Gather feedback on recent interface changes",
                        "Medium",
                        20,
                        all.clone(),
                        "Ensure user experience meets requirements",
                    ),
                ]
            }
            FocusMode::Progress => vec![
                AgendaItem::new(
                    "Milestone Review",
                    "Walk through completed and slipping milestones",
                    "High",
                    25,
                    all.clone(),
                    "Confirm where the project stands against the plan",
                ),
                AgendaItem::new(
                    "Metrics and Status",
                    "Review delivery metrics and open risks",
                    "Medium",
                    20,
                    first_two("Project Lead"),
                    "Surface trends before they become blockers",
                ),
            ],
            FocusMode::Planning => vec![
                AgendaItem::new(
                    "Roadmap Discussion",
                    "Review upcoming roadmap priorities and sequencing",
                    "High",
                    25,
                    all.clone(),
                    "Agree on what the team commits to next",
                ),
                AgendaItem::new(
                    "Strategic Decisions",
                    "Decide on open trade-offs that shape the next quarter",
                    "Medium",
                    20,
                    first_two("Team Lead"),
                    "Record owners for each decision",
                ),
            ],
            FocusMode::Balanced => vec![
                AgendaItem::new(
                    "Project Status Update",
                    "Review current project progress and milestones",
                    "High",
                    20,
                    all.clone(),
                    "Ensure alignment on project progress and timeline",
                ),
                AgendaItem::new(
                    "Technical Discussion",
                    "Address technical challenges and architectural decisions",
                    "Medium",
                    25,
                    {
                        let technical = matching(&["dev", "eng", "tech"]);
                        if technical.is_empty() { all.clone() } else { technical }
                    },
                    "Resolve technical questions and plan implementation",
                ),
                AgendaItem::new(
                    "Next Steps Planning",
                    "Plan upcoming sprint and assign action items",
                    "Medium",
                    15,
                    all.clone(),
                    "Define clear next steps and responsibilities",
                ),
            ],
        };

        Self {
            meeting_title: meeting_title.to_string(),
            estimated_duration: "60 minutes".to_string(),
            focus_mode,
            agenda_items,
        }
    }

    /// Wraps a non-JSON model answer into a single-item agenda.
    pub fn from_text(response: &str) -> Self {
        Self {
            meeting_title: "Generated Meeting".to_string(),
            estimated_duration: "60 minutes".to_string(),
            focus_mode: FocusMode::Balanced,
            agenda_items: vec![AgendaItem {
                title: "AI-Generated Agenda".to_string(),
                description: format!("{}...", preview(response, 200)),
                priority: "Medium".to_string(),
                time_allocation: "Full meeting".to_string(),
                stakeholders: vec!["All participants".to_string()],
                context: "AI-generated content based on available context".to_string(),
            }],
        }
    }

    fn into_output(self) -> AgentOutput {
        match serde_json::to_value(&self) {
            Ok(value) => AgentOutput::Structured(value),
            Err(_) => AgentOutput::Text(self.meeting_title),
        }
    }
}

pub struct AgendaBuilderAgent {
    invoker: Option<SharedInvoker>,
}

impl AgendaBuilderAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    /// Build an agenda from a free-form context object. Recognised keys are
    /// `meeting_title` and `participants`; everything is forwarded to the model.
    pub fn build(&self, context: &Value, focus_mode: FocusMode) -> anyhow::Result<AgentResult> {
        let Value::Object(fields) = context else {
            return Err(AgentError::InvalidInput {
                agent: "agenda_builder",
                reason: "context must be a JSON object".to_string(),
            }
            .into());
        };

        let meeting_title = fields
            .get("meeting_title")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        let participants: Vec<String> = fields
            .get("participants")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let context_json = serde_json::to_string_pretty(context)?;
        let prompt = format!(
            "{}\n\nFocus Mode: {}\n{}\n\nContext Data:\n{}\n\nGenerate a prioritized agenda for this meeting.",
            PROMPT,
            focus_mode.as_str(),
            focus_mode.instructions(),
            context_json,
        );

        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "agenda_builder",
                end_user: "agenda_builder",
                prompt: &prompt,
                tools: &[],
                required_tool: None,
            },
            |text| match parse_json_object(&text) {
                Some(value) => AgentOutput::Structured(value),
                None => AgendaPlan::from_text(&text).into_output(),
            },
            || AgendaPlan::canned(&meeting_title, &participants, focus_mode).into_output(),
        ))
    }

    /// The context object the pipeline hands to [`AgendaBuilderAgent::build`].
    pub fn pipeline_context(ctx: &StepContext) -> Value {
        let calendar = ctx.rendered(StepName::Calendar);
        let meeting_title = ctx
            .user_preferences
            .get("meeting_title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| extract_meeting_title(&calendar))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let mut fields = Map::new();
        fields.insert("meeting_title".into(), json!(meeting_title));
        fields.insert("participants".into(), json!(extract_attendees(&calendar)));
        if let Some(context) = &ctx.meeting_context {
            fields.insert("meeting_context".into(), json!(context));
        }
        fields.insert("calendar".into(), json!(calendar));
        if let Some(slack) = ctx.output(StepName::SlackContext) {
            fields.insert("slack".into(), json!(slack.render()));
        }
        if !ctx.user_preferences.is_empty() {
            fields.insert(
                "user_preferences".into(),
                Value::Object(ctx.user_preferences.clone()),
            );
        }
        Value::Object(fields)
    }
}

impl Agent for AgendaBuilderAgent {
    fn step(&self) -> StepName {
        StepName::AgendaBuilder
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        self.build(&Self::pipeline_context(ctx), ctx.focus_mode)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::agents::tests::ScriptedInvoker;

    fn plan(result: &AgentResult) -> AgendaPlan {
        match result.output() {
            AgentOutput::Structured(v) => serde_json::from_value(v.clone()).unwrap(),
            other => panic!("expected structured agenda, got {:?}", other),
        }
    }

    #[test]
    fn fallback_agenda_follows_focus_mode() {
        let agent = AgendaBuilderAgent::new(None);
        let context = json!({"meeting_title": "Ledger Review", "participants": ["a@x.io", "b@x.io", "c@x.io"]});

        let blockers = plan(&agent.build(&context, FocusMode::Blockers).unwrap());
        assert_eq!(blockers.meeting_title, "Ledger Review");
        assert_eq!(blockers.focus_mode, FocusMode::Blockers);
        assert_eq!(blockers.agenda_items[0].title, "Critical Blockers Review");
        assert_eq!(blockers.agenda_items[0].stakeholders.len(), 2);

        let balanced = plan(&agent.build(&context, FocusMode::Balanced).unwrap());
        assert_eq!(balanced.agenda_items.len(), 3);

        let progress = plan(&agent.build(&context, FocusMode::Progress).unwrap());
        let planning = plan(&agent.build(&context, FocusMode::Planning).unwrap());
        assert_ne!(progress.agenda_items, planning.agenda_items);
    }

    #[test]
    fn empty_participants_get_placeholder_owner() {
        let agent = AgendaBuilderAgent::new(None);
        let result = agent.build(&json!({}), FocusMode::Blockers).unwrap();
        let agenda = plan(&result);
        assert_eq!(agenda.meeting_title, "Team Meeting");
        assert_eq!(agenda.agenda_items[0].stakeholders, vec!["Team Lead".to_string()]);
    }

    #[test]
    fn non_object_context_is_rejected() {
        let agent = AgendaBuilderAgent::new(None);
        let err = agent.build(&json!(["not", "an", "object"]), FocusMode::Balanced).unwrap_err();
        assert!(err.to_string().contains("agenda_builder"));
    }

    #[test]
    fn json_reply_is_kept_as_is() {
        let reply = "Agenda:\n{\"meeting_title\": \"Live\", \"agenda_items\": [{\"title\": \"One\"}]}";
        let agent = AgendaBuilderAgent::new(Some(Arc::new(ScriptedInvoker::replying(reply))));
        let result = agent.build(&json!({}), FocusMode::Design).unwrap();
        assert!(!result.is_fallback());
        match result.output() {
            AgentOutput::Structured(v) => assert_eq!(v["agenda_items"][0]["title"], "One"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn prose_reply_is_wrapped() {
        let reply = "x".repeat(250);
        let agent = AgendaBuilderAgent::new(Some(Arc::new(ScriptedInvoker::replying(&reply))));
        let agenda = plan(&agent.build(&json!({}), FocusMode::Balanced).unwrap());
        assert_eq!(agenda.meeting_title, "Generated Meeting");
        assert_eq!(agenda.agenda_items[0].description.len(), 203);
    }

    #[test]
    fn pipeline_context_reads_calendar() {
        let mut ctx = StepContext::default();
        ctx.set_output(
            StepName::Calendar,
            "Title: Design Crit\nAttendees: ana@example.com, bo@example.com".into(),
        );
        let value = AgendaBuilderAgent::pipeline_context(&ctx);
        assert_eq!(value["meeting_title"], "Design Crit");
        assert_eq!(value["participants"], json!(["ana@example.com", "bo@example.com"]));

        ctx.user_preferences
            .insert("meeting_title".into(), json!("Override"));
        let value = AgendaBuilderAgent::pipeline_context(&ctx);
        assert_eq!(value["meeting_title"], "Override");
    }
}
