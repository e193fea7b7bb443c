use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::{AgentError, AgentOutput, AgentResult, LlmCall, invoke_or_fallback, parse_json_object};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Context Briefing Agent. Create personalized 1-page briefings for meeting participants.

For each participant role (PM, Engineer, Executive, etc.), generate a briefing that includes:
1. What's changed since the last meeting
2. Current blockers relevant to their role
3. Key decisions pending that need their input
4. Relevant KPIs or metrics for their function
5. Action items assigned to them
6. Role-specific context and priorities

Tailor the content based on participant roles:
- PMs: Focus on timelines, deliverables, stakeholder updates
- Engineers: Emphasize technical issues, code reviews, architecture
- Executives: Highlight high-level metrics, strategic decisions, resource needs
- Designers: Feature design updates, user feedback, UI/UX priorities

Keep briefings concise but comprehensive, focusing on actionable insights.";

/// Coarse role bucket used to pick a canned briefing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCategory {
    ProjectManager,
    Engineer,
    Executive,
    Designer,
    General,
}

impl RoleCategory {
    pub fn from_role(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "pm" | "project manager" | "product manager" => RoleCategory::ProjectManager,
            "engineer" | "developer" | "tech lead" => RoleCategory::Engineer,
            "executive" | "ceo" | "cto" | "vp" => RoleCategory::Executive,
            "designer" | "ux" | "ui" => RoleCategory::Designer,
            _ => RoleCategory::General,
        }
    }

    fn canned_briefing(self) -> Value {
        match self {
            RoleCategory::ProjectManager => json!({
                "role_focus": "Project Management",
                "key_changes": [
                    "Sprint velocity increased by 12% this week",
                    "2 new requirements added to backlog",
                    "Stakeholder feedback incorporated into roadmap"
                ],
                "current_blockers": [
                    "Waiting on legal approval for third-party integration",
                    "Resource allocation for next quarter needs finalization",
                    "Client feedback pending on mockups"
                ],
                "pending_decisions": [
                    "Sprint scope prioritization",
                    "Resource allocation for new feature development",
                    "Release timeline for v2.0"
                ],
                "relevant_metrics": {
                    "sprint_completion": "85%",
                    "story_points_delivered": "42/50",
                    "stakeholder_satisfaction": "4.2/5"
                },
                "action_items": [
                    "Review and approve updated project timeline",
                    "Coordinate with design team on user testing",
                    "Schedule stakeholder demo for next week"
                ]
            }),
            RoleCategory::Engineer => json!({
                "role_focus": "Engineering/Technical",
                "key_changes": [
                    "Database migration completed successfully",
                    "New CI/CD pipeline deployed to staging",
                    "Performance benchmarks improved by 18%"
                ],
                "current_blockers": [
                    "Memory growth in the replay worker",
                    "Third-party API rate limiting issues",
                    "Test environment configuration problems"
                ],
                "pending_decisions": [
                    "Service decomposition approach",
                    "Database indexing strategy",
                    "Code review process changes"
                ],
                "relevant_metrics": {
                    "code_coverage": "87%",
                    "build_success_rate": "94%",
                    "avg_response_time": "245ms"
                },
                "action_items": [
                    "Fix critical bug in user authentication",
                    "Review architecture RFC document",
                    "Optimize database queries for reports module"
                ]
            }),
            RoleCategory::Executive => json!({
                "role_focus": "Executive/Strategic",
                "key_changes": [
                    "Project on track for quarterly delivery",
                    "Team productivity metrics showing positive trends",
                    "Customer satisfaction scores improved"
                ],
                "current_blockers": [
                    "Budget approval needed for additional resources",
                    "Strategic partnership negotiations pending",
                    "Competitive analysis update required"
                ],
                "pending_decisions": [
                    "Resource allocation for next quarter",
                    "Market expansion strategy",
                    "Technology investment priorities"
                ],
                "relevant_metrics": {
                    "project_roi": "+23%",
                    "team_utilization": "92%",
                    "customer_satisfaction": "4.5/5"
                },
                "action_items": [
                    "Approve budget for upcoming initiatives",
                    "Review strategic roadmap alignment",
                    "Schedule investor update presentation"
                ]
            }),
            RoleCategory::Designer => json!({
                "role_focus": "Design/UX",
                "key_changes": [
                    "User testing results available for review",
                    "Design system v2.1 components finalized",
                    "Accessibility audit completed"
                ],
                "current_blockers": [
                    "User feedback integration into wireframes",
                    "Design handoff process needs work",
                    "Brand guidelines update pending approval"
                ],
                "pending_decisions": [
                    "Final design direction for onboarding flow",
                    "Mobile vs desktop prioritization",
                    "Component library structure"
                ],
                "relevant_metrics": {
                    "user_satisfaction": "4.3/5",
                    "design_iteration_speed": "+15%",
                    "accessibility_score": "92%"
                },
                "action_items": [
                    "Finalize mockups for user testing round 2",
                    "Update design documentation",
                    "Collaborate with engineering on component implementation"
                ]
            }),
            RoleCategory::General => json!({
                "role_focus": "General Participant",
                "key_changes": [
                    "Project making steady progress across all streams",
                    "Team coordination improving with new processes",
                    "Client feedback generally positive"
                ],
                "current_blockers": [
                    "Cross-team coordination challenges",
                    "Communication process improvements needed",
                    "Resource allocation optimization required"
                ],
                "pending_decisions": [
                    "Next sprint priorities",
                    "Team structure adjustments",
                    "Process improvement initiatives"
                ],
                "relevant_metrics": {
                    "overall_progress": "78%",
                    "team_satisfaction": "4.1/5",
                    "delivery_timeline": "On track"
                },
                "action_items": [
                    "Provide input on current initiatives",
                    "Share relevant updates from your area",
                    "Participate in planning discussions"
                ]
            }),
        }
    }
}

/// Direct-invocation agent producing one briefing per participant.
pub struct ContextBriefingAgent {
    invoker: Option<SharedInvoker>,
}

impl ContextBriefingAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn canned(meeting_title: &str, participant_roles: &BTreeMap<String, String>) -> Value {
        let briefings: Map<String, Value> = participant_roles
            .iter()
            .map(|(participant, role)| {
                (
                    participant.clone(),
                    RoleCategory::from_role(role).canned_briefing(),
                )
            })
            .collect();
        json!({
            "meeting_title": meeting_title,
            "briefings": briefings,
        })
    }

    pub fn execute(
        &self,
        meeting_data: &Value,
        participant_roles: &BTreeMap<String, String>,
        personalization_level: &str,
    ) -> anyhow::Result<AgentResult> {
        let Value::Object(fields) = meeting_data else {
            return Err(AgentError::InvalidInput {
                agent: "context_briefing",
                reason: "meeting_data must be a JSON object".to_string(),
            }
            .into());
        };
        let meeting_title = fields
            .get("meeting_title")
            .and_then(Value::as_str)
            .unwrap_or("Team Meeting")
            .to_string();

        let prompt = format!(
            "{}\n\nPersonalization level: {}\n\nMeeting Data:\n{}\n\nParticipant Roles:\n{}\n\nGenerate personalized briefings for each participant.",
            PROMPT,
            personalization_level,
            serde_json::to_string_pretty(meeting_data)?,
            serde_json::to_string_pretty(participant_roles)?,
        );

        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "context_briefing",
                end_user: "context_briefing",
                prompt: &prompt,
                tools: &[],
                required_tool: None,
            },
            |text| match parse_json_object(&text) {
                Some(value) => AgentOutput::Structured(value),
                None => AgentOutput::Structured(json!({
                    "meeting_title": "Generated Meeting",
                    "briefings": {"general": {"content": text}},
                })),
            },
            || AgentOutput::Structured(Self::canned(&meeting_title, participant_roles)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::agents::tests::ScriptedInvoker;

    fn roles(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn roles_map_to_categories() {
        assert_eq!(RoleCategory::from_role("Product Manager"), RoleCategory::ProjectManager);
        assert_eq!(RoleCategory::from_role("tech lead"), RoleCategory::Engineer);
        assert_eq!(RoleCategory::from_role("CTO"), RoleCategory::Executive);
        assert_eq!(RoleCategory::from_role("ux"), RoleCategory::Designer);
        assert_eq!(RoleCategory::from_role("intern"), RoleCategory::General);
    }

    #[test]
    fn fallback_briefs_every_participant() {
        let agent = ContextBriefingAgent::new(None);
        let result = agent
            .execute(
                &json!({"meeting_title": "Launch Review"}),
                &roles(&[("ana", "pm"), ("bo", "engineer"), ("cy", "sales")]),
                "standard",
            )
            .unwrap();
        assert!(result.is_fallback());
        let AgentOutput::Structured(value) = result.output() else {
            panic!("expected structured output");
        };
        assert_eq!(value["meeting_title"], "Launch Review");
        assert_eq!(value["briefings"]["ana"]["role_focus"], "Project Management");
        assert_eq!(value["briefings"]["bo"]["role_focus"], "Engineering/Technical");
        assert_eq!(value["briefings"]["cy"]["role_focus"], "General Participant");
        assert!(value.get("generated_at").is_none());
    }

    #[test]
    fn prose_reply_is_wrapped_as_general() {
        let agent =
            ContextBriefingAgent::new(Some(Arc::new(ScriptedInvoker::replying("Be ready."))));
        let result = agent.execute(&json!({}), &roles(&[]), "basic").unwrap();
        let AgentOutput::Structured(value) = result.output() else {
            panic!("expected structured output");
        };
        assert_eq!(value["briefings"]["general"]["content"], "Be ready.");
    }

    #[test]
    fn meeting_data_must_be_an_object() {
        let agent = ContextBriefingAgent::new(None);
        let err = agent.execute(&json!(3), &roles(&[]), "basic").unwrap_err();
        assert!(err.to_string().contains("meeting_data"));
    }
}
