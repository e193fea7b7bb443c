use serde_json::Value;

use super::{
    Agent, AgentOutput, AgentResult, LlmCall, StepContext, StepName, invoke_or_fallback,
};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Meeting Preparation Coordinator Agent. Your task is to synthesize research from multiple sources into a comprehensive meeting briefing.

Create a structured meeting preparation document that includes:
1. Meeting Overview (title, date, time, attendees)
2. Attendee Profiles (key information about each person)
3. Technical Context (relevant background information)
4. Slack Communication Context (recent discussions and team dynamics)
5. Key Discussion Points (likely topics based on all context)
6. Preparation Recommendations (what to review or prepare)
7. Action Items & Follow-ups (from Slack and other sources)

Keep the briefing concise but comprehensive, focusing on actionable insights from all available data sources.

Format your response as a well-structured markdown document with clear headings and bullet points.";

const NO_DATA: &str = "No data available";
const HEADING: &str = "# Meeting Preparation Briefing";
const PROMPT_LIMIT: usize = 4000;
const TRUNCATED_LIMIT: usize = 3500;

/// Merges every upstream output into the final markdown briefing.
pub struct CoordinatorAgent {
    invoker: Option<SharedInvoker>,
}

/// Coordinator inputs after formatting, one block per source.
struct Sections {
    calendar: String,
    people: String,
    technical: String,
    slack: String,
    agenda: Option<String>,
}

impl Sections {
    fn from_context(ctx: &StepContext) -> Self {
        Self {
            calendar: format_data(ctx.output(StepName::Calendar)),
            people: format_data(ctx.output(StepName::PeopleResearch)),
            technical: format_data(ctx.output(StepName::TechnicalContext)),
            slack: format_data(ctx.output(StepName::SlackContext)),
            agenda: ctx
                .output(StepName::AgendaBuilder)
                .filter(|o| !o.is_blank())
                .map(|o| format_data(Some(o))),
        }
    }
}

impl CoordinatorAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    fn prompt(sections: &Sections) -> String {
        let mut prompt = format!(
            "{}\n\nHere is the research data from other agents:\n\nCALENDAR DATA:\n{}\n\nPEOPLE RESEARCH:\n{}\n\nTECHNICAL CONTEXT:\n{}\n\nSLACK COMMUNICATION CONTEXT:\n{}",
            PROMPT, sections.calendar, sections.people, sections.technical, sections.slack,
        );
        if let Some(agenda) = &sections.agenda {
            prompt.push_str("\n\nPROPOSED AGENDA:\n");
            prompt.push_str(agenda);
        }
        prompt.push_str(
            "\n\nPlease create a comprehensive meeting briefing based on this information.",
        );

        if prompt.chars().count() > PROMPT_LIMIT {
            truncate_prompt(&prompt, TRUNCATED_LIMIT)
        } else {
            prompt
        }
    }

    fn structured_briefing(sections: &Sections) -> String {
        let mut lines: Vec<String> = vec![
            HEADING.to_string(),
            String::new(),
            "## Meeting Overview".to_string(),
            format_section_content(&sections.calendar),
            String::new(),
            "## Attendee Information".to_string(),
            format_section_content(&sections.people),
            String::new(),
            "## Technical Context".to_string(),
            format_section_content(&sections.technical),
            String::new(),
            "## Slack Communications".to_string(),
            format_section_content(&sections.slack),
            String::new(),
        ];
        if let Some(agenda) = &sections.agenda {
            lines.push("## Proposed Agenda".to_string());
            lines.push(format_section_content(agenda));
            lines.push(String::new());
        }
        lines.extend(
            [
                "## Key Preparation Points",
                "- Review attendee backgrounds and recent work",
                "- Understand technical context and current challenges",
                "- Note recent team discussions and decisions from Slack",
                "- Prepare for likely discussion topics based on all available context",
                "- Consider any action items or follow-ups mentioned in communications",
                "",
                "## Action Items",
                "- [ ] Review all attendee profiles",
                "- [ ] Prepare talking points for technical discussions",
                "- [ ] Follow up on any pending Slack conversations",
                "- [ ] Gather additional context if needed",
                "",
                "---",
                "*Generated by meetprep. Please review all sections for accuracy.*",
            ]
            .map(str::to_string),
        );
        lines.join("\n")
    }
}

impl Agent for CoordinatorAgent {
    fn step(&self) -> StepName {
        StepName::Coordinator
    }

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult> {
        let sections = Sections::from_context(ctx);
        let prompt = Self::prompt(&sections);
        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "coordinator",
                end_user: "coordinator_agent",
                prompt: &prompt,
                tools: &[],
                required_tool: None,
            },
            |text| AgentOutput::Text(format_final_output(&text)),
            || AgentOutput::Text(Self::structured_briefing(&sections)),
        ))
    }
}

fn format_data(output: Option<&AgentOutput>) -> String {
    match output {
        Some(output) if !output.is_blank() => output.render(),
        _ => NO_DATA.to_string(),
    }
}

/// Keep whole `\n\n`-separated sections while they fit in `max_chars`, then a
/// cut-down piece of the next one if enough room is left.
fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut total = 0usize;
    for section in prompt.split("\n\n") {
        let len = section.chars().count();
        if total + len > max_chars {
            let remaining = max_chars - total;
            if remaining > 100 {
                let head: String = section.chars().take(remaining).collect();
                kept.push(format!("{}... [truncated]", head));
            }
            break;
        }
        kept.push(section.to_string());
        total += len;
    }
    kept.join("\n\n")
}

fn format_final_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("{}\n\n{}", HEADING, trimmed)
    }
}

fn format_section_content(content: &str) -> String {
    if content == NO_DATA {
        return "*No information available for this section.*".to_string();
    }

    let trimmed = content.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => {
                return map
                    .iter()
                    .map(|(k, v)| format!("- **{}**: {}", k, inline(v)))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            Ok(Value::Array(items)) => {
                return items
                    .iter()
                    .map(|v| format!("- {}", inline(v)))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            _ => {}
        }
    }

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            if l.starts_with('-') || l.starts_with('*') {
                l.to_string()
            } else {
                format!("- {}", l)
            }
        })
        .collect();
    if lines.is_empty() {
        "*No content available.*".to_string()
    } else {
        lines.join("\n")
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::agents::tests::ScriptedInvoker;
    use serde_json::json;

    #[test]
    fn live_output_gets_a_heading() {
        let agent = CoordinatorAgent::new(Some(Arc::new(ScriptedInvoker::replying(
            "  Summary of the meeting  ",
        ))));
        let result = agent.execute(&StepContext::default()).unwrap();
        assert_eq!(
            result.output().as_text(),
            Some("# Meeting Preparation Briefing\n\nSummary of the meeting")
        );

        let agent = CoordinatorAgent::new(Some(Arc::new(ScriptedInvoker::replying("## Own"))));
        let result = agent.execute(&StepContext::default()).unwrap();
        assert_eq!(result.output().as_text(), Some("## Own"));
    }

    #[test]
    fn fallback_briefing_formats_each_source() {
        let mut ctx = StepContext::default();
        ctx.set_output(StepName::Calendar, "Title: Sync\n- Attendees: a@x.io".into());
        ctx.set_output(
            StepName::PeopleResearch,
            AgentOutput::from_value(json!({"lead": "Ana"})),
        );

        let result = CoordinatorAgent::new(None).execute(&ctx).unwrap();
        let text = result.output().as_text().unwrap().to_string();
        assert!(text.starts_with("# Meeting Preparation Briefing"));
        assert!(text.contains("- Title: Sync\n- Attendees: a@x.io"));
        assert!(text.contains("- **lead**: Ana"));
        assert!(text.contains("## Technical Context\n*No information available for this section.*"));
        assert!(!text.contains("## Proposed Agenda"));
    }

    #[test]
    fn agenda_is_included_when_present() {
        let invoker = Arc::new(ScriptedInvoker::replying("# Briefing"));
        let agent = CoordinatorAgent::new(Some(invoker.clone()));
        let mut ctx = StepContext::default();
        ctx.set_output(
            StepName::AgendaBuilder,
            AgentOutput::from_value(json!({"agenda_items": [{"title": "Kickoff"}]})),
        );
        agent.execute(&ctx).unwrap();
        let prompt = invoker.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("PROPOSED AGENDA:"));
        assert!(prompt.contains("Kickoff"));
    }

    #[test]
    fn long_prompts_are_truncated() {
        let invoker = Arc::new(ScriptedInvoker::replying("# Briefing"));
        let agent = CoordinatorAgent::new(Some(invoker.clone()));
        let mut ctx = StepContext::default();
        ctx.set_output(StepName::Calendar, "é".repeat(5000).into());
        agent.execute(&ctx).unwrap();

        let prompt = invoker.prompts.lock().unwrap()[0].clone();
        assert!(prompt.ends_with("... [truncated]"));
        assert!(prompt.chars().count() <= TRUNCATED_LIMIT + 100);
        assert!(!prompt.contains("SLACK COMMUNICATION CONTEXT"));
    }

    #[test]
    fn truncation_drops_small_remainders() {
        let prompt = format!("{}\n\n{}", "a".repeat(3450), "b".repeat(200));
        assert_eq!(truncate_prompt(&prompt, 3500), "a".repeat(3450));
    }
}
