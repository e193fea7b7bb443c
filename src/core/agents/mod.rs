//! Single-purpose agents that turn upstream context into briefing material.
//!
//! Every agent follows the same contract: build a prompt from a fixed template
//! plus serialised inputs, call the [`AgentInvoker`] once, and return a
//! deterministic canned value when no invoker is configured, a required tool
//! is missing, the call fails, or the output is blank. Errors returned from
//! [`Agent::execute`] are reserved for malformed input.

mod agenda;
mod briefing;
mod calendar;
mod coordinator;
mod people;
mod preread;
mod research;
mod slack;
mod technical;

use std::fmt;
use std::time::Duration;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::core::llm::{AgentInvoker, InvocationRequest};

pub use agenda::AgendaBuilderAgent;
pub use briefing::ContextBriefingAgent;
pub use calendar::CalendarAgent;
pub use coordinator::CoordinatorAgent;
pub use people::PeopleResearchAgent;
pub use preread::{DEFAULT_RELEVANCE_THRESHOLD, PreReadCollectorAgent};
pub use research::{
    ResearchAgent, ResearchKind, ResearchScope, combine_research, comprehensive_subjects,
};
pub use slack::SlackAgent;
pub use technical::TechnicalContextAgent;

/// A named stage of the preparation pipeline, one per agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Calendar,
    PeopleResearch,
    TechnicalContext,
    SlackContext,
    AgendaBuilder,
    Coordinator,
}

impl StepName {
    pub const ALL: [StepName; 6] = [
        StepName::Calendar,
        StepName::PeopleResearch,
        StepName::TechnicalContext,
        StepName::SlackContext,
        StepName::AgendaBuilder,
        StepName::Coordinator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepName::Calendar => "calendar",
            StepName::PeopleResearch => "people_research",
            StepName::TechnicalContext => "technical_context",
            StepName::SlackContext => "slack_context",
            StepName::AgendaBuilder => "agenda_builder",
            StepName::Coordinator => "coordinator",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim() {
            "calendar" => Some(StepName::Calendar),
            "people_research" => Some(StepName::PeopleResearch),
            "technical_context" => Some(StepName::TechnicalContext),
            "slack_context" => Some(StepName::SlackContext),
            "agenda_builder" => Some(StepName::AgendaBuilder),
            "coordinator" => Some(StepName::Coordinator),
            _ => None,
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent produced: free text or a parsed structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentOutput {
    Text(String),
    Structured(Value),
}

impl AgentOutput {
    /// Strings stay text; every other JSON value is structured.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => AgentOutput::Text(s),
            other => AgentOutput::Structured(other),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AgentOutput::Text(s) => Some(s),
            AgentOutput::Structured(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            AgentOutput::Text(s) => s.trim().is_empty(),
            AgentOutput::Structured(v) => match v {
                Value::Null => true,
                Value::Object(m) => m.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::String(s) => s.trim().is_empty(),
                _ => false,
            },
        }
    }

    /// Prompt-ready rendering: text as-is, structured values as pretty JSON.
    pub fn render(&self) -> String {
        match self {
            AgentOutput::Text(s) => s.clone(),
            AgentOutput::Structured(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }
}

impl From<String> for AgentOutput {
    fn from(value: String) -> Self {
        AgentOutput::Text(value)
    }
}

impl From<&str> for AgentOutput {
    fn from(value: &str) -> Self {
        AgentOutput::Text(value.to_string())
    }
}

/// Outcome of one agent execution. `Fallback` carries the canned output and
/// the reason the live path was not used.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResult {
    Success(AgentOutput),
    Fallback { output: AgentOutput, reason: String },
}

impl AgentResult {
    pub fn output(&self) -> &AgentOutput {
        match self {
            AgentResult::Success(output) => output,
            AgentResult::Fallback { output, .. } => output,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            AgentResult::Success(_) => None,
            AgentResult::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AgentResult::Fallback { .. })
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_fallback() {
            "fallback"
        } else {
            "success"
        }
    }

    pub fn into_parts(self) -> (AgentOutput, Option<String>) {
        match self {
            AgentResult::Success(output) => (output, None),
            AgentResult::Fallback { output, reason } => (output, Some(reason)),
        }
    }
}

/// Coarse category steering the agenda builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    Blockers,
    Design,
    Progress,
    Planning,
    #[default]
    Balanced,
}

impl FocusMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FocusMode::Blockers => "blockers",
            FocusMode::Design => "design",
            FocusMode::Progress => "progress",
            FocusMode::Planning => "planning",
            FocusMode::Balanced => "balanced",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "blockers" => Some(FocusMode::Blockers),
            "design" => Some(FocusMode::Design),
            "progress" => Some(FocusMode::Progress),
            "planning" => Some(FocusMode::Planning),
            "balanced" => Some(FocusMode::Balanced),
            _ => None,
        }
    }

    /// Unknown or missing modes resolve to `Balanced`.
    pub fn parse(value: Option<&str>) -> Self {
        value.and_then(Self::from_name).unwrap_or_default()
    }

    pub fn instructions(self) -> &'static str {
        match self {
            FocusMode::Blockers => {
                "Prioritize current blockers, technical issues, and urgent decisions that need resolution."
            }
            FocusMode::Design => {
                "Focus on design updates, architectural decisions, UI/UX reviews, and creative discussions."
            }
            FocusMode::Progress => {
                "Emphasize progress updates, milestone reviews, and project status discussions."
            }
            FocusMode::Planning => {
                "Concentrate on future planning, roadmap discussions, and strategic decisions."
            }
            FocusMode::Balanced => {
                "Create a balanced agenda covering all important aspects proportionally."
            }
        }
    }
}

/// Everything a pipeline step may read. Upstream outputs that were never
/// produced are `None` and render as the empty string.
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    pub meeting_context: Option<String>,
    pub focus_mode: FocusMode,
    pub user_preferences: Map<String, Value>,
    pub calendar: Option<AgentOutput>,
    pub people: Option<AgentOutput>,
    pub technical: Option<AgentOutput>,
    pub slack: Option<AgentOutput>,
    pub agenda: Option<AgentOutput>,
    pub coordinator: Option<AgentOutput>,
}

impl StepContext {
    pub fn output(&self, step: StepName) -> Option<&AgentOutput> {
        self.slot(step).as_ref()
    }

    pub fn set_output(&mut self, step: StepName, output: AgentOutput) {
        *self.slot_mut(step) = Some(output);
    }

    pub fn rendered(&self, step: StepName) -> String {
        self.output(step).map(AgentOutput::render).unwrap_or_default()
    }

    fn slot(&self, step: StepName) -> &Option<AgentOutput> {
        match step {
            StepName::Calendar => &self.calendar,
            StepName::PeopleResearch => &self.people,
            StepName::TechnicalContext => &self.technical,
            StepName::SlackContext => &self.slack,
            StepName::AgendaBuilder => &self.agenda,
            StepName::Coordinator => &self.coordinator,
        }
    }

    fn slot_mut(&mut self, step: StepName) -> &mut Option<AgentOutput> {
        match step {
            StepName::Calendar => &mut self.calendar,
            StepName::PeopleResearch => &mut self.people,
            StepName::TechnicalContext => &mut self.technical,
            StepName::SlackContext => &mut self.slack,
            StepName::AgendaBuilder => &mut self.agenda,
            StepName::Coordinator => &mut self.coordinator,
        }
    }

    fn meeting_context_section(&self) -> String {
        match self.meeting_context.as_deref().map(str::trim) {
            Some(ctx) if !ctx.is_empty() => format!("\n\nAdditional meeting context:\n{}", ctx),
            _ => String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid input for {agent} agent: {reason}")]
    InvalidInput { agent: &'static str, reason: String },
    #[error("Step {step} timed out after {limit:?}")]
    Timeout { step: String, limit: Duration },
    #[error("{agent} agent panicked: {message}")]
    WorkerPanicked { agent: String, message: String },
}

/// A pipeline agent. `execute` is blocking and runs on a worker thread.
pub trait Agent: Send + Sync {
    fn step(&self) -> StepName;

    fn execute(&self, ctx: &StepContext) -> anyhow::Result<AgentResult>;
}

/// Parameters of a single live call.
pub(crate) struct LlmCall<'a> {
    pub label: &'a str,
    pub end_user: &'a str,
    pub prompt: &'a str,
    pub tools: &'a [&'a str],
    /// The agent falls back without calling when the invoker lacks this tool.
    pub required_tool: Option<&'a str>,
}

pub(crate) fn invoke_or_fallback(
    invoker: Option<&dyn AgentInvoker>,
    call: LlmCall<'_>,
    parse: impl FnOnce(String) -> AgentOutput,
    fallback: impl FnOnce() -> AgentOutput,
) -> AgentResult {
    let reason = match invoker {
        None => "LLM invoker not configured".to_string(),
        Some(invoker) => {
            if let Some(tool) = call.required_tool
                && !invoker.has_tool(tool)
            {
                format!("no {} tools available", tool)
            } else {
                let request = InvocationRequest {
                    prompt: call.prompt,
                    end_user: call.end_user,
                    tools: call.tools,
                };
                match invoker.run(&request) {
                    Ok(text) if !text.trim().is_empty() => {
                        info!(agent = call.label, "Completed. Preview: {}...", preview(&text, 200));
                        return AgentResult::Success(parse(text));
                    }
                    Ok(_) => "no output returned".to_string(),
                    Err(e) => format!("invocation failed: {}", e),
                }
            }
        }
    };

    warn!(agent = call.label, "Using fallback data: {}", reason);
    AgentResult::Fallback {
        output: fallback(),
        reason,
    }
}

pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extract a JSON block from LLM output. Tries fenced ```json ... ``` first,
/// then raw JSON starting with `{` or `[`.
pub(crate) fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            let block = trimmed[content_start..content_start + end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    None
}

static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

/// Parse a JSON object out of model output, tolerating prose around it.
pub(crate) fn parse_json_object(text: &str) -> Option<Value> {
    if let Some(block) = extract_json_block(text)
        && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(block)
    {
        return Some(value);
    }
    let found = EMBEDDED_OBJECT.find(text)?;
    match serde_json::from_str::<Value>(found.as_str()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("static regex")
});

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*\**title\**:\s*(.+?)\s*$").expect("static regex"));

/// Attendee addresses mentioned in calendar output, in first-seen order.
pub(crate) fn extract_attendees(calendar: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in EMAIL.find_iter(calendar) {
        let email = m.as_str().to_lowercase();
        if !seen.contains(&email) {
            seen.push(email);
        }
    }
    seen
}

/// First `Title:` line in calendar output.
pub(crate) fn extract_meeting_title(calendar: &str) -> Option<String> {
    TITLE_LINE
        .captures(calendar)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ScriptedInvoker {
        pub reply: anyhow::Result<String>,
        pub tools: Vec<&'static str>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedInvoker {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                tools: vec!["calendar", "slack"],
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(anyhow::anyhow!(message.to_string())),
                tools: vec!["calendar", "slack"],
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl AgentInvoker for ScriptedInvoker {
        fn name(&self) -> &str {
            "scripted"
        }

        fn run(&self, request: &InvocationRequest<'_>) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }

        fn has_tool(&self, tool: &str) -> bool {
            self.tools.iter().any(|t| t.contains(tool))
        }
    }

    fn call<'a>(required_tool: Option<&'a str>) -> LlmCall<'a> {
        LlmCall {
            label: "test",
            end_user: "test_agent",
            prompt: "prompt",
            tools: &[],
            required_tool,
        }
    }

    #[test]
    fn step_names_round_trip() {
        for step in StepName::ALL {
            assert_eq!(StepName::from_name(step.as_str()), Some(step));
        }
        assert_eq!(StepName::from_name(" coordinator "), Some(StepName::Coordinator));
        assert_eq!(StepName::from_name("calendr"), None);
    }

    #[test]
    fn output_serializes_as_tagged_union() {
        let text = serde_json::to_value(AgentOutput::from("hi")).unwrap();
        assert_eq!(text, serde_json::json!({"kind": "text", "value": "hi"}));

        let structured = AgentOutput::from_value(serde_json::json!({"a": 1}));
        let value = serde_json::to_value(&structured).unwrap();
        assert_eq!(value["kind"], "structured");
        assert_eq!(value["value"]["a"], 1);
    }

    #[test]
    fn missing_invoker_falls_back() {
        let result = invoke_or_fallback(None, call(None), AgentOutput::Text, || "canned".into());
        assert_eq!(result.output(), &AgentOutput::from("canned"));
        assert_eq!(result.fallback_reason(), Some("LLM invoker not configured"));
    }

    #[test]
    fn missing_tool_skips_the_call() {
        let invoker = ScriptedInvoker::replying("live");
        let result = invoke_or_fallback(
            Some(&invoker),
            call(Some("github")),
            AgentOutput::Text,
            || "canned".into(),
        );
        assert!(result.is_fallback());
        assert!(invoker.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_or_blank_calls_fall_back() {
        let failing = ScriptedInvoker::failing("quota exceeded");
        let result = invoke_or_fallback(Some(&failing), call(None), AgentOutput::Text, || {
            "canned".into()
        });
        assert_eq!(
            result.fallback_reason(),
            Some("invocation failed: quota exceeded")
        );

        let blank = ScriptedInvoker::replying("   \n");
        let result =
            invoke_or_fallback(Some(&blank), call(None), AgentOutput::Text, || "canned".into());
        assert_eq!(result.fallback_reason(), Some("no output returned"));
    }

    #[test]
    fn live_output_is_success() {
        let invoker = ScriptedInvoker::replying("live text");
        let result =
            invoke_or_fallback(Some(&invoker), call(None), AgentOutput::Text, || "canned".into());
        assert_eq!(result, AgentResult::Success("live text".into()));
        assert_eq!(result.status_label(), "success");
    }

    #[test]
    fn json_object_is_found_inside_prose() {
        let fenced = "Here you go:\n```json\n{\"a\": 1}\n```";
        assert_eq!(parse_json_object(fenced).unwrap()["a"], 1);

        let prose = "Sure! {\"agenda_items\": []} Hope that helps.";
        assert!(parse_json_object(prose).unwrap()["agenda_items"].is_array());

        assert!(parse_json_object("no json here").is_none());
        assert!(parse_json_object("[1, 2]").is_none());
    }

    #[test]
    fn attendees_and_title_are_extracted() {
        let calendar = "**Meeting 1:**\n  Title: Roadmap Sync\n  Attendees: Ana@Example.com, bo@example.com\n\
                        **Meeting 2:**\n  Title: Retro\n  Attendees: ana@example.com";
        assert_eq!(
            extract_attendees(calendar),
            vec!["ana@example.com".to_string(), "bo@example.com".to_string()]
        );
        assert_eq!(extract_meeting_title(calendar).as_deref(), Some("Roadmap Sync"));
        assert_eq!(extract_meeting_title("nothing"), None);
    }

    #[test]
    fn focus_mode_defaults_to_balanced() {
        assert_eq!(FocusMode::parse(Some("Design")), FocusMode::Design);
        assert_eq!(FocusMode::parse(Some("unknown")), FocusMode::Balanced);
        assert_eq!(FocusMode::parse(None), FocusMode::Balanced);
        assert_eq!(FocusMode::from_name(" PLANNING "), Some(FocusMode::Planning));
        assert_eq!(FocusMode::from_name("urgent"), None);
    }
}
