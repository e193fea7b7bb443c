use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AgentError, AgentOutput, AgentResult, LlmCall, invoke_or_fallback, parse_json_object, preview};
use crate::core::llm::SharedInvoker;

const PROMPT: &str = "You are a Pre-Read Document Collector Agent. Your task is to gather all relevant documents for meeting preparation.

Based on meeting context and participant information:
1. Search for pull requests and issues involving participants
2. Find relevant documentation pages (Notion, Confluence, etc.)
3. Identify Slack/Teams discussions related to meeting topics
4. Collect recent updates and changes relevant to the meeting
5. Prioritize documents by relevance and importance

For each document, provide:
- Document title and type
- Source (GitHub, Notion, Slack, etc.)
- Relevance score (1-10)
- Brief summary
- Key points for meeting preparation
- Direct link/reference

Focus on actionable content that will help participants prepare effectively.";

pub const DEFAULT_RELEVANCE_THRESHOLD: u8 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreReadDocument {
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
    pub relevance_score: u8,
    pub summary: String,
    pub key_points: Vec<String>,
    pub link: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreReadPacket {
    pub meeting_title: String,
    pub preread_summary: String,
    pub documents: Vec<PreReadDocument>,
    pub action_items_context: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
fn document(
    title: &str,
    doc_type: &str,
    source: &str,
    relevance_score: u8,
    summary: &str,
    key_points: [&str; 3],
    link: &str,
    last_updated: &str,
) -> PreReadDocument {
    PreReadDocument {
        title: title.to_string(),
        doc_type: doc_type.to_string(),
        source: source.to_string(),
        relevance_score,
        summary: summary.to_string(),
        key_points: key_points.map(str::to_string).to_vec(),
        link: link.to_string(),
        last_updated: last_updated.to_string(),
    }
}

impl PreReadPacket {
    /// Canned packet, keeping documents scored at or above `relevance_threshold`.
    pub fn canned(meeting_title: &str, relevance_threshold: u8) -> Self {
        let documents = vec![
            document(
                "Project Status Dashboard",
                "Dashboard",
                "Internal Tools",
                9,
                "Current project metrics, progress indicators, and key performance data",
                [
                    "Sprint progress: 75% complete",
                    "3 critical issues pending resolution",
                    "Replication lag down 15% since last review",
                ],
                "https://dashboard.example.com/project-status",
                "2 hours ago",
            ),
            document(
                "Technical Architecture RFC",
                "Technical Document",
                "GitHub",
                8,
                "Proposed changes to system architecture and implementation approach",
                [
                    "Partition leasing for replication workers",
                    "Database optimization strategies",
                    "API versioning approach",
                ],
                "https://git.example.com/team/rfcs/pull/42",
                "1 day ago",
            ),
            document(
                "Design System Updates",
                "Design Documentation",
                "Notion",
                7,
                "Latest changes to design system components and guidelines",
                [
                    "New button component variants",
                    "Updated color palette",
                    "Accessibility improvements",
                ],
                "https://docs.example.com/design-system-v2.1",
                "3 days ago",
            ),
            document(
                "Recent Slack Discussions",
                "Communication Thread",
                "Slack",
                6,
                "Key discussions and decisions from relevant Slack channels",
                [
                    "Performance optimization approaches discussed",
                    "Deployment timeline concerns raised",
                    "Resource allocation decisions pending",
                ],
                "https://chat.example.com/channels/ledger-sync-dev",
                "6 hours ago",
            ),
        ];

        Self {
            meeting_title: meeting_title.to_string(),
            preread_summary: "Essential documents and updates for meeting preparation".to_string(),
            documents: documents
                .into_iter()
                .filter(|d| d.relevance_score >= relevance_threshold)
                .collect(),
            action_items_context: [
                "Review architecture RFC before technical discussion",
                "Prepare feedback on design system changes",
                "Come ready with performance optimization ideas",
                "Consider resource allocation proposals",
            ]
            .map(str::to_string)
            .to_vec(),
        }
    }

    pub fn from_text(response: &str) -> Self {
        Self {
            meeting_title: "Generated Meeting".to_string(),
            preread_summary: format!("{}...", preview(response, 300)),
            documents: Vec::new(),
            action_items_context: vec!["Review AI-generated summary".to_string()],
        }
    }

    fn into_output(self) -> AgentOutput {
        match serde_json::to_value(&self) {
            Ok(value) => AgentOutput::Structured(value),
            Err(_) => AgentOutput::Text(self.preread_summary),
        }
    }
}

/// Direct-invocation agent that assembles a pre-read packet.
pub struct PreReadCollectorAgent {
    invoker: Option<SharedInvoker>,
}

impl PreReadCollectorAgent {
    pub fn new(invoker: Option<SharedInvoker>) -> Self {
        Self { invoker }
    }

    pub fn execute(
        &self,
        meeting_context: &Value,
        relevance_threshold: u8,
        document_sources: &[String],
    ) -> anyhow::Result<AgentResult> {
        let Value::Object(fields) = meeting_context else {
            return Err(AgentError::InvalidInput {
                agent: "preread_collector",
                reason: "meeting_context must be a JSON object".to_string(),
            }
            .into());
        };
        let meeting_title = fields
            .get("meeting_title")
            .and_then(Value::as_str)
            .unwrap_or("Team Meeting")
            .to_string();

        let prompt = format!(
            "{}\n\nMeeting Context:\n{}\n\nDocument sources to search: {}\nOnly include documents with a relevance score of at least {}.\n\nFind and prioritize relevant documents for this meeting.",
            PROMPT,
            serde_json::to_string_pretty(meeting_context)?,
            document_sources.join(", "),
            relevance_threshold,
        );

        Ok(invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: "preread_collector",
                end_user: "preread_collector",
                prompt: &prompt,
                tools: &["web_search"],
                required_tool: None,
            },
            |text| match parse_json_object(&text) {
                Some(value) => AgentOutput::Structured(value),
                None => PreReadPacket::from_text(&text).into_output(),
            },
            || PreReadPacket::canned(&meeting_title, relevance_threshold).into_output(),
        ))
    }
}
