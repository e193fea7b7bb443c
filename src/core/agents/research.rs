//! Narrow technical research agents behind the `/technical/*` endpoints.
//!
//! Each kind makes one call with a short prompt plus a subject line and falls
//! back to a canned report, like the pipeline agents.

use super::{AgentOutput, AgentResult, LlmCall, extract_meeting_title, invoke_or_fallback, preview};
use crate::core::llm::SharedInvoker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchKind {
    GithubRepository,
    GithubIssues,
    Documentation,
    TechnologyStack,
}

impl ResearchKind {
    pub const ALL: [ResearchKind; 4] = [
        ResearchKind::GithubRepository,
        ResearchKind::GithubIssues,
        ResearchKind::Documentation,
        ResearchKind::TechnologyStack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => "github_repository",
            ResearchKind::GithubIssues => "github_issues",
            ResearchKind::Documentation => "documentation",
            ResearchKind::TechnologyStack => "technology_stack",
        }
    }

    fn end_user(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => "github_repo_agent",
            ResearchKind::GithubIssues => "github_issues_agent",
            ResearchKind::Documentation => "documentation_agent",
            ResearchKind::TechnologyStack => "tech_stack_agent",
        }
    }

    /// Heading used in the combined report.
    pub fn section_title(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => "Repository Analysis",
            ResearchKind::GithubIssues => "Development Activity",
            ResearchKind::Documentation => "Documentation",
            ResearchKind::TechnologyStack => "Technology Stack",
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => REPOSITORY_PROMPT,
            ResearchKind::GithubIssues => ISSUES_PROMPT,
            ResearchKind::Documentation => DOCUMENTATION_PROMPT,
            ResearchKind::TechnologyStack => STACK_PROMPT,
        }
    }

    fn subject_label(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => "Search terms",
            ResearchKind::GithubIssues | ResearchKind::TechnologyStack => {
                "Repository information"
            }
            ResearchKind::Documentation => "Project context",
        }
    }

    fn closing(self) -> &'static str {
        match self {
            ResearchKind::GithubRepository => "Find relevant GitHub repositories.",
            ResearchKind::GithubIssues => "Analyze recent issues and development activity.",
            ResearchKind::Documentation => "Find relevant technical documentation.",
            ResearchKind::TechnologyStack => "Research the technology stack used.",
        }
    }

    pub fn fallback_output(self) -> AgentOutput {
        let text = match self {
            ResearchKind::GithubRepository => REPOSITORY_FALLBACK,
            ResearchKind::GithubIssues => ISSUES_FALLBACK,
            ResearchKind::Documentation => DOCUMENTATION_FALLBACK,
            ResearchKind::TechnologyStack => STACK_FALLBACK,
        };
        AgentOutput::from(text)
    }
}

const REPOSITORY_PROMPT: &str = "You are a GitHub Repository Research Agent. Find and analyze GitHub repositories.

Steps:
1. Extract project/organization names from the input
2. Search for relevant repositories using GitHub search tools
3. Get repository info (stars, description, last updated)
4. List most relevant repositories

Output format:
- Repository name and URL
- Description and stars
- Last updated date
- Main programming language";

const ISSUES_PROMPT: &str = "You are a GitHub Issues Analysis Agent. Analyze issues and development activity.

Focus on:
1. Recent critical issues (bugs, blockers)
2. Active feature development
3. Performance/security concerns
4. Recent commits and changes

Output format:
- Issue number, title, priority
- Status and recent activity
- Impact assessment";

const DOCUMENTATION_PROMPT: &str = "You are a Documentation Research Agent. Find relevant technical documentation.

Search for:
1. API documentation
2. Architecture guides
3. Setup/deployment guides
4. Technical blog posts
5. Official project docs

Output format:
- Document title and URL
- Type of documentation
- Key topics covered";

const STACK_PROMPT: &str = "You are a Technology Stack Research Agent. Research technologies and frameworks.

Focus on:
1. Programming languages and versions
2. Frameworks and libraries
3. Infrastructure and deployment tech
4. Monitoring and observability tools

Output format:
- Technology name and version
- Purpose in the system
- Recent updates";

const REPOSITORY_FALLBACK: &str = "**GitHub Repositories Found:**

**example-org/ledger-sync** (https://github.com/example-org/ledger-sync)
- Description: Cross-region ledger replication service
- Stars: 42 | Language: Rust | Last updated: 3 days ago

**example-org/replay-tools** (https://github.com/example-org/replay-tools)
- Description: Operator tooling for replaying ledger entries
- Stars: 18 | Language: Go | Last updated: 1 week ago";

const ISSUES_FALLBACK: &str = "**Recent Development Activity:**

**Critical Issues:**
- Issue #156: Replication lag spikes under burst load (High Priority, Open)
- Issue #148: Failover drill leaves stale partition leases (Open)
- Issue #142: Replay throughput regression (In Progress)

**Recent Commits:**
- Fix: Idempotency keys survive worker restarts
- Feature: Cross-region batching behind a flag
- Docs: Updated operator runbook";

const DOCUMENTATION_FALLBACK: &str = "**Technical Documentation Found:**

**API Documentation:**
- Ledger Sync API Reference (https://docs.example.com/ledger-sync/api)
- Topics: Subscriptions, replay requests, health checks

**Architecture Guides:**
- Replication Architecture (https://docs.example.com/ledger-sync/architecture)
- Topics: Change capture, partition leasing, ordering guarantees

**Setup Guides:**
- Kubernetes Deployment Guide (https://docs.example.com/ledger-sync/deploy)
- Topics: Regional rollout, scaling workers";

const STACK_FALLBACK: &str = "**Technology Stack Analysis:**

**Programming Languages:**
- Rust 1.8x: Replication workers
- Go 1.22: Operator tooling

**Frameworks:**
- Tokio: Async runtime
- Apache Kafka: Event streaming

**Infrastructure:**
- Kubernetes: Container orchestration
- PostgreSQL: Primary data storage
- Redis: Lease cache";

pub struct ResearchAgent {
    kind: ResearchKind,
    invoker: Option<SharedInvoker>,
}

impl ResearchAgent {
    pub fn new(kind: ResearchKind, invoker: Option<SharedInvoker>) -> Self {
        Self { kind, invoker }
    }

    pub fn kind(&self) -> ResearchKind {
        self.kind
    }

    /// Blocking; run on a worker thread.
    pub fn execute(&self, subject: &str) -> AgentResult {
        let kind = self.kind;
        let prompt = format!(
            "{}\n\n{}: {}\n{}",
            kind.prompt(),
            kind.subject_label(),
            subject.trim(),
            kind.closing()
        );
        invoke_or_fallback(
            self.invoker.as_deref(),
            LlmCall {
                label: kind.as_str(),
                end_user: kind.end_user(),
                prompt: &prompt,
                tools: &["github", "web_search"],
                required_tool: None,
            },
            AgentOutput::Text,
            || kind.fallback_output(),
        )
    }
}

/// Which sub-agents a comprehensive analysis runs.
#[derive(Debug, Clone, Copy)]
pub struct ResearchScope {
    pub github: bool,
    pub docs: bool,
    pub tech_stack: bool,
}

/// Topic of the meeting described by calendar output: its `Title:` line, else
/// its first non-empty line.
fn research_topic(calendar_context: &str) -> String {
    extract_meeting_title(calendar_context)
        .or_else(|| {
            calendar_context
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| preview(line, 120))
        })
        .unwrap_or_else(|| "the meeting topic".to_string())
}

/// Subject line per sub-agent for a comprehensive analysis of one meeting.
pub fn comprehensive_subjects(
    calendar_context: &str,
    focus_areas: &[String],
    scope: ResearchScope,
) -> Vec<(ResearchKind, String)> {
    let topic = research_topic(calendar_context);
    let focus = if focus_areas.is_empty() {
        String::new()
    } else {
        format!(" (focus: {})", focus_areas.join(", "))
    };

    let mut subjects = Vec::new();
    if scope.github {
        subjects.push((ResearchKind::GithubRepository, format!("{}{}", topic, focus)));
        subjects.push((
            ResearchKind::GithubIssues,
            format!("Repositories related to: {}", topic),
        ));
    }
    if scope.docs {
        subjects.push((ResearchKind::Documentation, format!("Projects: {}", topic)));
    }
    if scope.tech_stack {
        let context = calendar_context.trim();
        let info = if context.is_empty() { topic.as_str() } else { context };
        subjects.push((
            ResearchKind::TechnologyStack,
            format!("{}{}", preview(info, 1000), focus),
        ));
    }
    subjects
}

/// Join sub-agent outputs under one heading per kind, in the given order.
pub fn combine_research(sections: &[(ResearchKind, AgentOutput)]) -> String {
    let mut combined = String::from("# Comprehensive Technical Analysis\n\n");
    for (kind, output) in sections {
        combined.push_str("## ");
        combined.push_str(kind.section_title());
        combined.push('\n');
        combined.push_str(&output.render());
        combined.push_str("\n\n");
    }
    combined
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::agents::tests::ScriptedInvoker;

    #[test]
    fn every_kind_has_a_distinct_fallback() {
        let outputs: Vec<AgentOutput> = ResearchKind::ALL
            .iter()
            .map(|kind| ResearchAgent::new(*kind, None).execute("ledger").output().clone())
            .collect();
        for (i, output) in outputs.iter().enumerate() {
            assert!(!output.is_blank());
            assert!(outputs[i + 1..].iter().all(|other| other != output));
        }
    }

    #[test]
    fn subject_is_labelled_in_the_prompt() {
        let invoker = Arc::new(ScriptedInvoker::replying("found two repos"));
        let agent = ResearchAgent::new(ResearchKind::Documentation, Some(invoker.clone()));
        let result = agent.execute("  Projects: ledger-sync ");
        assert_eq!(result, AgentResult::Success("found two repos".into()));

        let prompt = invoker.prompts.lock().unwrap()[0].clone();
        assert!(prompt.starts_with("You are a Documentation Research Agent."));
        assert!(prompt.contains("Project context: Projects: ledger-sync\n"));
        assert!(prompt.ends_with("Find relevant technical documentation."));
    }

    #[test]
    fn comprehensive_subjects_follow_scope_and_title() {
        let calendar = "**Meeting 1:**\n  Title: Ledger Sync Review\n  Date: 2025-05-16";
        let all = ResearchScope {
            github: true,
            docs: true,
            tech_stack: true,
        };
        let subjects = comprehensive_subjects(calendar, &["replication".to_string()], all);
        let kinds: Vec<ResearchKind> = subjects.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ResearchKind::ALL.to_vec());
        assert_eq!(subjects[0].1, "Ledger Sync Review (focus: replication)");
        assert_eq!(subjects[2].1, "Projects: Ledger Sync Review");

        let docs_only = ResearchScope {
            github: false,
            docs: true,
            tech_stack: false,
        };
        let subjects = comprehensive_subjects("Weekly infra sync", &[], docs_only);
        assert_eq!(
            subjects,
            vec![(ResearchKind::Documentation, "Projects: Weekly infra sync".to_string())]
        );
    }

    #[test]
    fn combined_report_keeps_section_order() {
        let report = combine_research(&[
            (ResearchKind::GithubIssues, AgentOutput::from("issues body")),
            (ResearchKind::TechnologyStack, AgentOutput::from("stack body")),
        ]);
        assert!(report.starts_with("# Comprehensive Technical Analysis\n\n## Development Activity\nissues body"));
        let issues = report.find("## Development Activity").unwrap();
        let stack = report.find("## Technology Stack\nstack body").unwrap();
        assert!(issues < stack);
        assert!(!report.contains("Repository Analysis"));
    }
}
