use std::path::PathBuf;

use anyhow::Result;

use crate::core::config::{AppConfig, REQUIRED_CREDENTIALS};
use crate::core::terminal::{self, GuideSection};

/// Tool integrations individual agents depend on.
const AGENT_TOOLS: [(&str, &str); 2] = [("calendar", "calendar"), ("slack", "slack_context")];

pub(crate) async fn run(config_path: Option<PathBuf>) -> Result<()> {
    terminal::print_banner();
    terminal::print_step("Checking meetprep setup");

    let config = AppConfig::load(config_path.as_deref())?;

    let missing = config.credentials.missing();
    let mut credentials = GuideSection::new("Credentials");
    for key in REQUIRED_CREDENTIALS {
        let state = if missing.contains(&key) { "missing" } else { "set" };
        credentials = credentials.status(key, state);
    }
    credentials.print();

    let configured: Vec<String> = config.llm.tools.iter().map(|t| t.to_lowercase()).collect();
    let mut tools = GuideSection::new("Tool integrations");
    for (tool, step) in AGENT_TOOLS {
        let available = configured.iter().any(|t| t.contains(tool));
        let state = if available {
            "configured".to_string()
        } else {
            format!("not configured ({} uses fallback)", step)
        };
        tools = tools.status(tool, &state);
    }
    tools
        .blank()
        .status("model", &config.llm.model)
        .status("environment", &config.environment)
        .print();
    println!();

    if config.credentials.is_complete() {
        terminal::print_success("All credentials present. Agents will call the live model.");
    } else {
        terminal::print_warn(&format!(
            "Missing {}. Every agent will return fallback data.",
            missing.join(", ")
        ));
    }
    Ok(())
}
