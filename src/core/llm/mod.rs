//! The opaque language-model capability behind every agent.

pub mod gemini;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::core::config::AppConfig;

/// One call into the language model on behalf of an agent.
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub prompt: &'a str,
    /// Identifies the calling agent to the backend.
    pub end_user: &'a str,
    /// Tool integrations the agent expects to be available.
    pub tools: &'a [&'a str],
}

pub trait AgentInvoker: Send + Sync {
    fn name(&self) -> &str;

    /// Blocking; agents are executed on worker threads.
    fn run(&self, request: &InvocationRequest<'_>) -> Result<String>;

    fn has_tool(&self, tool: &str) -> bool;
}

pub type SharedInvoker = Arc<dyn AgentInvoker>;

/// Build the live invoker when every required credential is present. Returns
/// `None` otherwise so agents degrade to their fallback output.
pub fn build_invoker(config: &AppConfig) -> Option<SharedInvoker> {
    if !config.credentials.is_complete() {
        warn!(
            "Missing environment variables: {}. Agents will use fallback data.",
            config.credentials.missing().join(", ")
        );
        return None;
    }
    let api_key = config.credentials.google_api_key.clone()?;

    match gemini::GeminiInvoker::new(&config.llm, api_key) {
        Ok(invoker) => {
            info!(
                "LLM invoker ready: {} ({})",
                invoker.name(),
                config.llm.model
            );
            Some(Arc::new(invoker))
        }
        Err(e) => {
            warn!("Failed to create LLM invoker, using fallback data: {}", e);
            None
        }
    }
}
