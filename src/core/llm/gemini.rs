use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use super::{AgentInvoker, InvocationRequest};
use crate::core::config::LlmConfig;

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResContent,
}

#[derive(Deserialize)]
struct GeminiResContent {
    #[serde(default)]
    parts: Vec<GeminiResPart>,
}

#[derive(Deserialize)]
struct GeminiResPart {
    #[serde(default)]
    text: String,
}

/// Calls Gemini `generateContent`. Requests are issued on the async client and
/// driven to completion with the runtime handle captured at construction, so
/// `run` must be called from a blocking worker thread.
pub struct GeminiInvoker {
    client: Client,
    handle: Handle,
    api_key: String,
    model: String,
    base_url: String,
    tools: Vec<String>,
}

impl GeminiInvoker {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        let handle = Handle::try_current()
            .map_err(|_| anyhow!("GeminiInvoker must be created inside a tokio runtime"))?;
        Ok(Self {
            client,
            handle,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tools: config.tools.iter().map(|t| t.to_lowercase()).collect(),
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Gemini API Error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: GeminiResponse = res.json().await?;
        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}

impl AgentInvoker for GeminiInvoker {
    fn name(&self) -> &str {
        "gemini"
    }

    fn run(&self, request: &InvocationRequest<'_>) -> Result<String> {
        tracing::debug!(
            end_user = request.end_user,
            tools = ?request.tools,
            "Invoking Gemini"
        );
        self.handle.block_on(self.generate(request.prompt))
    }

    fn has_tool(&self, tool: &str) -> bool {
        let tool = tool.to_lowercase();
        self.tools.iter().any(|t| t.contains(&tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tool_lookup_is_case_insensitive_substring() {
        let config = LlmConfig {
            tools: vec!["Google_Calendar".to_string(), "web_search".to_string()],
            ..LlmConfig::default()
        };
        let invoker = GeminiInvoker::new(&config, "key".to_string()).unwrap();
        assert!(invoker.has_tool("calendar"));
        assert!(invoker.has_tool("WEB_SEARCH"));
        assert!(!invoker.has_tool("slack"));
    }

    #[test]
    fn construction_outside_runtime_is_an_error() {
        assert!(GeminiInvoker::new(&LlmConfig::default(), "key".to_string()).is_err());
    }
}
