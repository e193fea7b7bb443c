//! Runtime configuration: optional TOML file overlaid with environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Credential variables that gate the live LLM invoker. Any missing key switches
/// every agent to its fallback path.
pub const REQUIRED_CREDENTIALS: [&str; 3] = ["PORTIA_API_KEY", "GOOGLE_API_KEY", "TAVILY_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub log_level: String,
    pub environment: String,
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            credentials: Credentials::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins in production. Outside production any origin is allowed.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Tool integrations exposed to agents. Calendar and Slack agents fall back
    /// when their tool is not listed.
    pub tools: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 60,
            tools: vec![
                "calendar".to_string(),
                "slack".to_string(),
                "web_search".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_concurrent_agent_calls: usize,
    pub step_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agent_calls: 8,
            step_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub portia_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
}

impl Credentials {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            portia_api_key: read("PORTIA_API_KEY"),
            google_api_key: read("GOOGLE_API_KEY"),
            tavily_api_key: read("TAVILY_API_KEY"),
        }
    }

    /// Names of required credential variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let values = [
            &self.portia_api_key,
            &self.google_api_key,
            &self.tavily_api_key,
        ];
        REQUIRED_CREDENTIALS
            .iter()
            .zip(values)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl AppConfig {
    /// Load from `explicit_path`, else `MEETPREP_CONFIG`, else `~/.meetprep/config.toml`
    /// when it exists, then apply environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if std::env::var("RENDER").as_deref() != Ok("true") {
            dotenv::dotenv().ok();
        }
        let lookup = |key: &str| std::env::var(key).ok();
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| lookup("MEETPREP_CONFIG").map(PathBuf::from))
            .or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".meetprep").join("config.toml"))
                    .filter(|p| p.exists())
            });
        Self::load_with(path.as_deref(), lookup)
    }

    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed reading config file {}", path.display()))?;
                toml::from_str::<AppConfig>(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => AppConfig::default(),
        };
        config.apply_env(&lookup);
        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.llm.model = model;
        }
        if let Some(env) = lookup("ENVIRONMENT") {
            self.environment = env;
        }
        self.credentials = Credentials::from_lookup(lookup);
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
