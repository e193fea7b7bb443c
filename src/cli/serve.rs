use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::ServeArgs;
use crate::core::config::AppConfig;
use crate::core::jobs::InMemoryJobStore;
use crate::core::llm::build_invoker;
use crate::core::pipeline::MeetingPreparationPipeline;
use crate::core::service::AgentService;
use crate::core::terminal;
use crate::interfaces::web::{self, AppState};
use crate::logging::{self, LogTarget};

/// Wire the shared service, job store and pipeline from configuration.
pub(crate) fn build_state(config: AppConfig) -> AppState {
    let invoker = build_invoker(&config);
    let agents = Arc::new(AgentService::new(
        invoker,
        config.pipeline.max_concurrent_agent_calls,
    ));
    let step_timeout = config.pipeline.step_timeout_secs.map(Duration::from_secs);
    let pipeline = Arc::new(MeetingPreparationPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::clone(&agents),
        step_timeout,
    ));
    AppState::new(pipeline, agents, Arc::new(config))
}

pub(crate) async fn run(args: ServeArgs) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    logging::init(&config.log_level, LogTarget::Stdout);

    terminal::print_banner();
    terminal::print_status("Environment", &config.environment);
    let display_host = if config.server.host == "0.0.0.0" {
        "localhost"
    } else {
        config.server.host.as_str()
    };
    terminal::print_link(
        "API",
        &format!("http://{}:{}/api/v1", display_host, config.server.port),
    );

    let state = build_state(config);
    if state.agents.llm_available() {
        terminal::print_success("Live agents enabled.");
    } else {
        terminal::print_warn("Credentials incomplete; agents will return fallback data.");
    }

    web::serve(state).await
}
