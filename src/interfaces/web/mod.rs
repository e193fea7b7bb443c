mod error;
mod handlers;
mod router;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::config::AppConfig;
use crate::core::pipeline::MeetingPreparationPipeline;
use crate::core::service::AgentService;

pub(crate) use router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pipeline: Arc<MeetingPreparationPipeline>,
    pub(crate) agents: Arc<AgentService>,
    pub(crate) config: Arc<AppConfig>,
}

impl AppState {
    pub(crate) fn new(
        pipeline: Arc<MeetingPreparationPipeline>,
        agents: Arc<AgentService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            pipeline,
            agents,
            config,
        }
    }
}

/// Bind and serve until Ctrl-C.
pub(crate) async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API Server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("API Server shutting down...");
        })
        .await
        .context("API Server crashed")?;
    Ok(())
}
