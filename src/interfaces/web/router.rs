use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use super::AppState;
use super::handlers::{agenda, agents, health, meetings, technical};

/// Any origin outside production; the configured list in production.
fn build_cors(state: &AppState) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    if !state.config.is_production() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

pub(crate) fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/meetings/prepare", post(meetings::prepare_meeting))
        .route("/meetings/prepare-custom", post(meetings::prepare_custom))
        .route("/meetings/jobs", get(meetings::list_jobs))
        .route(
            "/meetings/jobs/{job_id}",
            get(meetings::get_job).delete(meetings::delete_job),
        )
        .route("/meetings/jobs/{job_id}/cancel", post(meetings::cancel_job))
        .route("/agents/{agent}", post(agents::run_agent))
        .route("/agenda/build", post(agenda::build_agenda))
        .route("/agenda/preread", post(agenda::collect_preread))
        .route("/agenda/briefing", post(agenda::context_briefing))
        .route("/agenda/comprehensive", post(agenda::comprehensive))
        .route("/agenda/quick/{focus_mode}", post(agenda::quick_agenda))
        .route(
            "/technical/github/repositories",
            post(technical::search_repositories),
        )
        .route("/technical/github/issues", post(technical::analyze_issues))
        .route("/technical/documentation", post(technical::search_documentation))
        .route(
            "/technical/technology-stack",
            post(technical::analyze_tech_stack),
        )
        .route(
            "/technical/comprehensive",
            post(technical::comprehensive_analysis),
        );

    let cors = build_cors(&state);
    Router::new()
        .route("/", get(health::root))
        .nest("/api/v1", api)
        .layer(cors)
        .with_state(state)
}
