//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Score ledger
        .route("/scores", post(handlers::score::submit_score))
        .route("/scores/{id}", get(handlers::score::get_score))
        .route("/scores/{id}/decision", post(handlers::score::decide_score))
        // Study plans
        .route("/plans", post(handlers::plan::submit_plan))
        .route("/plans/{id}", get(handlers::plan::get_plan))
        .route("/plans/{id}/reject", post(handlers::plan::reject_plan))
        .route("/plans/{id}/feedback", post(handlers::plan::give_feedback))
        .route("/plans/{id}/complete", post(handlers::plan::complete_plan))
        .route(
            "/plans/{id}/reconciliation",
            get(handlers::plan::plan_reconciliation),
        )
        // Participant views
        .route(
            "/participants/{id}/scores",
            get(handlers::score::list_participant_scores),
        )
        .route(
            "/participants/{id}/scores/current",
            get(handlers::score::get_current_score),
        )
        .route(
            "/participants/{id}/plans",
            get(handlers::plan::list_participant_plans),
        )
        .route(
            "/participants/{id}/plans/active",
            get(handlers::plan::get_active_plan),
        )
        .route(
            "/participants/{id}/eligibility",
            get(handlers::eligibility::get_eligibility),
        )
        .route(
            "/participants/{id}/transactions",
            get(handlers::transaction::list_participant_transactions),
        )
        .route(
            "/participants/{id}/subscription",
            get(handlers::transaction::get_subscription),
        )
        // Skill catalog
        .route("/skills", get(handlers::skill::list_skills))
        // Packages
        .route(
            "/packages",
            get(handlers::package::list_packages).post(handlers::package::create_package),
        )
        .route("/packages/{id}", get(handlers::package::get_package))
        .route("/packages/{id}", put(handlers::package::update_package))
        // Transactions
        .route("/transactions", post(handlers::transaction::purchase))
        .route(
            "/transactions/{id}",
            get(handlers::transaction::get_transaction),
        )
        .route(
            "/transactions/{id}/decision",
            post(handlers::transaction::decide_transaction),
        )
        // Files
        .route("/files", post(handlers::file::upload_file))
        .route("/files/{file_ref}", get(handlers::file::download_file));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
