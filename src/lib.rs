// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

/// Monta todas as rotas da API. Só health e docs ficam fora do `auth_guard`.
pub fn router(app_state: AppState) -> Router {
    let inbound_routes = Router::new()
        .route("/schedule", post(handlers::inbounds::schedule_inbound))
        .route("/tasks", get(handlers::inbounds::list_tasks))
        .route("/tasks-complete-inbound", post(handlers::inbounds::complete_inbound))
        .route("/tasks-report-confirmation", post(handlers::inbounds::report_confirmation))
        .route("/tasks-report-duplicate", post(handlers::inbounds::report_duplicate))
        .route("/tasks-report-job", post(handlers::inbounds::report_job))
        .route("/reports/resolve", post(handlers::inbounds::resolve_report))
        .route("/weighing", post(handlers::inbounds::save_weighing))
        .route("/actual-weight", post(handlers::inbounds::save_actual_weight))
        .route("/crew-lot-no", post(handlers::inbounds::update_crew_lot_no))
        .route("/repack", post(handlers::inbounds::save_repack))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let outbound_routes = Router::new()
        .route("/schedule", post(handlers::outbounds::schedule_outbound))
        .route("/create-grn-and-transactions", post(handlers::outbounds::create_grn))
        .route("/{outbound_id}/regenerate-grn", post(handlers::outbounds::regenerate_grn))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let sync_routes = Router::new()
        .route("/", post(handlers::sync::sync_batch))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/inbounds", inbound_routes)
        .nest("/api/outbounds", outbound_routes)
        .nest("/api/sync", sync_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
