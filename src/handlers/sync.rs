// src/handlers/sync.rs

use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::sync::{SyncBatchPayload, SyncBatchResponse},
};

// POST /api/sync
#[utoipa::path(
    post,
    path = "/api/sync",
    tag = "Sync",
    request_body = SyncBatchPayload,
    responses(
        (status = 200, description = "Resultado por job (SUCCESS, FAILED ou SKIPPED)", body = SyncBatchResponse),
        (status = 500, description = "Um job falhou e o lote inteiro foi desfeito")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_batch(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SyncBatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state
        .sync_service
        .process_batch(&payload.jobs, user.user_id)
        .await?;

    Ok(Json(response))
}
