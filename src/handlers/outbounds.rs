// src/handlers/outbounds.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::outbound::{CreateGrnPayload, CreatedGrn, Outbound, ScheduleOutboundPayload, ScheduledRelease},
};

// POST /api/outbounds/schedule
#[utoipa::path(
    post,
    path = "/api/outbounds/schedule",
    tag = "Outbounds",
    request_body = ScheduleOutboundPayload,
    responses(
        (status = 201, description = "Agendamento de saída criado", body = ScheduledRelease),
        (status = 409, description = "Inbound já está em outro agendamento ativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn schedule_outbound(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ScheduleOutboundPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let release = app_state
        .outbound_service
        .schedule_outbound(None, user.user_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(release)))
}

// POST /api/outbounds/create-grn-and-transactions
#[utoipa::path(
    post,
    path = "/api/outbounds/create-grn-and-transactions",
    tag = "Outbounds",
    request_body = CreateGrnPayload,
    responses(
        (status = 201, description = "GRN, transações e PDF (base64)", body = CreatedGrn),
        (status = 409, description = "GRN duplicada ou lote já liberado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_grn(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateGrnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = app_state
        .outbound_service
        .create_outbound_document(None, &payload, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// POST /api/outbounds/{outbound_id}/regenerate-grn
#[utoipa::path(
    post,
    path = "/api/outbounds/{outbound_id}/regenerate-grn",
    tag = "Outbounds",
    responses(
        (status = 200, description = "PDF da GRN refeito a partir das transações gravadas", body = Outbound)
    ),
    params(
        ("outbound_id" = i64, Path, description = "ID da saída")
    ),
    security(("api_jwt" = []))
)]
pub async fn regenerate_grn(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(outbound_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outbound = app_state.outbound_service.regenerate_grn(None, outbound_id).await?;

    Ok(Json(outbound))
}
