// src/handlers/inbounds.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        bundle::{ActualWeightPayload, RepackPayload, RepackResult, WeighingPayload, WeighingResult},
        inbound::{ConfirmLotsPayload, ConfirmOutcome, CrewLotNoPayload, ReportJobPayload, ReportLotsPayload},
        lot::{ScheduleInboundPayload, ScheduledInbound},
        report::{Report, ResolveReport},
        task::{InboundTask, TaskQuery},
    },
};

// =============================================================================
//  AGENDAMENTO E LISTAGEM
// =============================================================================

// POST /api/inbounds/schedule
#[utoipa::path(
    post,
    path = "/api/inbounds/schedule",
    tag = "Inbounds",
    request_body = ScheduleInboundPayload,
    responses(
        (status = 201, description = "Agendamento criado", body = ScheduledInbound),
        (status = 422, description = "Um ou mais lotes inválidos (nada é gravado)")
    ),
    security(("api_jwt" = []))
)]
pub async fn schedule_inbound(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ScheduleInboundPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let scheduled = app_state
        .lifecycle_service
        .schedule_inbound(None, user.user_id, payload.inbound_date, &payload.lots)
        .await?;

    Ok((StatusCode::CREATED, Json(scheduled)))
}

// GET /api/inbounds/tasks
#[utoipa::path(
    get,
    path = "/api/inbounds/tasks",
    tag = "Inbounds",
    params(TaskQuery),
    responses(
        (status = 200, description = "Lotes do escritório ou da equipe", body = Vec<InboundTask>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state
        .lifecycle_service
        .list_inbound_tasks(None, &query.to_filter())
        .await?;

    Ok(Json(tasks))
}

// =============================================================================
//  CONFIRMAÇÃO E REPORTES
// =============================================================================

// POST /api/inbounds/tasks-complete-inbound
#[utoipa::path(
    post,
    path = "/api/inbounds/tasks-complete-inbound",
    tag = "Inbounds",
    request_body = ConfirmLotsPayload,
    responses(
        (status = 200, description = "Inbounds criados e lotes pulados", body = ConfirmOutcome)
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_inbound(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ConfirmLotsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .lifecycle_service
        .confirm_lots(None, &payload.selected_lots, user.user_id)
        .await?;

    Ok(Json(outcome))
}

// POST /api/inbounds/tasks-report-confirmation
#[utoipa::path(
    post,
    path = "/api/inbounds/tasks-report-confirmation",
    tag = "Inbounds",
    request_body = ReportLotsPayload,
    responses(
        (status = 201, description = "Reportes de divergência abertos", body = Vec<Report>)
    ),
    security(("api_jwt" = []))
)]
pub async fn report_confirmation(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ReportLotsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reports = app_state
        .lifecycle_service
        .report_discrepancy(None, &payload.lot_ids, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reports)))
}

// POST /api/inbounds/tasks-report-duplicate
#[utoipa::path(
    post,
    path = "/api/inbounds/tasks-report-duplicate",
    tag = "Inbounds",
    request_body = ReportLotsPayload,
    responses(
        (status = 201, description = "Reportes de duplicidade abertos", body = Vec<Report>)
    ),
    security(("api_jwt" = []))
)]
pub async fn report_duplicate(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ReportLotsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reports = app_state
        .lifecycle_service
        .report_duplicate(None, &payload.lot_ids, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reports)))
}

// POST /api/inbounds/tasks-report-job
#[utoipa::path(
    post,
    path = "/api/inbounds/tasks-report-job",
    tag = "Inbounds",
    request_body = ReportJobPayload,
    responses(
        (status = 201, description = "Divergência aberta em todos os lotes do job", body = Vec<Report>),
        (status = 404, description = "Job sem lotes")
    ),
    security(("api_jwt" = []))
)]
pub async fn report_job(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ReportJobPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reports = app_state
        .lifecycle_service
        .report_job_discrepancy(None, &payload.job_no, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reports)))
}

// POST /api/inbounds/reports/resolve
#[utoipa::path(
    post,
    path = "/api/inbounds/reports/resolve",
    tag = "Inbounds",
    request_body = ResolveReport,
    responses(
        (status = 200, description = "Reporte fechado", body = Report),
        (status = 404, description = "Nenhum reporte aberto para o lote")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ResolveReport>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .lifecycle_service
        .resolve_report(None, payload, user.user_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("reporte {} aberto do lote {}", payload.kind.as_str(), payload.lot_id))
        })?;

    Ok(Json(report))
}

// =============================================================================
//  PESAGEM, LOTE DA EQUIPE E REPACK
// =============================================================================

// POST /api/inbounds/weighing
#[utoipa::path(
    post,
    path = "/api/inbounds/weighing",
    tag = "Inbounds",
    request_body = WeighingPayload,
    responses(
        (status = 200, description = "Peso gravado e bundles substituídos", body = WeighingResult)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_weighing(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<WeighingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .lifecycle_service
        .save_weighing(None, payload.target(), payload.actual_weight, &payload.bundles)
        .await?;

    Ok(Json(result))
}

// POST /api/inbounds/actual-weight
#[utoipa::path(
    post,
    path = "/api/inbounds/actual-weight",
    tag = "Inbounds",
    request_body = ActualWeightPayload,
    responses(
        (status = 200, description = "Pesagem localizada por job e lote", body = WeighingResult)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_actual_weight(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<ActualWeightPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state.lifecycle_service.save_actual_weight(None, &payload).await?;

    Ok(Json(result))
}

// POST /api/inbounds/crew-lot-no
#[utoipa::path(
    post,
    path = "/api/inbounds/crew-lot-no",
    tag = "Inbounds",
    request_body = CrewLotNoPayload,
    responses(
        (status = 200, description = "Lote da equipe gravado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_crew_lot_no(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CrewLotNoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let target = app_state
        .lifecycle_service
        .update_located_crew_lot_no(None, &payload)
        .await?;

    Ok(Json(json!({ "target": target, "crewLotNo": payload.crew_lot_no.trim() })))
}

// POST /api/inbounds/repack
#[utoipa::path(
    post,
    path = "/api/inbounds/repack",
    tag = "Inbounds",
    request_body = RepackPayload,
    responses(
        (status = 200, description = "Bundle reembalado, peças e fotos gravadas", body = RepackResult)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_repack(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<RepackPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state.lifecycle_service.save_located_repack(None, &payload).await?;

    Ok(Json(result))
}
