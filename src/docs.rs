// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::common::error::ItemError;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Inbounds ---
        handlers::inbounds::schedule_inbound,
        handlers::inbounds::list_tasks,
        handlers::inbounds::complete_inbound,
        handlers::inbounds::report_confirmation,
        handlers::inbounds::report_duplicate,
        handlers::inbounds::report_job,
        handlers::inbounds::resolve_report,
        handlers::inbounds::save_weighing,
        handlers::inbounds::save_actual_weight,
        handlers::inbounds::update_crew_lot_no,
        handlers::inbounds::save_repack,

        // --- Outbounds ---
        handlers::outbounds::schedule_outbound,
        handlers::outbounds::create_grn,
        handlers::outbounds::regenerate_grn,

        // --- Sync ---
        handlers::sync::sync_batch,
    ),
    components(
        schemas(
            ItemError,

            // --- Lotes ---
            models::lot::LotStatus,
            models::lot::ScheduleInbound,
            models::lot::Lot,
            models::lot::NewLot,
            models::lot::LotRef,
            models::lot::ScheduleInboundPayload,
            models::lot::ScheduledInbound,
            models::task::InboundTask,
            models::task::TaskView,

            // --- Inbounds ---
            models::inbound::InboundRecord,
            models::inbound::SkipReason,
            models::inbound::SkippedLot,
            models::inbound::ConfirmOutcome,
            models::inbound::ConfirmLotsPayload,
            models::inbound::ReportLotsPayload,
            models::inbound::ReportJobPayload,
            models::inbound::TargetLocator,
            models::inbound::CrewLotNoPayload,

            // --- Reportes ---
            models::report::ReportKind,
            models::report::ReportStatus,
            models::report::ReportDecision,
            models::report::Report,
            models::report::ResolveReport,

            // --- Bundles ---
            models::bundle::BundleParent,
            models::bundle::Bundle,
            models::bundle::NewBundle,
            models::bundle::BundlePiece,
            models::bundle::NewPiece,
            models::bundle::WeighingResult,
            models::bundle::RepackResult,
            models::bundle::WeighingPayload,
            models::bundle::ActualWeightPayload,
            models::bundle::RepackPayload,

            // --- Outbounds ---
            models::outbound::ScheduleOutbound,
            models::outbound::SelectedInbound,
            models::outbound::ScheduledRelease,
            models::outbound::ReleaseLine,
            models::outbound::Outbound,
            models::outbound::OutboundTransaction,
            models::outbound::LotForPdf,
            models::outbound::ScheduleOutboundPayload,
            models::outbound::GrnSignatures,
            models::outbound::CreateGrnPayload,
            models::outbound::CreatedGrn,

            // --- Sync ---
            models::sync::SyncJob,
            models::sync::SyncBatchPayload,
            models::sync::JobStatus,
            models::sync::SyncResult,
            models::sync::SyncBatchResponse,
        )
    ),
    tags(
        (name = "Inbounds", description = "Agendamento, confirmação, reportes e pesagem de lotes"),
        (name = "Outbounds", description = "Agendamento de saída e GRN"),
        (name = "Sync", description = "Fila offline do aplicativo da equipe")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/inbounds/schedule",
            "/api/inbounds/tasks",
            "/api/inbounds/weighing",
            "/api/outbounds/create-grn-and-transactions",
            "/api/outbounds/{outbound_id}/regenerate-grn",
            "/api/sync",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota sem documentação: {path}");
        }
    }
}
