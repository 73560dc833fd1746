// src/models/inbound.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::lookup::ResolvedReferences;
use crate::models::lot::{Lot, LotRef};

/// Registro canônico de carga recebida. Único por (job_no, lot_no).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboundRecord {
    pub inbound_id: i64,
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: Option<String>,
    pub crew_lot_no: Option<String>,

    pub commodity_id: i64,
    pub shape_id: i64,
    pub brand_id: i64,
    pub ex_lme_warehouse_id: i64,
    pub inbound_warehouse_id: i64,
    pub ex_warehouse_location_id: i64,

    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub actual_weight: Option<Decimal>,
    pub is_weighted: bool,
    pub no_of_bundle: i32,

    /// Quem agendou o lote originalmente
    pub user_id: i64,
    /// Quem confirmou o recebimento
    pub processed_id: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInbound {
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: Option<String>,
    pub crew_lot_no: Option<String>,
    pub refs: ResolvedReferences,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub actual_weight: Option<Decimal>,
    pub is_weighted: bool,
    pub no_of_bundle: i32,
    pub user_id: i64,
    pub processed_id: i64,
}

impl NewInbound {
    pub fn from_lot(lot: &Lot, refs: ResolvedReferences, scheduled_by: i64, processed_by: i64) -> Self {
        Self {
            job_no: lot.job_no.clone(),
            lot_no: lot.lot_no,
            ex_warehouse_lot: lot.ex_warehouse_lot.clone(),
            crew_lot_no: lot.crew_lot_no.clone(),
            refs,
            net_weight: lot.net_weight,
            gross_weight: lot.gross_weight,
            actual_weight: lot.actual_weight,
            is_weighted: lot.is_weighted,
            no_of_bundle: lot.expected_bundle_count,
            user_id: scheduled_by,
            processed_id: processed_by,
        }
    }
}

/// Por que um lote ficou de fora da confirmação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    LotNotFound,
    NotPending,
    InboundExists,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLot {
    pub lot_id: i64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub inserted: Vec<InboundRecord>,
    pub skipped: Vec<SkippedLot>,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmLotsPayload {
    #[validate(length(min = 1, message = "Selecione ao menos um lote."))]
    pub selected_lots: Vec<LotRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportLotsPayload {
    #[validate(length(min = 1, message = "Selecione ao menos um lote."))]
    pub lot_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportJobPayload {
    #[validate(length(min = 1, message = "O número do job é obrigatório."))]
    pub job_no: String,
}

/// Como achar o inbound (ou o lote) quando o cliente offline não tem o ID.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetLocator {
    pub inbound_id: Option<i64>,
    pub lot_id: Option<i64>,
    pub job_no: Option<String>,
    pub lot_no: Option<i32>,
    pub ex_warehouse_lot: Option<String>,
}

impl TargetLocator {
    /// `target_id` externo conta como ID de inbound quando nenhum ID veio no corpo.
    pub fn apply_target_id(&mut self, target_id: Option<i64>) {
        if self.inbound_id.is_none() && self.lot_id.is_none() {
            self.inbound_id = target_id;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrewLotNoPayload {
    #[serde(flatten)]
    pub target: TargetLocator,
    #[validate(length(min = 1, message = "O lote da equipe é obrigatório."))]
    pub crew_lot_no: String,
}
