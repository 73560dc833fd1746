// src/models/lot.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lot_status")]
pub enum LotStatus {
    Pending,
    Received,
}

impl LotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LotStatus::Pending => "Pending",
            LotStatus::Received => "Received",
        }
    }
}

// --- Agendamento de entrada ---

/// Lote de agendamento: quem agendou e para qual dia.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInbound {
    pub schedule_inbound_id: i64,
    /// Usuário que agendou (vira o `userId` do inbound)
    pub user_id: i64,
    #[schema(example = "2025-03-14")]
    pub inbound_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Unidade de carga agendada, identificada por job + lote.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub lot_id: i64,
    pub schedule_inbound_id: i64,
    #[schema(example = "JOB-2025-0142")]
    pub job_no: String,
    #[schema(example = 3)]
    pub lot_no: i32,
    #[schema(example = "HMC/5521")]
    pub ex_warehouse_lot: Option<String>,
    pub crew_lot_no: Option<String>,

    // Nomes "humanos"; só viram IDs na confirmação
    #[schema(example = "Copper")]
    pub commodity: String,
    #[schema(example = "KGHM")]
    pub brand: String,
    #[schema(example = "Cathode")]
    pub shape: String,
    pub ex_lme_warehouse: String,
    pub inbound_warehouse: String,
    pub ex_warehouse_location: String,

    pub expected_bundle_count: i32,
    #[schema(example = "25012.5")]
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub actual_weight: Option<Decimal>,
    pub is_weighted: bool,

    pub status: LotStatus,
    pub is_confirm: bool,
    /// Existe relatório de divergência em aberto
    pub report: bool,
    /// Existe relatório de duplicidade em aberto
    pub report_duplicate: bool,
    pub is_duplicated: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLot {
    #[validate(length(min = 1, message = "O número do job é obrigatório."))]
    #[schema(example = "JOB-2025-0142")]
    pub job_no: String,

    #[validate(range(min = 1, message = "O número do lote deve ser positivo."))]
    #[schema(example = 3)]
    pub lot_no: i32,

    pub ex_warehouse_lot: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub commodity: String,
    #[validate(length(min = 1, message = "required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "required"))]
    pub shape: String,
    #[validate(length(min = 1, message = "required"))]
    pub ex_lme_warehouse: String,
    #[validate(length(min = 1, message = "required"))]
    pub inbound_warehouse: String,
    #[validate(length(min = 1, message = "required"))]
    pub ex_warehouse_location: String,

    #[validate(range(min = 0, message = "A quantidade de bundles não pode ser negativa."))]
    #[serde(default)]
    pub expected_bundle_count: i32,

    #[serde(default)]
    pub net_weight: Decimal,
    #[serde(default)]
    pub gross_weight: Decimal,
}

/// Referência a um lote vinda do cliente (`{ lotId }`).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotRef {
    pub lot_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInboundPayload {
    #[schema(example = "2025-03-14")]
    pub inbound_date: NaiveDate,
    // Sem `nested`: cada lote é validado no serviço e volta na lista de erros por item
    #[validate(length(min = 1, message = "Informe ao menos um lote."))]
    pub lots: Vec<NewLot>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledInbound {
    pub schedule: ScheduleInbound,
    pub lots: Vec<Lot>,
}
