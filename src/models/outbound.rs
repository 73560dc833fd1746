// src/models/outbound.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Agendamento de saída ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutbound {
    pub schedule_outbound_id: i64,
    pub user_id: i64,
    #[schema(example = "2025-04-02")]
    pub release_date: NaiveDate,
    #[schema(example = "WXY 4821")]
    pub lorry_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedInbound {
    pub selected_inbound_id: i64,
    pub schedule_outbound_id: i64,
    pub inbound_id: i64,
    pub is_outbounded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRelease {
    pub schedule: ScheduleOutbound,
    pub selected: Vec<SelectedInbound>,
}

/// Linha selecionada + dados do inbound, já com os nomes de referência.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseLine {
    pub selected_inbound_id: i64,
    pub inbound_id: i64,
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: Option<String>,
    pub commodity: String,
    pub brand: String,
    pub shape: String,
    pub no_of_bundle: i32,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub actual_weight: Option<Decimal>,
}

// --- GRN ---

/// Cabeçalho da GRN (Goods Release Note).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    pub outbound_id: i64,
    pub schedule_outbound_id: i64,
    #[schema(example = "GRN-20250402-0001")]
    pub grn_no: String,
    pub release_date: NaiveDate,
    pub created_by: i64,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub driver_signature: Option<String>,
    pub warehouse_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOutbound {
    pub schedule_outbound_id: i64,
    pub grn_no: String,
    pub release_date: NaiveDate,
    pub created_by: i64,
}

/// Uma linha por inbound liberado; guarda uma cópia dos nomes para regerar o PDF.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutboundTransaction {
    pub outbound_transaction_id: i64,
    pub outbound_id: i64,
    pub inbound_id: i64,
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: Option<String>,
    pub commodity: String,
    pub brand: String,
    pub shape: String,
    pub no_of_bundle: i32,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub actual_weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMeta {
    pub file_path: String,
    pub file_size: i64,
    pub driver_signature: Option<String>,
    pub warehouse_signature: Option<String>,
}

/// Linha achatada no formato que o PDF consome.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotForPdf {
    pub index: usize,
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: String,
    pub commodity: String,
    pub brand: String,
    pub shape: String,
    pub bundles: i32,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    /// Peso pesado na balança; cai para o peso líquido se o lote não foi pesado
    pub actual_weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnDocument {
    pub grn_no: String,
    pub release_date: NaiveDate,
    pub lorry_no: Option<String>,
    pub lots: Vec<LotForPdf>,
    pub total_bundles: i32,
    pub total_net_weight: Decimal,
    pub total_gross_weight: Decimal,
    pub total_actual_weight: Decimal,
}

impl GrnDocument {
    pub fn new(grn_no: &str, release_date: NaiveDate, lorry_no: Option<String>, lots: Vec<LotForPdf>) -> Self {
        let total_bundles = lots.iter().map(|l| l.bundles).sum();
        let total_net_weight = lots.iter().map(|l| l.net_weight).sum();
        let total_gross_weight = lots.iter().map(|l| l.gross_weight).sum();
        let total_actual_weight = lots.iter().map(|l| l.actual_weight).sum();
        Self {
            grn_no: grn_no.to_string(),
            release_date,
            lorry_no,
            lots,
            total_bundles,
            total_net_weight,
            total_gross_weight,
            total_actual_weight,
        }
    }
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutboundPayload {
    #[schema(example = "2025-04-02")]
    pub release_date: NaiveDate,
    pub lorry_no: Option<String>,
    #[validate(length(min = 1, message = "Selecione ao menos um inbound."))]
    pub inbound_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrnSignatures {
    /// Imagem base64 (aceita prefixo `data:image/...;base64,`)
    pub driver: Option<String>,
    pub warehouse: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrnPayload {
    pub schedule_outbound_id: i64,
    #[validate(length(min = 1, message = "Selecione ao menos um lote."))]
    pub selected_inbound_ids: Vec<i64>,
    /// Se omitido, o número é gerado a partir da data de saída
    pub grn_no: Option<String>,
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub signatures: GrnSignatures,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGrn {
    pub created_outbound: Outbound,
    pub transactions: Vec<OutboundTransaction>,
    pub lots_for_pdf: Vec<LotForPdf>,
    /// PDF em base64 para pré-visualização no cliente
    pub pdf_base64: String,
}
