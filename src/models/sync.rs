// src/models/sync.rs

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::bundle::{ActualWeightPayload, RepackPayload};
use crate::models::inbound::{ConfirmLotsPayload, CrewLotNoPayload, ReportJobPayload, ReportLotsPayload};

/// Uma ação gerada offline pelo aplicativo e reenviada em lote.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SyncJob {
    /// ID gerado pelo cliente; devolvido como veio
    #[schema(value_type = Object)]
    pub id: Value,
    pub action_type: String,
    /// String JSON serializada ou objeto
    #[schema(value_type = Object)]
    pub payload: Value,
    pub target_id: Option<i64>,
}

impl SyncJob {
    pub fn id_label(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct SyncBatchPayload {
    #[validate(length(min = 1, message = "Nenhum job para sincronizar."))]
    pub jobs: Vec<SyncJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    #[schema(value_type = Object)]
    pub job_id: Value,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub processed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn success(job: &SyncJob, processed: Value) -> Self {
        Self { job_id: job.id.clone(), status: JobStatus::Success, processed: Some(processed), error: None }
    }

    pub fn failed(job: &SyncJob, error: impl Into<String>) -> Self {
        Self { job_id: job.id.clone(), status: JobStatus::Failed, processed: None, error: Some(error.into()) }
    }

    pub fn skipped(job: &SyncJob) -> Self {
        Self { job_id: job.id.clone(), status: JobStatus::Skipped, processed: None, error: None }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncBatchResponse {
    pub results: Vec<SyncResult>,
}

// =============================================================================
//  AÇÕES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    ConfirmInbound,
    ReportDiscrepancy,
    ReportJobDiscrepancy,
    RegenerateGrn,
    UpdateCrewLotNo,
    SaveActualWeight,
    SaveRepack,
}

impl SyncAction {
    pub fn parse(action_type: &str) -> Option<Self> {
        match action_type {
            "CONFIRM_INBOUND" => Some(SyncAction::ConfirmInbound),
            "REPORT_DISCREPANCY" => Some(SyncAction::ReportDiscrepancy),
            "REPORT_JOB_DISCREPANCY" => Some(SyncAction::ReportJobDiscrepancy),
            "REGENERATE_GRN" => Some(SyncAction::RegenerateGrn),
            "UPDATE_CREW_LOT_NO" => Some(SyncAction::UpdateCrewLotNo),
            "SAVE_ACTUAL_WEIGHT" => Some(SyncAction::SaveActualWeight),
            "SAVE_REPACK" => Some(SyncAction::SaveRepack),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateGrnPayload {
    pub outbound_id: Option<i64>,
}

/// Ação já decodificada e tipada, pronta para executar.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    ConfirmInbound(ConfirmLotsPayload),
    ReportDiscrepancy(ReportLotsPayload),
    ReportJobDiscrepancy(ReportJobPayload),
    RegenerateGrn { outbound_id: i64 },
    UpdateCrewLotNo(CrewLotNoPayload),
    SaveActualWeight(ActualWeightPayload),
    SaveRepack(RepackPayload),
}

impl SyncCommand {
    /// Falhas aqui são "leves": o job vira FAILED e o lote continua.
    pub fn decode(action: SyncAction, payload: &Value, target_id: Option<i64>) -> Result<Self, String> {
        let payload = unwrap_payload(payload)?;

        let command = match action {
            SyncAction::ConfirmInbound => SyncCommand::ConfirmInbound(typed(payload)?),
            SyncAction::ReportDiscrepancy => SyncCommand::ReportDiscrepancy(typed(payload)?),
            SyncAction::ReportJobDiscrepancy => SyncCommand::ReportJobDiscrepancy(typed(payload)?),
            SyncAction::RegenerateGrn => {
                let p: RegenerateGrnPayload = typed(payload)?;
                let outbound_id = p
                    .outbound_id
                    .or(target_id)
                    .ok_or_else(|| "outboundId ausente".to_string())?;
                SyncCommand::RegenerateGrn { outbound_id }
            }
            SyncAction::UpdateCrewLotNo => {
                let mut p: CrewLotNoPayload = typed(payload)?;
                p.target.apply_target_id(target_id);
                SyncCommand::UpdateCrewLotNo(p)
            }
            SyncAction::SaveActualWeight => {
                let mut p: ActualWeightPayload = typed(payload)?;
                p.target.apply_target_id(target_id);
                SyncCommand::SaveActualWeight(p)
            }
            SyncAction::SaveRepack => {
                let mut p: RepackPayload = typed(payload)?;
                p.target.apply_target_id(target_id);
                SyncCommand::SaveRepack(p)
            }
        };
        Ok(command)
    }
}

/// O payload pode chegar como string JSON (fila do app) ou já como objeto.
fn unwrap_payload(payload: &Value) -> Result<Value, String> {
    match payload {
        Value::String(raw) => {
            serde_json::from_str(raw).map_err(|e| format!("Payload inválido: {e}"))
        }
        other => Ok(other.clone()),
    }
}

fn typed<T: DeserializeOwned>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("Payload inválido: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_action_is_not_parsed() {
        assert_eq!(SyncAction::parse("NOT_REAL"), None);
        assert_eq!(SyncAction::parse("SAVE_REPACK"), Some(SyncAction::SaveRepack));
    }

    #[test]
    fn string_payload_is_parsed() {
        let payload = json!(r#"{"selectedLots":[{"lotId":4}]}"#);
        let command = SyncCommand::decode(SyncAction::ConfirmInbound, &payload, None).unwrap();
        match command {
            SyncCommand::ConfirmInbound(p) => assert_eq!(p.selected_lots[0].lot_id, 4),
            other => panic!("comando inesperado: {other:?}"),
        }
    }

    #[test]
    fn broken_string_payload_is_a_soft_failure() {
        let payload = json!("{not json");
        let err = SyncCommand::decode(SyncAction::ReportDiscrepancy, &payload, None).unwrap_err();
        assert!(err.starts_with("Payload inválido"));
    }

    #[test]
    fn target_id_fills_missing_inbound_id() {
        let payload = json!({ "crewLotNo": "C-17" });
        let command = SyncCommand::decode(SyncAction::UpdateCrewLotNo, &payload, Some(12)).unwrap();
        match command {
            SyncCommand::UpdateCrewLotNo(p) => assert_eq!(p.target.inbound_id, Some(12)),
            other => panic!("comando inesperado: {other:?}"),
        }
    }

    #[test]
    fn explicit_lot_id_wins_over_target_id() {
        let payload = json!({ "lotId": 3, "actualWeight": 1000 });
        let command = SyncCommand::decode(SyncAction::SaveActualWeight, &payload, Some(12)).unwrap();
        match command {
            SyncCommand::SaveActualWeight(p) => {
                assert_eq!(p.target.lot_id, Some(3));
                assert_eq!(p.target.inbound_id, None);
            }
            other => panic!("comando inesperado: {other:?}"),
        }
    }

    #[test]
    fn regenerate_needs_an_outbound_id() {
        let err = SyncCommand::decode(SyncAction::RegenerateGrn, &json!({}), None).unwrap_err();
        assert!(err.contains("outboundId"));
    }
}
