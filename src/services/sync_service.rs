// src/services/sync_service.rs

use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{finish, Store},
    models::sync::{SyncAction, SyncBatchResponse, SyncCommand, SyncJob, SyncResult},
    services::{
        lifecycle_service::LifecycleService,
        outbound_service::OutboundService,
    },
};

/// Reaplica a fila offline do aplicativo numa única transação.
///
/// Payload ilegível ou ação desconhecida só marcam o job (FAILED / SKIPPED).
/// Erro dentro de uma ação desfaz o lote inteiro.
#[derive(Clone)]
pub struct SyncService<S: Store> {
    store: S,
    lifecycle: LifecycleService<S>,
    outbound: OutboundService<S>,
}

impl<S: Store> SyncService<S> {
    pub fn new(store: S, lifecycle: LifecycleService<S>, outbound: OutboundService<S>) -> Self {
        Self { store, lifecycle, outbound }
    }

    pub async fn process_batch(&self, jobs: &[SyncJob], user_id: i64) -> Result<SyncBatchResponse, AppError> {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("sync", %batch_id, user_id, jobs = jobs.len());

        async move {
            let mut tx = self.store.begin().await?;
            let result = self.process_in(&mut tx, jobs, user_id).await;
            let response = finish(tx, result).await;
            match &response {
                Ok(r) => tracing::info!("🔄 Lote sincronizado ({} job(s))", r.results.len()),
                Err(e) => tracing::error!("🔥 Lote de sincronização desfeito: {}", e),
            }
            response
        }
        .instrument(span)
        .await
    }

    async fn process_in(&self, tx: &mut S::Tx, jobs: &[SyncJob], user_id: i64) -> Result<SyncBatchResponse, AppError> {
        let mut results = Vec::with_capacity(jobs.len());

        for job in jobs {
            // 1. Ação desconhecida: pula
            let Some(action) = SyncAction::parse(&job.action_type) else {
                tracing::warn!("⚠️ Job {}: ação desconhecida '{}'", job.id_label(), job.action_type);
                results.push(SyncResult::skipped(job));
                continue;
            };

            // 2. Payload ilegível: falha só o job
            let command = match SyncCommand::decode(action, &job.payload, job.target_id) {
                Ok(command) => command,
                Err(message) => {
                    tracing::warn!("⚠️ Job {}: {}", job.id_label(), message);
                    results.push(SyncResult::failed(job, message));
                    continue;
                }
            };

            // 3. Executa; erro aqui aborta o lote
            let processed = self
                .execute(tx, command, user_id)
                .await
                .map_err(|source| AppError::SyncAborted {
                    job_id: job.id_label(),
                    source: Box::new(source),
                })?;
            results.push(SyncResult::success(job, processed));
        }

        Ok(SyncBatchResponse { results })
    }

    async fn execute(&self, tx: &mut S::Tx, command: SyncCommand, user_id: i64) -> Result<Value, AppError> {
        let processed = match command {
            SyncCommand::ConfirmInbound(p) => {
                let outcome = self.lifecycle.confirm_lots(Some(&mut *tx), &p.selected_lots, user_id).await?;
                serde_json::to_value(outcome)?
            }
            SyncCommand::ReportDiscrepancy(p) => {
                let reports = self.lifecycle.report_discrepancy(Some(&mut *tx), &p.lot_ids, user_id).await?;
                serde_json::to_value(reports)?
            }
            SyncCommand::ReportJobDiscrepancy(p) => {
                let reports = self.lifecycle.report_job_discrepancy(Some(&mut *tx), &p.job_no, user_id).await?;
                serde_json::to_value(reports)?
            }
            SyncCommand::RegenerateGrn { outbound_id } => {
                let outbound = self.outbound.regenerate_grn(Some(&mut *tx), outbound_id).await?;
                serde_json::to_value(outbound)?
            }
            SyncCommand::UpdateCrewLotNo(p) => {
                let target = self.lifecycle.update_located_crew_lot_no(Some(&mut *tx), &p).await?;
                json!({ "target": target, "crewLotNo": p.crew_lot_no.trim() })
            }
            SyncCommand::SaveActualWeight(p) => {
                let weighing = self.lifecycle.save_actual_weight(Some(&mut *tx), &p).await?;
                serde_json::to_value(weighing)?
            }
            SyncCommand::SaveRepack(p) => {
                let repack = self.lifecycle.save_located_repack(Some(&mut *tx), &p).await?;
                serde_json::to_value(repack)?
            }
        };
        Ok(processed)
    }
}
