// src/db/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, filter::TaskFilter},
    models::{
        bundle::{Bundle, BundleParent, BundlePiece, NewBundle, NewPiece},
        inbound::{InboundRecord, NewInbound},
        lookup::LookupTable,
        lot::{Lot, NewLot, ScheduleInbound},
        outbound::{
            DocumentMeta, NewOutbound, Outbound, OutboundTransaction, ReleaseLine,
            ScheduleOutbound, SelectedInbound,
        },
        report::{Report, ReportKind, ReportStatus},
        task::InboundTask,
    },
};

/// Fonte de transações. `PgStore` em produção, `MemoryStore` nos testes.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// Uma transação aberta. Tudo que o motor lê ou escreve passa por aqui.
///
/// Se for descartada sem `commit`, nada do que foi escrito fica visível.
#[async_trait]
pub trait StoreTx: Send + Sized + 'static {
    async fn commit(self) -> Result<(), AppError>;
    async fn rollback(self) -> Result<(), AppError>;

    // --- Agendamento de entrada / lotes ---
    async fn insert_schedule_inbound(&mut self, user_id: i64, inbound_date: NaiveDate) -> Result<ScheduleInbound, AppError>;
    async fn find_schedule_inbound(&mut self, schedule_inbound_id: i64) -> Result<Option<ScheduleInbound>, AppError>;
    async fn insert_lot(&mut self, schedule_inbound_id: i64, lot: &NewLot) -> Result<Lot, AppError>;
    async fn find_lot(&mut self, lot_id: i64) -> Result<Option<Lot>, AppError>;
    /// Pode haver mais de um (reimportação); ordem crescente de `lot_id`.
    async fn find_lots_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Vec<Lot>, AppError>;
    async fn find_lot_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<Lot>, AppError>;
    async fn list_lots_by_job(&mut self, job_no: &str) -> Result<Vec<Lot>, AppError>;
    /// Pending -> Received. `false` se o lote não estava mais pendente.
    async fn mark_lot_received(&mut self, lot_id: i64) -> Result<bool, AppError>;
    async fn set_lot_report_flag(&mut self, lot_id: i64, kind: ReportKind, open: bool) -> Result<(), AppError>;
    async fn set_lot_duplicated(&mut self, lot_id: i64, duplicated: bool) -> Result<(), AppError>;
    async fn set_lot_weighing(&mut self, lot_id: i64, actual_weight: Decimal) -> Result<bool, AppError>;
    async fn set_lot_crew_lot_no(&mut self, lot_id: i64, crew_lot_no: &str) -> Result<bool, AppError>;
    async fn list_inbound_tasks(&mut self, filter: &TaskFilter) -> Result<Vec<InboundTask>, AppError>;

    // --- Referências / inbounds ---
    async fn resolve_reference_id(&mut self, table: LookupTable, value: &str) -> Result<Option<i64>, AppError>;
    async fn find_inbound(&mut self, inbound_id: i64) -> Result<Option<InboundRecord>, AppError>;
    async fn find_inbound_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Option<InboundRecord>, AppError>;
    async fn find_inbound_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<InboundRecord>, AppError>;
    /// `Conflict` se já existir inbound para (job_no, lot_no).
    async fn insert_inbound(&mut self, inbound: &NewInbound) -> Result<InboundRecord, AppError>;
    async fn set_inbound_weighing(&mut self, inbound_id: i64, actual_weight: Decimal) -> Result<bool, AppError>;
    async fn set_inbound_crew_lot_no(&mut self, inbound_id: i64, crew_lot_no: &str) -> Result<bool, AppError>;

    // --- Bundles ---
    async fn delete_bundles(&mut self, parent: BundleParent) -> Result<u64, AppError>;
    async fn insert_bundles(&mut self, parent: BundleParent, bundles: &[NewBundle]) -> Result<Vec<Bundle>, AppError>;
    async fn list_bundles(&mut self, parent: BundleParent) -> Result<Vec<Bundle>, AppError>;
    /// Insere ou atualiza o bundle (inbound_id, bundle_no) e marca como reembalado.
    async fn upsert_repack_bundle(&mut self, inbound_id: i64, bundle: &NewBundle) -> Result<Bundle, AppError>;
    async fn replace_bundle_pieces(&mut self, bundle_id: i64, pieces: &[NewPiece]) -> Result<Vec<BundlePiece>, AppError>;
    /// Só sobrescreve as fotos informadas.
    async fn set_bundle_photos(&mut self, bundle_id: i64, before: Option<&str>, after: Option<&str>) -> Result<Bundle, AppError>;
    async fn mark_bundles_outbounded(&mut self, inbound_ids: &[i64]) -> Result<u64, AppError>;

    // --- Relatórios ---
    async fn insert_report(&mut self, lot_id: i64, kind: ReportKind, reported_by: i64) -> Result<Report, AppError>;
    /// Relatório pendente mais recente do tipo.
    async fn find_open_report(&mut self, lot_id: i64, kind: ReportKind) -> Result<Option<Report>, AppError>;
    async fn close_report(&mut self, report_id: i64, kind: ReportKind, status: ReportStatus, resolved_by: i64) -> Result<Report, AppError>;

    // --- Saída ---
    async fn insert_schedule_outbound(&mut self, user_id: i64, release_date: NaiveDate, lorry_no: Option<&str>) -> Result<ScheduleOutbound, AppError>;
    async fn find_schedule_outbound(&mut self, schedule_outbound_id: i64) -> Result<Option<ScheduleOutbound>, AppError>;
    /// Seleção ainda não liberada (`is_outbounded = false`) do inbound, se houver.
    async fn find_active_selection(&mut self, inbound_id: i64) -> Result<Option<SelectedInbound>, AppError>;
    async fn insert_selected_inbound(&mut self, schedule_outbound_id: i64, inbound_id: i64) -> Result<SelectedInbound, AppError>;
    /// Marca como liberadas as seleções pendentes do agendamento; devolve só as que mudaram.
    async fn mark_selected_outbounded(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<SelectedInbound>, AppError>;
    /// Ordenado por job_no, lot_no.
    async fn list_release_lines(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<ReleaseLine>, AppError>;
    /// Números de GRN que começam com `prefix`.
    async fn list_grns_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, AppError>;
    /// `DuplicateGrn` se o número já existir.
    async fn insert_outbound(&mut self, outbound: &NewOutbound) -> Result<Outbound, AppError>;
    async fn find_outbound(&mut self, outbound_id: i64) -> Result<Option<Outbound>, AppError>;
    async fn insert_outbound_transaction(&mut self, outbound_id: i64, line: &ReleaseLine) -> Result<OutboundTransaction, AppError>;
    async fn list_outbound_transactions(&mut self, outbound_id: i64) -> Result<Vec<OutboundTransaction>, AppError>;
    async fn set_outbound_document(&mut self, outbound_id: i64, meta: &DocumentMeta) -> Result<Outbound, AppError>;
}

/// Commit no sucesso, rollback no erro. O erro original sempre prevalece.
pub async fn finish<T, X: StoreTx>(tx: X, result: Result<T, AppError>) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("⚠️ Falha no rollback: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Executa `$body` na transação do chamador, ou abre uma própria e fecha com [`finish`].
///
/// ```ignore
/// with_tx!(self.store, tx, |t| self.confirm_in(t, refs, user))
/// ```
macro_rules! with_tx {
    ($store:expr, $tx:expr, |$t:ident| $body:expr) => {
        match $tx {
            Some($t) => $body.await,
            None => {
                let mut owned = $store.begin().await?;
                let result = {
                    let $t = &mut owned;
                    $body.await
                };
                $crate::db::store::finish(owned, result).await
            }
        }
    };
}

pub(crate) use with_tx;
