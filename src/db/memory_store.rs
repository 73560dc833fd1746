// src/db/memory_store.rs

//! Store em memória para testes. Cada transação trabalha numa cópia do estado
//! e só publica no `commit`. Transações são serializadas: `begin` espera a
//! anterior terminar, então um commit nunca apaga o de outra transação.
//! As constraints de unicidade do esquema são reproduzidas aqui.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    common::{error::AppError, filter::TaskFilter},
    db::store::{Store, StoreTx},
    models::{
        bundle::{Bundle, BundleParent, BundlePiece, NewBundle, NewPiece},
        inbound::{InboundRecord, NewInbound},
        lookup::LookupTable,
        lot::{Lot, LotStatus, NewLot, ScheduleInbound},
        outbound::{
            DocumentMeta, NewOutbound, Outbound, OutboundTransaction, ReleaseLine,
            ScheduleOutbound, SelectedInbound,
        },
        report::{Report, ReportKind, ReportStatus},
        task::InboundTask,
    },
};

#[derive(Debug, Clone, Default)]
struct State {
    sequences: HashMap<&'static str, i64>,
    references: BTreeMap<LookupTable, Vec<(i64, String)>>,
    schedule_inbounds: BTreeMap<i64, ScheduleInbound>,
    lots: BTreeMap<i64, Lot>,
    inbounds: BTreeMap<i64, InboundRecord>,
    bundles: BTreeMap<i64, Bundle>,
    pieces: BTreeMap<i64, BundlePiece>,
    reports: BTreeMap<(ReportKind, i64), Report>,
    schedule_outbounds: BTreeMap<i64, ScheduleOutbound>,
    selected: BTreeMap<i64, SelectedInbound>,
    outbounds: BTreeMap<i64, Outbound>,
    transactions: BTreeMap<i64, OutboundTransaction>,
}

impl State {
    fn next_id(&mut self, sequence: &'static str) -> i64 {
        let current = self.sequences.entry(sequence).or_insert(0);
        *current += 1;
        *current
    }

    fn reference_name(&self, table: LookupTable, id: i64) -> Option<String> {
        self.references
            .get(&table)?
            .iter()
            .find(|(ref_id, _)| *ref_id == id)
            .map(|(_, name)| name.clone())
    }

    fn lot_mut(&mut self, lot_id: i64) -> Result<&mut Lot, AppError> {
        self.lots
            .get_mut(&lot_id)
            .ok_or_else(|| AppError::not_found(format!("lote {lot_id}")))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    // Uma transação por vez
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cadastra nomes numa tabela de referência; devolve os IDs na mesma ordem.
    /// Para montar cenários: não espera transações abertas.
    pub async fn seed_reference(&self, table: LookupTable, names: &[&str]) -> Vec<i64> {
        let mut state = self.state.lock().await;
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = state.next_id(table.table_name());
            state.references.entry(table).or_default().push((id, name.to_string()));
            ids.push(id);
        }
        ids
    }

    pub async fn inbounds(&self) -> Vec<InboundRecord> {
        self.state.lock().await.inbounds.values().cloned().collect()
    }

    pub async fn selected_inbounds(&self) -> Vec<SelectedInbound> {
        self.state.lock().await.selected.values().cloned().collect()
    }

    pub async fn outbounds(&self) -> Vec<Outbound> {
        self.state.lock().await.outbounds.values().cloned().collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, AppError> {
        let gate = Arc::clone(&self.writer).lock_owned().await;
        let snapshot = self.state.lock().await.clone();
        Ok(MemoryTx {
            shared: Arc::clone(&self.state),
            work: snapshot,
            _gate: gate,
        })
    }
}

/// Solta a vez no `commit`, no `rollback` ou ao ser descartada.
pub struct MemoryTx {
    shared: Arc<Mutex<State>>,
    work: State,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self) -> Result<(), AppError> {
        *self.shared.lock().await = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        Ok(())
    }

    // --- Agendamento de entrada / lotes ---

    async fn insert_schedule_inbound(&mut self, user_id: i64, inbound_date: NaiveDate) -> Result<ScheduleInbound, AppError> {
        let schedule = ScheduleInbound {
            schedule_inbound_id: self.work.next_id("scheduleinbounds"),
            user_id,
            inbound_date,
            created_at: Utc::now(),
        };
        self.work.schedule_inbounds.insert(schedule.schedule_inbound_id, schedule.clone());
        Ok(schedule)
    }

    async fn find_schedule_inbound(&mut self, schedule_inbound_id: i64) -> Result<Option<ScheduleInbound>, AppError> {
        Ok(self.work.schedule_inbounds.get(&schedule_inbound_id).cloned())
    }

    async fn insert_lot(&mut self, schedule_inbound_id: i64, lot: &NewLot) -> Result<Lot, AppError> {
        let now = Utc::now();
        let row = Lot {
            lot_id: self.work.next_id("lot"),
            schedule_inbound_id,
            job_no: lot.job_no.trim().to_string(),
            lot_no: lot.lot_no,
            ex_warehouse_lot: lot.ex_warehouse_lot.clone(),
            crew_lot_no: None,
            commodity: lot.commodity.clone(),
            brand: lot.brand.clone(),
            shape: lot.shape.clone(),
            ex_lme_warehouse: lot.ex_lme_warehouse.clone(),
            inbound_warehouse: lot.inbound_warehouse.clone(),
            ex_warehouse_location: lot.ex_warehouse_location.clone(),
            expected_bundle_count: lot.expected_bundle_count,
            net_weight: lot.net_weight,
            gross_weight: lot.gross_weight,
            actual_weight: None,
            is_weighted: false,
            status: LotStatus::Pending,
            is_confirm: false,
            report: false,
            report_duplicate: false,
            is_duplicated: false,
            created_at: now,
            updated_at: now,
        };
        self.work.lots.insert(row.lot_id, row.clone());
        Ok(row)
    }

    async fn find_lot(&mut self, lot_id: i64) -> Result<Option<Lot>, AppError> {
        Ok(self.work.lots.get(&lot_id).cloned())
    }

    async fn find_lots_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Vec<Lot>, AppError> {
        Ok(self
            .work
            .lots
            .values()
            .filter(|l| l.job_no == job_no && l.lot_no == lot_no)
            .cloned()
            .collect())
    }

    async fn find_lot_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<Lot>, AppError> {
        Ok(self
            .work
            .lots
            .values()
            .rev()
            .find(|l| l.job_no == job_no && l.ex_warehouse_lot.as_deref() == Some(ex_warehouse_lot))
            .cloned())
    }

    async fn list_lots_by_job(&mut self, job_no: &str) -> Result<Vec<Lot>, AppError> {
        let mut lots: Vec<Lot> = self.work.lots.values().filter(|l| l.job_no == job_no).cloned().collect();
        lots.sort_by_key(|l| (l.lot_no, l.lot_id));
        Ok(lots)
    }

    async fn mark_lot_received(&mut self, lot_id: i64) -> Result<bool, AppError> {
        match self.work.lots.get_mut(&lot_id) {
            Some(lot) if lot.status == LotStatus::Pending => {
                lot.status = LotStatus::Received;
                lot.is_confirm = true;
                lot.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_lot_report_flag(&mut self, lot_id: i64, kind: ReportKind, open: bool) -> Result<(), AppError> {
        let lot = self.work.lot_mut(lot_id)?;
        match kind {
            ReportKind::Discrepancy => lot.report = open,
            ReportKind::Duplicate => lot.report_duplicate = open,
        }
        lot.updated_at = Utc::now();
        Ok(())
    }

    async fn set_lot_duplicated(&mut self, lot_id: i64, duplicated: bool) -> Result<(), AppError> {
        let lot = self.work.lot_mut(lot_id)?;
        lot.is_duplicated = duplicated;
        lot.updated_at = Utc::now();
        Ok(())
    }

    async fn set_lot_weighing(&mut self, lot_id: i64, actual_weight: Decimal) -> Result<bool, AppError> {
        let Some(lot) = self.work.lots.get_mut(&lot_id) else {
            return Ok(false);
        };
        lot.actual_weight = Some(actual_weight);
        lot.is_weighted = true;
        lot.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_lot_crew_lot_no(&mut self, lot_id: i64, crew_lot_no: &str) -> Result<bool, AppError> {
        let Some(lot) = self.work.lots.get_mut(&lot_id) else {
            return Ok(false);
        };
        lot.crew_lot_no = Some(crew_lot_no.to_string());
        lot.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_inbound_tasks(&mut self, filter: &TaskFilter) -> Result<Vec<InboundTask>, AppError> {
        let mut tasks: Vec<InboundTask> = self
            .work
            .lots
            .values()
            .filter_map(|lot| {
                let schedule = self.work.schedule_inbounds.get(&lot.schedule_inbound_id)?;
                Some(InboundTask {
                    lot_id: lot.lot_id,
                    schedule_inbound_id: lot.schedule_inbound_id,
                    inbound_date: schedule.inbound_date,
                    scheduled_by: schedule.user_id,
                    job_no: lot.job_no.clone(),
                    lot_no: lot.lot_no,
                    ex_warehouse_lot: lot.ex_warehouse_lot.clone(),
                    commodity: lot.commodity.clone(),
                    brand: lot.brand.clone(),
                    shape: lot.shape.clone(),
                    inbound_warehouse: lot.inbound_warehouse.clone(),
                    expected_bundle_count: lot.expected_bundle_count,
                    net_weight: lot.net_weight,
                    gross_weight: lot.gross_weight,
                    status: lot.status,
                    is_confirm: lot.is_confirm,
                    report: lot.report,
                    report_duplicate: lot.report_duplicate,
                })
            })
            .filter(|task| filter.matches(task))
            .collect();

        tasks.sort_by(|a, b| {
            b.inbound_date
                .cmp(&a.inbound_date)
                .then_with(|| a.job_no.cmp(&b.job_no))
                .then_with(|| a.lot_no.cmp(&b.lot_no))
        });
        Ok(tasks)
    }

    // --- Referências / inbounds ---

    async fn resolve_reference_id(&mut self, table: LookupTable, value: &str) -> Result<Option<i64>, AppError> {
        let wanted = value.to_lowercase();
        Ok(self
            .work
            .references
            .get(&table)
            .and_then(|rows| rows.iter().find(|(_, name)| name.to_lowercase() == wanted))
            .map(|(id, _)| *id))
    }

    async fn find_inbound(&mut self, inbound_id: i64) -> Result<Option<InboundRecord>, AppError> {
        Ok(self.work.inbounds.get(&inbound_id).cloned())
    }

    async fn find_inbound_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Option<InboundRecord>, AppError> {
        Ok(self
            .work
            .inbounds
            .values()
            .find(|i| i.job_no == job_no && i.lot_no == lot_no)
            .cloned())
    }

    async fn find_inbound_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<InboundRecord>, AppError> {
        Ok(self
            .work
            .inbounds
            .values()
            .rev()
            .find(|i| i.job_no == job_no && i.ex_warehouse_lot.as_deref() == Some(ex_warehouse_lot))
            .cloned())
    }

    async fn insert_inbound(&mut self, inbound: &NewInbound) -> Result<InboundRecord, AppError> {
        let exists = self
            .work
            .inbounds
            .values()
            .any(|i| i.job_no == inbound.job_no && i.lot_no == inbound.lot_no);
        if exists {
            return Err(AppError::Conflict(format!(
                "Já existe inbound para job {} lote {}",
                inbound.job_no, inbound.lot_no
            )));
        }

        let now = Utc::now();
        let row = InboundRecord {
            inbound_id: self.work.next_id("inbounds"),
            job_no: inbound.job_no.clone(),
            lot_no: inbound.lot_no,
            ex_warehouse_lot: inbound.ex_warehouse_lot.clone(),
            crew_lot_no: inbound.crew_lot_no.clone(),
            commodity_id: inbound.refs.commodity_id,
            shape_id: inbound.refs.shape_id,
            brand_id: inbound.refs.brand_id,
            ex_lme_warehouse_id: inbound.refs.ex_lme_warehouse_id,
            inbound_warehouse_id: inbound.refs.inbound_warehouse_id,
            ex_warehouse_location_id: inbound.refs.ex_warehouse_location_id,
            net_weight: inbound.net_weight,
            gross_weight: inbound.gross_weight,
            actual_weight: inbound.actual_weight,
            is_weighted: inbound.is_weighted,
            no_of_bundle: inbound.no_of_bundle,
            user_id: inbound.user_id,
            processed_id: inbound.processed_id,
            created_at: now,
            updated_at: now,
        };
        self.work.inbounds.insert(row.inbound_id, row.clone());
        Ok(row)
    }

    async fn set_inbound_weighing(&mut self, inbound_id: i64, actual_weight: Decimal) -> Result<bool, AppError> {
        let Some(inbound) = self.work.inbounds.get_mut(&inbound_id) else {
            return Ok(false);
        };
        inbound.actual_weight = Some(actual_weight);
        inbound.is_weighted = true;
        inbound.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_inbound_crew_lot_no(&mut self, inbound_id: i64, crew_lot_no: &str) -> Result<bool, AppError> {
        let Some(inbound) = self.work.inbounds.get_mut(&inbound_id) else {
            return Ok(false);
        };
        inbound.crew_lot_no = Some(crew_lot_no.to_string());
        inbound.updated_at = Utc::now();
        Ok(true)
    }

    // --- Bundles ---

    async fn delete_bundles(&mut self, parent: BundleParent) -> Result<u64, AppError> {
        let doomed: Vec<i64> = self
            .work
            .bundles
            .values()
            .filter(|b| b.parent == parent)
            .map(|b| b.bundle_id)
            .collect();
        for bundle_id in &doomed {
            self.work.bundles.remove(bundle_id);
        }
        // ON DELETE CASCADE
        self.work.pieces.retain(|_, p| !doomed.contains(&p.bundle_id));
        Ok(doomed.len() as u64)
    }

    async fn insert_bundles(&mut self, parent: BundleParent, bundles: &[NewBundle]) -> Result<Vec<Bundle>, AppError> {
        let mut inserted = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let taken = self
                .work
                .bundles
                .values()
                .any(|b| b.parent == parent && b.bundle_no == bundle.bundle_no);
            if taken {
                return Err(AppError::Conflict(format!(
                    "Bundle {} repetido em {}",
                    bundle.bundle_no,
                    parent.label()
                )));
            }
            let row = Bundle {
                bundle_id: self.work.next_id("inboundbundles"),
                parent,
                bundle_no: bundle.bundle_no,
                weight: bundle.weight,
                melt_no: bundle.melt_no.clone(),
                is_outbounded: false,
                is_repacked: false,
                before_photo: None,
                after_photo: None,
                created_at: Utc::now(),
            };
            self.work.bundles.insert(row.bundle_id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn list_bundles(&mut self, parent: BundleParent) -> Result<Vec<Bundle>, AppError> {
        let mut bundles: Vec<Bundle> = self.work.bundles.values().filter(|b| b.parent == parent).cloned().collect();
        bundles.sort_by_key(|b| b.bundle_no);
        Ok(bundles)
    }

    async fn upsert_repack_bundle(&mut self, inbound_id: i64, bundle: &NewBundle) -> Result<Bundle, AppError> {
        let parent = BundleParent::Inbound(inbound_id);
        if let Some(existing) = self
            .work
            .bundles
            .values_mut()
            .find(|b| b.parent == parent && b.bundle_no == bundle.bundle_no)
        {
            existing.weight = bundle.weight;
            existing.melt_no = bundle.melt_no.clone();
            existing.is_repacked = true;
            return Ok(existing.clone());
        }

        let row = Bundle {
            bundle_id: self.work.next_id("inboundbundles"),
            parent,
            bundle_no: bundle.bundle_no,
            weight: bundle.weight,
            melt_no: bundle.melt_no.clone(),
            is_outbounded: false,
            is_repacked: true,
            before_photo: None,
            after_photo: None,
            created_at: Utc::now(),
        };
        self.work.bundles.insert(row.bundle_id, row.clone());
        Ok(row)
    }

    async fn replace_bundle_pieces(&mut self, bundle_id: i64, pieces: &[NewPiece]) -> Result<Vec<BundlePiece>, AppError> {
        self.work.pieces.retain(|_, p| p.bundle_id != bundle_id);

        let mut inserted: Vec<BundlePiece> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            if inserted.iter().any(|p| p.piece_no == piece.piece_no) {
                return Err(AppError::Conflict(format!(
                    "Peça {} repetida no bundle {}",
                    piece.piece_no, bundle_id
                )));
            }
            let row = BundlePiece {
                piece_id: self.work.next_id("bundlepieces"),
                bundle_id,
                piece_no: piece.piece_no,
                weight: piece.weight,
            };
            self.work.pieces.insert(row.piece_id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn set_bundle_photos(&mut self, bundle_id: i64, before: Option<&str>, after: Option<&str>) -> Result<Bundle, AppError> {
        let bundle = self
            .work
            .bundles
            .get_mut(&bundle_id)
            .ok_or_else(|| AppError::not_found(format!("bundle {bundle_id}")))?;
        if let Some(path) = before {
            bundle.before_photo = Some(path.to_string());
        }
        if let Some(path) = after {
            bundle.after_photo = Some(path.to_string());
        }
        Ok(bundle.clone())
    }

    async fn mark_bundles_outbounded(&mut self, inbound_ids: &[i64]) -> Result<u64, AppError> {
        let mut count = 0;
        for bundle in self.work.bundles.values_mut() {
            if bundle.parent.inbound_id().is_some_and(|id| inbound_ids.contains(&id)) {
                bundle.is_outbounded = true;
                count += 1;
            }
        }
        Ok(count)
    }

    // --- Relatórios ---

    async fn insert_report(&mut self, lot_id: i64, kind: ReportKind, reported_by: i64) -> Result<Report, AppError> {
        if !self.work.lots.contains_key(&lot_id) {
            // FK lot_id
            return Err(AppError::not_found(format!("lote {lot_id}")));
        }
        let report = Report {
            report_id: self.work.next_id(kind.table_name()),
            lot_id,
            kind,
            status: ReportStatus::Pending,
            reported_by,
            reported_at: Utc::now(),
            resolved_by: None,
            resolved_at: None,
        };
        self.work.reports.insert((kind, report.report_id), report.clone());
        Ok(report)
    }

    async fn find_open_report(&mut self, lot_id: i64, kind: ReportKind) -> Result<Option<Report>, AppError> {
        Ok(self
            .work
            .reports
            .values()
            .filter(|r| r.kind == kind && r.lot_id == lot_id && r.status == ReportStatus::Pending)
            .max_by_key(|r| (r.reported_at, r.report_id))
            .cloned())
    }

    async fn close_report(&mut self, report_id: i64, kind: ReportKind, status: ReportStatus, resolved_by: i64) -> Result<Report, AppError> {
        let report = self
            .work
            .reports
            .get_mut(&(kind, report_id))
            .ok_or_else(|| AppError::not_found(format!("relatório {report_id}")))?;
        report.status = status;
        report.resolved_by = Some(resolved_by);
        report.resolved_at = Some(Utc::now());
        Ok(report.clone())
    }

    // --- Saída ---

    async fn insert_schedule_outbound(&mut self, user_id: i64, release_date: NaiveDate, lorry_no: Option<&str>) -> Result<ScheduleOutbound, AppError> {
        let schedule = ScheduleOutbound {
            schedule_outbound_id: self.work.next_id("scheduleoutbounds"),
            user_id,
            release_date,
            lorry_no: lorry_no.map(str::to_string),
            created_at: Utc::now(),
        };
        self.work.schedule_outbounds.insert(schedule.schedule_outbound_id, schedule.clone());
        Ok(schedule)
    }

    async fn find_schedule_outbound(&mut self, schedule_outbound_id: i64) -> Result<Option<ScheduleOutbound>, AppError> {
        Ok(self.work.schedule_outbounds.get(&schedule_outbound_id).cloned())
    }

    async fn find_active_selection(&mut self, inbound_id: i64) -> Result<Option<SelectedInbound>, AppError> {
        Ok(self
            .work
            .selected
            .values()
            .find(|s| s.inbound_id == inbound_id && !s.is_outbounded)
            .cloned())
    }

    async fn insert_selected_inbound(&mut self, schedule_outbound_id: i64, inbound_id: i64) -> Result<SelectedInbound, AppError> {
        if self.find_active_selection(inbound_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Inbound {inbound_id} já está em um agendamento ativo"
            )));
        }
        if !self.work.inbounds.contains_key(&inbound_id) {
            return Err(AppError::not_found(format!("inbound {inbound_id}")));
        }
        let selected = SelectedInbound {
            selected_inbound_id: self.work.next_id("selectedinbounds"),
            schedule_outbound_id,
            inbound_id,
            is_outbounded: false,
            created_at: Utc::now(),
        };
        self.work.selected.insert(selected.selected_inbound_id, selected.clone());
        Ok(selected)
    }

    async fn mark_selected_outbounded(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<SelectedInbound>, AppError> {
        let mut updated = Vec::new();
        for selected in self.work.selected.values_mut() {
            if selected.schedule_outbound_id == schedule_outbound_id
                && selected_inbound_ids.contains(&selected.selected_inbound_id)
                && !selected.is_outbounded
            {
                selected.is_outbounded = true;
                updated.push(selected.clone());
            }
        }
        Ok(updated)
    }

    async fn list_release_lines(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<ReleaseLine>, AppError> {
        let state = &self.work;
        let mut lines: Vec<ReleaseLine> = state
            .selected
            .values()
            .filter(|s| {
                s.schedule_outbound_id == schedule_outbound_id
                    && selected_inbound_ids.contains(&s.selected_inbound_id)
            })
            .filter_map(|s| {
                let inbound = state.inbounds.get(&s.inbound_id)?;
                Some(ReleaseLine {
                    selected_inbound_id: s.selected_inbound_id,
                    inbound_id: inbound.inbound_id,
                    job_no: inbound.job_no.clone(),
                    lot_no: inbound.lot_no,
                    ex_warehouse_lot: inbound.ex_warehouse_lot.clone(),
                    commodity: state.reference_name(LookupTable::Commodities, inbound.commodity_id)?,
                    brand: state.reference_name(LookupTable::Brands, inbound.brand_id)?,
                    shape: state.reference_name(LookupTable::Shapes, inbound.shape_id)?,
                    no_of_bundle: inbound.no_of_bundle,
                    net_weight: inbound.net_weight,
                    gross_weight: inbound.gross_weight,
                    actual_weight: inbound.actual_weight,
                })
            })
            .collect();
        lines.sort_by(|a, b| a.job_no.cmp(&b.job_no).then_with(|| a.lot_no.cmp(&b.lot_no)));
        Ok(lines)
    }

    async fn list_grns_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .work
            .outbounds
            .values()
            .filter(|o| o.grn_no.starts_with(prefix))
            .map(|o| o.grn_no.clone())
            .collect())
    }

    async fn insert_outbound(&mut self, outbound: &NewOutbound) -> Result<Outbound, AppError> {
        if self.work.outbounds.values().any(|o| o.grn_no == outbound.grn_no) {
            return Err(AppError::DuplicateGrn(outbound.grn_no.clone()));
        }
        let now = Utc::now();
        let row = Outbound {
            outbound_id: self.work.next_id("outbounds"),
            schedule_outbound_id: outbound.schedule_outbound_id,
            grn_no: outbound.grn_no.clone(),
            release_date: outbound.release_date,
            created_by: outbound.created_by,
            file_path: None,
            file_size: None,
            driver_signature: None,
            warehouse_signature: None,
            created_at: now,
            updated_at: now,
        };
        self.work.outbounds.insert(row.outbound_id, row.clone());
        Ok(row)
    }

    async fn find_outbound(&mut self, outbound_id: i64) -> Result<Option<Outbound>, AppError> {
        Ok(self.work.outbounds.get(&outbound_id).cloned())
    }

    async fn insert_outbound_transaction(&mut self, outbound_id: i64, line: &ReleaseLine) -> Result<OutboundTransaction, AppError> {
        let row = OutboundTransaction {
            outbound_transaction_id: self.work.next_id("outboundtransactions"),
            outbound_id,
            inbound_id: line.inbound_id,
            job_no: line.job_no.clone(),
            lot_no: line.lot_no,
            ex_warehouse_lot: line.ex_warehouse_lot.clone(),
            commodity: line.commodity.clone(),
            brand: line.brand.clone(),
            shape: line.shape.clone(),
            no_of_bundle: line.no_of_bundle,
            net_weight: line.net_weight,
            gross_weight: line.gross_weight,
            actual_weight: line.actual_weight,
            created_at: Utc::now(),
        };
        self.work.transactions.insert(row.outbound_transaction_id, row.clone());
        Ok(row)
    }

    async fn list_outbound_transactions(&mut self, outbound_id: i64) -> Result<Vec<OutboundTransaction>, AppError> {
        let mut rows: Vec<OutboundTransaction> = self
            .work
            .transactions
            .values()
            .filter(|t| t.outbound_id == outbound_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.job_no.cmp(&b.job_no).then_with(|| a.lot_no.cmp(&b.lot_no)));
        Ok(rows)
    }

    async fn set_outbound_document(&mut self, outbound_id: i64, meta: &DocumentMeta) -> Result<Outbound, AppError> {
        let outbound = self
            .work
            .outbounds
            .get_mut(&outbound_id)
            .ok_or_else(|| AppError::not_found(format!("outbound {outbound_id}")))?;
        outbound.file_path = Some(meta.file_path.clone());
        outbound.file_size = Some(meta.file_size);
        if meta.driver_signature.is_some() {
            outbound.driver_signature = meta.driver_signature.clone();
        }
        if meta.warehouse_signature.is_some() {
            outbound.warehouse_signature = meta.warehouse_signature.clone();
        }
        outbound.updated_at = Utc::now();
        Ok(outbound.clone())
    }
}
