// src/services/lifecycle_service.rs

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    common::{
        error::{AppError, ItemError},
        filter::TaskFilter,
    },
    db::store::{with_tx, Store, StoreTx},
    models::{
        bundle::{
            duplicate_bundle_numbers, duplicate_piece_numbers, ActualWeightPayload, BundleParent, NewBundle,
            NewPiece, RepackPayload, RepackResult, WeighingResult,
        },
        inbound::{ConfirmOutcome, CrewLotNoPayload, NewInbound, SkipReason, SkippedLot, TargetLocator},
        lot::{LotRef, LotStatus, NewLot, ScheduledInbound},
        report::{Report, ReportDecision, ReportKind, ResolveReport},
        task::InboundTask,
    },
    services::{
        lookup_service::LookupResolver,
        photo_service::{PhotoService, PhotoStage},
    },
};

/// Fotos opcionais de um repack, em base64.
#[derive(Debug, Clone, Default)]
pub struct RepackPhotos {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Motor do ciclo de vida do lote: Pending -> Received -> pesagem -> saída.
///
/// Toda operação aceita a transação do chamador (`Some(tx)`); sem ela, abre
/// uma própria e faz commit ou rollback ao final.
#[derive(Clone)]
pub struct LifecycleService<S: Store> {
    store: S,
    lookups: LookupResolver,
    photos: PhotoService,
}

impl<S: Store> LifecycleService<S> {
    pub fn new(store: S, photos: PhotoService) -> Self {
        Self {
            store,
            lookups: LookupResolver::new(),
            photos,
        }
    }

    // =========================================================================
    //  CONFIRMAÇÃO DE RECEBIMENTO
    // =========================================================================

    pub async fn confirm_lots(
        &self,
        tx: Option<&mut S::Tx>,
        lot_refs: &[LotRef],
        processed_by: i64,
    ) -> Result<ConfirmOutcome, AppError> {
        with_tx!(self.store, tx, |t| self.confirm_lots_in(t, lot_refs, processed_by))
    }

    async fn confirm_lots_in(
        &self,
        tx: &mut S::Tx,
        lot_refs: &[LotRef],
        processed_by: i64,
    ) -> Result<ConfirmOutcome, AppError> {
        let mut outcome = ConfirmOutcome::default();

        for lot_ref in lot_refs {
            let skip = |reason| SkippedLot { lot_id: lot_ref.lot_id, reason };

            // 1. Lote precisa existir e estar pendente
            let Some(lot) = tx.find_lot(lot_ref.lot_id).await? else {
                tracing::warn!("⚠️ Lote {} não encontrado; ignorado", lot_ref.lot_id);
                outcome.skipped.push(skip(SkipReason::LotNotFound));
                continue;
            };
            if lot.status != LotStatus::Pending {
                tracing::warn!("⚠️ Lote {} já está {:?}; ignorado", lot.lot_id, lot.status);
                outcome.skipped.push(skip(SkipReason::NotPending));
                continue;
            }

            // 2. Quem agendou (vira o user_id do inbound)
            let schedule = tx
                .find_schedule_inbound(lot.schedule_inbound_id)
                .await?
                .ok_or(AppError::MissingSchedule {
                    lot_id: lot.lot_id,
                    schedule_inbound_id: lot.schedule_inbound_id,
                })?;

            // 3. Nomes -> IDs. Qualquer falha derruba a chamada inteira
            let refs = self.lookups.resolve_lot(tx, &lot).await?;

            // 4. Já existe inbound para (job, lote)? Confirmação é idempotente
            if tx.find_inbound_by_job_lot(&lot.job_no, lot.lot_no).await?.is_some() {
                tracing::warn!("⚠️ Inbound já existe para job {} lote {}", lot.job_no, lot.lot_no);
                outcome.skipped.push(skip(SkipReason::InboundExists));
                continue;
            }

            // 5. Pending -> Received, condicional ao status
            if !tx.mark_lot_received(lot.lot_id).await? {
                outcome.skipped.push(skip(SkipReason::NotPending));
                continue;
            }

            // 6. Cria o inbound
            let inbound = tx
                .insert_inbound(&NewInbound::from_lot(&lot, refs, schedule.user_id, processed_by))
                .await?;
            outcome.inserted.push(inbound);
        }

        tracing::info!(
            "✅ Confirmação: {} inbound(s) criados, {} ignorado(s)",
            outcome.inserted.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    // =========================================================================
    //  RELATÓRIOS
    // =========================================================================

    pub async fn report_discrepancy(
        &self,
        tx: Option<&mut S::Tx>,
        lot_ids: &[i64],
        reported_by: i64,
    ) -> Result<Vec<Report>, AppError> {
        with_tx!(self.store, tx, |t| self.report_in(t, lot_ids, ReportKind::Discrepancy, reported_by))
    }

    pub async fn report_duplicate(
        &self,
        tx: Option<&mut S::Tx>,
        lot_ids: &[i64],
        reported_by: i64,
    ) -> Result<Vec<Report>, AppError> {
        with_tx!(self.store, tx, |t| self.report_in(t, lot_ids, ReportKind::Duplicate, reported_by))
    }

    /// Relatório de divergência para todos os lotes do job.
    pub async fn report_job_discrepancy(
        &self,
        tx: Option<&mut S::Tx>,
        job_no: &str,
        reported_by: i64,
    ) -> Result<Vec<Report>, AppError> {
        with_tx!(self.store, tx, |t| self.report_job_in(t, job_no, reported_by))
    }

    async fn report_job_in(&self, tx: &mut S::Tx, job_no: &str, reported_by: i64) -> Result<Vec<Report>, AppError> {
        let lots = tx.list_lots_by_job(job_no.trim()).await?;
        if lots.is_empty() {
            return Err(AppError::not_found(format!("job {}", job_no.trim())));
        }
        let lot_ids: Vec<i64> = lots.iter().map(|l| l.lot_id).collect();
        self.report_in(tx, &lot_ids, ReportKind::Discrepancy, reported_by).await
    }

    async fn report_in(
        &self,
        tx: &mut S::Tx,
        lot_ids: &[i64],
        kind: ReportKind,
        reported_by: i64,
    ) -> Result<Vec<Report>, AppError> {
        let mut reports = Vec::with_capacity(lot_ids.len());
        let mut seen = HashSet::new();

        for &lot_id in lot_ids {
            if !seen.insert(lot_id) {
                continue;
            }
            if tx.find_lot(lot_id).await?.is_none() {
                tracing::warn!("⚠️ Lote {} não encontrado; relatório ignorado", lot_id);
                continue;
            }
            // Um relatório aberto por tipo e lote
            if tx.find_open_report(lot_id, kind).await?.is_some() {
                tracing::warn!("⚠️ Lote {} já tem relatório {} aberto", lot_id, kind.as_str());
                continue;
            }
            let report = tx.insert_report(lot_id, kind, reported_by).await?;
            tx.set_lot_report_flag(lot_id, kind, true).await?;
            reports.push(report);
        }

        tracing::info!("📝 {} relatório(s) de {} registrados", reports.len(), kind.as_str());
        Ok(reports)
    }

    /// Fecha o relatório pendente mais recente. `None` se não houver nenhum.
    pub async fn resolve_report(
        &self,
        tx: Option<&mut S::Tx>,
        request: ResolveReport,
        resolved_by: i64,
    ) -> Result<Option<Report>, AppError> {
        with_tx!(self.store, tx, |t| self.resolve_report_in(t, request, resolved_by))
    }

    async fn resolve_report_in(
        &self,
        tx: &mut S::Tx,
        request: ResolveReport,
        resolved_by: i64,
    ) -> Result<Option<Report>, AppError> {
        let Some(open) = tx.find_open_report(request.lot_id, request.kind).await? else {
            return Ok(None);
        };

        let closed = tx
            .close_report(open.report_id, request.kind, request.decision.into(), resolved_by)
            .await?;

        // A flag do lote acompanha "existe relatório aberto"
        let still_open = tx.find_open_report(request.lot_id, request.kind).await?.is_some();
        tx.set_lot_report_flag(request.lot_id, request.kind, still_open).await?;

        if request.kind == ReportKind::Duplicate {
            tx.set_lot_duplicated(request.lot_id, request.decision == ReportDecision::Accepted)
                .await?;
        }
        Ok(Some(closed))
    }

    // =========================================================================
    //  PESAGEM / BUNDLES
    // =========================================================================

    /// Grava o peso real e substitui toda a lista de bundles do alvo.
    pub async fn save_weighing(
        &self,
        tx: Option<&mut S::Tx>,
        target: BundleParent,
        actual_weight: Decimal,
        bundles: &[NewBundle],
    ) -> Result<WeighingResult, AppError> {
        // Validação antes de abrir a transação
        validate_bundles(bundles)?;
        with_tx!(self.store, tx, |t| self.save_weighing_in(t, target, actual_weight, bundles))
    }

    async fn save_weighing_in(
        &self,
        tx: &mut S::Tx,
        target: BundleParent,
        actual_weight: Decimal,
        bundles: &[NewBundle],
    ) -> Result<WeighingResult, AppError> {
        let found = match target {
            BundleParent::Inbound(id) => tx.set_inbound_weighing(id, actual_weight).await?,
            BundleParent::Lot(id) => tx.set_lot_weighing(id, actual_weight).await?,
        };
        if !found {
            return Err(AppError::not_found(target.label()));
        }

        let removed = tx.delete_bundles(target).await?;
        tx.insert_bundles(target, bundles).await?;
        let bundles = tx.list_bundles(target).await?;

        tracing::info!(
            "⚖️ Pesagem de {}: {} bundle(s) removidos, {} gravados",
            target.label(),
            removed,
            bundles.len()
        );
        Ok(WeighingResult { actual_weight, bundles })
    }

    pub async fn update_crew_lot_no(
        &self,
        tx: Option<&mut S::Tx>,
        target: BundleParent,
        crew_lot_no: &str,
    ) -> Result<(), AppError> {
        let crew_lot_no = crew_lot_no.trim();
        if crew_lot_no.is_empty() {
            return Err(AppError::BadRequest("O lote da equipe é obrigatório.".into()));
        }
        with_tx!(self.store, tx, |t| self.update_crew_lot_no_in(t, target, crew_lot_no))
    }

    async fn update_crew_lot_no_in(&self, tx: &mut S::Tx, target: BundleParent, crew_lot_no: &str) -> Result<(), AppError> {
        let found = match target {
            BundleParent::Inbound(id) => tx.set_inbound_crew_lot_no(id, crew_lot_no).await?,
            BundleParent::Lot(id) => tx.set_lot_crew_lot_no(id, crew_lot_no).await?,
        };
        if !found {
            return Err(AppError::not_found(target.label()));
        }
        Ok(())
    }

    /// Upsert do bundle reembalado, troca das peças e gravação das fotos.
    pub async fn save_repack(
        &self,
        tx: Option<&mut S::Tx>,
        inbound_id: i64,
        bundle: &NewBundle,
        pieces: &[NewPiece],
        photos: RepackPhotos,
    ) -> Result<RepackResult, AppError> {
        validate_repack(bundle, pieces)?;
        with_tx!(self.store, tx, |t| self.save_repack_in(t, inbound_id, bundle, pieces, &photos))
    }

    async fn save_repack_in(
        &self,
        tx: &mut S::Tx,
        inbound_id: i64,
        bundle: &NewBundle,
        pieces: &[NewPiece],
        photos: &RepackPhotos,
    ) -> Result<RepackResult, AppError> {
        let inbound = tx
            .find_inbound(inbound_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("inbound {inbound_id}")))?;

        let mut row = tx.upsert_repack_bundle(inbound_id, bundle).await?;
        let pieces = tx.replace_bundle_pieces(row.bundle_id, pieces).await?;

        // Arquivos em disco não participam da transação
        let before = match &photos.before {
            Some(payload) => Some(
                self.photos
                    .save_bundle_photo(payload, &inbound.job_no, inbound.lot_no, bundle.bundle_no, PhotoStage::Before)
                    .await?,
            ),
            None => None,
        };
        let after = match &photos.after {
            Some(payload) => Some(
                self.photos
                    .save_bundle_photo(payload, &inbound.job_no, inbound.lot_no, bundle.bundle_no, PhotoStage::After)
                    .await?,
            ),
            None => None,
        };
        if before.is_some() || after.is_some() {
            row = tx
                .set_bundle_photos(row.bundle_id, before.as_deref(), after.as_deref())
                .await?;
        }

        tracing::info!(
            "📦 Repack do bundle {} (inbound {}): {} peça(s)",
            row.bundle_no,
            inbound_id,
            pieces.len()
        );
        Ok(RepackResult { bundle: row, pieces })
    }

    // =========================================================================
    //  AGENDAMENTO / LISTAGEM
    // =========================================================================

    /// Cria o agendamento e seus lotes. Qualquer item inválido cancela tudo
    /// e devolve a lista de erros por item.
    pub async fn schedule_inbound(
        &self,
        tx: Option<&mut S::Tx>,
        scheduled_by: i64,
        inbound_date: NaiveDate,
        lots: &[NewLot],
    ) -> Result<ScheduledInbound, AppError> {
        if lots.is_empty() {
            return Err(AppError::BadRequest("Informe ao menos um lote.".into()));
        }
        with_tx!(self.store, tx, |t| self.schedule_inbound_in(t, scheduled_by, inbound_date, lots))
    }

    async fn schedule_inbound_in(
        &self,
        tx: &mut S::Tx,
        scheduled_by: i64,
        inbound_date: NaiveDate,
        lots: &[NewLot],
    ) -> Result<ScheduledInbound, AppError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (index, lot) in lots.iter().enumerate() {
            let job_no = lot.job_no.trim();
            let item_error = |message: String| ItemError {
                index,
                job_no: job_no.to_string(),
                lot_no: lot.lot_no,
                message,
            };

            if job_no.is_empty() || lot.lot_no <= 0 {
                errors.push(item_error("Número do job e do lote são obrigatórios".into()));
                continue;
            }
            if let Err(validation) = lot.validate() {
                let fields: Vec<String> = validation.field_errors().keys().map(|k| k.to_string()).collect();
                errors.push(item_error(format!("Campos inválidos: {}", fields.join(", "))));
                continue;
            }
            if !seen.insert((job_no.to_string(), lot.lot_no)) {
                errors.push(item_error("Lote repetido no mesmo agendamento".into()));
                continue;
            }
            let existing = tx.find_lots_by_job_lot(job_no, lot.lot_no).await?;
            if existing.iter().any(|l| l.status == LotStatus::Pending) {
                errors.push(item_error("Lote já agendado e ainda pendente".into()));
            }
        }

        if !errors.is_empty() {
            let rejected: HashSet<usize> = errors.iter().map(|e| e.index).collect();
            let accepted = (0..lots.len()).filter(|i| !rejected.contains(i)).collect();
            tracing::warn!("⚠️ Agendamento recusado: {} item(ns) inválidos", errors.len());
            return Err(AppError::PartialBatch { errors, accepted });
        }

        let schedule = tx.insert_schedule_inbound(scheduled_by, inbound_date).await?;
        let mut created = Vec::with_capacity(lots.len());
        for lot in lots {
            created.push(tx.insert_lot(schedule.schedule_inbound_id, lot).await?);
        }

        tracing::info!(
            "✅ Agendamento {} criado com {} lote(s) para {}",
            schedule.schedule_inbound_id,
            created.len(),
            inbound_date
        );
        Ok(ScheduledInbound { schedule, lots: created })
    }

    pub async fn list_inbound_tasks(
        &self,
        tx: Option<&mut S::Tx>,
        filter: &TaskFilter,
    ) -> Result<Vec<InboundTask>, AppError> {
        with_tx!(self.store, tx, |t| t.list_inbound_tasks(filter))
    }

    // =========================================================================
    //  LOCALIZAÇÃO (clientes offline)
    // =========================================================================

    /// Acha o alvo por ID explícito, depois por job + ex-warehouse lot e,
    /// com `legacy`, por job + número do lote. Inbound tem prioridade sobre lote.
    pub async fn locate_target(
        &self,
        tx: &mut S::Tx,
        locator: &TargetLocator,
        legacy: bool,
    ) -> Result<BundleParent, AppError> {
        if let Some(id) = locator.inbound_id {
            return Ok(BundleParent::Inbound(id));
        }
        if let Some(id) = locator.lot_id {
            return Ok(BundleParent::Lot(id));
        }

        let job_no = locator.job_no.as_deref().map(str::trim).filter(|j| !j.is_empty());

        if let (Some(job_no), Some(ex_lot)) = (job_no, locator.ex_warehouse_lot.as_deref()) {
            if let Some(inbound) = tx.find_inbound_by_ex_warehouse_lot(job_no, ex_lot).await? {
                return Ok(BundleParent::Inbound(inbound.inbound_id));
            }
            if let Some(lot) = tx.find_lot_by_ex_warehouse_lot(job_no, ex_lot).await? {
                return Ok(BundleParent::Lot(lot.lot_id));
            }
        }

        if legacy {
            if let (Some(job_no), Some(lot_no)) = (job_no, locator.lot_no) {
                if let Some(inbound) = tx.find_inbound_by_job_lot(job_no, lot_no).await? {
                    return Ok(BundleParent::Inbound(inbound.inbound_id));
                }
                if let Some(lot) = tx.find_lots_by_job_lot(job_no, lot_no).await?.pop() {
                    return Ok(BundleParent::Lot(lot.lot_id));
                }
            }
        }

        Err(AppError::not_found(format!(
            "alvo (job {:?}, ex-warehouse lot {:?}, lote {:?})",
            locator.job_no, locator.ex_warehouse_lot, locator.lot_no
        )))
    }

    // --- Variantes com localizador (app móvel / sync) ---

    /// Pesagem cujo alvo vem por job + ex-warehouse lot ou job + lote.
    pub async fn save_actual_weight(
        &self,
        tx: Option<&mut S::Tx>,
        payload: &ActualWeightPayload,
    ) -> Result<WeighingResult, AppError> {
        validate_bundles(&payload.bundles)?;
        with_tx!(self.store, tx, |t| self.save_actual_weight_in(t, payload))
    }

    async fn save_actual_weight_in(&self, tx: &mut S::Tx, payload: &ActualWeightPayload) -> Result<WeighingResult, AppError> {
        let target = self.locate_target(tx, &payload.target, true).await?;
        self.save_weighing_in(tx, target, payload.actual_weight, &payload.bundles).await
    }

    pub async fn update_located_crew_lot_no(
        &self,
        tx: Option<&mut S::Tx>,
        payload: &CrewLotNoPayload,
    ) -> Result<BundleParent, AppError> {
        let crew_lot_no = payload.crew_lot_no.trim();
        if crew_lot_no.is_empty() {
            return Err(AppError::BadRequest("O lote da equipe é obrigatório.".into()));
        }
        with_tx!(self.store, tx, |t| self.update_located_crew_lot_no_in(t, &payload.target, crew_lot_no))
    }

    async fn update_located_crew_lot_no_in(
        &self,
        tx: &mut S::Tx,
        locator: &TargetLocator,
        crew_lot_no: &str,
    ) -> Result<BundleParent, AppError> {
        // Sem fallback por número do lote: o app sempre manda o ex-warehouse lot
        let target = self.locate_target(tx, locator, false).await?;
        self.update_crew_lot_no_in(tx, target, crew_lot_no).await?;
        Ok(target)
    }

    pub async fn save_located_repack(
        &self,
        tx: Option<&mut S::Tx>,
        payload: &RepackPayload,
    ) -> Result<RepackResult, AppError> {
        validate_repack(&payload.bundle, &payload.pieces)?;
        let photos = RepackPhotos {
            before: payload.before_photo.clone(),
            after: payload.after_photo.clone(),
        };
        with_tx!(self.store, tx, |t| self.save_located_repack_in(t, payload, &photos))
    }

    async fn save_located_repack_in(
        &self,
        tx: &mut S::Tx,
        payload: &RepackPayload,
        photos: &RepackPhotos,
    ) -> Result<RepackResult, AppError> {
        let inbound_id = self.locate_inbound_id(tx, &payload.target).await?;
        self.save_repack_in(tx, inbound_id, &payload.bundle, &payload.pieces, photos).await
    }

    /// Repack sempre é sobre um inbound; um lote é traduzido pelo seu (job, lote).
    pub async fn locate_inbound_id(&self, tx: &mut S::Tx, locator: &TargetLocator) -> Result<i64, AppError> {
        match self.locate_target(tx, locator, true).await? {
            BundleParent::Inbound(id) => Ok(id),
            BundleParent::Lot(lot_id) => {
                let lot = tx
                    .find_lot(lot_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("lote {lot_id}")))?;
                tx.find_inbound_by_job_lot(&lot.job_no, lot.lot_no)
                    .await?
                    .map(|inbound| inbound.inbound_id)
                    .ok_or_else(|| AppError::not_found(format!("inbound do lote {lot_id}")))
            }
        }
    }
}

fn validate_bundles(bundles: &[NewBundle]) -> Result<(), AppError> {
    for bundle in bundles {
        bundle.validate()?;
    }
    let repeated = duplicate_bundle_numbers(bundles);
    if !repeated.is_empty() {
        return Err(AppError::BadRequest(format!("Bundles repetidos: {repeated:?}")));
    }
    Ok(())
}

fn validate_repack(bundle: &NewBundle, pieces: &[NewPiece]) -> Result<(), AppError> {
    bundle.validate()?;
    for piece in pieces {
        piece.validate()?;
    }
    let repeated = duplicate_piece_numbers(pieces);
    if !repeated.is_empty() {
        return Err(AppError::BadRequest(format!("Peças repetidas: {repeated:?}")));
    }
    Ok(())
}
