// src/services/outbound_service.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    db::store::{with_tx, Store, StoreTx},
    models::outbound::{
        CreateGrnPayload, CreatedGrn, DocumentMeta, GrnDocument, LotForPdf, NewOutbound, Outbound,
        OutboundTransaction, ReleaseLine, ScheduleOutboundPayload, ScheduledRelease, SelectedInbound,
    },
    services::{
        document_service::DocumentService,
        photo_service::{PhotoService, SignatureRole},
    },
};

/// Linha que sabe virar uma linha do PDF.
pub trait PdfLine {
    fn to_pdf(&self, index: usize) -> LotForPdf;
}

impl PdfLine for ReleaseLine {
    fn to_pdf(&self, index: usize) -> LotForPdf {
        LotForPdf {
            index,
            job_no: self.job_no.clone(),
            lot_no: self.lot_no,
            ex_warehouse_lot: self.ex_warehouse_lot.clone().unwrap_or_else(|| "-".to_string()),
            commodity: self.commodity.clone(),
            brand: self.brand.clone(),
            shape: self.shape.clone(),
            bundles: self.no_of_bundle,
            net_weight: self.net_weight,
            gross_weight: self.gross_weight,
            actual_weight: self.actual_weight.unwrap_or(self.net_weight),
        }
    }
}

impl PdfLine for OutboundTransaction {
    fn to_pdf(&self, index: usize) -> LotForPdf {
        LotForPdf {
            index,
            job_no: self.job_no.clone(),
            lot_no: self.lot_no,
            ex_warehouse_lot: self.ex_warehouse_lot.clone().unwrap_or_else(|| "-".to_string()),
            commodity: self.commodity.clone(),
            brand: self.brand.clone(),
            shape: self.shape.clone(),
            bundles: self.no_of_bundle,
            net_weight: self.net_weight,
            gross_weight: self.gross_weight,
            actual_weight: self.actual_weight.unwrap_or(self.net_weight),
        }
    }
}

/// Lista achatada e numerada (a partir de 1) no formato do PDF.
pub fn shape_lots_for_pdf<L: PdfLine>(lines: &[L]) -> Vec<LotForPdf> {
    lines.iter().enumerate().map(|(i, line)| line.to_pdf(i + 1)).collect()
}

pub fn grn_prefix(release_date: NaiveDate) -> String {
    format!("GRN-{}-", release_date.format("%Y%m%d"))
}

/// Maior sufixo numérico já usado no prefixo, mais um.
/// Números manuais com sufixo não numérico não entram na conta.
pub fn next_grn_sequence(prefix: &str, existing: &[String]) -> i64 {
    existing
        .iter()
        .filter_map(|grn| grn.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<i64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

#[derive(Clone)]
pub struct OutboundService<S: Store> {
    store: S,
    documents: DocumentService,
    photos: PhotoService,
}

impl<S: Store> OutboundService<S> {
    pub fn new(store: S, documents: DocumentService, photos: PhotoService) -> Self {
        Self { store, documents, photos }
    }

    // =========================================================================
    //  AGENDAMENTO DE SAÍDA
    // =========================================================================

    pub async fn schedule_outbound(
        &self,
        tx: Option<&mut S::Tx>,
        scheduled_by: i64,
        payload: &ScheduleOutboundPayload,
    ) -> Result<ScheduledRelease, AppError> {
        with_tx!(self.store, tx, |t| self.schedule_outbound_in(t, scheduled_by, payload))
    }

    async fn schedule_outbound_in(
        &self,
        tx: &mut S::Tx,
        scheduled_by: i64,
        payload: &ScheduleOutboundPayload,
    ) -> Result<ScheduledRelease, AppError> {
        let inbound_ids = unique_ids(&payload.inbound_ids);

        // 1. Todos precisam existir e estar livres
        for &inbound_id in &inbound_ids {
            if tx.find_inbound(inbound_id).await?.is_none() {
                return Err(AppError::not_found(format!("inbound {inbound_id}")));
            }
            if let Some(active) = tx.find_active_selection(inbound_id).await? {
                return Err(AppError::AlreadySelected {
                    inbound_id,
                    schedule_outbound_id: active.schedule_outbound_id,
                });
            }
        }

        // 2. Cabeçalho + seleções
        let lorry_no = payload.lorry_no.as_deref().map(str::trim).filter(|l| !l.is_empty());
        let schedule = tx
            .insert_schedule_outbound(scheduled_by, payload.release_date, lorry_no)
            .await?;

        let mut selected = Vec::with_capacity(inbound_ids.len());
        for inbound_id in inbound_ids {
            selected.push(tx.insert_selected_inbound(schedule.schedule_outbound_id, inbound_id).await?);
        }

        tracing::info!(
            "🚚 Saída {} agendada para {} com {} inbound(s)",
            schedule.schedule_outbound_id,
            schedule.release_date,
            selected.len()
        );
        Ok(ScheduledRelease { schedule, selected })
    }

    /// Marca as seleções como liberadas e os bundles como expedidos.
    pub async fn confirm_outbound_selection(
        &self,
        tx: Option<&mut S::Tx>,
        schedule_outbound_id: i64,
        selected_inbound_ids: &[i64],
    ) -> Result<Vec<SelectedInbound>, AppError> {
        with_tx!(self.store, tx, |t| self.confirm_selection_in(t, schedule_outbound_id, selected_inbound_ids))
    }

    async fn confirm_selection_in(
        &self,
        tx: &mut S::Tx,
        schedule_outbound_id: i64,
        selected_inbound_ids: &[i64],
    ) -> Result<Vec<SelectedInbound>, AppError> {
        let wanted = unique_ids(selected_inbound_ids);
        let updated = tx.mark_selected_outbounded(schedule_outbound_id, &wanted).await?;

        if updated.len() != wanted.len() {
            let missing: Vec<i64> = wanted
                .iter()
                .copied()
                .filter(|id| !updated.iter().any(|s| s.selected_inbound_id == *id))
                .collect();
            return Err(AppError::Conflict(format!(
                "Seleções {missing:?} já liberadas ou fora do agendamento {schedule_outbound_id}"
            )));
        }

        let inbound_ids: Vec<i64> = updated.iter().map(|s| s.inbound_id).collect();
        let bundles = tx.mark_bundles_outbounded(&inbound_ids).await?;
        tracing::info!("✅ {} seleção(ões) liberadas, {} bundle(s) expedidos", updated.len(), bundles);
        Ok(updated)
    }

    // =========================================================================
    //  GRN
    // =========================================================================

    pub async fn create_outbound_document(
        &self,
        tx: Option<&mut S::Tx>,
        payload: &CreateGrnPayload,
        created_by: i64,
    ) -> Result<CreatedGrn, AppError> {
        with_tx!(self.store, tx, |t| self.create_document_in(t, payload, created_by))
    }

    async fn create_document_in(
        &self,
        tx: &mut S::Tx,
        payload: &CreateGrnPayload,
        created_by: i64,
    ) -> Result<CreatedGrn, AppError> {
        // 1. Agendamento e linhas selecionadas
        let schedule = tx
            .find_schedule_outbound(payload.schedule_outbound_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("agendamento de saída {}", payload.schedule_outbound_id)))?;

        let wanted = unique_ids(&payload.selected_inbound_ids);
        let lines = tx.list_release_lines(schedule.schedule_outbound_id, &wanted).await?;
        if lines.len() != wanted.len() {
            return Err(AppError::not_found(format!(
                "seleções {:?} no agendamento {}",
                wanted, schedule.schedule_outbound_id
            )));
        }

        // 2. Libera a seleção
        self.confirm_selection_in(tx, schedule.schedule_outbound_id, &wanted).await?;

        // 3. Cabeçalho da GRN
        let release_date = payload.release_date.unwrap_or(schedule.release_date);
        let grn_no = match payload.grn_no.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(grn_no) => grn_no.to_string(),
            None => self.next_grn_number(tx, release_date).await?,
        };
        let outbound = tx
            .insert_outbound(&NewOutbound {
                schedule_outbound_id: schedule.schedule_outbound_id,
                grn_no: grn_no.clone(),
                release_date,
                created_by,
            })
            .await?;

        // 4. Uma transação de saída por lote
        let mut transactions = Vec::with_capacity(lines.len());
        for line in &lines {
            transactions.push(tx.insert_outbound_transaction(outbound.outbound_id, line).await?);
        }

        // 5. PDF + assinaturas no disco
        let lots_for_pdf = shape_lots_for_pdf(&lines);
        let document = GrnDocument::new(&grn_no, release_date, schedule.lorry_no.clone(), lots_for_pdf.clone());
        let stored = self.documents.render_and_store(&document).await?;

        let driver_signature = match &payload.signatures.driver {
            Some(image) => Some(self.photos.save_signature(image, &grn_no, SignatureRole::Driver).await?),
            None => None,
        };
        let warehouse_signature = match &payload.signatures.warehouse {
            Some(image) => Some(self.photos.save_signature(image, &grn_no, SignatureRole::Warehouse).await?),
            None => None,
        };

        // 6. Metadados do arquivo
        let created_outbound = tx
            .set_outbound_document(
                outbound.outbound_id,
                &DocumentMeta {
                    file_path: stored.file_path,
                    file_size: stored.file_size,
                    driver_signature,
                    warehouse_signature,
                },
            )
            .await?;

        tracing::info!(
            "✅ GRN {} criada com {} lote(s)",
            created_outbound.grn_no,
            transactions.len()
        );
        Ok(CreatedGrn {
            created_outbound,
            transactions,
            lots_for_pdf,
            pdf_base64: STANDARD.encode(&stored.bytes),
        })
    }

    /// Regera o PDF a partir das transações gravadas e atualiza os metadados.
    pub async fn regenerate_grn(&self, tx: Option<&mut S::Tx>, outbound_id: i64) -> Result<Outbound, AppError> {
        with_tx!(self.store, tx, |t| self.regenerate_grn_in(t, outbound_id))
    }

    async fn regenerate_grn_in(&self, tx: &mut S::Tx, outbound_id: i64) -> Result<Outbound, AppError> {
        let outbound = tx
            .find_outbound(outbound_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("outbound {outbound_id}")))?;
        let transactions = tx.list_outbound_transactions(outbound_id).await?;
        let lorry_no = tx
            .find_schedule_outbound(outbound.schedule_outbound_id)
            .await?
            .and_then(|s| s.lorry_no);

        let document = GrnDocument::new(
            &outbound.grn_no,
            outbound.release_date,
            lorry_no,
            shape_lots_for_pdf(&transactions),
        );
        let stored = self.documents.render_and_store(&document).await?;

        // Assinaturas em branco mantêm as já gravadas
        let updated = tx
            .set_outbound_document(
                outbound_id,
                &DocumentMeta {
                    file_path: stored.file_path,
                    file_size: stored.file_size,
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!("🔁 GRN {} regerada", updated.grn_no);
        Ok(updated)
    }

    async fn next_grn_number(&self, tx: &mut S::Tx, release_date: NaiveDate) -> Result<String, AppError> {
        let prefix = grn_prefix(release_date);
        let existing = tx.list_grns_with_prefix(&prefix).await?;
        Ok(format!("{prefix}{:04}", next_grn_sequence(&prefix, &existing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(job_no: &str, lot_no: i32, actual: Option<i64>) -> ReleaseLine {
        ReleaseLine {
            selected_inbound_id: 1,
            inbound_id: 1,
            job_no: job_no.into(),
            lot_no,
            ex_warehouse_lot: None,
            commodity: "Copper".into(),
            brand: "KGHM".into(),
            shape: "Cathode".into(),
            no_of_bundle: 4,
            net_weight: Decimal::from(1000),
            gross_weight: Decimal::from(1010),
            actual_weight: actual.map(Decimal::from),
        }
    }

    #[test]
    fn pdf_rows_are_numbered_and_fall_back_to_net_weight() {
        let rows = shape_lots_for_pdf(&[line("J1", 1, None), line("J1", 2, Some(998))]);

        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].actual_weight, Decimal::from(1000));
        assert_eq!(rows[0].ex_warehouse_lot, "-");
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].actual_weight, Decimal::from(998));
    }

    #[test]
    fn grn_prefix_uses_release_date() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        assert_eq!(grn_prefix(date), "GRN-20250402-");
    }

    #[test]
    fn grn_sequence_follows_the_highest_numeric_suffix() {
        let prefix = "GRN-20250402-";
        assert_eq!(next_grn_sequence(prefix, &[]), 1);

        let existing: Vec<String> = ["GRN-20250402-0001", "GRN-20250402-0007", "GRN-20250402-EXTRA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(next_grn_sequence(prefix, &existing), 8);
    }

    #[test]
    fn totals_add_up() {
        let rows = shape_lots_for_pdf(&[line("J1", 1, None), line("J2", 1, Some(990))]);
        let doc = GrnDocument::new("GRN-1", NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(), None, rows);
        assert_eq!(doc.total_bundles, 8);
        assert_eq!(doc.total_net_weight, Decimal::from(2000));
        assert_eq!(doc.total_actual_weight, Decimal::from(1990));
    }
}
