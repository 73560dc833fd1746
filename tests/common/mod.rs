// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use warehouse_backend::{
    common::error::AppError,
    db::{MemoryStore, Store, StoreTx},
    models::{
        bundle::NewBundle,
        lookup::LookupTable,
        lot::{Lot, LotRef, NewLot},
        outbound::GrnDocument,
    },
    services::{
        document_service::{DocumentService, GrnRenderer},
        lifecycle_service::LifecycleService,
        outbound_service::OutboundService,
        photo_service::PhotoService,
        sync_service::SyncService,
    },
};

pub const OFFICE_USER: i64 = 10;
pub const CREW_USER: i64 = 20;

/// Renderizador falso: o "PDF" é só o número da GRN.
pub struct StubRenderer;

impl GrnRenderer for StubRenderer {
    fn render(&self, document: &GrnDocument) -> Result<Vec<u8>, AppError> {
        Ok(format!("%PDF-stub {} ({} lotes)", document.grn_no, document.lots.len()).into_bytes())
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub lifecycle: LifecycleService<MemoryStore>,
    pub outbound: OutboundService<MemoryStore>,
    pub sync: SyncService<MemoryStore>,
    pub uploads: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        store.seed_reference(LookupTable::Commodities, &["Copper", "Aluminium"]).await;
        store.seed_reference(LookupTable::Brands, &["KGHM", "Rusal"]).await;
        store.seed_reference(LookupTable::Shapes, &["Cathode", "Ingot"]).await;
        store.seed_reference(LookupTable::ExLmeWarehouses, &["Rotterdam"]).await;
        store.seed_reference(LookupTable::InboundWarehouses, &["Port Klang"]).await;
        store.seed_reference(LookupTable::ExWarehouseLocations, &["Bay 4"]).await;

        let uploads = tempfile::tempdir().expect("tempdir");
        let photos = PhotoService::new(uploads.path());
        let documents = DocumentService::new(Arc::new(StubRenderer), photos.clone());

        let lifecycle = LifecycleService::new(store.clone(), photos.clone());
        let outbound = OutboundService::new(store.clone(), documents, photos);
        let sync = SyncService::new(store.clone(), lifecycle.clone(), outbound.clone());

        Self {
            store,
            lifecycle,
            outbound,
            sync,
            uploads,
        }
    }

    /// Agenda os lotes e devolve os IDs criados.
    pub async fn schedule(&self, lots: Vec<NewLot>) -> Vec<i64> {
        let scheduled = self
            .lifecycle
            .schedule_inbound(None, OFFICE_USER, date(2025, 3, 14), &lots)
            .await
            .expect("agendamento");
        scheduled.lots.iter().map(|l| l.lot_id).collect()
    }

    /// Agenda e confirma `count` lotes de cobre do job `job_no`; devolve os inbound IDs.
    pub async fn received(&self, job_no: &str, count: i32) -> Vec<i64> {
        let lots = (1..=count).map(|n| copper(job_no, n)).collect();
        let lot_ids = self.schedule(lots).await;
        let outcome = self
            .lifecycle
            .confirm_lots(None, &refs(&lot_ids), CREW_USER)
            .await
            .expect("confirmação");
        outcome.inserted.iter().map(|i| i.inbound_id).collect()
    }

    pub async fn lot(&self, lot_id: i64) -> Lot {
        let mut tx = self.store.begin().await.expect("begin");
        let lot = tx.find_lot(lot_id).await.expect("find_lot").expect("lote existe");
        tx.rollback().await.expect("rollback");
        lot
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("data válida")
}

pub fn new_lot(job_no: &str, lot_no: i32, commodity: &str) -> NewLot {
    NewLot {
        job_no: job_no.to_string(),
        lot_no,
        ex_warehouse_lot: Some(format!("EX-{job_no}-{lot_no}")),
        commodity: commodity.to_string(),
        brand: "KGHM".to_string(),
        shape: "Cathode".to_string(),
        ex_lme_warehouse: "Rotterdam".to_string(),
        inbound_warehouse: "Port Klang".to_string(),
        ex_warehouse_location: "Bay 4".to_string(),
        expected_bundle_count: 4,
        net_weight: Decimal::from(25_000),
        gross_weight: Decimal::from(25_150),
    }
}

pub fn copper(job_no: &str, lot_no: i32) -> NewLot {
    new_lot(job_no, lot_no, "Copper")
}

pub fn refs(lot_ids: &[i64]) -> Vec<LotRef> {
    lot_ids.iter().map(|&lot_id| LotRef { lot_id }).collect()
}

pub fn bundle(bundle_no: i32, weight: i64) -> NewBundle {
    NewBundle {
        bundle_no,
        weight: Decimal::from(weight),
        melt_no: None,
    }
}
