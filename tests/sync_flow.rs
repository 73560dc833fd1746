// tests/sync_flow.rs

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{copper, Harness, CREW_USER};
use warehouse_backend::{
    common::error::AppError,
    db::{Store, StoreTx},
    models::{
        bundle::BundleParent,
        lot::LotStatus,
        sync::{JobStatus, SyncJob},
    },
};

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn job(id: Value, action_type: &str, payload: Value, target_id: Option<i64>) -> SyncJob {
    // Mesmo formato que o app envia
    serde_json::from_value(json!({
        "id": id,
        "action_type": action_type,
        "payload": payload,
        "target_id": target_id,
    }))
    .unwrap()
}

#[tokio::test]
async fn mixed_batch_reports_each_job() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-700", 1)]).await;

    let jobs = vec![
        job(json!("a"), "CONFIRM_INBOUND", json!({ "selectedLots": [{ "lotId": lot_ids[0] }] }), None),
        job(json!(2), "NOT_REAL", json!({}), None),
        job(json!("c"), "SAVE_ACTUAL_WEIGHT", json!("{not json"), None),
        job(
            json!("d"),
            "SAVE_ACTUAL_WEIGHT",
            json!({
                "jobNo": "J-700",
                "exWarehouseLot": "EX-J-700-1",
                "actualWeight": 1000,
                "bundles": [{ "bundleNo": 1, "weight": 1000 }]
            }),
            None,
        ),
    ];

    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    let statuses: Vec<JobStatus> = response.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Success, JobStatus::Skipped, JobStatus::Failed, JobStatus::Success]
    );

    assert_eq!(response.results[1].job_id, json!(2));
    assert!(response.results[2].error.as_deref().unwrap().starts_with("Payload inválido"));

    // A pesagem enxergou o inbound criado pelo primeiro job do mesmo lote
    let inbounds = h.store.inbounds().await;
    let inbound = &inbounds[0];
    assert!(inbound.is_weighted);
    assert_eq!(inbound.actual_weight, Some(Decimal::from(1000)));
}

#[tokio::test]
async fn failing_job_rolls_back_the_batch() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-710", 1)]).await;

    let jobs = vec![
        job(json!("first"), "CONFIRM_INBOUND", json!({ "selectedLots": [{ "lotId": lot_ids[0] }] }), None),
        job(json!("boom"), "REGENERATE_GRN", json!({ "outboundId": 77 }), None),
    ];

    let err = h.sync.process_batch(&jobs, CREW_USER).await.unwrap_err();
    match &err {
        AppError::SyncAborted { job_id, source } => {
            assert_eq!(job_id, "boom");
            assert!(matches!(**source, AppError::ResourceNotFound(_)));
        }
        other => panic!("erro inesperado: {other:?}"),
    }
    assert_eq!(err.code(), "SYNC_ABORTED");

    assert!(h.store.inbounds().await.is_empty());
    assert_eq!(h.lot(lot_ids[0]).await.status, LotStatus::Pending);
}

#[tokio::test]
async fn payload_shape_mismatch_only_fails_that_job() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-720", 1)]).await;

    let jobs = vec![
        job(json!(1), "REPORT_DISCREPANCY", json!({ "lotIds": "não é lista" }), None),
        job(json!(2), "REPORT_DISCREPANCY", json!({ "lotIds": [lot_ids[0]] }), None),
        job(json!(3), "REGENERATE_GRN", json!({}), None),
    ];

    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    assert_eq!(response.results[0].status, JobStatus::Failed);
    assert_eq!(response.results[1].status, JobStatus::Success);
    assert_eq!(response.results[2].status, JobStatus::Failed);
    assert_eq!(response.results[2].error.as_deref(), Some("outboundId ausente"));

    assert!(h.lot(lot_ids[0]).await.report);
}

#[tokio::test]
async fn crew_lot_number_uses_the_job_target_id() {
    let h = Harness::new().await;
    let inbounds = h.received("J-730", 1).await;

    let jobs = vec![job(json!("crew"), "UPDATE_CREW_LOT_NO", json!({ "crewLotNo": " C-9 " }), Some(inbounds[0]))];
    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();

    assert_eq!(response.results[0].status, JobStatus::Success);
    let processed = response.results[0].processed.as_ref().unwrap();
    assert_eq!(processed["crewLotNo"], json!("C-9"));
    assert_eq!(h.store.inbounds().await[0].crew_lot_no.as_deref(), Some("C-9"));
}

#[tokio::test]
async fn repack_from_the_queue_writes_pieces_and_photo() {
    let h = Harness::new().await;
    let inbounds = h.received("J-800", 1).await;

    let payload = json!({
        "inboundId": inbounds[0],
        "bundle": { "bundleNo": 2, "weight": 480 },
        "pieces": [{ "pieceNo": 1, "weight": 240 }, { "pieceNo": 2, "weight": 240 }],
        "afterPhoto": STANDARD.encode(PNG_HEADER),
    });
    // A fila do app guarda o payload como string
    let jobs = vec![job(json!("r1"), "SAVE_REPACK", Value::String(payload.to_string()), None)];

    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    assert_eq!(response.results[0].status, JobStatus::Success);

    let processed = response.results[0].processed.as_ref().unwrap();
    assert_eq!(processed["pieces"].as_array().unwrap().len(), 2);
    assert_eq!(processed["bundle"]["afterPhoto"], json!("repack/J-800_1/bundle_2/after.png"));
    assert!(h.uploads.path().join("repack/J-800_1/bundle_2/after.png").exists());

    let mut tx = h.store.begin().await.unwrap();
    let bundles = tx.list_bundles(BundleParent::Inbound(inbounds[0])).await.unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(bundles.len(), 1);
    assert!(bundles[0].is_repacked);
}

// =============================================================================
//  LOCALIZAÇÃO SEM ID
// =============================================================================

#[tokio::test]
async fn weighing_falls_back_to_job_and_lot_number() {
    let h = Harness::new().await;
    h.received("J-740", 1).await;

    let jobs = vec![job(
        json!("w"),
        "SAVE_ACTUAL_WEIGHT",
        json!({
            "jobNo": "J-740",
            "lotNo": 1,
            "actualWeight": 500,
            "bundles": [{ "bundleNo": 1, "weight": 500 }]
        }),
        None,
    )];
    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    assert_eq!(response.results[0].status, JobStatus::Success);

    let inbounds = h.store.inbounds().await;
    assert!(inbounds[0].is_weighted);
    assert_eq!(inbounds[0].actual_weight, Some(Decimal::from(500)));
}

#[tokio::test]
async fn crew_lot_number_found_by_ex_warehouse_lot() {
    let h = Harness::new().await;
    h.received("J-750", 1).await;

    let jobs = vec![job(
        json!("crew"),
        "UPDATE_CREW_LOT_NO",
        json!({ "jobNo": "J-750", "exWarehouseLot": "EX-J-750-1", "crewLotNo": "C-1" }),
        None,
    )];
    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    assert_eq!(response.results[0].status, JobStatus::Success);
    assert_eq!(h.store.inbounds().await[0].crew_lot_no.as_deref(), Some("C-1"));
}

#[tokio::test]
async fn crew_lot_number_does_not_fall_back_to_lot_number() {
    let h = Harness::new().await;
    h.received("J-760", 1).await;

    let jobs = vec![job(
        json!("crew-legacy"),
        "UPDATE_CREW_LOT_NO",
        json!({ "jobNo": "J-760", "lotNo": 1, "crewLotNo": "C-2" }),
        None,
    )];
    let err = h.sync.process_batch(&jobs, CREW_USER).await.unwrap_err();
    match &err {
        AppError::SyncAborted { job_id, source } => {
            assert_eq!(job_id, "crew-legacy");
            assert!(matches!(**source, AppError::ResourceNotFound(_)));
        }
        other => panic!("erro inesperado: {other:?}"),
    }
    assert!(h.store.inbounds().await[0].crew_lot_no.is_none());
}

#[tokio::test]
async fn repack_by_lot_id_lands_on_its_inbound() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-770", 1)]).await;
    let outcome = h
        .lifecycle
        .confirm_lots(None, &common::refs(&lot_ids), CREW_USER)
        .await
        .unwrap();
    let inbound_id = outcome.inserted[0].inbound_id;

    let jobs = vec![job(
        json!("r-lot"),
        "SAVE_REPACK",
        json!({
            "lotId": lot_ids[0],
            "bundle": { "bundleNo": 1, "weight": 300 },
            "pieces": [{ "pieceNo": 1, "weight": 300 }]
        }),
        None,
    )];
    let response = h.sync.process_batch(&jobs, CREW_USER).await.unwrap();
    assert_eq!(response.results[0].status, JobStatus::Success);

    let mut tx = h.store.begin().await.unwrap();
    let on_inbound = tx.list_bundles(BundleParent::Inbound(inbound_id)).await.unwrap();
    let on_lot = tx.list_bundles(BundleParent::Lot(lot_ids[0])).await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(on_inbound.len(), 1);
    assert!(on_inbound[0].is_repacked);
    assert!(on_lot.is_empty());
}
