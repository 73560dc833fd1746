// tests/lifecycle_flow.rs

mod common;

use rust_decimal::Decimal;

use common::{bundle, copper, date, new_lot, refs, Harness, CREW_USER, OFFICE_USER};
use warehouse_backend::{
    common::error::AppError,
    db::{Store, StoreTx},
    models::{
        bundle::BundleParent,
        inbound::SkipReason,
        lot::LotStatus,
        report::{ReportDecision, ReportKind, ResolveReport},
        task::{TaskQuery, TaskView},
    },
};

// =============================================================================
//  CONFIRMAÇÃO
// =============================================================================

#[tokio::test]
async fn unresolvable_commodity_rolls_back_the_whole_confirmation() {
    let h = Harness::new().await;
    let lot_ids = h
        .schedule(vec![new_lot("J-100", 1, "Copper"), new_lot("J-100", 2, "Unobtainium")])
        .await;

    let err = h
        .lifecycle
        .confirm_lots(None, &refs(&lot_ids), CREW_USER)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::LookupNotFound { .. }));
    assert!(err.to_string().contains("Unobtainium"));
    assert!(h.store.inbounds().await.is_empty());
    assert_eq!(h.lot(lot_ids[0]).await.status, LotStatus::Pending);
}

#[tokio::test]
async fn confirming_twice_creates_a_single_inbound() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-200", 1)]).await;

    let first = h.lifecycle.confirm_lots(None, &refs(&lot_ids), CREW_USER).await.unwrap();
    let second = h.lifecycle.confirm_lots(None, &refs(&lot_ids), CREW_USER).await.unwrap();

    assert_eq!(first.inserted.len(), 1);
    assert!(second.inserted.is_empty());
    assert_eq!(second.skipped[0].reason, SkipReason::NotPending);
    assert_eq!(h.store.inbounds().await.len(), 1);

    let inbound = &first.inserted[0];
    assert_eq!(inbound.user_id, OFFICE_USER);
    assert_eq!(inbound.processed_id, CREW_USER);
    assert_eq!(h.lot(lot_ids[0]).await.status, LotStatus::Received);
}

#[tokio::test]
async fn rescheduled_lot_with_existing_inbound_is_skipped() {
    let h = Harness::new().await;
    h.received("J-210", 1).await;

    // Mesmo (job, lote) agendado de novo depois de recebido
    let again = h.schedule(vec![copper("J-210", 1)]).await;
    let outcome = h.lifecycle.confirm_lots(None, &refs(&again), CREW_USER).await.unwrap();

    assert!(outcome.inserted.is_empty());
    assert_eq!(outcome.skipped[0].reason, SkipReason::InboundExists);
    assert_eq!(h.lot(again[0]).await.status, LotStatus::Pending);
}

#[tokio::test]
async fn unknown_lots_are_skipped_not_fatal() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-220", 1)]).await;

    let outcome = h
        .lifecycle
        .confirm_lots(None, &refs(&[404, lot_ids[0]]), CREW_USER)
        .await
        .unwrap();

    assert_eq!(outcome.inserted.len(), 1);
    assert_eq!(outcome.skipped[0].lot_id, 404);
    assert_eq!(outcome.skipped[0].reason, SkipReason::LotNotFound);
}

#[tokio::test]
async fn lot_without_schedule_is_an_integrity_error() {
    let h = Harness::new().await;

    let mut tx = h.store.begin().await.unwrap();
    let orphan = tx.insert_lot(999, &copper("J-230", 1)).await.unwrap();
    tx.commit().await.unwrap();

    let err = h
        .lifecycle
        .confirm_lots(None, &refs(&[orphan.lot_id]), CREW_USER)
        .await
        .unwrap_err();

    match err {
        AppError::MissingSchedule { lot_id, schedule_inbound_id } => {
            assert_eq!(lot_id, orphan.lot_id);
            assert_eq!(schedule_inbound_id, 999);
        }
        other => panic!("erro inesperado: {other:?}"),
    }
    assert!(h.store.inbounds().await.is_empty());
}

#[tokio::test]
async fn caller_transaction_is_left_open_for_the_caller() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-240", 1)]).await;

    let mut tx = h.store.begin().await.unwrap();
    let outcome = h
        .lifecycle
        .confirm_lots(Some(&mut tx), &refs(&lot_ids), CREW_USER)
        .await
        .unwrap();
    assert_eq!(outcome.inserted.len(), 1);

    // Nada publicado até o chamador decidir
    assert!(h.store.inbounds().await.is_empty());
    tx.rollback().await.unwrap();
    assert!(h.store.inbounds().await.is_empty());
    assert_eq!(h.lot(lot_ids[0]).await.status, LotStatus::Pending);
}

#[tokio::test]
async fn open_transaction_does_not_erase_a_later_confirmation() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-250", 1), copper("J-250", 2)]).await;

    let mut flagging = h.store.begin().await.unwrap();
    flagging
        .set_lot_report_flag(lot_ids[1], ReportKind::Discrepancy, true)
        .await
        .unwrap();

    // A confirmação espera a transação aberta terminar
    let lifecycle = h.lifecycle.clone();
    let first_lot = refs(&lot_ids[..1]);
    let confirming = tokio::spawn(async move { lifecycle.confirm_lots(None, &first_lot, CREW_USER).await });
    tokio::task::yield_now().await;

    flagging.commit().await.unwrap();
    let outcome = confirming.await.unwrap().unwrap();
    assert_eq!(outcome.inserted.len(), 1);

    assert_eq!(h.store.inbounds().await.len(), 1);
    assert_eq!(h.lot(lot_ids[0]).await.status, LotStatus::Received);
    assert!(h.lot(lot_ids[1]).await.report);
}

// =============================================================================
//  AGENDAMENTO E LISTAGEM
// =============================================================================

#[tokio::test]
async fn invalid_items_reject_the_whole_schedule() {
    let h = Harness::new().await;
    h.schedule(vec![copper("J-300", 1)]).await;

    let lots = vec![
        copper("J-300", 2),
        copper("J-300", 1), // já pendente
        copper("", 3),
        copper("J-300", 2), // repetido
    ];
    let err = h
        .lifecycle
        .schedule_inbound(None, OFFICE_USER, date(2025, 3, 15), &lots)
        .await
        .unwrap_err();

    match err {
        AppError::PartialBatch { errors, accepted } => {
            let rejected: Vec<usize> = errors.iter().map(|e| e.index).collect();
            assert_eq!(rejected, vec![1, 2, 3]);
            assert_eq!(accepted, vec![0]);
        }
        other => panic!("erro inesperado: {other:?}"),
    }

    let tasks = h
        .lifecycle
        .list_inbound_tasks(None, &TaskQuery::default().to_filter())
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn crew_view_hides_received_lots() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-310", 1), copper("J-310", 2)]).await;
    h.lifecycle.confirm_lots(None, &refs(&lot_ids[..1]), CREW_USER).await.unwrap();

    let crew = TaskQuery {
        view: TaskView::Crew,
        ..Default::default()
    };
    let tasks = h.lifecycle.list_inbound_tasks(None, &crew.to_filter()).await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].lot_id, lot_ids[1]);

    let office = TaskQuery {
        job_no: Some("J-310".into()),
        ..Default::default()
    };
    let all = h.lifecycle.list_inbound_tasks(None, &office.to_filter()).await.unwrap();
    assert_eq!(all.len(), 2);
}

// =============================================================================
//  RELATÓRIOS
// =============================================================================

#[tokio::test]
async fn report_flag_follows_open_reports() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-400", 1)]).await;
    let lot_id = lot_ids[0];

    let opened = h
        .lifecycle
        .report_discrepancy(None, &[lot_id, lot_id, 404], CREW_USER)
        .await
        .unwrap();
    assert_eq!(opened.len(), 1);
    assert!(h.lot(lot_id).await.report);

    // Segundo reporte do mesmo tipo enquanto o primeiro está aberto
    let again = h.lifecycle.report_discrepancy(None, &[lot_id], CREW_USER).await.unwrap();
    assert!(again.is_empty());

    let request = ResolveReport {
        lot_id,
        kind: ReportKind::Discrepancy,
        decision: ReportDecision::Declined,
    };
    let closed = h.lifecycle.resolve_report(None, request, OFFICE_USER).await.unwrap();
    assert!(closed.is_some());
    assert!(!h.lot(lot_id).await.report);

    let nothing_left = h.lifecycle.resolve_report(None, request, OFFICE_USER).await.unwrap();
    assert!(nothing_left.is_none());
}

#[tokio::test]
async fn accepted_duplicate_marks_the_lot() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-410", 1)]).await;
    let lot_id = lot_ids[0];

    h.lifecycle.report_duplicate(None, &[lot_id], CREW_USER).await.unwrap();
    let lot = h.lot(lot_id).await;
    assert!(lot.report_duplicate);
    assert!(!lot.report);

    let request = ResolveReport {
        lot_id,
        kind: ReportKind::Duplicate,
        decision: ReportDecision::Accepted,
    };
    h.lifecycle.resolve_report(None, request, OFFICE_USER).await.unwrap();

    let lot = h.lot(lot_id).await;
    assert!(!lot.report_duplicate);
    assert!(lot.is_duplicated);
}

#[tokio::test]
async fn job_report_covers_every_lot_of_the_job() {
    let h = Harness::new().await;
    h.schedule(vec![copper("J-420", 1), copper("J-420", 2), copper("J-421", 1)]).await;

    let reports = h
        .lifecycle
        .report_job_discrepancy(None, " J-420 ", CREW_USER)
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);

    let err = h
        .lifecycle
        .report_job_discrepancy(None, "J-999", CREW_USER)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}

// =============================================================================
//  PESAGEM
// =============================================================================

#[tokio::test]
async fn weighing_replaces_the_bundle_list() {
    let h = Harness::new().await;
    let inbound_ids = h.received("J-500", 5).await;
    assert_eq!(inbound_ids[4], 5);
    let target = BundleParent::Inbound(5);

    h.lifecycle
        .save_weighing(None, target, Decimal::from(1000), &[bundle(1, 500), bundle(2, 500)])
        .await
        .unwrap();
    let second = h
        .lifecycle
        .save_weighing(None, target, Decimal::from(999), &[bundle(1, 999)])
        .await
        .unwrap();

    assert_eq!(second.bundles.len(), 1);
    assert_eq!(second.bundles[0].bundle_no, 1);
    assert_eq!(second.bundles[0].weight, Decimal::from(999));

    let inbound = h
        .store
        .inbounds()
        .await
        .into_iter()
        .find(|i| i.inbound_id == 5)
        .unwrap();
    assert!(inbound.is_weighted);
    assert_eq!(inbound.actual_weight, Some(Decimal::from(999)));
}

#[tokio::test]
async fn lot_and_inbound_bundles_do_not_mix() {
    let h = Harness::new().await;
    let lot_ids = h.schedule(vec![copper("J-510", 1)]).await;
    h.lifecycle.confirm_lots(None, &refs(&lot_ids), CREW_USER).await.unwrap();

    h.lifecycle
        .save_weighing(None, BundleParent::Lot(lot_ids[0]), Decimal::from(10), &[bundle(1, 10)])
        .await
        .unwrap();
    h.lifecycle
        .save_weighing(None, BundleParent::Inbound(1), Decimal::from(20), &[bundle(1, 20), bundle(2, 0)])
        .await
        .unwrap();

    let mut tx = h.store.begin().await.unwrap();
    let on_lot = tx.list_bundles(BundleParent::Lot(lot_ids[0])).await.unwrap();
    let on_inbound = tx.list_bundles(BundleParent::Inbound(1)).await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(on_lot.len(), 1);
    assert_eq!(on_inbound.len(), 2);
    assert!(on_lot.iter().all(|b| b.parent == BundleParent::Lot(lot_ids[0])));
}

#[tokio::test]
async fn repeated_bundle_numbers_are_rejected_before_writing() {
    let h = Harness::new().await;
    h.received("J-520", 1).await;

    let err = h
        .lifecycle
        .save_weighing(None, BundleParent::Inbound(1), Decimal::from(10), &[bundle(1, 5), bundle(1, 5)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = h
        .lifecycle
        .save_weighing(None, BundleParent::Inbound(77), Decimal::from(10), &[bundle(1, 5)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}
