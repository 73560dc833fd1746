// tests/outbound_flow.rs

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use common::{date, Harness, OFFICE_USER};
use warehouse_backend::{
    common::error::AppError,
    models::outbound::{CreateGrnPayload, GrnSignatures, ScheduleOutboundPayload, ScheduledRelease},
};

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

async fn schedule(h: &Harness, inbound_ids: &[i64]) -> Result<ScheduledRelease, AppError> {
    let payload = ScheduleOutboundPayload {
        release_date: date(2025, 4, 2),
        lorry_no: Some(" WXY 1234 ".into()),
        inbound_ids: inbound_ids.to_vec(),
    };
    h.outbound.schedule_outbound(None, OFFICE_USER, &payload).await
}

fn grn_payload(release: &ScheduledRelease, grn_no: Option<&str>) -> CreateGrnPayload {
    CreateGrnPayload {
        schedule_outbound_id: release.schedule.schedule_outbound_id,
        selected_inbound_ids: release.selected.iter().map(|s| s.selected_inbound_id).collect(),
        grn_no: grn_no.map(str::to_string),
        release_date: None,
        signatures: GrnSignatures::default(),
    }
}

#[tokio::test]
async fn inbound_cannot_sit_in_two_active_schedules() {
    let h = Harness::new().await;
    let inbounds = h.received("J-600", 2).await;

    let first = schedule(&h, &inbounds).await.unwrap();
    assert_eq!(first.schedule.lorry_no.as_deref(), Some("WXY 1234"));

    let err = schedule(&h, &inbounds[1..]).await.unwrap_err();
    match err {
        AppError::AlreadySelected {
            inbound_id,
            schedule_outbound_id,
        } => {
            assert_eq!(inbound_id, inbounds[1]);
            assert_eq!(schedule_outbound_id, first.schedule.schedule_outbound_id);
        }
        other => panic!("erro inesperado: {other:?}"),
    }
    assert_eq!(h.store.selected_inbounds().await.len(), 2);
}

#[tokio::test]
async fn unknown_inbound_cannot_be_scheduled() {
    let h = Harness::new().await;
    let err = schedule(&h, &[404]).await.unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}

#[tokio::test]
async fn grn_releases_the_selection_and_stores_the_pdf() {
    let h = Harness::new().await;
    let inbounds = h.received("J-610", 2).await;
    let release = schedule(&h, &inbounds).await.unwrap();

    let mut payload = grn_payload(&release, None);
    payload.signatures.driver = Some(format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER)));

    let created = h
        .outbound
        .create_outbound_document(None, &payload, OFFICE_USER)
        .await
        .unwrap();

    let outbound = &created.created_outbound;
    assert_eq!(outbound.grn_no, "GRN-20250402-0001");
    assert_eq!(created.transactions.len(), 2);
    assert_eq!(created.lots_for_pdf.len(), 2);
    assert_eq!(created.lots_for_pdf[0].commodity, "Copper");

    let pdf = STANDARD.decode(&created.pdf_base64).unwrap();
    assert!(pdf.starts_with(b"%PDF-stub GRN-20250402-0001"));

    let file_path = outbound.file_path.as_deref().unwrap();
    assert!(h.uploads.path().join(file_path).exists());
    assert_eq!(outbound.file_size, Some(pdf.len() as i64));
    assert_eq!(
        outbound.driver_signature.as_deref(),
        Some("grn/GRN-20250402-0001/driver_signature.png")
    );
    assert!(outbound.warehouse_signature.is_none());

    assert!(h.store.selected_inbounds().await.iter().all(|s| s.is_outbounded));

    // Liberado: pode entrar num novo agendamento
    assert!(schedule(&h, &inbounds[..1]).await.is_ok());
}

#[tokio::test]
async fn grn_numbers_follow_the_release_date_sequence() {
    let h = Harness::new().await;
    let inbounds = h.received("J-620", 2).await;

    let first = schedule(&h, &inbounds[..1]).await.unwrap();
    let second = schedule(&h, &inbounds[1..]).await.unwrap();

    let a = h
        .outbound
        .create_outbound_document(None, &grn_payload(&first, None), OFFICE_USER)
        .await
        .unwrap();
    let b = h
        .outbound
        .create_outbound_document(None, &grn_payload(&second, None), OFFICE_USER)
        .await
        .unwrap();

    assert_eq!(a.created_outbound.grn_no, "GRN-20250402-0001");
    assert_eq!(b.created_outbound.grn_no, "GRN-20250402-0002");
}

#[tokio::test]
async fn generated_grn_skips_past_manual_numbers_on_the_same_day() {
    let h = Harness::new().await;
    let inbounds = h.received("J-625", 3).await;

    let manual = schedule(&h, &inbounds[..1]).await.unwrap();
    h.outbound
        .create_outbound_document(None, &grn_payload(&manual, Some("GRN-20250402-0005")), OFFICE_USER)
        .await
        .unwrap();

    let lettered = schedule(&h, &inbounds[1..2]).await.unwrap();
    h.outbound
        .create_outbound_document(None, &grn_payload(&lettered, Some("GRN-20250402-EXTRA")), OFFICE_USER)
        .await
        .unwrap();

    let generated = schedule(&h, &inbounds[2..]).await.unwrap();
    let created = h
        .outbound
        .create_outbound_document(None, &grn_payload(&generated, None), OFFICE_USER)
        .await
        .unwrap();

    assert_eq!(created.created_outbound.grn_no, "GRN-20250402-0006");
}

#[tokio::test]
async fn duplicate_grn_rolls_back_the_release() {
    let h = Harness::new().await;
    let inbounds = h.received("J-630", 2).await;

    let first = schedule(&h, &inbounds[..1]).await.unwrap();
    h.outbound
        .create_outbound_document(None, &grn_payload(&first, Some("GRN-MANUAL-7")), OFFICE_USER)
        .await
        .unwrap();

    let second = schedule(&h, &inbounds[1..]).await.unwrap();
    let err = h
        .outbound
        .create_outbound_document(None, &grn_payload(&second, Some("GRN-MANUAL-7")), OFFICE_USER)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DuplicateGrn(ref grn) if grn == "GRN-MANUAL-7"));
    assert_eq!(err.code(), "DUPLICATE_GRN");
    assert_eq!(h.store.outbounds().await.len(), 1);

    let pending = h
        .store
        .selected_inbounds()
        .await
        .into_iter()
        .find(|s| s.inbound_id == inbounds[1])
        .unwrap();
    assert!(!pending.is_outbounded);
}

#[tokio::test]
async fn released_selection_cannot_be_released_again() {
    let h = Harness::new().await;
    let inbounds = h.received("J-640", 1).await;
    let release = schedule(&h, &inbounds).await.unwrap();

    h.outbound
        .create_outbound_document(None, &grn_payload(&release, Some("GRN-A")), OFFICE_USER)
        .await
        .unwrap();
    let err = h
        .outbound
        .create_outbound_document(None, &grn_payload(&release, Some("GRN-B")), OFFICE_USER)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.store.outbounds().await.len(), 1);
}

#[tokio::test]
async fn regenerating_keeps_number_and_signatures() {
    let h = Harness::new().await;
    let inbounds = h.received("J-650", 1).await;
    let release = schedule(&h, &inbounds).await.unwrap();

    let mut payload = grn_payload(&release, Some("GRN-R-1"));
    payload.signatures.warehouse = Some(STANDARD.encode(PNG_HEADER));
    let created = h
        .outbound
        .create_outbound_document(None, &payload, OFFICE_USER)
        .await
        .unwrap();

    let outbound_id = created.created_outbound.outbound_id;
    let regenerated = h.outbound.regenerate_grn(None, outbound_id).await.unwrap();

    assert_eq!(regenerated.grn_no, "GRN-R-1");
    assert_eq!(regenerated.file_path, created.created_outbound.file_path);
    assert_eq!(
        regenerated.warehouse_signature.as_deref(),
        Some("grn/GRN-R-1/warehouse_signature.png")
    );

    let err = h.outbound.regenerate_grn(None, 999).await.unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}
