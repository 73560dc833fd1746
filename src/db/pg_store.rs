// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::{
        db_utils::{bind_filter_values, unique_violation},
        error::AppError,
        filter::TaskFilter,
    },
    db::store::{Store, StoreTx},
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

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, AppError> {
        Ok(PgTx { tx: self.pool.begin().await? })
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// Colunas do relatório; o `kind` não é coluna, vem da tabela consultada.
fn report_columns(kind: ReportKind) -> String {
    format!(
        "report_id, lot_id, '{}'::report_kind AS kind, status, reported_by, reported_at, resolved_by, resolved_at",
        kind.as_str()
    )
}

fn report_flag_column(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Discrepancy => "report",
        ReportKind::Duplicate => "report_duplicate",
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }

    // ---
    // Agendamento de entrada / lotes
    // ---

    async fn insert_schedule_inbound(&mut self, user_id: i64, inbound_date: NaiveDate) -> Result<ScheduleInbound, AppError> {
        let schedule = sqlx::query_as::<_, ScheduleInbound>(
            "INSERT INTO scheduleinbounds (user_id, inbound_date) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(inbound_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(schedule)
    }

    async fn find_schedule_inbound(&mut self, schedule_inbound_id: i64) -> Result<Option<ScheduleInbound>, AppError> {
        let schedule = sqlx::query_as::<_, ScheduleInbound>(
            "SELECT * FROM scheduleinbounds WHERE schedule_inbound_id = $1",
        )
        .bind(schedule_inbound_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(schedule)
    }

    async fn insert_lot(&mut self, schedule_inbound_id: i64, lot: &NewLot) -> Result<Lot, AppError> {
        let lot = sqlx::query_as::<_, Lot>(
            r#"
            INSERT INTO lot (
                schedule_inbound_id, job_no, lot_no, ex_warehouse_lot,
                commodity, brand, shape, ex_lme_warehouse, inbound_warehouse, ex_warehouse_location,
                expected_bundle_count, net_weight, gross_weight
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(schedule_inbound_id)
        .bind(lot.job_no.trim())
        .bind(lot.lot_no)
        .bind(lot.ex_warehouse_lot.as_deref())
        .bind(&lot.commodity)
        .bind(&lot.brand)
        .bind(&lot.shape)
        .bind(&lot.ex_lme_warehouse)
        .bind(&lot.inbound_warehouse)
        .bind(&lot.ex_warehouse_location)
        .bind(lot.expected_bundle_count)
        .bind(lot.net_weight)
        .bind(lot.gross_weight)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(lot)
    }

    async fn find_lot(&mut self, lot_id: i64) -> Result<Option<Lot>, AppError> {
        let lot = sqlx::query_as::<_, Lot>("SELECT * FROM lot WHERE lot_id = $1")
            .bind(lot_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(lot)
    }

    async fn find_lots_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Vec<Lot>, AppError> {
        let lots = sqlx::query_as::<_, Lot>(
            "SELECT * FROM lot WHERE job_no = $1 AND lot_no = $2 ORDER BY lot_id",
        )
        .bind(job_no)
        .bind(lot_no)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(lots)
    }

    async fn find_lot_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<Lot>, AppError> {
        let lot = sqlx::query_as::<_, Lot>(
            r#"
            SELECT * FROM lot
            WHERE job_no = $1 AND ex_warehouse_lot = $2
            ORDER BY lot_id DESC
            LIMIT 1
            "#,
        )
        .bind(job_no)
        .bind(ex_warehouse_lot)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(lot)
    }

    async fn list_lots_by_job(&mut self, job_no: &str) -> Result<Vec<Lot>, AppError> {
        let lots = sqlx::query_as::<_, Lot>("SELECT * FROM lot WHERE job_no = $1 ORDER BY lot_no, lot_id")
            .bind(job_no)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(lots)
    }

    async fn mark_lot_received(&mut self, lot_id: i64) -> Result<bool, AppError> {
        // A condição no status fecha a corrida entre duas confirmações simultâneas
        let result = sqlx::query(
            r#"
            UPDATE lot
            SET status = 'Received', is_confirm = TRUE, updated_at = NOW()
            WHERE lot_id = $1 AND status = 'Pending'
            "#,
        )
        .bind(lot_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_lot_report_flag(&mut self, lot_id: i64, kind: ReportKind, open: bool) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE lot SET {} = $2, updated_at = NOW() WHERE lot_id = $1",
            report_flag_column(kind)
        );
        sqlx::query(&sql)
            .bind(lot_id)
            .bind(open)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_lot_duplicated(&mut self, lot_id: i64, duplicated: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE lot SET is_duplicated = $2, updated_at = NOW() WHERE lot_id = $1")
            .bind(lot_id)
            .bind(duplicated)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_lot_weighing(&mut self, lot_id: i64, actual_weight: Decimal) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE lot SET actual_weight = $2, is_weighted = TRUE, updated_at = NOW() WHERE lot_id = $1",
        )
        .bind(lot_id)
        .bind(actual_weight)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_lot_crew_lot_no(&mut self, lot_id: i64, crew_lot_no: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE lot SET crew_lot_no = $2, updated_at = NOW() WHERE lot_id = $1")
            .bind(lot_id)
            .bind(crew_lot_no)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_inbound_tasks(&mut self, filter: &TaskFilter) -> Result<Vec<InboundTask>, AppError> {
        let (where_clause, values) = filter.to_sql(1);
        let sql = format!(
            r#"
            SELECT
                l.lot_id, l.schedule_inbound_id, s.inbound_date, s.user_id AS scheduled_by,
                l.job_no, l.lot_no, l.ex_warehouse_lot,
                l.commodity, l.brand, l.shape, l.inbound_warehouse,
                l.expected_bundle_count, l.net_weight, l.gross_weight,
                l.status, l.is_confirm, l.report, l.report_duplicate
            FROM lot l
            JOIN scheduleinbounds s ON s.schedule_inbound_id = l.schedule_inbound_id
            {where_clause}
            ORDER BY s.inbound_date DESC, l.job_no, l.lot_no
            "#
        );

        let query = bind_filter_values(sqlx::query_as::<_, InboundTask>(&sql), values);
        let tasks = query.fetch_all(&mut *self.tx).await?;
        Ok(tasks)
    }

    // ---
    // Referências / inbounds
    // ---

    async fn resolve_reference_id(&mut self, table: LookupTable, value: &str) -> Result<Option<i64>, AppError> {
        // Tabela e colunas vêm do enum, nunca da entrada do usuário
        let sql = format!(
            "SELECT {id} FROM {table} WHERE LOWER({name}) = LOWER($1) ORDER BY {id} LIMIT 1",
            id = table.id_column(),
            table = table.table_name(),
            name = table.name_column(),
        );
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn find_inbound(&mut self, inbound_id: i64) -> Result<Option<InboundRecord>, AppError> {
        let inbound = sqlx::query_as::<_, InboundRecord>("SELECT * FROM inbounds WHERE inbound_id = $1")
            .bind(inbound_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(inbound)
    }

    async fn find_inbound_by_job_lot(&mut self, job_no: &str, lot_no: i32) -> Result<Option<InboundRecord>, AppError> {
        let inbound = sqlx::query_as::<_, InboundRecord>(
            "SELECT * FROM inbounds WHERE job_no = $1 AND lot_no = $2",
        )
        .bind(job_no)
        .bind(lot_no)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(inbound)
    }

    async fn find_inbound_by_ex_warehouse_lot(&mut self, job_no: &str, ex_warehouse_lot: &str) -> Result<Option<InboundRecord>, AppError> {
        let inbound = sqlx::query_as::<_, InboundRecord>(
            r#"
            SELECT * FROM inbounds
            WHERE job_no = $1 AND ex_warehouse_lot = $2
            ORDER BY inbound_id DESC
            LIMIT 1
            "#,
        )
        .bind(job_no)
        .bind(ex_warehouse_lot)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(inbound)
    }

    async fn insert_inbound(&mut self, inbound: &NewInbound) -> Result<InboundRecord, AppError> {
        sqlx::query_as::<_, InboundRecord>(
            r#"
            INSERT INTO inbounds (
                job_no, lot_no, ex_warehouse_lot, crew_lot_no,
                commodity_id, shape_id, brand_id, ex_lme_warehouse_id, inbound_warehouse_id, ex_warehouse_location_id,
                net_weight, gross_weight, actual_weight, is_weighted, no_of_bundle,
                user_id, processed_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(&inbound.job_no)
        .bind(inbound.lot_no)
        .bind(inbound.ex_warehouse_lot.as_deref())
        .bind(inbound.crew_lot_no.as_deref())
        .bind(inbound.refs.commodity_id)
        .bind(inbound.refs.shape_id)
        .bind(inbound.refs.brand_id)
        .bind(inbound.refs.ex_lme_warehouse_id)
        .bind(inbound.refs.inbound_warehouse_id)
        .bind(inbound.refs.ex_warehouse_location_id)
        .bind(inbound.net_weight)
        .bind(inbound.gross_weight)
        .bind(inbound.actual_weight)
        .bind(inbound.is_weighted)
        .bind(inbound.no_of_bundle)
        .bind(inbound.user_id)
        .bind(inbound.processed_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Conflict(format!(
                "Já existe inbound para job {} lote {}",
                inbound.job_no, inbound.lot_no
            )),
            None => e.into(),
        })
    }

    async fn set_inbound_weighing(&mut self, inbound_id: i64, actual_weight: Decimal) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE inbounds SET actual_weight = $2, is_weighted = TRUE, updated_at = NOW() WHERE inbound_id = $1",
        )
        .bind(inbound_id)
        .bind(actual_weight)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_inbound_crew_lot_no(&mut self, inbound_id: i64, crew_lot_no: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE inbounds SET crew_lot_no = $2, updated_at = NOW() WHERE inbound_id = $1")
            .bind(inbound_id)
            .bind(crew_lot_no)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // ---
    // Bundles
    // ---

    async fn delete_bundles(&mut self, parent: BundleParent) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM inboundbundles WHERE inbound_id IS NOT DISTINCT FROM $1 AND lot_id IS NOT DISTINCT FROM $2",
        )
        .bind(parent.inbound_id())
        .bind(parent.lot_id())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_bundles(&mut self, parent: BundleParent, bundles: &[NewBundle]) -> Result<Vec<Bundle>, AppError> {
        let mut inserted = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let row = sqlx::query_as::<_, Bundle>(
                r#"
                INSERT INTO inboundbundles (inbound_id, lot_id, bundle_no, weight, melt_no)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(parent.inbound_id())
            .bind(parent.lot_id())
            .bind(bundle.bundle_no)
            .bind(bundle.weight)
            .bind(bundle.melt_no.as_deref())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => AppError::Conflict(format!(
                    "Bundle {} repetido em {}",
                    bundle.bundle_no,
                    parent.label()
                )),
                None => e.into(),
            })?;
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn list_bundles(&mut self, parent: BundleParent) -> Result<Vec<Bundle>, AppError> {
        let bundles = sqlx::query_as::<_, Bundle>(
            r#"
            SELECT * FROM inboundbundles
            WHERE inbound_id IS NOT DISTINCT FROM $1 AND lot_id IS NOT DISTINCT FROM $2
            ORDER BY bundle_no
            "#,
        )
        .bind(parent.inbound_id())
        .bind(parent.lot_id())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(bundles)
    }

    async fn upsert_repack_bundle(&mut self, inbound_id: i64, bundle: &NewBundle) -> Result<Bundle, AppError> {
        let row = sqlx::query_as::<_, Bundle>(
            r#"
            INSERT INTO inboundbundles (inbound_id, bundle_no, weight, melt_no, is_repacked)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (inbound_id, bundle_no) WHERE inbound_id IS NOT NULL
            DO UPDATE SET weight = EXCLUDED.weight, melt_no = EXCLUDED.melt_no, is_repacked = TRUE
            RETURNING *
            "#,
        )
        .bind(inbound_id)
        .bind(bundle.bundle_no)
        .bind(bundle.weight)
        .bind(bundle.melt_no.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn replace_bundle_pieces(&mut self, bundle_id: i64, pieces: &[NewPiece]) -> Result<Vec<BundlePiece>, AppError> {
        sqlx::query("DELETE FROM bundlepieces WHERE bundle_id = $1")
            .bind(bundle_id)
            .execute(&mut *self.tx)
            .await?;

        let mut inserted = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let row = sqlx::query_as::<_, BundlePiece>(
                "INSERT INTO bundlepieces (bundle_id, piece_no, weight) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(bundle_id)
            .bind(piece.piece_no)
            .bind(piece.weight)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => AppError::Conflict(format!("Peça {} repetida no bundle {}", piece.piece_no, bundle_id)),
                None => e.into(),
            })?;
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn set_bundle_photos(&mut self, bundle_id: i64, before: Option<&str>, after: Option<&str>) -> Result<Bundle, AppError> {
        sqlx::query_as::<_, Bundle>(
            r#"
            UPDATE inboundbundles
            SET before_photo = COALESCE($2, before_photo),
                after_photo = COALESCE($3, after_photo)
            WHERE bundle_id = $1
            RETURNING *
            "#,
        )
        .bind(bundle_id)
        .bind(before)
        .bind(after)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("bundle {bundle_id}")))
    }

    async fn mark_bundles_outbounded(&mut self, inbound_ids: &[i64]) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE inboundbundles SET is_outbounded = TRUE WHERE inbound_id = ANY($1)")
            .bind(inbound_ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Relatórios
    // ---

    async fn insert_report(&mut self, lot_id: i64, kind: ReportKind, reported_by: i64) -> Result<Report, AppError> {
        let sql = format!(
            "INSERT INTO {} (lot_id, reported_by) VALUES ($1, $2) RETURNING {}",
            kind.table_name(),
            report_columns(kind)
        );
        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(lot_id)
            .bind(reported_by)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(report)
    }

    async fn find_open_report(&mut self, lot_id: i64, kind: ReportKind) -> Result<Option<Report>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM {}
            WHERE lot_id = $1 AND status = 'pending'
            ORDER BY reported_at DESC, report_id DESC
            LIMIT 1
            "#,
            report_columns(kind),
            kind.table_name()
        );
        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(lot_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(report)
    }

    async fn close_report(&mut self, report_id: i64, kind: ReportKind, status: ReportStatus, resolved_by: i64) -> Result<Report, AppError> {
        let sql = format!(
            r#"
            UPDATE {}
            SET status = $2, resolved_by = $3, resolved_at = NOW()
            WHERE report_id = $1
            RETURNING {}
            "#,
            kind.table_name(),
            report_columns(kind)
        );
        sqlx::query_as::<_, Report>(&sql)
            .bind(report_id)
            .bind(status)
            .bind(resolved_by)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("relatório {report_id}")))
    }

    // ---
    // Saída
    // ---

    async fn insert_schedule_outbound(&mut self, user_id: i64, release_date: NaiveDate, lorry_no: Option<&str>) -> Result<ScheduleOutbound, AppError> {
        let schedule = sqlx::query_as::<_, ScheduleOutbound>(
            "INSERT INTO scheduleoutbounds (user_id, release_date, lorry_no) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(release_date)
        .bind(lorry_no)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(schedule)
    }

    async fn find_schedule_outbound(&mut self, schedule_outbound_id: i64) -> Result<Option<ScheduleOutbound>, AppError> {
        let schedule = sqlx::query_as::<_, ScheduleOutbound>(
            "SELECT * FROM scheduleoutbounds WHERE schedule_outbound_id = $1",
        )
        .bind(schedule_outbound_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(schedule)
    }

    async fn find_active_selection(&mut self, inbound_id: i64) -> Result<Option<SelectedInbound>, AppError> {
        let selected = sqlx::query_as::<_, SelectedInbound>(
            "SELECT * FROM selectedinbounds WHERE inbound_id = $1 AND NOT is_outbounded",
        )
        .bind(inbound_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(selected)
    }

    async fn insert_selected_inbound(&mut self, schedule_outbound_id: i64, inbound_id: i64) -> Result<SelectedInbound, AppError> {
        sqlx::query_as::<_, SelectedInbound>(
            "INSERT INTO selectedinbounds (schedule_outbound_id, inbound_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(schedule_outbound_id)
        .bind(inbound_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Conflict(format!("Inbound {inbound_id} já está em um agendamento ativo")),
            None => e.into(),
        })
    }

    async fn mark_selected_outbounded(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<SelectedInbound>, AppError> {
        let updated = sqlx::query_as::<_, SelectedInbound>(
            r#"
            UPDATE selectedinbounds
            SET is_outbounded = TRUE
            WHERE schedule_outbound_id = $1
              AND selected_inbound_id = ANY($2)
              AND NOT is_outbounded
            RETURNING *
            "#,
        )
        .bind(schedule_outbound_id)
        .bind(selected_inbound_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(updated)
    }

    async fn list_release_lines(&mut self, schedule_outbound_id: i64, selected_inbound_ids: &[i64]) -> Result<Vec<ReleaseLine>, AppError> {
        let lines = sqlx::query_as::<_, ReleaseLine>(
            r#"
            SELECT
                si.selected_inbound_id, i.inbound_id, i.job_no, i.lot_no, i.ex_warehouse_lot,
                c.commodity_name AS commodity, b.brand_name AS brand, sh.shape_name AS shape,
                i.no_of_bundle, i.net_weight, i.gross_weight, i.actual_weight
            FROM selectedinbounds si
            JOIN inbounds i ON i.inbound_id = si.inbound_id
            JOIN commodities c ON c.commodity_id = i.commodity_id
            JOIN brands b ON b.brand_id = i.brand_id
            JOIN shapes sh ON sh.shape_id = i.shape_id
            WHERE si.schedule_outbound_id = $1 AND si.selected_inbound_id = ANY($2)
            ORDER BY i.job_no, i.lot_no
            "#,
        )
        .bind(schedule_outbound_id)
        .bind(selected_inbound_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(lines)
    }

    async fn list_grns_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, AppError> {
        let grns = sqlx::query_scalar::<_, String>("SELECT grn_no FROM outbounds WHERE starts_with(grn_no, $1)")
            .bind(prefix)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(grns)
    }

    async fn insert_outbound(&mut self, outbound: &NewOutbound) -> Result<Outbound, AppError> {
        sqlx::query_as::<_, Outbound>(
            r#"
            INSERT INTO outbounds (schedule_outbound_id, grn_no, release_date, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(outbound.schedule_outbound_id)
        .bind(&outbound.grn_no)
        .bind(outbound.release_date)
        .bind(outbound.created_by)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) if constraint.contains("grn_no") => AppError::DuplicateGrn(outbound.grn_no.clone()),
            _ => e.into(),
        })
    }

    async fn find_outbound(&mut self, outbound_id: i64) -> Result<Option<Outbound>, AppError> {
        let outbound = sqlx::query_as::<_, Outbound>("SELECT * FROM outbounds WHERE outbound_id = $1")
            .bind(outbound_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(outbound)
    }

    async fn insert_outbound_transaction(&mut self, outbound_id: i64, line: &ReleaseLine) -> Result<OutboundTransaction, AppError> {
        let transaction = sqlx::query_as::<_, OutboundTransaction>(
            r#"
            INSERT INTO outboundtransactions (
                outbound_id, inbound_id, job_no, lot_no, ex_warehouse_lot,
                commodity, brand, shape, no_of_bundle, net_weight, gross_weight, actual_weight
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(outbound_id)
        .bind(line.inbound_id)
        .bind(&line.job_no)
        .bind(line.lot_no)
        .bind(line.ex_warehouse_lot.as_deref())
        .bind(&line.commodity)
        .bind(&line.brand)
        .bind(&line.shape)
        .bind(line.no_of_bundle)
        .bind(line.net_weight)
        .bind(line.gross_weight)
        .bind(line.actual_weight)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(transaction)
    }

    async fn list_outbound_transactions(&mut self, outbound_id: i64) -> Result<Vec<OutboundTransaction>, AppError> {
        let transactions = sqlx::query_as::<_, OutboundTransaction>(
            "SELECT * FROM outboundtransactions WHERE outbound_id = $1 ORDER BY job_no, lot_no",
        )
        .bind(outbound_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(transactions)
    }

    async fn set_outbound_document(&mut self, outbound_id: i64, meta: &DocumentMeta) -> Result<Outbound, AppError> {
        sqlx::query_as::<_, Outbound>(
            r#"
            UPDATE outbounds
            SET file_path = $2,
                file_size = $3,
                driver_signature = COALESCE($4, driver_signature),
                warehouse_signature = COALESCE($5, warehouse_signature),
                updated_at = NOW()
            WHERE outbound_id = $1
            RETURNING *
            "#,
        )
        .bind(outbound_id)
        .bind(&meta.file_path)
        .bind(meta.file_size)
        .bind(meta.driver_signature.as_deref())
        .bind(meta.warehouse_signature.as_deref())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("outbound {outbound_id}")))
    }
}
