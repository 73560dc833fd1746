// src/models/task.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::common::filter::{Operator, TaskColumn, TaskFilter};
use crate::models::lot::LotStatus;

/// Linha da lista de tarefas (lote + data do agendamento).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboundTask {
    pub lot_id: i64,
    pub schedule_inbound_id: i64,
    pub inbound_date: NaiveDate,
    pub scheduled_by: i64,
    pub job_no: String,
    pub lot_no: i32,
    pub ex_warehouse_lot: Option<String>,
    pub commodity: String,
    pub brand: String,
    pub shape: String,
    pub inbound_warehouse: String,
    pub expected_bundle_count: i32,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
    pub status: LotStatus,
    pub is_confirm: bool,
    pub report: bool,
    pub report_duplicate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskView {
    /// Escritório: vê tudo
    #[default]
    Office,
    /// Equipe do armazém: só o que ainda falta receber
    Crew,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    #[serde(default)]
    pub view: TaskView,
    pub job_no: Option<String>,
    /// Busca parcial no ex-warehouse lot
    pub search: Option<String>,
    pub status: Option<LotStatus>,
    pub commodity: Option<String>,
    pub brand: Option<String>,
    pub inbound_warehouse: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub reported: Option<bool>,
}

impl TaskQuery {
    pub fn to_filter(&self) -> TaskFilter {
        let status = match self.view {
            TaskView::Crew => Some(LotStatus::Pending),
            TaskView::Office => self.status,
        };

        TaskFilter::new()
            .with_opt(TaskColumn::Status, Operator::Eq, status.map(|s| s.as_str().to_string()))
            .with_opt(TaskColumn::JobNo, Operator::Eq, non_blank(&self.job_no))
            .with_opt(TaskColumn::ExWarehouseLot, Operator::Contains, non_blank(&self.search))
            .with_opt(TaskColumn::Commodity, Operator::Eq, non_blank(&self.commodity))
            .with_opt(TaskColumn::Brand, Operator::Eq, non_blank(&self.brand))
            .with_opt(TaskColumn::InboundWarehouse, Operator::Eq, non_blank(&self.inbound_warehouse))
            .with_opt(TaskColumn::InboundDate, Operator::Gte, self.from_date)
            .with_opt(TaskColumn::InboundDate, Operator::Lte, self.to_date)
            .with_opt(TaskColumn::Report, Operator::Eq, self.reported)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crew_view_only_sees_pending_lots() {
        let query = TaskQuery {
            view: TaskView::Crew,
            status: Some(LotStatus::Received),
            ..Default::default()
        };
        let (sql, _) = query.to_filter().to_sql(1);
        assert_eq!(sql, " WHERE l.status::text = $1");
    }

    #[test]
    fn blank_fields_are_ignored() {
        let query = TaskQuery {
            job_no: Some("   ".into()),
            search: Some("".into()),
            ..Default::default()
        };
        assert!(query.to_filter().is_empty());
    }
}
