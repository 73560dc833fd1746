// src/models/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Discrepancy,
    Duplicate,
}

impl ReportKind {
    /// Cada tipo de relatório tem a sua própria tabela.
    pub fn table_name(self) -> &'static str {
        match self {
            ReportKind::Discrepancy => "lot_reports",
            ReportKind::Duplicate => "lot_duplicate",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Discrepancy => "discrepancy",
            ReportKind::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportDecision {
    Accepted,
    Declined,
}

impl From<ReportDecision> for ReportStatus {
    fn from(decision: ReportDecision) -> Self {
        match decision {
            ReportDecision::Accepted => ReportStatus::Accepted,
            ReportDecision::Declined => ReportStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: i64,
    pub lot_id: i64,
    pub kind: ReportKind,
    pub status: ReportStatus,
    pub reported_by: i64,
    pub reported_at: DateTime<Utc>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub lot_id: i64,
    pub kind: ReportKind,
    pub decision: ReportDecision,
}
