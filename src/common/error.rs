// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Item rejeitado dentro de um lote (ex.: agendamento de vários lotes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub index: usize,
    pub job_no: String,
    pub lot_no: i32,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Não encontrado: {0}")]
    ResourceNotFound(String),

    // Nome que não existe na tabela de referência. Aborta a transação inteira.
    #[error("Valor '{value}' não encontrado em {table}")]
    LookupNotFound { table: &'static str, value: String },

    #[error("Lote {lot_id} aponta para o agendamento {schedule_inbound_id}, que não existe")]
    MissingSchedule { lot_id: i64, schedule_inbound_id: i64 },

    #[error("{} item(ns) do lote são inválidos", errors.len())]
    PartialBatch { errors: Vec<ItemError>, accepted: Vec<usize> },

    #[error("Inbound {inbound_id} já está no agendamento de saída ativo {schedule_outbound_id}")]
    AlreadySelected { inbound_id: i64, schedule_outbound_id: i64 },

    #[error("GRN '{0}' já existe")]
    DuplicateGrn(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Falha ao gerar documento: {0}")]
    DocumentError(String),

    #[error("Sincronização abortada no job {job_id}: {source}")]
    SyncAborted {
        job_id: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de arquivo: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::ResourceNotFound(what.into())
    }

    /// Código estável para o cliente distinguir conflitos de falhas genéricas.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::ResourceNotFound(_) => "NOT_FOUND",
            AppError::LookupNotFound { .. } => "LOOKUP_NOT_FOUND",
            AppError::MissingSchedule { .. } => "MISSING_SCHEDULE",
            AppError::PartialBatch { .. } => "PARTIAL_BATCH",
            AppError::AlreadySelected { .. } => "ALREADY_SELECTED",
            AppError::DuplicateGrn(_) => "DUPLICATE_GRN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DocumentError(_) => "DOCUMENT_ERROR",
            AppError::SyncAborted { .. } => "SYNC_ABORTED",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::PartialBatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AlreadySelected { .. } | AppError::DuplicateGrn(_) | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::DocumentError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "code": code,
                    "details": details,
                })
            }
            AppError::PartialBatch { ref errors, ref accepted } => json!({
                "error": self.to_string(),
                "code": code,
                "details": errors,
                "accepted": accepted,
            }),
            ref e if status.is_server_error() => {
                // A mensagem detalhada vai para o log; integridade de dados também vai para o cliente.
                tracing::error!("Erro Interno do Servidor: {}", e);
                match e {
                    AppError::DatabaseError(_)
                    | AppError::IoError(_)
                    | AppError::JsonError(_)
                    | AppError::InternalServerError(_) => json!({
                        "error": "Ocorreu um erro inesperado.",
                        "code": code,
                    }),
                    _ => json!({ "error": e.to_string(), "code": code }),
                }
            }
            ref e => json!({ "error": e.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failure_names_the_value() {
        let err = AppError::LookupNotFound {
            table: "commodities",
            value: "Unobtainium".into(),
        };
        assert!(err.to_string().contains("Unobtainium"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn duplicate_grn_is_tagged_as_conflict() {
        let err = AppError::DuplicateGrn("GRN-20250101-0001".into());
        assert_eq!(err.code(), "DUPLICATE_GRN");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn sync_abort_keeps_the_failing_job() {
        let err = AppError::SyncAborted {
            job_id: "job-3".into(),
            source: Box::new(AppError::not_found("inbound 42")),
        };
        let text = err.to_string();
        assert!(text.contains("job-3"));
        assert!(text.contains("inbound 42"));
    }
}
