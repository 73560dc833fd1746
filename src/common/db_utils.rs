// src/common/db_utils.rs

use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};

use crate::common::filter::FilterValue;

// ---
// Helpers de erro do Postgres
// ---

/// Nome da constraint se o erro for violação de unicidade.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

// ---
// Helper de filtros: vincula os valores na ordem dos placeholders
// ---
pub(crate) fn bind_filter_values<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    values: Vec<FilterValue>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in values {
        query = match value {
            FilterValue::Text(text) => query.bind(text),
            FilterValue::Date(date) => query.bind(date),
            FilterValue::Bool(flag) => query.bind(flag),
        };
    }
    query
}
