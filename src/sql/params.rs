//! Typed bind values for document queries.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a positional placeholder. JSON values bind as JSONB so they compare
/// against `doc -> 'field'` with JSONB semantics.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Json(Value),
    Text(String),
    Uuid(uuid::Uuid),
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            BindValue::Json(v) => query.bind(v),
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Uuid(u) => query.bind(*u),
        };
    }
    query
}
