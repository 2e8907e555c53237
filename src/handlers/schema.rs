//! Schema description for admin front-ends.

use crate::state::SchemaDescription;
use axum::{extract::State, Json};
use std::sync::Arc;

pub async fn describe(State(description): State<Arc<SchemaDescription>>) -> Json<SchemaDescription> {
    Json(description.as_ref().clone())
}
