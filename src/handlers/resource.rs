//! Resource CRUD handlers: list, detail, create, update, delete.

use crate::error::AppError;
use crate::response::{deleted, success_many, success_one, success_one_ok};
use crate::schema::PayloadValidator;
use crate::state::ResourceState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

/// Identifier segment of the matched route. A route without one can never find an entity.
fn path_id(params: &HashMap<String, String>) -> Result<&str, AppError> {
    params
        .get("id")
        .map(String::as_str)
        .ok_or_else(|| AppError::entity_not_found(""))
}

pub async fn list(
    State(state): State<ResourceState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let (entities, total) = state.engine.list(&params).await?;
    Ok(success_many(entities, total))
}

pub async fn detail(
    State(state): State<ResourceState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.engine.detail(path_id(&params)?).await?;
    Ok(success_one_ok(entity))
}

pub async fn create(State(state): State<ResourceState>, body: Bytes) -> Result<impl IntoResponse, AppError> {
    let payload = PayloadValidator::parse(&body)?;
    let entity = state.engine.create(payload).await?;
    Ok(success_one(entity))
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = PayloadValidator::parse(&body)?;
    let entity = state.engine.update(path_id(&params)?, payload).await?;
    Ok(success_one_ok(entity))
}

pub async fn delete(
    State(state): State<ResourceState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(&params)?;
    state.engine.delete(id).await?;
    tracing::debug!(resource = %state.name, id = %id, "deleted");
    Ok(deleted())
}
