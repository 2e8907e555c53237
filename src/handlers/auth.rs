//! Login and logout.

use crate::auth::Credentials;
use crate::error::AppError;
use crate::response::location;
use crate::schema::PayloadValidator;
use crate::state::AuthState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

/// `{username: string, password: string}` and nothing else.
fn login_form(body: Map<String, Value>) -> Result<Credentials, AppError> {
    let mut errors = Map::new();
    let mut take = |key: &str| match body.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.insert(key.to_string(), Value::String("value is not a string".into()));
            None
        }
        None => {
            errors.insert(key.to_string(), Value::String("is required".into()));
            None
        }
    };
    let username = take("username");
    let password = take("password");
    for key in body.keys().filter(|k| *k != "username" && *k != "password") {
        errors.insert(key.clone(), Value::String(format!("{} is not allowed key", key)));
    }
    match (username, password) {
        (Some(username), Some(password)) if errors.is_empty() => Ok(Credentials { username, password }),
        _ => Err(AppError::validation_with("Invalid json payload", Value::Object(errors))),
    }
}

pub async fn token(State(state): State<AuthState>, body: Bytes) -> Result<impl IntoResponse, AppError> {
    let credentials = login_form(PayloadValidator::parse(&body)?)?;
    let identity = state.authorizer.authorize(&credentials).await?;
    let mut headers = HeaderMap::new();
    state.session.remember(&mut headers, &identity);
    tracing::info!(username = %identity.username, "login");
    Ok((headers, Json(location(&state.login_redirect))))
}

/// Requires an `Authorization` header even when a session cookie is present.
pub async fn logout(State(state): State<AuthState>, request_headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    if !request_headers.contains_key(header::AUTHORIZATION) {
        return Err(AppError::validation("auth header missing"));
    }
    let mut headers = HeaderMap::new();
    state.session.forget(&mut headers);
    Ok((headers, Json(location(&state.logout_redirect))))
}
