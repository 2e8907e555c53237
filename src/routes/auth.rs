//! Login/logout routes.

use crate::handlers::auth::{logout, token};
use crate::state::AuthState;
use axum::{routing::delete, routing::post, Router};

pub fn auth_routes(token_path: &str, logout_path: &str, state: AuthState) -> Router {
    Router::new()
        .route(token_path, post(token))
        .route(logout_path, delete(logout))
        .with_state(state)
}
