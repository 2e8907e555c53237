mod auth;
mod common;
mod resource;

pub use auth::auth_routes;
pub use common::common_routes;
pub use resource::{normalize_prefix, RouterBinder};
