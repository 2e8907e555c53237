//! HTTP handlers for resource CRUD, login/logout and schema description.

pub mod auth;
pub mod resource;
pub mod schema;
