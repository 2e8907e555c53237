//! REST admin: schema-described resources over document collections, exposed as CRUD
//! endpoints with paging, sorting and filtering, plus token login/logout.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod resource;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use admin::Admin;
pub use auth::{Authorizer, CookieSession, Credentials, Identity, SessionPolicy, StaticAuthorizer};
pub use config::{load_config, parse_config, resolve, AdminConfig, Settings};
pub use error::{AppError, ConfigError, StoreError};
pub use resource::{Action, Resource, Route};
pub use routes::common_routes;
pub use schema::{FieldKind, FieldSpec, Schema};
pub use service::CrudResource;
pub use store::{ensure_database_exists, Collection, Document, MemoryCollection, PgCollection};
