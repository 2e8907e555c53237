//! Shared handler state. Everything here is built at startup and read-only afterwards.

use crate::auth::{Authorizer, SessionPolicy};
use crate::service::CrudResource;
use serde::Serialize;
use std::sync::Arc;

/// One resource's engine; each bound resource gets its own router state.
#[derive(Clone)]
pub struct ResourceState {
    pub name: Arc<str>,
    pub engine: Arc<dyn CrudResource>,
}

#[derive(Clone)]
pub struct AuthState {
    pub authorizer: Arc<dyn Authorizer>,
    pub session: Arc<dyn SessionPolicy>,
    pub login_redirect: Arc<str>,
    pub logout_redirect: Arc<str>,
}

/// Front-end field hints for every mounted resource.
#[derive(Clone, Debug, Serialize)]
pub struct SchemaDescription {
    pub title: Option<String>,
    pub resources: Vec<ResourceDescription>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResourceDescription {
    pub name: String,
    pub primary_key: String,
    pub fields: Vec<crate::schema::FieldDescriptor>,
}
