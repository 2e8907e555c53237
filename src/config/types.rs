//! Raw config types matching the admin JSON document.

use serde::{Deserialize, Serialize};

fn default_mount_prefix() -> String {
    "/admin".into()
}

fn default_redirect() -> String {
    "/".into()
}

fn default_primary_key() -> String {
    "id".into()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    #[serde(default = "default_redirect")]
    pub login_redirect: String,
    #[serde(default = "default_redirect")]
    pub logout_redirect: String,
    pub resources: Vec<ResourceConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    /// Backing collection; defaults to the resource name.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub default_sort_field: Option<String>,
    #[serde(default)]
    pub disable: Vec<String>,
    #[serde(default)]
    pub enable: Vec<ActionOverride>,
    pub fields: Vec<FieldConfig>,
}

impl ResourceConfig {
    pub fn collection_name(&self) -> &str {
        self.collection.as_deref().unwrap_or(&self.name)
    }
}

/// Route override for one action, e.g. `{"action": "update", "method": "PATCH", "path": "/{id}"}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionOverride {
    pub action: String,
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
}
