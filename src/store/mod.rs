//! Document collections: the narrow storage capability the resource engine runs against.

mod memory;
mod postgres;

pub use memory::MemoryCollection;
pub use postgres::{ensure_database_exists, PgCollection};

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque stored entity. Only the primary key field is assumed.
pub type Document = Map<String, Value>;

/// Single-field condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    In(Vec<Value>),
    /// Case-insensitive substring match on the string form.
    Like(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub condition: Condition,
}

/// Case-insensitive substring match against any of `fields`.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSearch {
    pub fields: Vec<String>,
    pub needle: String,
}

/// Query object understood by every collection: all predicates and the text search
/// must hold. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
    pub text: Option<TextSearch>,
}

impl Filter {
    pub fn by_key(primary_key: &str, id: Value) -> Self {
        Filter::default().and(primary_key, Condition::Eq(id))
    }

    pub fn and(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            condition,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.text.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ASC" => Some(SortDir::Asc),
            "DESC" => Some(SortDir::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    /// Fields to return besides the primary key. `None` returns whole documents.
    pub projection: Option<Vec<String>>,
    pub sort: Option<(String, SortDir)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Capabilities a storage backend must offer. Mutations are single atomic operations;
/// callers never read-then-write.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Field holding the backend-assigned identifier.
    fn primary_key(&self) -> &str;

    /// Parse a path identifier into the stored identifier value. `None` when malformed.
    fn parse_id(&self, raw: &str) -> Option<Value> {
        uuid::Uuid::parse_str(raw)
            .ok()
            .map(|u| Value::String(u.to_string()))
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Insert and return the generated identifier.
    async fn insert_one(&self, doc: Document) -> Result<Value, StoreError>;

    /// Merge `set` into the first matching document and return it after the update. Never upserts.
    async fn find_one_and_update(&self, filter: &Filter, set: Document) -> Result<Option<Document>, StoreError>;

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError>;
}

/// Keep only the primary key and the projected fields.
pub(crate) fn project(mut doc: Document, primary_key: &str, projection: Option<&[String]>) -> Document {
    if let Some(fields) = projection {
        doc.retain(|k, _| k == primary_key || fields.iter().any(|f| f == k));
    }
    doc
}
