//! Resource definition: a named collection plus its schema and action table.

use crate::error::ConfigError;
use crate::schema::Schema;
use crate::store::Collection;
use axum::http::Method;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    List,
    Detail,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Detail,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Detail => "detail",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
    }

    /// Method and sub-path every resource starts with.
    pub fn default_route(self) -> Route {
        let (method, path) = match self {
            Action::List => (Method::GET, ""),
            Action::Detail => (Method::GET, "/{id}"),
            Action::Create => (Method::POST, ""),
            Action::Update => (Method::PUT, "/{id}"),
            Action::Delete => (Method::DELETE, "/{id}"),
        };
        Route::new(method, path)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method plus sub-path below the resource's base URL. `{id}` marks the identifier segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Route {
            method,
            path: path.into(),
        }
    }
}

pub fn default_actions() -> BTreeMap<Action, Route> {
    Action::ALL.into_iter().map(|a| (a, a.default_route())).collect()
}

/// A URL-mounted CRUD facade over one collection. Built at startup; the action table can
/// only be changed by value, before the resource is handed to the router binder.
#[derive(Clone)]
pub struct Resource {
    name: String,
    collection: Arc<dyn Collection>,
    schema: Arc<Schema>,
    primary_key: String,
    default_sort_field: String,
    actions: BTreeMap<Action, Route>,
}

impl Resource {
    /// The primary key is the collection's; the schema must not declare it.
    pub fn new(name: impl Into<String>, collection: Arc<dyn Collection>, schema: Schema) -> Result<Self, ConfigError> {
        let name = name.into();
        let primary_key = collection.primary_key().to_string();
        if schema.field(&primary_key).is_some() {
            return Err(ConfigError::DuplicateField {
                resource: name,
                field: primary_key,
            });
        }
        Ok(Resource {
            name,
            default_sort_field: primary_key.clone(),
            primary_key,
            collection,
            schema: Arc::new(schema),
            actions: default_actions(),
        })
    }

    pub fn with_default_sort_field(mut self, field: impl Into<String>) -> Self {
        self.default_sort_field = field.into();
        self
    }

    /// Add or override one action's route.
    pub fn enable(mut self, action: Action, method: Method, path: impl Into<String>) -> Self {
        self.actions.insert(action, Route::new(method, path));
        self
    }

    pub fn disable(mut self, action: Action) -> Self {
        self.actions.remove(&action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &Arc<dyn Collection> {
        &self.collection
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn default_sort_field(&self) -> &str {
        &self.default_sort_field
    }

    pub fn actions(&self) -> &BTreeMap<Action, Route> {
        &self.actions
    }

    /// Columns a list query may sort or filter on: the primary key and every schema field.
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(self.primary_key.as_str())
            .chain(self.schema.names())
            .collect()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("collection", &self.collection.name())
            .field("primary_key", &self.primary_key)
            .field("actions", &self.actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSpec};
    use crate::store::MemoryCollection;

    fn resource() -> Resource {
        let schema = Schema::new(vec![FieldSpec::new("name", FieldKind::String)]).unwrap();
        Resource::new("user", Arc::new(MemoryCollection::new("user")), schema).unwrap()
    }

    #[test]
    fn default_table_has_five_crud_actions() {
        let r = resource();
        let table: Vec<_> = r
            .actions()
            .iter()
            .map(|(a, route)| (a.as_str(), route.method.as_str(), route.path.as_str()))
            .collect();
        assert_eq!(
            table,
            [
                ("list", "GET", ""),
                ("detail", "GET", "/{id}"),
                ("create", "POST", ""),
                ("update", "PUT", "/{id}"),
                ("delete", "DELETE", "/{id}"),
            ]
        );
        assert_eq!(r.default_sort_field(), "id");
        assert_eq!(r.columns(), ["id", "name"]);
    }

    #[test]
    fn enable_and_disable_are_per_resource() {
        let patched = resource()
            .disable(Action::Delete)
            .enable(Action::Update, Method::PATCH, "/{id}");
        assert!(!patched.actions().contains_key(&Action::Delete));
        assert_eq!(patched.actions()[&Action::Update].method, Method::PATCH);
        assert_eq!(resource().actions().len(), 5);
    }

    #[test]
    fn schema_may_not_redeclare_primary_key() {
        let schema = Schema::new(vec![FieldSpec::new("id", FieldKind::String)]).unwrap();
        let err = Resource::new("user", Arc::new(MemoryCollection::new("user")), schema).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn parse_action_names() {
        assert_eq!(Action::parse("detail").unwrap(), Action::Detail);
        assert!(matches!(Action::parse("bulk"), Err(ConfigError::UnknownAction(_))));
    }
}
