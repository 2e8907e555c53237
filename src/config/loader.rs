//! Load the admin config document and resolve it into runtime resources.

use crate::config::types::*;
use crate::config::{parse_method, validate};
use crate::error::ConfigError;
use crate::resource::{Action, Resource};
use crate::schema::{Constraints, FieldKind, FieldSpec, Schema};
use crate::store::Collection;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

pub fn parse_config(doc: &str) -> Result<AdminConfig, ConfigError> {
    serde_json::from_str(doc).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and validate the JSON document at `path`.
pub async fn load_config(path: impl AsRef<Path>) -> Result<AdminConfig, ConfigError> {
    let path = path.as_ref();
    let doc = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = parse_config(&doc)?;
    validate(&config)?;
    tracing::info!(path = %path.display(), resources = config.resources.len(), "admin config loaded");
    Ok(config)
}

pub fn field_spec(f: &FieldConfig) -> Result<FieldSpec, ConfigError> {
    let pattern = f
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| ConfigError::Validation(format!("{}: bad pattern: {}", f.name, e)))?;
    Ok(FieldSpec {
        name: f.name.clone(),
        kind: FieldKind::from_name(&f.type_),
        constraints: Constraints {
            required: f.required,
            nullable: f.nullable,
            choices: f.choices.clone(),
            min_length: f.min_length,
            max_length: f.max_length,
            minimum: f.minimum,
            maximum: f.maximum,
            pattern,
        },
    })
}

/// Build resources from a config (validated here). `open` supplies each resource's
/// collection; its primary key must match the configured one.
pub fn resolve<F>(config: &AdminConfig, mut open: F) -> Result<Vec<Resource>, ConfigError>
where
    F: FnMut(&ResourceConfig) -> Arc<dyn Collection>,
{
    validate(config)?;
    let mut out = Vec::with_capacity(config.resources.len());
    for rc in &config.resources {
        let fields = rc.fields.iter().map(field_spec).collect::<Result<Vec<_>, _>>()?;
        let mut schema = Schema::new(fields)?;
        if let Some(title) = &config.title {
            schema = schema.with_title(title.clone());
        }

        let collection = open(rc);
        if collection.primary_key() != rc.primary_key {
            return Err(ConfigError::Validation(format!(
                "{}: collection primary key '{}' does not match '{}'",
                rc.name,
                collection.primary_key(),
                rc.primary_key
            )));
        }

        let mut resource = Resource::new(rc.name.clone(), collection, schema)?;
        if let Some(sort) = &rc.default_sort_field {
            resource = resource.with_default_sort_field(sort.clone());
        }
        for a in &rc.disable {
            resource = resource.disable(Action::parse(a)?);
        }
        for o in &rc.enable {
            resource = resource.enable(Action::parse(&o.action)?, parse_method(&o.method)?, o.path.clone());
        }
        out.push(resource);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCollection;
    use axum::http::Method;

    const DOC: &str = r#"{
        "title": "Blog",
        "resources": [
            {
                "name": "user",
                "default_sort_field": "username",
                "disable": ["delete"],
                "enable": [{"action": "update", "method": "PATCH", "path": "/{id}"}],
                "fields": [
                    {"name": "username", "type": "string", "max_length": 20, "pattern": "^[a-z]+$"},
                    {"name": "role", "type": "enum", "choices": ["admin", "user"], "required": false}
                ]
            },
            {"name": "follower", "collection": "followers", "fields": []}
        ]
    }"#;

    #[test]
    fn defaults_are_filled_in() {
        let c = parse_config(DOC).unwrap();
        assert_eq!(c.mount_prefix, "/admin");
        assert_eq!(c.login_redirect, "/");
        assert_eq!(c.resources[0].primary_key, "id");
        assert_eq!(c.resources[0].collection_name(), "user");
        assert_eq!(c.resources[1].collection_name(), "followers");
        assert!(c.resources[0].fields[0].required);
        assert!(!c.resources[0].fields[1].required);
    }

    #[test]
    fn resolves_resources_with_overrides() {
        let c = parse_config(DOC).unwrap();
        let mut opened = Vec::new();
        let resources = resolve(&c, |rc| {
            opened.push(rc.collection_name().to_string());
            Arc::new(MemoryCollection::new(rc.collection_name())) as Arc<dyn Collection>
        })
        .unwrap();
        assert_eq!(opened, ["user", "followers"]);

        let user = &resources[0];
        assert_eq!(user.default_sort_field(), "username");
        assert!(!user.actions().contains_key(&Action::Delete));
        assert_eq!(user.actions()[&Action::Update].method, Method::PATCH);
        assert_eq!(user.schema().title.as_deref(), Some("Blog"));
        let username = user.schema().field("username").unwrap();
        assert_eq!(username.constraints.max_length, Some(20));
        assert!(username.constraints.pattern.is_some());
    }

    #[test]
    fn primary_key_must_match_collection() {
        let c = parse_config(DOC).unwrap();
        let err = resolve(&c, |rc| {
            Arc::new(MemoryCollection::new(rc.collection_name()).with_primary_key("_id")) as Arc<dyn Collection>
        })
            .unwrap_err();
        assert!(err.to_string().contains("primary key"));
    }

    #[test]
    fn malformed_document_is_a_load_error() {
        assert!(matches!(parse_config("{"), Err(ConfigError::Load(_))));
        assert!(matches!(parse_config(r#"{"title": "x"}"#), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_config("/nonexistent/admin.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
