//! Config validation: names, field declarations and action overrides.

use crate::config::{AdminConfig, ResourceConfig};
use crate::error::ConfigError;
use crate::resource::Action;
use crate::schema::FieldKind;
use axum::http::Method;
use axum::routing::MethodFilter;
use regex::Regex;
use std::collections::HashSet;

pub fn validate(config: &AdminConfig) -> Result<(), ConfigError> {
    if config.resources.is_empty() {
        return Err(ConfigError::Validation("at least one resource required".into()));
    }
    let mut names = HashSet::new();
    for r in &config.resources {
        if !names.insert(r.name.as_str()) {
            return Err(ConfigError::DuplicateResource(r.name.clone()));
        }
        validate_resource(r)?;
    }
    Ok(())
}

fn validate_resource(r: &ResourceConfig) -> Result<(), ConfigError> {
    if r.name.is_empty() || r.name.contains('/') {
        return Err(ConfigError::Validation(format!("invalid resource name: '{}'", r.name)));
    }

    let mut fields = HashSet::new();
    for f in &r.fields {
        if f.name == r.primary_key || !fields.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                resource: r.name.clone(),
                field: f.name.clone(),
            });
        }
        if FieldKind::from_name(&f.type_) == FieldKind::Enum && f.choices.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}.{}: enum field needs choices",
                r.name, f.name
            )));
        }
        if let Some(p) = &f.pattern {
            Regex::new(p).map_err(|e| {
                ConfigError::Validation(format!("{}.{}: bad pattern: {}", r.name, f.name, e))
            })?;
        }
    }

    if let Some(sort) = &r.default_sort_field {
        if *sort != r.primary_key && !fields.contains(sort.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: default_sort_field '{}' is not a field",
                r.name, sort
            )));
        }
    }

    for a in &r.disable {
        Action::parse(a)?;
    }
    for o in &r.enable {
        Action::parse(&o.action)?;
        parse_method(&o.method)?;
        if !o.path.is_empty() && !o.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{}: action path must start with '/': {}",
                r.name, o.path
            )));
        }
    }
    Ok(())
}

/// Standard HTTP methods only; extension methods cannot be routed.
pub fn parse_method(s: &str) -> Result<Method, ConfigError> {
    let invalid = || ConfigError::Validation(format!("invalid HTTP method: {}", s));
    let method = Method::from_bytes(s.to_uppercase().as_bytes()).map_err(|_| invalid())?;
    MethodFilter::try_from(method.clone()).map_err(|_| invalid())?;
    Ok(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn check(doc: &str) -> Result<(), ConfigError> {
        validate(&parse_config(doc)?)
    }

    #[test]
    fn accepts_minimal_config() {
        check(r#"{"resources": [{"name": "user", "fields": [{"name": "username", "type": "string"}]}]}"#).unwrap();
    }

    #[test]
    fn rejects_empty_and_duplicate_resources() {
        assert!(matches!(check(r#"{"resources": []}"#), Err(ConfigError::Validation(_))));
        let dup = r#"{"resources": [{"name": "a", "fields": []}, {"name": "a", "fields": []}]}"#;
        assert!(matches!(check(dup), Err(ConfigError::DuplicateResource(n)) if n == "a"));
    }

    #[test]
    fn rejects_bad_fields() {
        let pk = r#"{"resources": [{"name": "a", "fields": [{"name": "id", "type": "string"}]}]}"#;
        assert!(matches!(check(pk), Err(ConfigError::DuplicateField { .. })));
        let choices = r#"{"resources": [{"name": "a", "fields": [{"name": "s", "type": "enum"}]}]}"#;
        assert!(check(choices).unwrap_err().to_string().contains("needs choices"));
        let pattern = r#"{"resources": [{"name": "a", "fields": [{"name": "s", "type": "string", "pattern": "("}]}]}"#;
        assert!(check(pattern).unwrap_err().to_string().contains("bad pattern"));
    }

    #[test]
    fn rejects_bad_actions() {
        let action = r#"{"resources": [{"name": "a", "fields": [], "disable": ["bulk"]}]}"#;
        assert!(matches!(check(action), Err(ConfigError::UnknownAction(_))));
        let sort = r#"{"resources": [{"name": "a", "fields": [], "default_sort_field": "zz"}]}"#;
        assert!(check(sort).is_err());
        let ok = r#"{"resources": [{"name": "a", "fields": [], "enable": [{"action": "update", "method": "patch", "path": "/{id}"}]}]}"#;
        check(ok).unwrap();
        let method = r#"{"resources": [{"name": "a", "fields": [], "enable": [{"action": "update", "method": "BREW", "path": "/{id}"}]}]}"#;
        assert!(check(method).unwrap_err().to_string().contains("invalid HTTP method"));
    }
}
