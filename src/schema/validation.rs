//! Write-schema validation for create and update payloads.

use crate::error::AppError;
use crate::schema::{normalize_datetime, FieldKind, FieldSpec, Schema};
use crate::store::Document;
use serde_json::{Map, Value};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const INVALID_PAYLOAD: &str = "Invalid json payload";

pub struct PayloadValidator;

impl PayloadValidator {
    /// Decode a raw request body into a JSON object.
    pub fn parse(raw: &[u8]) -> Result<Map<String, Value>, AppError> {
        let text = std::str::from_utf8(raw).map_err(|_| AppError::validation("Payload is not json serialisable"))?;
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(m)) => Ok(m),
            Ok(_) => Err(AppError::validation("Payload must be a json object")),
            Err(_) => Err(AppError::validation("Payload is not json serialisable")),
        }
    }

    /// Full write-schema check (create). All required fields must be present.
    pub fn validate(
        body: Map<String, Value>,
        schema: &Schema,
        primary_key: &str,
    ) -> Result<Document, AppError> {
        check(body, schema, primary_key, true)
    }

    /// Validate only the fields present in body (update). Required is not enforced for missing fields.
    pub fn validate_partial(
        body: Map<String, Value>,
        schema: &Schema,
        primary_key: &str,
    ) -> Result<Document, AppError> {
        check(body, schema, primary_key, false)
    }
}

fn check(
    body: Map<String, Value>,
    schema: &Schema,
    primary_key: &str,
    enforce_required: bool,
) -> Result<Document, AppError> {
    let mut errors: BTreeMap<String, String> = BTreeMap::new();
    let mut out = Document::new();

    for (key, v) in body {
        let field = schema.field(&key).filter(|f| f.name != primary_key);
        let Some(field) = field else {
            errors.insert(key.clone(), format!("{} is not allowed key", key));
            continue;
        };
        match validate_field(field, &v) {
            Ok(normalized) => {
                out.insert(key, normalized);
            }
            Err(msg) => {
                errors.insert(key, msg);
            }
        }
    }

    if enforce_required {
        for f in schema.fields() {
            if f.name == primary_key || !f.constraints.required {
                continue;
            }
            if !out.contains_key(&f.name) && !errors.contains_key(&f.name) {
                errors.insert(f.name.clone(), "is required".into());
            }
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        let details: Map<String, Value> = errors.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        Err(AppError::validation_with(INVALID_PAYLOAD, Value::Object(details)))
    }
}

fn format_matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, s: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    format_matches(&EMAIL, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$", s)
}

fn is_url(s: &str) -> bool {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    format_matches(&URL, r"^https?://[^\s/$.?#][^\s]*$", s)
}

/// Check one value and return its stored form.
fn validate_field(field: &FieldSpec, v: &Value) -> Result<Value, String> {
    let c = &field.constraints;
    if v.is_null() {
        return if c.nullable {
            Ok(Value::Null)
        } else {
            Err("value is null".into())
        };
    }
    let value = match &field.kind {
        FieldKind::Int => match v {
            Value::Number(n) if n.is_i64() || n.is_u64() => v.clone(),
            _ => return Err("value is not an integer".into()),
        },
        FieldKind::Float => match v {
            Value::Number(_) => v.clone(),
            _ => return Err("value is not float".into()),
        },
        FieldKind::Bool => match v {
            Value::Bool(_) => v.clone(),
            _ => return Err("value should be True or False".into()),
        },
        FieldKind::String => match v {
            Value::String(_) => v.clone(),
            _ => return Err("value is not a string".into()),
        },
        FieldKind::Email => match v.as_str() {
            Some(s) if is_email(s) => v.clone(),
            _ => return Err("value is not a valid email address".into()),
        },
        FieldKind::Url => match v.as_str() {
            Some(s) if is_url(s) => v.clone(),
            _ => return Err("value is not URL".into()),
        },
        FieldKind::Enum => match v.as_str() {
            Some(s) if c.choices.iter().any(|choice| choice == s) => v.clone(),
            _ => {
                return Err(format!(
                    "value doesn't match any variant: {}",
                    c.choices.join(", ")
                ))
            }
        },
        FieldKind::DateTime => match v.as_str().and_then(normalize_datetime) {
            Some(s) => Value::String(s),
            None => return Err("value is not a valid RFC 3339 datetime".into()),
        },
        FieldKind::Json => match v {
            Value::Object(_) | Value::Array(_) => v.clone(),
            _ => return Err("value is not an object or a list".into()),
        },
        FieldKind::Other(_) => v.clone(),
    };

    if let Some(s) = value.as_str() {
        let len = s.chars().count();
        if let Some(min) = c.min_length {
            if len < min {
                return Err(format!("String is shorter than {} characters", min));
            }
        }
        if let Some(max) = c.max_length {
            if len > max {
                return Err(format!("String is longer than {} characters", max));
            }
        }
        if let Some(re) = &c.pattern {
            if !re.is_match(s) {
                return Err("does not match pattern".into());
            }
        }
    }
    if let Some(n) = value.as_f64() {
        if let Some(min) = c.minimum {
            if n < min {
                return Err(format!("value is less than {}", min));
            }
        }
        if let Some(max) = c.maximum {
            if n > max {
                return Err(format!("value is greater than {}", max));
            }
        }
    }
    Ok(value)
}
