//! Field declarations and their front-end type hints.

use chrono::{DateTime, SecondsFormat};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Declared type of a field. `Other` keeps unrecognized config type names around; it
/// validates nothing and is hinted as a plain string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Bool,
    String,
    Float,
    Email,
    Url,
    Enum,
    DateTime,
    Json,
    Other(String),
}

impl FieldKind {
    /// Parse a config type name. Never fails.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "int" | "integer" => FieldKind::Int,
            "bool" | "boolean" => FieldKind::Bool,
            "string" | "str" | "text" => FieldKind::String,
            "float" | "number" => FieldKind::Float,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "enum" | "choice" => FieldKind::Enum,
            "datetime" => FieldKind::DateTime,
            "json" | "object" | "list" => FieldKind::Json,
            _ => FieldKind::Other(name.to_string()),
        }
    }

    /// UI type hint used by admin front-ends.
    pub fn ui_type(&self) -> &'static str {
        match self {
            FieldKind::Int => "number",
            FieldKind::String | FieldKind::Url => "string",
            FieldKind::Email => "email",
            FieldKind::Float => "float",
            FieldKind::Enum => "choice",
            FieldKind::Json => "json",
            FieldKind::Bool => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Other(_) => "string",
        }
    }

    /// Fields the `q` text search looks at.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::String | FieldKind::Email | FieldKind::Url | FieldKind::Enum
        )
    }

    /// Convert a query literal into the stored representation for this kind.
    /// Strings are accepted for numbers and booleans since query literals often arrive quoted.
    pub fn coerce_literal(&self, v: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Int => match v {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(v.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                    _ => Err("value is not an integer".into()),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| "value can't be converted to int".into()),
                _ => Err("value is not an integer".into()),
            },
            FieldKind::Float => match v {
                Value::Number(_) => Ok(v.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| "value can't be converted to float".into()),
                _ => Err("value is not float".into()),
            },
            FieldKind::Bool => match v {
                Value::Bool(_) => Ok(v.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err("value should be True or False".into()),
            },
            FieldKind::DateTime => match v {
                Value::String(s) => normalize_datetime(s)
                    .map(Value::String)
                    .ok_or_else(|| "value is not a valid RFC 3339 datetime".into()),
                _ => Err("value is not a string".into()),
            },
            FieldKind::String | FieldKind::Email | FieldKind::Url | FieldKind::Enum => match v {
                Value::String(_) => Ok(v.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err("value is not a string".into()),
            },
            FieldKind::Json | FieldKind::Other(_) => Ok(v.clone()),
        }
    }
}

/// Parse an RFC 3339 timestamp and render it back in UTC with a fixed-width fraction,
/// so stored values compare as strings in time order.
pub fn normalize_datetime(s: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&chrono::Utc).to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[derive(Clone, Debug, Default)]
pub struct Constraints {
    pub required: bool,
    pub nullable: bool,
    pub choices: Vec<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<Regex>,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub constraints: Constraints,
}

impl FieldSpec {
    /// Required, non-nullable field without further constraints.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.into(),
            kind,
            constraints: Constraints {
                required: true,
                ..Constraints::default()
            },
        }
    }

    pub fn optional(mut self) -> Self {
        self.constraints.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.constraints.nullable = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.constraints.min_length = min;
        self.constraints.max_length = max;
        self
    }

    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.constraints.minimum = minimum;
        self.constraints.maximum = maximum;
        self
    }
}

/// `(name, uiType, extra)` triple handed to admin front-ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ui_type: &'static str,
    pub extra: Option<Value>,
}

pub fn describe_field(field: &FieldSpec) -> FieldDescriptor {
    let extra = match field.kind {
        FieldKind::Enum => Some(serde_json::json!({ "choices": field.constraints.choices })),
        _ => None,
    };
    FieldDescriptor {
        name: field.name.clone(),
        ui_type: field.kind.ui_type(),
        extra,
    }
}
