//! Schema model: ordered field declarations used for payload validation and UI hints.

mod field;
mod validation;

pub use field::*;
pub use validation::PayloadValidator;

use crate::error::ConfigError;
use std::collections::HashSet;

/// Ordered set of uniquely named fields. Built once per resource and never mutated.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub title: Option<String>,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!("duplicate field name: {}", f.name)));
            }
        }
        Ok(Schema { title: None, fields })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Field hints in declaration order.
    pub fn describe(&self) -> Vec<FieldDescriptor> {
        self.fields.iter().map(describe_field).collect()
    }

    /// Names of the fields the `q` text search covers.
    pub fn text_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.kind.is_textual())
            .map(|f| f.name.clone())
            .collect()
    }
}
