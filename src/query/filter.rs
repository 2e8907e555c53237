//! Filter compiler: validated filter map to the collection query object.

use crate::error::AppError;
use crate::query::{FilterExpr, FilterValue, Scalar, MULTI_FIELD_TEXT_QUERY};
use crate::schema::{FieldKind, Schema};
use crate::store::{Condition, Filter, TextSearch};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Compile filters conjunctively. Literals are coerced through the field's declared kind;
/// fields outside the schema (the primary key) compare as strings.
pub fn create_filter(
    filters: &BTreeMap<String, FilterValue>,
    schema: &Schema,
    primary_key: &str,
) -> Result<Filter, AppError> {
    let mut filter = Filter::default();
    let mut errors = Map::new();

    for (field, value) in filters {
        if field == MULTI_FIELD_TEXT_QUERY {
            match value {
                FilterValue::Scalar(s) => {
                    filter.text = Some(TextSearch {
                        fields: schema.text_fields(),
                        needle: s.as_text(),
                    });
                }
                FilterValue::Expr(_) => {
                    errors.insert(field.clone(), Value::String("text search expects a plain value".into()));
                }
            }
            continue;
        }

        let kind = match schema.field(field) {
            Some(f) if f.name != primary_key => f.kind.clone(),
            Some(_) => FieldKind::String,
            None if field == primary_key => FieldKind::String,
            None => {
                errors.insert(field.clone(), Value::String("column not present in resource".into()));
                continue;
            }
        };

        match value {
            FilterValue::Scalar(s) => match kind.coerce_literal(&s.to_json()) {
                Ok(v) => filter = filter.and(field.clone(), Condition::Eq(v)),
                Err(msg) => {
                    errors.insert(field.clone(), Value::String(msg));
                }
            },
            FilterValue::Expr(expr) => match compile_expr(expr, &kind) {
                Ok(conditions) => {
                    for c in conditions {
                        filter = filter.and(field.clone(), c);
                    }
                }
                Err(op_errors) => {
                    errors.insert(field.clone(), Value::Object(op_errors));
                }
            },
        }
    }

    if errors.is_empty() {
        tracing::debug!(filter = ?filter, "compiled filter");
        Ok(filter)
    } else {
        Err(AppError::validation_with(
            "filters invalid",
            serde_json::json!({ "_filters": Value::Object(errors) }),
        ))
    }
}

fn compile_expr(expr: &FilterExpr, kind: &FieldKind) -> Result<Vec<Condition>, Map<String, Value>> {
    let mut out = Vec::new();
    let mut errors = Map::new();
    let mut literal = |op: &str, s: &Scalar, make: fn(Value) -> Condition| match kind.coerce_literal(&s.to_json()) {
        Ok(v) => out.push(make(v)),
        Err(msg) => {
            errors.insert(op.to_string(), Value::String(msg));
        }
    };

    if let Some(s) = &expr.eq {
        literal("eq", s, Condition::Eq);
    }
    if let Some(s) = &expr.ne {
        literal("ne", s, Condition::Ne);
    }
    if let Some(s) = &expr.gt {
        literal("gt", s, Condition::Gt);
    }
    if let Some(s) = &expr.ge {
        literal("ge", s, Condition::Ge);
    }
    if let Some(s) = &expr.lt {
        literal("lt", s, Condition::Lt);
    }
    if let Some(s) = &expr.le {
        literal("le", s, Condition::Le);
    }
    if let Some(items) = &expr.in_ {
        let coerced: Result<Vec<Value>, String> = items.iter().map(|s| kind.coerce_literal(&s.to_json())).collect();
        match coerced {
            Ok(values) => out.push(Condition::In(values)),
            Err(msg) => {
                errors.insert("in".into(), Value::String(msg));
            }
        }
    }
    if let Some(s) = &expr.like {
        out.push(Condition::Like(s.as_text()));
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::validate_query;
    use crate::schema::FieldSpec;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::new("name", FieldKind::String),
            FieldSpec::new("email", FieldKind::Email),
            FieldSpec::new("age", FieldKind::Int),
            FieldSpec::new("active", FieldKind::Bool),
        ])
        .unwrap()
    }

    fn compile(filters: &str) -> Result<Filter, AppError> {
        let params: HashMap<String, String> = [("_filters".to_string(), filters.to_string())].into_iter().collect();
        let s = schema();
        let mut columns: Vec<&str> = s.names().collect();
        columns.push("id");
        let q = validate_query(&params, &columns)?;
        create_filter(q.filters(), &s, "id")
    }

    #[test]
    fn operators_map_to_conditions() {
        let f = compile(r#"{"age": {"gt": 18, "le": "65", "in": [20, "21"]}, "name": {"like": "al", "ne": "bob"}}"#).unwrap();
        let age: Vec<_> = f.predicates.iter().filter(|p| p.field == "age").map(|p| p.condition.clone()).collect();
        assert_eq!(
            age,
            vec![
                Condition::Gt(json!(18)),
                Condition::Le(json!(65)),
                Condition::In(vec![json!(20), json!(21)]),
            ]
        );
        let name: Vec<_> = f.predicates.iter().filter(|p| p.field == "name").map(|p| p.condition.clone()).collect();
        assert_eq!(name, vec![Condition::Ne(json!("bob")), Condition::Like("al".into())]);
    }

    #[test]
    fn bare_scalar_is_equality() {
        let f = compile(r#"{"active": "true", "id": "abc"}"#).unwrap();
        assert_eq!(
            f,
            Filter::default()
                .and("active", Condition::Eq(json!(true)))
                .and("id", Condition::Eq(json!("abc")))
        );
    }

    #[test]
    fn text_search_covers_textual_fields() {
        let f = compile(r#"{"q": "ali", "age": 3}"#).unwrap();
        let text = f.text.unwrap();
        assert_eq!(text.fields, ["name", "email"]);
        assert_eq!(text.needle, "ali");
        assert_eq!(f.predicates.len(), 1);
    }

    #[test]
    fn uncoercible_literals_are_validation_errors() {
        let err = compile(r#"{"age": {"gt": "old"}, "active": 7}"#).unwrap_err();
        match err {
            AppError::Validation { message, details } => {
                assert_eq!(message, "filters invalid");
                let d = details.unwrap();
                assert_eq!(d["_filters"]["age"]["gt"], "value can't be converted to int");
                assert!(d["_filters"]["active"].is_string());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        assert!(compile("{}").unwrap().is_empty());
    }
}
