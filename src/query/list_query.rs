//! List query validation: raw query-string parameters to a checked `ListQuery`.

use crate::error::AppError;
use crate::store::SortDir;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Reserved filter key for the multi-field text search.
pub const MULTI_FIELD_TEXT_QUERY: &str = "q";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl Scalar {
    fn from_json(v: &Value) -> Result<Self, String> {
        match v {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Scalar::Int(i)),
                None => n
                    .as_f64()
                    .map(Scalar::Float)
                    .ok_or_else(|| "value is not int, bool, string or float".to_string()),
            },
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::String(s) => Ok(Scalar::String(s.clone())),
            _ => Err("value is not int, bool, string or float".into()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }

    /// String form used by substring matching.
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

/// Per-field operator set. Absent operators are `None`; all present ones must hold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterExpr {
    pub in_: Option<Vec<Scalar>>,
    pub gt: Option<Scalar>,
    pub ge: Option<Scalar>,
    pub lt: Option<Scalar>,
    pub le: Option<Scalar>,
    pub ne: Option<Scalar>,
    pub eq: Option<Scalar>,
    pub like: Option<Scalar>,
}

impl FilterExpr {
    /// Parse an operator object, collecting one message per offending key.
    fn from_json(obj: &Map<String, Value>) -> Result<Self, Map<String, Value>> {
        let mut expr = FilterExpr::default();
        let mut errors = Map::new();
        for (op, v) in obj {
            let res = match op.as_str() {
                "in" => match v {
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| Scalar::from_json(item).map_err(|e| format!("item {}: {}", i, e)))
                        .collect::<Result<Vec<_>, _>>()
                        .map(|list| expr.in_ = Some(list)),
                    _ => Err("value is not a list".into()),
                },
                "gt" => Scalar::from_json(v).map(|s| expr.gt = Some(s)),
                "ge" => Scalar::from_json(v).map(|s| expr.ge = Some(s)),
                "lt" => Scalar::from_json(v).map(|s| expr.lt = Some(s)),
                "le" => Scalar::from_json(v).map(|s| expr.le = Some(s)),
                "ne" => Scalar::from_json(v).map(|s| expr.ne = Some(s)),
                "eq" => Scalar::from_json(v).map(|s| expr.eq = Some(s)),
                "like" => Scalar::from_json(v).map(|s| expr.like = Some(s)),
                other => Err(format!("{} is not allowed key", other)),
            };
            if let Err(msg) = res {
                errors.insert(op.clone(), Value::String(msg));
            }
        }
        if errors.is_empty() {
            Ok(expr)
        } else {
            Err(errors)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    /// Bare value: equality.
    Scalar(Scalar),
    Expr(FilterExpr),
}

/// Validated list request. Read-only once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    page: u64,
    per_page: u64,
    sort_field: Option<String>,
    sort_dir: SortDir,
    filters: BTreeMap<String, FilterValue>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            sort_field: None,
            sort_dir: SortDir::Desc,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_field.as_deref()
    }

    pub fn sort_dir(&self) -> SortDir {
        self.sort_dir
    }

    pub fn filters(&self) -> &BTreeMap<String, FilterValue> {
        &self.filters
    }
}

fn parse_positive(raw: &str) -> Result<u64, String> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| "value can't be converted to int".to_string())?;
    if n < 1 {
        return Err("value is less than 1".into());
    }
    Ok(n as u64)
}

/// Parse and check the query shape. Unknown top-level keys are ignored.
pub fn validate_query_structure(params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    let mut q = ListQuery::default();
    let mut errors = Map::new();

    let filters_json = match params.get("_filters") {
        Some(raw) if !raw.trim().is_empty() => Some(
            serde_json::from_str::<Value>(raw).map_err(|_| AppError::validation("filters not serializable"))?,
        ),
        _ => None,
    };

    if let Some(raw) = params.get("_page") {
        match parse_positive(raw) {
            Ok(n) => q.page = n,
            Err(e) => {
                errors.insert("_page".into(), Value::String(e));
            }
        }
    }
    if let Some(raw) = params.get("_perPage") {
        match parse_positive(raw) {
            Ok(n) => q.per_page = n,
            Err(e) => {
                errors.insert("_perPage".into(), Value::String(e));
            }
        }
    }
    if let Some(raw) = params.get("_sortField") {
        if raw.trim().is_empty() {
            errors.insert("_sortField".into(), Value::String("blank value is not allowed".into()));
        } else {
            q.sort_field = Some(raw.clone());
        }
    }
    if let Some(raw) = params.get("_sortDir") {
        match SortDir::parse(raw) {
            Some(dir) => q.sort_dir = dir,
            None => {
                errors.insert(
                    "_sortDir".into(),
                    Value::String("value doesn't match any variant: DESC, ASC".into()),
                );
            }
        }
    }

    match filters_json {
        None => {}
        Some(Value::Object(obj)) => {
            let mut filter_errors = Map::new();
            for (field, v) in obj {
                let parsed = match &v {
                    Value::Object(ops) => FilterExpr::from_json(ops)
                        .map(FilterValue::Expr)
                        .map_err(Value::Object),
                    other => Scalar::from_json(other)
                        .map(FilterValue::Scalar)
                        .map_err(Value::String),
                };
                match parsed {
                    Ok(fv) => {
                        q.filters.insert(field, fv);
                    }
                    Err(detail) => {
                        filter_errors.insert(field, detail);
                    }
                }
            }
            if !filter_errors.is_empty() {
                errors.insert("_filters".into(), Value::Object(filter_errors));
            }
        }
        Some(_) => {
            errors.insert("_filters".into(), Value::String("value is not a dict".into()));
        }
    }

    if errors.is_empty() {
        Ok(q)
    } else {
        Err(AppError::validation_with("list query invalid", Value::Object(errors)))
    }
}

/// Full validation: shape, then every filter key and the sort field must be a resource column
/// or the text-search key.
pub fn validate_query<S: AsRef<str>>(
    params: &HashMap<String, String>,
    columns: &[S],
) -> Result<ListQuery, AppError> {
    let q = validate_query_structure(params)?;
    let known = |c: &str| c == MULTI_FIELD_TEXT_QUERY || columns.iter().any(|k| k.as_ref() == c);

    let mut invalid: BTreeSet<&str> = q.filters.keys().map(String::as_str).filter(|c| !known(c)).collect();
    if let Some(sort) = q.sort_field() {
        if !known(sort) {
            invalid.insert(sort);
        }
    }
    if !invalid.is_empty() {
        let list: Vec<&str> = invalid.into_iter().collect();
        return Err(AppError::validation_with(
            format!("columns not present in resource: {}", list.join(", ")),
            serde_json::json!({ "columns": list }),
        ));
    }
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn err_parts(err: AppError) -> (String, Value) {
        match err {
            AppError::Validation { message, details } => (message, details.unwrap_or(Value::Null)),
            other => panic!("unexpected {:?}", other),
        }
    }

    const COLUMNS: [&str; 3] = ["id", "name", "age"];

    #[test]
    fn defaults() {
        let q = validate_query(&params(&[("unrelated", "1")]), &COLUMNS).unwrap();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 30);
        assert_eq!(q.sort_field(), None);
        assert_eq!(q.sort_dir(), SortDir::Desc);
        assert!(q.filters().is_empty());
    }

    #[test]
    fn parses_full_query() {
        let q = validate_query(
            &params(&[
                ("_page", "3"),
                ("_perPage", "10"),
                ("_sortField", "name"),
                ("_sortDir", "ASC"),
                ("_filters", r#"{"age": {"gt": 18, "in": [20, 21]}, "name": "al", "q": "x"}"#),
            ]),
            &COLUMNS,
        )
        .unwrap();
        assert_eq!((q.page(), q.per_page()), (3, 10));
        assert_eq!(q.sort_field(), Some("name"));
        assert_eq!(q.sort_dir(), SortDir::Asc);
        assert_eq!(
            q.filters()["age"],
            FilterValue::Expr(FilterExpr {
                gt: Some(Scalar::Int(18)),
                in_: Some(vec![Scalar::Int(20), Scalar::Int(21)]),
                ..FilterExpr::default()
            })
        );
        assert_eq!(q.filters()["name"], FilterValue::Scalar(Scalar::String("al".into())));
    }

    #[test]
    fn empty_filter_expression_is_legal() {
        let q = validate_query(&params(&[("_filters", r#"{"age": {}}"#)]), &COLUMNS).unwrap();
        assert_eq!(q.filters()["age"], FilterValue::Expr(FilterExpr::default()));
    }

    #[test]
    fn unparsable_filters() {
        let (msg, _) = err_parts(validate_query(&params(&[("_filters", "{age")]), &COLUMNS).unwrap_err());
        assert_eq!(msg, "filters not serializable");
    }

    #[test]
    fn shape_errors_are_reported_per_field() {
        let err = validate_query(
            &params(&[
                ("_page", "0"),
                ("_perPage", "many"),
                ("_sortDir", "UP"),
                ("_filters", r#"{"age": {"between": [1, 2], "gt": null}, "name": [1]}"#),
            ]),
            &COLUMNS,
        )
        .unwrap_err();
        let (msg, d) = err_parts(err);
        assert_eq!(msg, "list query invalid");
        assert_eq!(d["_page"], "value is less than 1");
        assert_eq!(d["_perPage"], "value can't be converted to int");
        assert!(d["_sortDir"].as_str().unwrap().contains("DESC, ASC"));
        assert_eq!(d["_filters"]["age"]["between"], "between is not allowed key");
        assert!(d["_filters"]["age"]["gt"].is_string());
        assert!(d["_filters"]["name"].is_string());
    }

    #[test]
    fn per_page_has_no_upper_bound() {
        let q = validate_query(&params(&[("_perPage", "5000")]), &COLUMNS).unwrap();
        assert_eq!(q.per_page(), 5000);
        let err = validate_query(&params(&[("_perPage", "0")]), &COLUMNS).unwrap_err();
        let (_, d) = err_parts(err);
        assert_eq!(d["_perPage"], "value is less than 1");
    }

    #[test]
    fn unknown_columns_are_all_named() {
        let err = validate_query(
            &params(&[
                ("_page", "2"),
                ("_sortField", "nonexistent"),
                ("_filters", r#"{"zip": 1, "name": "a", "color": {"eq": "red"}}"#),
            ]),
            &COLUMNS,
        )
        .unwrap_err();
        let (msg, d) = err_parts(err);
        assert_eq!(msg, "columns not present in resource: color, nonexistent, zip");
        assert_eq!(d["columns"], serde_json::json!(["color", "nonexistent", "zip"]));
    }

    #[test]
    fn text_search_key_is_always_allowed() {
        assert!(validate_query(&params(&[("_filters", r#"{"q": "hello"}"#)]), &COLUMNS).is_ok());
    }
}
