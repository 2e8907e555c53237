//! Builds parameterized SELECT, INSERT, UPDATE, DELETE over a JSONB document table.
//!
//! Each collection is a table `(id UUID PRIMARY KEY, doc JSONB NOT NULL)`. The primary key
//! lives in `id`; every other field is read from `doc`.

use crate::sql::BindValue;
use crate::store::{Condition, Document, Filter, FindOptions, SortDir};
use serde_json::Value;

/// Table coordinates for one collection.
#[derive(Clone, Debug)]
pub struct DocTable {
    pub schema: String,
    pub table: String,
    pub primary_key: String,
}

impl DocTable {
    /// Full qualified table name.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quoted(&self.schema), quoted(&self.table))
    }
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Escape LIKE wildcards so the needle matches as plain text.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// JSONB expression for a field.
fn field_expr(t: &DocTable, field: &str) -> String {
    if field == t.primary_key {
        "to_jsonb(id::text)".to_string()
    } else {
        format!("(doc -> {})", literal(field))
    }
}

/// Text expression for a field (LIKE and text search).
fn text_expr(t: &DocTable, field: &str) -> String {
    if field == t.primary_key {
        "id::text".to_string()
    } else {
        format!("(doc ->> {})", literal(field))
    }
}

fn condition_sql(q: &mut QueryBuf, t: &DocTable, field: &str, condition: &Condition) -> String {
    let expr = field_expr(t, field);
    let range = |q: &mut QueryBuf, op: &str, v: &Value| {
        let n = q.push_param(BindValue::Json(v.clone()));
        format!("({expr} {op} ${n} AND jsonb_typeof({expr}) = jsonb_typeof(${n}))", expr = expr, op = op, n = n)
    };
    match condition {
        Condition::Eq(Value::String(s)) if field == t.primary_key => {
            let n = q.push_param(BindValue::Text(s.clone()));
            format!("id::text = ${}", n)
        }
        Condition::Eq(v) => {
            let n = q.push_param(BindValue::Json(v.clone()));
            format!("{} = ${}", expr, n)
        }
        Condition::Ne(v) => {
            let n = q.push_param(BindValue::Json(v.clone()));
            format!("{} IS DISTINCT FROM ${}", expr, n)
        }
        Condition::Gt(v) => range(q, ">", v),
        Condition::Ge(v) => range(q, ">=", v),
        Condition::Lt(v) => range(q, "<", v),
        Condition::Le(v) => range(q, "<=", v),
        Condition::In(values) => {
            if values.is_empty() {
                return "FALSE".to_string();
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| format!("${}", q.push_param(BindValue::Json(v.clone()))))
                .collect();
            format!("{} IN ({})", expr, placeholders.join(", "))
        }
        Condition::Like(needle) => {
            let n = q.push_param(BindValue::Text(like_pattern(needle)));
            format!("{} ILIKE ${}", text_expr(t, field), n)
        }
    }
}

/// ` WHERE ...` for the filter, or empty when the filter matches everything.
fn where_clause(q: &mut QueryBuf, t: &DocTable, filter: &Filter) -> String {
    let mut parts: Vec<String> = filter
        .predicates
        .iter()
        .map(|p| condition_sql(q, t, &p.field, &p.condition))
        .collect();
    if let Some(text) = &filter.text {
        if text.fields.is_empty() {
            parts.push("FALSE".to_string());
        } else {
            let n = q.push_param(BindValue::Text(like_pattern(&text.needle)));
            let ors: Vec<String> = text
                .fields
                .iter()
                .map(|f| format!("{} ILIKE ${}", text_expr(t, f), n))
                .collect();
            parts.push(format!("({})", ors.join(" OR ")));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// LIMIT and OFFSET are bigint in PostgreSQL.
const MAX_ROW_COUNT: u64 = i64::MAX as u64;

/// Missing fields order lowest, as in the memory collection.
fn order_field_sql(t: &DocTable, field: &str, dir: SortDir) -> String {
    let nulls = match dir {
        SortDir::Asc => "NULLS FIRST",
        SortDir::Desc => "NULLS LAST",
    };
    format!(" ORDER BY {} {} {}, id", field_expr(t, field), dir.as_sql(), nulls)
}

/// SELECT with filter, ORDER BY, LIMIT/OFFSET. Ties break on id so paging is stable.
pub fn select(t: &DocTable, filter: &Filter, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, t, filter);
    let order_sql = match &options.sort {
        Some((field, dir)) if *field == t.primary_key => format!(" ORDER BY id {}", dir.as_sql()),
        Some((field, dir)) => order_field_sql(t, field, *dir),
        None => String::new(),
    };
    let limit_sql = options
        .limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_ROW_COUNT)))
        .unwrap_or_default();
    let offset_sql = if options.skip > 0 {
        format!(" OFFSET {}", options.skip.min(MAX_ROW_COUNT))
    } else {
        String::new()
    };
    q.sql = format!(
        "SELECT id, doc FROM {}{}{}{}{}",
        t.qualified(),
        where_sql,
        order_sql,
        limit_sql,
        offset_sql
    );
    q
}

pub fn count(t: &DocTable, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, t, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", t.qualified(), where_sql);
    q
}

/// INSERT one document under a caller-generated id.
pub fn insert(t: &DocTable, id: uuid::Uuid, doc: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut body = doc.clone();
    body.remove(&t.primary_key);
    q.push_param(BindValue::Uuid(id));
    q.push_param(BindValue::Json(Value::Object(body)));
    q.sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", t.qualified());
    q
}

/// Single-statement merge of `set` into the first matching row.
pub fn update_one(t: &DocTable, filter: &Filter, set: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut body = set.clone();
    body.remove(&t.primary_key);
    let n = q.push_param(BindValue::Json(Value::Object(body)));
    let where_sql = where_clause(&mut q, t, filter);
    let table = t.qualified();
    q.sql = format!(
        "UPDATE {table} SET doc = doc || ${n} WHERE id = (SELECT id FROM {table}{where_sql} LIMIT 1 FOR UPDATE) RETURNING id, doc",
        table = table,
        n = n,
        where_sql = where_sql
    );
    q
}

/// Single-statement delete of the first matching row.
pub fn delete_one(t: &DocTable, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, t, filter);
    let table = t.qualified();
    q.sql = format!(
        "DELETE FROM {table} WHERE id = (SELECT id FROM {table}{where_sql} LIMIT 1 FOR UPDATE) RETURNING id, doc",
        table = table,
        where_sql = where_sql
    );
    q
}

/// DDL for the backing table.
pub fn create_table(t: &DocTable) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, doc JSONB NOT NULL DEFAULT '{{}}'::jsonb)",
        t.qualified()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SortDir, TextSearch};
    use serde_json::json;

    fn table() -> DocTable {
        DocTable {
            schema: "admin".into(),
            table: "user".into(),
            primary_key: "id".into(),
        }
    }

    #[test]
    fn select_with_filters_sort_and_paging() {
        let f = Filter::default()
            .and("age", Condition::Gt(json!(18)))
            .and("name", Condition::Like("a_l%".into()));
        let opts = FindOptions {
            projection: None,
            sort: Some(("name".into(), SortDir::Asc)),
            skip: 20,
            limit: Some(10),
        };
        let q = select(&table(), &f, &opts);
        assert_eq!(
            q.sql,
            "SELECT id, doc FROM \"admin\".\"user\" WHERE ((doc -> 'age') > $1 AND jsonb_typeof((doc -> 'age')) = jsonb_typeof($1)) AND (doc ->> 'name') ILIKE $2 ORDER BY (doc -> 'name') ASC NULLS FIRST, id LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            q.params,
            vec![BindValue::Json(json!(18)), BindValue::Text("%a\\_l\\%%".into())]
        );
    }

    #[test]
    fn key_lookup_uses_id_column() {
        let f = Filter::by_key("id", json!("0b7c1a44-5d52-4f43-9d6a-3a5c4d3f8f11"));
        let q = count(&table(), &f);
        assert_eq!(q.sql, "SELECT COUNT(*) FROM \"admin\".\"user\" WHERE id::text = $1");
        let q = select(
            &table(),
            &Filter::default(),
            &FindOptions {
                sort: Some(("id".into(), SortDir::Desc)),
                ..FindOptions::default()
            },
        );
        assert_eq!(q.sql, "SELECT id, doc FROM \"admin\".\"user\" ORDER BY id DESC");
    }

    #[test]
    fn paging_is_clamped_to_bigint() {
        let opts = FindOptions {
            projection: None,
            sort: Some(("name".into(), SortDir::Desc)),
            skip: u64::MAX,
            limit: Some(u64::MAX),
        };
        let q = select(&table(), &Filter::default(), &opts);
        assert_eq!(
            q.sql,
            "SELECT id, doc FROM \"admin\".\"user\" ORDER BY (doc -> 'name') DESC NULLS LAST, id LIMIT 9223372036854775807 OFFSET 9223372036854775807"
        );
    }

    #[test]
    fn in_ne_and_text_search() {
        let f = Filter {
            predicates: vec![],
            text: Some(TextSearch {
                fields: vec!["name".into(), "email".into()],
                needle: "bo".into(),
            }),
        }
        .and("role", Condition::In(vec![json!("a"), json!("b")]))
        .and("flag", Condition::Ne(json!(true)))
        .and("none", Condition::In(vec![]));
        let q = count(&table(), &f);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"admin\".\"user\" WHERE (doc -> 'role') IN ($1, $2) AND (doc -> 'flag') IS DISTINCT FROM $3 AND FALSE AND ((doc ->> 'name') ILIKE $4 OR (doc ->> 'email') ILIKE $4)"
        );
        assert_eq!(q.params.len(), 4);
    }

    #[test]
    fn update_and_delete_are_single_statements() {
        let f = Filter::by_key("id", json!("x"));
        let mut set = Document::new();
        set.insert("age".into(), json!(3));
        set.insert("id".into(), json!("other"));
        let q = update_one(&table(), &f, &set);
        assert_eq!(
            q.sql,
            "UPDATE \"admin\".\"user\" SET doc = doc || $1 WHERE id = (SELECT id FROM \"admin\".\"user\" WHERE id::text = $2 LIMIT 1 FOR UPDATE) RETURNING id, doc"
        );
        assert_eq!(q.params[0], BindValue::Json(json!({"age": 3})));

        let q = delete_one(&table(), &f);
        assert!(q.sql.starts_with("DELETE FROM \"admin\".\"user\" WHERE id = (SELECT id"));
        assert!(q.sql.ends_with("RETURNING id, doc"));
    }

    #[test]
    fn field_names_are_escaped() {
        let f = Filter::default().and("o'brien", Condition::Eq(json!(1)));
        let q = count(&table(), &f);
        assert!(q.sql.contains("(doc -> 'o''brien') = $1"));
    }
}
