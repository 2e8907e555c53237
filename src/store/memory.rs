//! In-process collection. Filters are evaluated directly against stored documents.

use super::{project, Collection, Condition, Document, Filter, FindOptions, SortDir};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use tokio::sync::RwLock;

pub struct MemoryCollection {
    name: String,
    primary_key: String,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryCollection {
            name: name.into(),
            primary_key: "id".into(),
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(collection = %self.name, filter = ?filter, "find");
        let docs = self.docs.read().await;
        let mut hits: Vec<&Document> = docs.iter().filter(|d| matches(d, filter)).collect();
        if let Some((field, dir)) = &options.sort {
            hits.sort_by(|a, b| {
                let ord = sort_cmp(a.get(field), b.get(field));
                match dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            });
        }
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d.clone(), &self.primary_key, options.projection.as_deref()))
            .collect())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        tracing::debug!(collection = %self.name, filter = ?filter, "find_one");
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| matches(d, filter)).cloned())
    }

    async fn insert_one(&self, mut doc: Document) -> Result<Value, StoreError> {
        let id = Value::String(uuid::Uuid::new_v4().to_string());
        doc.insert(self.primary_key.clone(), id.clone());
        tracing::debug!(collection = %self.name, id = %id, "insert_one");
        self.docs.write().await.push(doc);
        Ok(id)
    }

    async fn find_one_and_update(&self, filter: &Filter, mut set: Document) -> Result<Option<Document>, StoreError> {
        tracing::debug!(collection = %self.name, filter = ?filter, "find_one_and_update");
        set.remove(&self.primary_key);
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) else {
            return Ok(None);
        };
        for (k, v) in set {
            doc.insert(k, v);
        }
        Ok(Some(doc.clone()))
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        tracing::debug!(collection = %self.name, filter = ?filter, "find_one_and_delete");
        let mut docs = self.docs.write().await;
        let pos = docs.iter().position(|d| matches(d, filter));
        Ok(pos.map(|i| docs.remove(i)))
    }

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| matches(d, filter)).count() as u64)
    }
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    let predicates_hold = filter
        .predicates
        .iter()
        .all(|p| condition_holds(doc.get(&p.field), &p.condition));
    let text_holds = filter.text.as_ref().map_or(true, |t| {
        t.fields
            .iter()
            .any(|f| like(doc.get(f), &t.needle))
    });
    predicates_hold && text_holds
}

fn condition_holds(value: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(v) => value.is_some_and(|x| values_equal(x, v)),
        Condition::Ne(v) => !value.is_some_and(|x| values_equal(x, v)),
        Condition::Gt(v) => value.and_then(|x| compare_same_type(x, v)) == Some(Ordering::Greater),
        Condition::Ge(v) => matches!(
            value.and_then(|x| compare_same_type(x, v)),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Condition::Lt(v) => value.and_then(|x| compare_same_type(x, v)) == Some(Ordering::Less),
        Condition::Le(v) => matches!(
            value.and_then(|x| compare_same_type(x, v)),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Condition::In(vs) => value.is_some_and(|x| vs.iter().any(|v| values_equal(x, v))),
        Condition::Like(needle) => like(value, needle),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64()?.partial_cmp(&m.as_f64()?),
        (Value::String(s), Value::String(t)) => Some(s.cmp(t)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like(value: Option<&Value>, needle: &str) -> bool {
    let hay = match value {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return false,
    };
    hay.contains(&needle.to_lowercase())
}

/// Total order for sorting: missing/null, numbers, strings, booleans, then composites.
fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Bool(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) if rank(a) == rank(b) => compare_same_type(x, y).unwrap_or(Ordering::Equal),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TextSearch;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    async fn seeded() -> MemoryCollection {
        let c = MemoryCollection::new("people");
        for (name, age) in [("alice", 30), ("bob", 17), ("Alan", 45), ("carol", 18)] {
            c.insert_one(doc(json!({"name": name, "age": age}))).await.unwrap();
        }
        c
    }

    #[tokio::test]
    async fn range_and_like_combine() {
        let c = seeded().await;
        let f = Filter::default()
            .and("age", Condition::Gt(json!(18)))
            .and("name", Condition::Like("al".into()));
        let found = c.find(&f, &FindOptions::default()).await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, [json!("alice"), json!("Alan")]);
        assert_eq!(c.count_documents(&f).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn range_bounds_and_membership() {
        async fn count(c: &MemoryCollection, cond: Condition) -> u64 {
            c.count_documents(&Filter::default().and("age", cond)).await.unwrap()
        }
        let c = seeded().await;
        assert_eq!(count(&c, Condition::Ge(json!(18))).await, 3);
        assert_eq!(count(&c, Condition::Gt(json!(18))).await, 2);
        assert_eq!(count(&c, Condition::Le(json!(18))).await, 2);
        assert_eq!(count(&c, Condition::Lt(json!(18))).await, 1);
        assert_eq!(count(&c, Condition::Le(json!(16))).await, 0);
        assert_eq!(count(&c, Condition::In(vec![json!(17), json!(45), json!(99)])).await, 2);
        assert_eq!(count(&c, Condition::In(vec![])).await, 0);
        assert_eq!(count(&c, Condition::Eq(json!(30.0))).await, 1);
    }

    #[tokio::test]
    async fn missing_fields_sort_lowest() {
        let c = MemoryCollection::new("sparse");
        for d in [json!({"n": 2}), json!({}), json!({"n": 1}), json!({"n": null})] {
            c.insert_one(doc(d)).await.unwrap();
        }
        let sorted = |dir| FindOptions {
            sort: Some(("n".to_string(), dir)),
            ..FindOptions::default()
        };
        let asc = c.find(&Filter::default(), &sorted(SortDir::Asc)).await.unwrap();
        assert_eq!(asc[2]["n"], 1);
        assert_eq!(asc[3]["n"], 2);
        let desc = c.find(&Filter::default(), &sorted(SortDir::Desc)).await.unwrap();
        assert_eq!(desc[0]["n"], 2);
        assert_eq!(desc[1]["n"], 1);
        assert!(desc[2..].iter().all(|d| d.get("n").map_or(true, Value::is_null)));
    }

    #[tokio::test]
    async fn sort_skip_limit_and_projection() {
        let c = seeded().await;
        let opts = FindOptions {
            projection: Some(vec!["age".into()]),
            sort: Some(("age".into(), SortDir::Desc)),
            skip: 1,
            limit: Some(2),
        };
        let found = c.find(&Filter::default(), &opts).await.unwrap();
        let ages: Vec<_> = found.iter().map(|d| d["age"].clone()).collect();
        assert_eq!(ages, [json!(30), json!(18)]);
        assert!(found.iter().all(|d| d.get("name").is_none() && d.contains_key("id")));
    }

    #[tokio::test]
    async fn ne_matches_missing_and_ranges_ignore_other_types() {
        let c = MemoryCollection::new("mixed");
        c.insert_one(doc(json!({"v": 5}))).await.unwrap();
        c.insert_one(doc(json!({"v": "9"}))).await.unwrap();
        c.insert_one(doc(json!({}))).await.unwrap();
        let ne = Filter::default().and("v", Condition::Ne(json!(5)));
        assert_eq!(c.count_documents(&ne).await.unwrap(), 2);
        let gt = Filter::default().and("v", Condition::Gt(json!(1)));
        assert_eq!(c.count_documents(&gt).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn text_search_any_field() {
        let c = MemoryCollection::new("msgs");
        c.insert_one(doc(json!({"title": "Hello", "body": "x"}))).await.unwrap();
        c.insert_one(doc(json!({"title": "x", "body": "say HELLO"}))).await.unwrap();
        c.insert_one(doc(json!({"title": "x", "body": "y"}))).await.unwrap();
        let f = Filter {
            predicates: vec![],
            text: Some(TextSearch {
                fields: vec!["title".into(), "body".into()],
                needle: "hello".into(),
            }),
        };
        assert_eq!(c.count_documents(&f).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_key() {
        let c = seeded().await;
        let id = c.insert_one(doc(json!({"name": "dave", "age": 50}))).await.unwrap();
        let by_key = Filter::by_key("id", id.clone());
        let updated = c
            .find_one_and_update(&by_key, doc(json!({"age": 51, "id": "hijack"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], 51);
        assert_eq!(updated["name"], "dave");
        assert_eq!(updated["id"], id);

        let deleted = c.find_one_and_delete(&by_key).await.unwrap().unwrap();
        assert_eq!(deleted["name"], "dave");
        assert!(c.find_one(&by_key).await.unwrap().is_none());
        assert!(c.find_one_and_update(&by_key, Document::new()).await.unwrap().is_none());
    }

    #[test]
    fn parse_id_rejects_foreign_formats() {
        let c = MemoryCollection::new("x");
        assert!(c.parse_id("507f1f77bcf86cd799439011").is_none());
        assert!(c.parse_id("not-a-valid-id").is_none());
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(c.parse_id(&id), Some(Value::String(id)));
    }
}
