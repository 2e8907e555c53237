//! PostgreSQL collection: one JSONB document table per collection.

use super::{project, Collection, Document, Filter, FindOptions};
use crate::error::StoreError;
use crate::sql::{self, bind_all, DocTable, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgCollection {
    pool: PgPool,
    name: String,
    table: DocTable,
}

impl PgCollection {
    /// Collection `name` stored in `schema.name`. Call `ensure_table` before first use.
    pub fn new(pool: PgPool, schema: &str, name: &str, primary_key: &str) -> Self {
        PgCollection {
            pool,
            name: name.to_string(),
            table: DocTable {
                schema: schema.to_string(),
                table: name.to_string(),
                primary_key: primary_key.to_string(),
            },
        }
    }

    /// Create the schema and backing table if missing.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let schema_ddl = format!("CREATE SCHEMA IF NOT EXISTS {}", sql::quoted(&self.table.schema));
        sqlx::query(&schema_ddl).execute(&self.pool).await?;
        sqlx::query(&sql::create_table(&self.table)).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| self.row_to_document(r)).collect()
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| self.row_to_document(&r)).transpose()
    }

    fn row_to_document(&self, row: &PgRow) -> Result<Document, StoreError> {
        let id: uuid::Uuid = row.try_get("id")?;
        let doc: Value = row.try_get("doc")?;
        let Value::Object(mut doc) = doc else {
            return Err(StoreError::Codec(format!(
                "row {} in {} is not a JSON object",
                id, self.name
            )));
        };
        doc.insert(self.table.primary_key.clone(), Value::String(id.to_string()));
        Ok(doc)
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.table.primary_key
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let q = sql::select(&self.table, filter, options);
        let docs = self.fetch_all(&q).await?;
        Ok(docs
            .into_iter()
            .map(|d| project(d, &self.table.primary_key, options.projection.as_deref()))
            .collect())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        let q = sql::select(&self.table, filter, &options);
        self.fetch_optional(&q).await
    }

    async fn insert_one(&self, doc: Document) -> Result<Value, StoreError> {
        let id = uuid::Uuid::new_v4();
        let q = sql::insert(&self.table, id, &doc);
        tracing::debug!(sql = %q.sql, "query");
        bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(Value::String(id.to_string()))
    }

    async fn find_one_and_update(&self, filter: &Filter, set: Document) -> Result<Option<Document>, StoreError> {
        let q = sql::update_one(&self.table, filter, &set);
        self.fetch_optional(&q).await
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let q = sql::delete_one(&self.table, filter);
        self.fetch_optional(&q).await
    }

    async fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        let q = sql::count(&self.table, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Codec("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}
