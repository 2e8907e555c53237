//! Generic CRUD execution against a document collection.

use crate::error::AppError;
use crate::query::{calc_pagination, create_filter, validate_query};
use crate::resource::Resource;
use crate::schema::PayloadValidator;
use crate::store::{Document, Filter, FindOptions};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Capability set every admin resource offers. Ids are raw path segments: a malformed id
/// and an absent one both end in `AppError::NotFound`.
#[async_trait]
pub trait CrudResource: Send + Sync {
    /// One page of entities plus the count of all entities matching the filter.
    async fn list(&self, params: &HashMap<String, String>) -> Result<(Vec<Document>, u64), AppError>;

    async fn detail(&self, id: &str) -> Result<Document, AppError>;

    async fn create(&self, body: Map<String, Value>) -> Result<Document, AppError>;

    /// `$set`-style merge of the supplied fields.
    async fn update(&self, id: &str, body: Map<String, Value>) -> Result<Document, AppError>;

    async fn delete(&self, id: &str) -> Result<Document, AppError>;
}

impl Resource {
    fn key_filter(&self, id: &str) -> Result<Filter, AppError> {
        let key = self
            .collection()
            .parse_id(id)
            .ok_or_else(|| AppError::entity_not_found(id))?;
        Ok(Filter::by_key(self.primary_key(), key))
    }

    fn projection(&self) -> Vec<String> {
        self.schema().names().map(str::to_string).collect()
    }
}

#[async_trait]
impl CrudResource for Resource {
    async fn list(&self, params: &HashMap<String, String>) -> Result<(Vec<Document>, u64), AppError> {
        let query = validate_query(params, &self.columns())?;
        let filter = create_filter(query.filters(), self.schema(), self.primary_key())?;
        let paging = calc_pagination(&query, self.default_sort_field());
        let options = FindOptions {
            projection: Some(self.projection()),
            sort: Some((paging.sort_field, paging.sort_dir)),
            skip: paging.offset,
            limit: Some(paging.limit),
        };
        let entities = self.collection().find(&filter, &options).await?;
        let count = self.collection().count_documents(&filter).await?;
        tracing::debug!(resource = %self.name(), returned = entities.len(), count, "list");
        Ok((entities, count))
    }

    async fn detail(&self, id: &str) -> Result<Document, AppError> {
        let filter = self.key_filter(id)?;
        self.collection()
            .find_one(&filter)
            .await?
            .ok_or_else(|| AppError::entity_not_found(id))
    }

    async fn create(&self, body: Map<String, Value>) -> Result<Document, AppError> {
        let doc = PayloadValidator::validate(body, self.schema(), self.primary_key())?;
        let id = self.collection().insert_one(doc).await?;
        tracing::debug!(resource = %self.name(), id = %id, "created");
        let filter = Filter::by_key(self.primary_key(), id.clone());
        self.collection().find_one(&filter).await?.ok_or_else(|| {
            let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
            AppError::entity_not_found(&id)
        })
    }

    async fn update(&self, id: &str, body: Map<String, Value>) -> Result<Document, AppError> {
        let set = PayloadValidator::validate_partial(body, self.schema(), self.primary_key())?;
        let filter = self.key_filter(id)?;
        self.collection()
            .find_one_and_update(&filter, set)
            .await?
            .ok_or_else(|| AppError::entity_not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<Document, AppError> {
        let filter = self.key_filter(id)?;
        self.collection()
            .find_one_and_delete(&filter)
            .await?
            .ok_or_else(|| AppError::entity_not_found(id))
    }
}
