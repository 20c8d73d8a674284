pub mod memory;
pub mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::query::{Condition, DocQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Query error: {0}")]
    Query(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A persistent document collection: filter/sort/skip/limit/count reads plus
/// atomic per-document field updates and set operations.
///
/// Equality against an array-valued field matches membership, so
/// `tags = "impact"` finds articles tagged impact and `authors = <id>` finds
/// articles the user co-authors.
#[async_trait]
pub trait Collection: Send + Sync {
    async fn find(&self, query: &DocQuery) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, conditions: &[Condition]) -> Result<u64, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Insert a document, assigning an id when the document carries none.
    /// Returns the stored document.
    async fn insert(&self, doc: Value) -> Result<Value, StoreError>;

    /// Merge the given top-level fields into the document. Returns the
    /// updated document, or None when the id is unknown.
    async fn update(&self, id: Uuid, fields: Map<String, Value>) -> Result<Option<Value>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Append `value` to the array field unless already present.
    /// Returns whether the document was modified.
    async fn push_unique(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError>;

    /// Remove every occurrence of `value` from the array field.
    /// Returns whether a document with that id exists.
    async fn pull(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError>;
}

/// Apply a projection to a stored document. The id always survives.
pub fn project(doc: Value, fields: &[String]) -> Value {
    let Value::Object(map) = doc else { return doc };
    let mut out = Map::new();
    for (key, value) in map {
        if key == "id" || fields.iter().any(|f| f == &key) {
            out.insert(key, value);
        }
    }
    Value::Object(out)
}

/// Typed wrapper over a raw collection, serializing through serde.
pub struct Repo<T> {
    coll: Arc<dyn Collection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repo<T> {
    fn clone(&self) -> Self {
        Self { coll: self.coll.clone(), _marker: PhantomData }
    }
}

impl<T> Repo<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(coll: Arc<dyn Collection>) -> Self {
        Self { coll, _marker: PhantomData }
    }

    fn decode(doc: Value) -> Result<T, StoreError> {
        serde_json::from_value(doc).map_err(|e| StoreError::Decode(e.to_string()))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.coll.get(id).await?.map(Self::decode).transpose()
    }

    pub async fn find_one(&self, conditions: Vec<Condition>) -> Result<Option<T>, StoreError> {
        let query = DocQuery { conditions, limit: Some(1), ..Default::default() };
        let mut docs = self.coll.find(&query).await?;
        docs.pop().map(Self::decode).transpose()
    }

    pub async fn insert(&self, item: &T) -> Result<T, StoreError> {
        let doc = serde_json::to_value(item).map_err(|e| StoreError::Decode(e.to_string()))?;
        Self::decode(self.coll.insert(doc).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Option<T>, StoreError> {
        self.coll.update(id, fields).await?.map(Self::decode).transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.coll.delete(id).await
    }

    pub async fn push_unique(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        self.coll.push_unique(id, field, value).await
    }

    pub async fn pull(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        self.coll.pull(id, field, value).await
    }

    /// Raw reads for listing paths where a projection may drop required fields.
    pub async fn find_raw(&self, query: &DocQuery) -> Result<Vec<Value>, StoreError> {
        self.coll.find(query).await
    }

    pub async fn count(&self, conditions: &[Condition]) -> Result<u64, StoreError> {
        self.coll.count(conditions).await
    }
}
