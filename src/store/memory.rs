use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{project, Collection, StoreError};
use crate::query::{CompareOp, Condition, DocQuery, SortKey};

/// In-memory document collection. Backs tests and secret-free local runs;
/// evaluates the same query AST the Postgres backend translates to SQL.
#[derive(Default)]
pub struct MemoryCollection {
    docs: Arc<RwLock<HashMap<Uuid, Value>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

fn doc_id(doc: &Value) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

/// Equality with document-store array semantics: an array-valued field
/// matches when it contains the target value.
fn eq_matches(field_value: &Value, target: &Value) -> bool {
    match field_value {
        Value::Array(items) => items.iter().any(|item| item == target),
        other => other == target,
    }
}

fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

fn matches(doc: &Value, condition: &Condition) -> bool {
    let field_value = doc.get(&condition.field).unwrap_or(&Value::Null);
    match condition.op {
        CompareOp::Eq => eq_matches(field_value, &condition.value),
        CompareOp::In => condition
            .value
            .as_array()
            .map(|candidates| candidates.iter().any(|c| eq_matches(field_value, c)))
            .unwrap_or(false),
        CompareOp::Gt => value_cmp(field_value, &condition.value) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            value_cmp(field_value, &condition.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => value_cmp(field_value, &condition.value) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            value_cmp(field_value, &condition.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

fn sort_docs(docs: &mut [Value], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        for key in keys {
            let av = a.get(&key.field).unwrap_or(&Value::Null);
            let bv = b.get(&key.field).unwrap_or(&Value::Null);
            let ord = value_cmp(av, bv).unwrap_or(Ordering::Equal);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn find(&self, query: &DocQuery) -> Result<Vec<Value>, StoreError> {
        let docs = self.docs.read().await;
        let mut hits: Vec<Value> = docs
            .values()
            .filter(|doc| query.conditions.iter().all(|c| matches(doc, c)))
            .cloned()
            .collect();

        sort_docs(&mut hits, &query.sort);

        let skip = query.skip as usize;
        let mut hits: Vec<Value> = if skip >= hits.len() {
            Vec::new()
        } else {
            hits.split_off(skip)
        };
        if let Some(limit) = query.limit {
            hits.truncate(limit as usize);
        }

        if let Some(fields) = &query.projection {
            hits = hits.into_iter().map(|doc| project(doc, fields)).collect();
        }
        Ok(hits)
    }

    async fn count(&self, conditions: &[Condition]) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        let n = docs
            .values()
            .filter(|doc| conditions.iter().all(|c| matches(doc, c)))
            .count();
        Ok(n as u64)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    async fn insert(&self, mut doc: Value) -> Result<Value, StoreError> {
        let id = doc_id(&doc).unwrap_or_else(Uuid::new_v4);
        doc["id"] = json!(id);
        self.docs.write().await.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(&id) else { return Ok(None) };
        if let Some(map) = doc.as_object_mut() {
            for (key, value) in fields {
                map.insert(key, value);
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.docs.write().await.remove(&id).is_some())
    }

    async fn push_unique(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(&id) else { return Ok(false) };
        let map = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Query("document is not an object".to_string()))?;
        let entry = map.entry(field.to_string()).or_insert_with(|| json!([]));
        let items = entry
            .as_array_mut()
            .ok_or_else(|| StoreError::Query(format!("field {} is not an array", field)))?;
        if items.contains(&value) {
            return Ok(false);
        }
        items.push(value);
        Ok(true)
    }

    async fn pull(&self, id: Uuid, field: &str, value: Value) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(&id) else { return Ok(false) };
        if let Some(items) = doc.get_mut(field).and_then(Value::as_array_mut) {
            items.retain(|item| item != &value);
        }
        Ok(true)
    }
}
