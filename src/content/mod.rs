pub mod cover;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Canonical persisted shape of article body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub content: String,
}

/// Reconcile the accepted input shapes for article content into the canonical
/// `{content}` record: a raw HTML string, an object wrapping a `content`
/// string, or (defensively) any other object stringified. Empty content is
/// rejected; the result is idempotent under re-normalization.
pub fn normalize(input: Option<&Value>) -> Result<ArticleContent, ApiError> {
    let required = || ApiError::validation("content required");
    match input {
        None | Some(Value::Null) => Err(required()),
        Some(Value::String(s)) => {
            if s.is_empty() {
                Err(required())
            } else {
                Ok(ArticleContent { content: s.clone() })
            }
        }
        Some(Value::Object(map)) => match map.get("content") {
            Some(Value::String(s)) if !s.is_empty() => Ok(ArticleContent { content: s.clone() }),
            // Last-resort fallback for unrecognized object shapes.
            _ => {
                let raw = serde_json::to_string(map)?;
                Ok(ArticleContent { content: raw })
            }
        },
        Some(other) => {
            let raw = other.to_string();
            if raw.is_empty() {
                Err(required())
            } else {
                Ok(ArticleContent { content: raw })
            }
        }
    }
}
