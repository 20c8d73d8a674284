//! Article lifecycle: create, update, delete, pin, and the listing paths.
//!
//! Every mutation resolves existence before authorization, so a missing
//! article reports 404 even to users who could not have touched it.

use std::collections::HashMap;

use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::content::cover::{self, CoverUpload};
use crate::content::{self, ArticleContent};
use crate::error::ApiError;
use crate::models::article::{validate_title, Article, Tag};
use crate::models::user::{AUTHOR_PROFILE_FIELDS, AUTHOR_SUMMARY_FIELDS};
use crate::models::User;
use crate::query::{ast, CompareOp, Condition, DocQuery, Pagination};
use crate::state::AppState;

use super::policy;

/// Mutable article fields as they arrive from a request, JSON or multipart.
/// Loosely typed on purpose: shapes are validated here, not at the edge.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleInput {
    pub title: Option<String>,
    pub authors: Option<Value>,
    pub article_content: Option<Value>,
    pub cover_picture_url: Option<String>,
    pub tags: Option<Value>,
    pub pinned: Option<bool>,
    pub remove_cover: Option<Value>,
    #[serde(skip)]
    pub cover_upload: Option<CoverUpload>,
}

pub async fn create(state: &AppState, actor: &User, input: ArticleInput) -> Result<Value, ApiError> {
    if !policy::can_create(actor) {
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            actor.admin_status.as_str()
        )));
    }

    let title = input.title.unwrap_or_default();
    validate_title(&title).map_err(ApiError::validation)?;

    let mut authors = match &input.authors {
        Some(value) => parse_author_ids(value)?,
        None => Vec::new(),
    };
    // The creator is always on the byline.
    if !authors.contains(&actor.id) {
        authors.push(actor.id);
    }
    ensure_authors_exist(state, &authors).await?;

    let article_content = content::normalize(input.article_content.as_ref())?;
    let tags = match &input.tags {
        Some(value) => parse_tags(value)?,
        None => Vec::new(),
    };

    let cover_picture_url = cover::resolve(
        state.blobs.as_ref(),
        None,
        input.cover_upload,
        truthy(input.remove_cover.as_ref()),
        input.cover_picture_url.as_deref(),
    )
    .await?;

    let now = Utc::now();
    let article = Article {
        id: Uuid::new_v4(),
        title,
        published_date: now,
        last_edited: now,
        authors,
        cover_picture_url,
        article_content,
        pinned: false,
        tags,
    };

    let stored = state.articles.insert(&article).await?;
    link_authors(state, stored.id, &stored.authors).await;

    Ok(serde_json::to_value(&stored)?)
}

pub async fn update(
    state: &AppState,
    actor: &User,
    id: Uuid,
    input: ArticleInput,
) -> Result<Value, ApiError> {
    let article = require_article(state, id).await?;
    if !policy::can_mutate(actor, &article.authors) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to update this article",
            actor.id
        )));
    }

    let mut patch = Map::new();

    if let Some(title) = input.title {
        validate_title(&title).map_err(ApiError::validation)?;
        patch.insert("title".to_string(), json!(title));
    }

    if let Some(value) = input.article_content.as_ref() {
        let article_content: ArticleContent = content::normalize(Some(value))?;
        patch.insert("article_content".to_string(), serde_json::to_value(article_content)?);
    }

    if let Some(value) = input.tags.as_ref() {
        let tags = parse_tags(value)?;
        patch.insert("tags".to_string(), serde_json::to_value(tags)?);
    }

    if let Some(value) = input.authors.as_ref() {
        // Replaces the byline wholesale. User.articles back-references are
        // maintained on create and delete only, so a byline edit can leave a
        // removed author's profile still listing this article.
        let authors = parse_author_ids(value)?;
        if authors.is_empty() {
            return Err(ApiError::validation("An article must have at least one author"));
        }
        ensure_authors_exist(state, &authors).await?;
        patch.insert("authors".to_string(), serde_json::to_value(&authors)?);
    }

    let cover_changed = input.cover_upload.is_some()
        || truthy(input.remove_cover.as_ref())
        || input.cover_picture_url.is_some();
    if cover_changed {
        let url = cover::resolve(
            state.blobs.as_ref(),
            Some(&article.cover_picture_url),
            input.cover_upload,
            truthy(input.remove_cover.as_ref()),
            input.cover_picture_url.as_deref(),
        )
        .await?;
        patch.insert("cover_picture_url".to_string(), json!(url));
    }

    // published_date and pinned are never touched here; pinning has its own
    // admin-only endpoint.
    patch.insert("last_edited".to_string(), serde_json::to_value(Utc::now())?);

    let updated = state
        .articles
        .update(id, patch)
        .await?
        .ok_or_else(|| article_not_found(id))?;

    let doc = serde_json::to_value(&updated)?;
    expand_one(state, doc, AUTHOR_SUMMARY_FIELDS).await
}

pub async fn delete(state: &AppState, actor: &User, id: Uuid) -> Result<(), ApiError> {
    let article = require_article(state, id).await?;
    if !policy::can_mutate(actor, &article.authors) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to delete this article",
            actor.id
        )));
    }

    unlink_authors(state, id, &article.authors).await;
    state.articles.delete(id).await?;
    Ok(())
}

/// Flip or explicitly set the pinned flag. An absent body toggles.
pub async fn set_pinned(
    state: &AppState,
    actor: &User,
    id: Uuid,
    explicit: Option<bool>,
) -> Result<Value, ApiError> {
    let article = require_article(state, id).await?;
    if !policy::can_pin(actor) {
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            actor.admin_status.as_str()
        )));
    }

    let pinned = explicit.unwrap_or(!article.pinned);
    let mut patch = Map::new();
    patch.insert("pinned".to_string(), json!(pinned));

    let updated = state
        .articles
        .update(id, patch)
        .await?
        .ok_or_else(|| article_not_found(id))?;
    let doc = serde_json::to_value(&updated)?;
    expand_one(state, doc, AUTHOR_SUMMARY_FIELDS).await
}

/// Public listing: filter/sort/select/page straight from the query string,
/// authors expanded to their summary view.
pub async fn list(state: &AppState, raw_query: &str) -> Result<(Pagination, Vec<Value>), ApiError> {
    let params = crate::query::params::parse(raw_query)?;
    let total = state.articles.count(&params.query.conditions).await?;
    let docs = state.articles.find_raw(&params.query).await?;
    let docs = expand_many(state, docs, AUTHOR_SUMMARY_FIELDS).await?;
    Ok((params.page.describe(total), docs))
}

/// Everything the acting user co-authors, newest first with pins on top.
pub async fn mine(state: &AppState, actor: &User) -> Result<Vec<Value>, ApiError> {
    let query = DocQuery {
        conditions: vec![Condition::eq("authors", json!(actor.id))],
        sort: ast::default_sort(),
        ..Default::default()
    };
    let docs = state.articles.find_raw(&query).await?;
    expand_many(state, docs, AUTHOR_SUMMARY_FIELDS).await
}

/// Single-article page: authors carry their full public profile.
pub async fn fetch(state: &AppState, id: Uuid) -> Result<Value, ApiError> {
    let article = require_article(state, id).await?;
    let doc = serde_json::to_value(&article)?;
    expand_one(state, doc, AUTHOR_PROFILE_FIELDS).await
}

async fn require_article(state: &AppState, id: Uuid) -> Result<Article, ApiError> {
    state
        .articles
        .get(id)
        .await?
        .ok_or_else(|| article_not_found(id))
}

fn article_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Article not found with id of {}", id))
}

/// Every id on a byline must name a real account.
async fn ensure_authors_exist(state: &AppState, authors: &[Uuid]) -> Result<(), ApiError> {
    let ids: Vec<Value> = authors.iter().map(|a| json!(a)).collect();
    let query = DocQuery {
        conditions: vec![Condition {
            field: "id".to_string(),
            op: CompareOp::In,
            value: Value::Array(ids),
        }],
        projection: Some(vec!["id".to_string()]),
        ..Default::default()
    };
    let found = state.users.find_raw(&query).await?;
    let found: Vec<&str> = found
        .iter()
        .filter_map(|user| user.get("id").and_then(Value::as_str))
        .collect();
    for author in authors {
        let id = author.to_string();
        if !found.contains(&id.as_str()) {
            return Err(ApiError::validation(format!("Author not found with id of {}", author)));
        }
    }
    Ok(())
}

/// Replace author id lists with the requested field view of each user.
/// Ids that resolve to no user are dropped, never exposed as bare strings.
async fn expand_many(
    state: &AppState,
    mut docs: Vec<Value>,
    fields: &[&str],
) -> Result<Vec<Value>, ApiError> {
    let mut ids: Vec<Value> = Vec::new();
    for doc in &docs {
        let Some(authors) = doc.get("authors").and_then(Value::as_array) else { continue };
        for author in authors {
            if author.is_string() && !ids.contains(author) {
                ids.push(author.clone());
            }
        }
    }
    if ids.is_empty() {
        return Ok(docs);
    }

    let query = DocQuery {
        conditions: vec![Condition {
            field: "id".to_string(),
            op: CompareOp::In,
            value: Value::Array(ids),
        }],
        ..Default::default()
    };
    let users = state.users.find_raw(&query).await?;
    let by_id: HashMap<String, Value> = users
        .into_iter()
        .filter_map(|user| {
            let id = user.get("id")?.as_str()?.to_string();
            Some((id, field_view(&user, fields)))
        })
        .collect();

    for doc in &mut docs {
        let Some(authors) = doc.get_mut("authors").and_then(Value::as_array_mut) else { continue };
        *authors = authors
            .iter()
            .filter_map(|a| a.as_str().and_then(|id| by_id.get(id)).cloned())
            .collect();
    }
    Ok(docs)
}

async fn expand_one(state: &AppState, doc: Value, fields: &[&str]) -> Result<Value, ApiError> {
    let mut docs = expand_many(state, vec![doc], fields).await?;
    docs.pop()
        .ok_or_else(|| ApiError::internal("Failed to format response"))
}

fn field_view(doc: &Value, fields: &[&str]) -> Value {
    let mut out = Map::new();
    if let Some(map) = doc.as_object() {
        for field in fields {
            if let Some(value) = map.get(*field) {
                out.insert((*field).to_string(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn parse_author_ids(value: &Value) -> Result<Vec<Uuid>, ApiError> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::String(_) => vec![value],
        _ => return Err(ApiError::validation("authors must be a list of user ids")),
    };

    let mut ids = Vec::new();
    for item in items {
        let raw = item
            .as_str()
            .ok_or_else(|| ApiError::validation("authors must be a list of user ids"))?;
        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::validation(format!("Invalid author id: {}", raw)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn parse_tags(value: &Value) -> Result<Vec<Tag>, ApiError> {
    let names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::validation("tags must be a list of tag names"))
            })
            .collect::<Result<_, _>>()?,
        Value::String(joined) => joined
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => return Err(ApiError::validation("tags must be a list of tag names")),
    };

    let mut tags = Vec::new();
    for name in names {
        let tag = Tag::parse(&name)
            .ok_or_else(|| ApiError::validation(format!("Invalid tag: {}", name)))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Record the new article on each author's profile. Failures are logged and
/// never fail the create that triggered them.
async fn link_authors(state: &AppState, article_id: Uuid, authors: &[Uuid]) {
    let results = join_all(
        authors
            .iter()
            .map(|author| state.users.push_unique(*author, "articles", json!(article_id))),
    )
    .await;
    for (author, result) in authors.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!("failed to link article {} to author {}: {}", article_id, author, e);
        }
    }
}

async fn unlink_authors(state: &AppState, article_id: Uuid, authors: &[Uuid]) {
    let results = join_all(
        authors
            .iter()
            .map(|author| state.users.pull(*author, "articles", json!(article_id))),
    )
    .await;
    for (author, result) in authors.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(
                "failed to unlink article {} from author {}: {}",
                article_id,
                author,
                e
            );
        }
    }
}
