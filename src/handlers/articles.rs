//! Article endpoints.
//!
//! Create and update accept either a JSON body or multipart form data; the
//! multipart shape carries the cover image under the `coverImage` field with
//! the remaining article fields as text parts.

use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Path, RawQuery, Request, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api;
use crate::articles::{service, ArticleInput};
use crate::config;
use crate::content::cover::CoverUpload;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub async fn list_articles(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let (pagination, docs) = service::list(&state, raw.as_deref().unwrap_or("")).await?;
    Ok(api::page(&pagination, docs))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;
    let doc = service::fetch(&state, id).await?;
    Ok(api::ok(doc))
}

pub async fn my_articles(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let docs = service::mine(&state, &user).await?;
    Ok(api::list(docs))
}

pub async fn create_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_article_input(request).await?;
    let doc = service::create(&state, &user, input).await?;
    Ok((StatusCode::CREATED, api::ok(doc)))
}

pub async fn update_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;
    let input = read_article_input(request).await?;
    let doc = service::update(&state, &user, id, input).await?;
    Ok(api::ok(doc))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;
    service::delete(&state, &user, id).await?;
    Ok(api::ok(json!({})))
}

pub async fn pin_article(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_article_id(&id)?;
    // No body (or no pinned field) means toggle.
    let explicit = body.and_then(|Json(v)| v.get("pinned").and_then(Value::as_bool));
    let doc = service::set_pinned(&state, &user, id, explicit).await?;
    Ok(api::ok(doc))
}

/// A malformed id cannot name any article, so it reports the same 404 as an
/// unknown one.
fn parse_article_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::not_found(format!("Article not found with id of {}", raw)))
}

async fn read_article_input(request: Request) -> Result<ArticleInput, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| ApiError::validation("Malformed multipart request"))?;
        read_multipart_input(multipart).await
    } else {
        let limit = config::config().uploads.max_request_size_bytes;
        let bytes = to_bytes(request.into_body(), limit)
            .await
            .map_err(|_| ApiError::validation("Request body too large or unreadable"))?;
        if bytes.is_empty() {
            return Ok(ArticleInput::default());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::validation(format!("Invalid JSON body: {}", e)))
    }
}

async fn read_multipart_input(mut multipart: Multipart) -> Result<ArticleInput, ApiError> {
    let mut input = ArticleInput::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "coverImage" => {
                let filename = field.file_name().unwrap_or("cover").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read upload: {}", e)))?;
                input.cover_upload = Some(CoverUpload { filename, bytes: bytes.to_vec() });
            }
            "title" => input.title = Some(read_text(field).await?),
            "cover_picture_url" => input.cover_picture_url = Some(read_text(field).await?),
            "pinned" => input.pinned = read_text(field).await?.parse().ok(),
            "remove_cover" => input.remove_cover = Some(json_or_string(&read_text(field).await?)),
            // Structured fields arrive JSON-encoded in form data.
            "tags" => input.tags = Some(json_or_string(&read_text(field).await?)),
            "authors" => input.authors = Some(json_or_string(&read_text(field).await?)),
            "article_content" => {
                input.article_content = Some(json_or_string(&read_text(field).await?))
            }
            _ => {}
        }
    }
    Ok(input)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart field: {}", e)))
}

fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
