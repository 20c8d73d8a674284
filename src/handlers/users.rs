//! User and account endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::api;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::models::{Role, User};
use crate::state::AppState;
use crate::users::{service, RegisterRequest};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let granted = service::register(&state, req).await?;
    Ok((StatusCode::CREATED, api::token(granted.token, granted.user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.get("email").and_then(Value::as_str).unwrap_or("");
    let password = body.get("password").and_then(Value::as_str).unwrap_or("");
    let granted = service::login(&state, email, password).await?;
    Ok(api::token(granted.token, granted.user))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = service::me(&state, &user).await?;
    Ok(api::ok(doc))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = service::update_profile(&state, &user, &body).await?;
    Ok(api::ok(doc))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_user_id(&id)?;
    let doc = service::fetch(&state, id).await?;
    Ok(api::ok(doc))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;
    let docs = service::list(&state).await?;
    Ok(api::list(docs))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user)?;
    let id = parse_user_id(&id)?;
    // admin_status is the wire name; role is accepted as an alias.
    let role = body
        .get("admin_status")
        .or_else(|| body.get("role"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::validation("Please provide a valid role"))?;
    let doc = service::update_role(&state, id, role).await?;
    Ok(api::ok(doc))
}

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.admin_status != Role::Admin {
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            user.admin_status.as_str()
        )));
    }
    Ok(())
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::not_found(format!("User not found with id of {}", raw)))
}
