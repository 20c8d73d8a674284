//! Account lifecycle: registration, login, profile reads and edits, and the
//! admin-only role change.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth;
use crate::error::ApiError;
use crate::models::user::{sanitize_user, UPDATABLE_PROFILE_FIELDS};
use crate::models::{Role, User};
use crate::query::{CompareOp, Condition, DocQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Token plus the user summary returned by register and login.
#[derive(Debug)]
pub struct AuthGrant {
    pub token: String,
    pub user: Value,
}

fn grant(user: &User) -> Result<AuthGrant, ApiError> {
    let token = auth::issue_token(user)?;
    Ok(AuthGrant {
        token,
        user: json!({
            "id": user.id,
            "name": user.name,
            "username": user.username,
            "email": user.email,
            "admin_status": user.admin_status,
        }),
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthGrant, ApiError> {
    if req.username.trim().is_empty()
        || req.email.trim().is_empty()
        || req.name.trim().is_empty()
        || req.password.is_empty()
    {
        return Err(ApiError::validation(
            "Please provide a username, email, name and password",
        ));
    }

    let email_taken = state
        .users
        .find_one(vec![Condition::eq("email", json!(req.email))])
        .await?
        .is_some();
    let username_taken = state
        .users
        .find_one(vec![Condition::eq("username", json!(req.username))])
        .await?
        .is_some();
    if email_taken || username_taken {
        return Err(ApiError::conflict(
            "User already exists with that email or username",
        ));
    }

    let user = User {
        id: Uuid::new_v4(),
        username: req.username,
        email: req.email,
        name: req.name,
        password_hash: auth::hash_password(&req.password)?,
        // Everyone starts as an author; admins are promoted by hand.
        admin_status: Role::Author,
        articles: vec![],
        personal_bio: None,
        linkedin_url: None,
        github_url: None,
        class_year: None,
        profile_picture_url: None,
    };
    let stored = state.users.insert(&user).await?;
    grant(&stored)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please provide an email and password"));
    }

    let user = state
        .users
        .find_one(vec![Condition::eq("email", json!(email))])
        .await?;
    // Same answer for unknown email and wrong password.
    let user = match user {
        Some(user) if auth::verify_password(password, &user.password_hash) => user,
        _ => return Err(ApiError::unauthorized("Invalid credentials")),
    };
    grant(&user)
}

/// The acting user's own record, with authored articles expanded in full.
pub async fn me(state: &AppState, user: &User) -> Result<Value, ApiError> {
    let doc = sanitize_user(serde_json::to_value(user)?);
    expand_articles(state, doc).await
}

/// Apply a profile edit. Only whitelisted fields move; anything else in the
/// body (email, admin_status, password_hash) is ignored rather than rejected.
pub async fn update_profile(state: &AppState, user: &User, body: &Value) -> Result<Value, ApiError> {
    let mut patch = Map::new();
    if let Some(map) = body.as_object() {
        for field in UPDATABLE_PROFILE_FIELDS {
            if let Some(value) = map.get(*field) {
                patch.insert((*field).to_string(), value.clone());
            }
        }
    }

    if patch.is_empty() {
        return Ok(sanitize_user(serde_json::to_value(user)?));
    }

    let updated = state
        .users
        .update(user.id, patch)
        .await?
        .ok_or_else(|| user_not_found(user.id))?;
    Ok(sanitize_user(serde_json::to_value(&updated)?))
}

/// Public author profile with their articles expanded.
pub async fn fetch(state: &AppState, id: Uuid) -> Result<Value, ApiError> {
    let user = state.users.get(id).await?.ok_or_else(|| user_not_found(id))?;
    let doc = sanitize_user(serde_json::to_value(&user)?);
    expand_articles(state, doc).await
}

/// Full account listing for admins.
pub async fn list(state: &AppState) -> Result<Vec<Value>, ApiError> {
    let docs = state.users.find_raw(&DocQuery::default()).await?;
    Ok(docs.into_iter().map(sanitize_user).collect())
}

pub async fn update_role(state: &AppState, id: Uuid, role: &str) -> Result<Value, ApiError> {
    let role = Role::parse(role).ok_or_else(|| ApiError::validation("Please provide a valid role"))?;
    let mut patch = Map::new();
    patch.insert("admin_status".to_string(), json!(role.as_str()));
    let updated = state
        .users
        .update(id, patch)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(sanitize_user(serde_json::to_value(&updated)?))
}

fn user_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("User not found with id of {}", id))
}

/// Replace the id list under `articles` with the full article documents.
/// Dangling ids (the update-path gap, or a failed unlink) are dropped.
async fn expand_articles(state: &AppState, mut doc: Value) -> Result<Value, ApiError> {
    let ids: Vec<Value> = doc
        .get("articles")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter(|v| v.is_string()).cloned().collect())
        .unwrap_or_default();
    if ids.is_empty() {
        return Ok(doc);
    }

    let query = DocQuery {
        conditions: vec![Condition {
            field: "id".to_string(),
            op: CompareOp::In,
            value: Value::Array(ids),
        }],
        ..Default::default()
    };
    let articles = state.articles.find_raw(&query).await?;
    if let Some(slot) = doc.get_mut("articles") {
        *slot = Value::Array(articles);
    }
    Ok(doc)
}
