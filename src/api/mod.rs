//! Uniform response envelope helpers: `{success, data?, count?, pagination?}`.

use axum::Json;
use serde_json::{json, Value};

use crate::query::Pagination;

pub fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub fn list(data: Vec<Value>) -> Json<Value> {
    Json(json!({ "success": true, "count": data.len(), "data": data }))
}

pub fn page(pagination: &Pagination, data: Vec<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": data.len(),
        "pagination": pagination,
        "data": data,
    }))
}

pub fn token(token: String, user: Value) -> Json<Value> {
    Json(json!({ "success": true, "token": token, "user": user }))
}
