use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Authenticated user loaded from the store for the current request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Bearer-token middleware: verifies the JWT, loads the user it names, and
/// injects it into request extensions. Applied to every protected route.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    let claims = auth::verify_token(&token)?;

    // The token may outlive the account; always re-load the user.
    let user = state
        .users
        .get(claims.sub)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi".to_string()));

        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer(&headers), None);
    }
}
