use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::models::{Role, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user id.
    pub sub: Uuid,
    pub access: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: user.id,
            access: user.admin_status,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn issue_token(user: &User) -> Result<String, ApiError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(ApiError::internal("JWT secret not configured"));
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &Claims::new(user), &encoding_key)
        .map_err(|e| ApiError::internal(format!("failed to sign token: {}", e)))
}

pub fn verify_token(token: &str) -> Result<Claims, ApiError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(ApiError::internal("JWT secret not configured"));
    }
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| ApiError::unauthorized("Not authorized to access this route"))?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else { return false };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}
