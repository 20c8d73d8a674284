use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Access level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Author,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "author" => Some(Role::Author),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Author => "author",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    /// Argon2 hash; stripped from every outward-facing serialization.
    pub password_hash: String,
    pub admin_status: Role,
    /// Back-reference to authored articles. The article's author list is the
    /// source of truth; this list is kept consistent by the article service.
    #[serde(default)]
    pub articles: Vec<Uuid>,
    #[serde(default)]
    pub personal_bio: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub class_year: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

/// Fields exposed when authors are attached to article listings.
pub const AUTHOR_SUMMARY_FIELDS: &[&str] = &["id", "name", "username", "profile_picture_url"];

/// Fields exposed on the single-article page (full author profile).
pub const AUTHOR_PROFILE_FIELDS: &[&str] = &[
    "id",
    "name",
    "username",
    "profile_picture_url",
    "linkedin_url",
    "github_url",
    "personal_bio",
];

/// Profile fields a user may change through PUT /api/users/me.
pub const UPDATABLE_PROFILE_FIELDS: &[&str] = &[
    "name",
    "linkedin_url",
    "personal_bio",
    "class_year",
    "github_url",
    "profile_picture_url",
];

/// Remove fields that must never leave the server from a user document.
pub fn sanitize_user(mut doc: Value) -> Value {
    if let Some(map) = doc.as_object_mut() {
        map.remove("password_hash");
    }
    doc
}
