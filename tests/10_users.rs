mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn register_login_and_profile_flow() -> Result<()> {
    let app = common::spawn_app().await?;

    // Fresh registration grants a token and defaults to author access.
    let res = app
        .client
        .post(format!("{}/api/users/register", app.base_url))
        .json(&json!({
            "username": "ada",
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "password": "hunter22",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["admin_status"], json!("author"));
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    // Re-registering the same identity conflicts.
    let res = app
        .client
        .post(format!("{}/api/users/register", app.base_url))
        .json(&json!({
            "username": "ada",
            "email": "other@example.com",
            "name": "Imposter",
            "password": "hunter22",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("User already exists with that email or username"));

    // Wrong password and unknown email get the same answer.
    let res = app
        .client
        .post(format!("{}/api/users/login", app.base_url))
        .json(&json!({"email": "ada@example.com", "password": "wrong"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!("Invalid credentials"));

    let res = app
        .client
        .post(format!("{}/api/users/login", app.base_url))
        .json(&json!({"email": "ada@example.com", "password": "hunter22"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["token"].as_str().is_some());

    // /me requires a token.
    let res = app
        .client
        .get(format!("{}/api/users/me", app.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .get(format!("{}/api/users/me", app.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], json!("ada"));
    assert_eq!(body["data"]["articles"], json!([]));
    assert!(body["data"].get("password_hash").is_none());

    // Profile edits move whitelisted fields only; admin_status is ignored.
    let res = app
        .client
        .put(format!("{}/api/users/me", app.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Ada L.",
            "personal_bio": "Writes about compilers",
            "admin_status": "admin",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["name"], json!("Ada L."));
    assert_eq!(body["data"]["personal_bio"], json!("Writes about compilers"));
    assert_eq!(body["data"]["admin_status"], json!("author"));

    Ok(())
}

#[tokio::test]
async fn role_management_is_admin_only() -> Result<()> {
    let app = common::spawn_app().await?;
    let (ada_token, ada_id) = app.register("ada").await?;
    let (bob_token, bob_id) = app.register("bob").await?;
    app.promote_to_admin(&ada_id).await?;

    // Non-admins may neither list users nor change roles.
    let res = app
        .client
        .get(format!("{}/api/users", app.base_url))
        .bearer_auth(&bob_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!("User role author is not authorized to access this route"));

    let res = app
        .client
        .put(format!("{}/api/users/{}/role", app.base_url, ada_id))
        .bearer_auth(&bob_token)
        .json(&json!({"admin_status": "user"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Admin listing includes every account, sanitized.
    let res = app
        .client
        .get(format!("{}/api/users", app.base_url))
        .bearer_auth(&ada_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["count"], json!(2));
    for user in body["data"].as_array().unwrap() {
        assert!(user.get("password_hash").is_none());
    }

    // Role changes arrive under the admin_status key and validate the vocabulary.
    let res = app
        .client
        .put(format!("{}/api/users/{}/role", app.base_url, bob_id))
        .bearer_auth(&ada_token)
        .json(&json!({"admin_status": "superadmin"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!("Please provide a valid role"));

    let res = app
        .client
        .put(format!("{}/api/users/{}/role", app.base_url, bob_id))
        .bearer_auth(&ada_token)
        .json(&json!({"admin_status": "user"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["admin_status"], json!("user"));

    // The role alias is still honored.
    let res = app
        .client
        .put(format!("{}/api/users/{}/role", app.base_url, bob_id))
        .bearer_auth(&ada_token)
        .json(&json!({"role": "author"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["admin_status"], json!("author"));

    Ok(())
}

#[tokio::test]
async fn public_profiles_and_missing_users() -> Result<()> {
    let app = common::spawn_app().await?;
    let (_, ada_id) = app.register("ada").await?;

    // Anyone may read a profile; the hash never leaves.
    let res = app
        .client
        .get(format!("{}/api/users/{}", app.base_url, ada_id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], json!("ada"));
    assert!(body["data"].get("password_hash").is_none());

    // Unknown and malformed ids both read as missing.
    let ghost = uuid::Uuid::new_v4();
    let res = app
        .client
        .get(format!("{}/api/users/{}", app.base_url, ghost))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!(format!("User not found with id of {}", ghost)));

    let res = app
        .client
        .get(format!("{}/api/users/not-a-uuid", app.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}
