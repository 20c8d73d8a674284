mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn article_lifecycle_with_shared_authorship() -> Result<()> {
    let app = common::spawn_app().await?;
    let (ada_token, ada_id) = app.register("ada").await?;
    let (bob_token, _) = app.register("bob").await?;
    let (carol_token, carol_id) = app.register("carol").await?;
    app.promote_to_admin(&carol_id).await?;

    // Creating without a token is rejected outright.
    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .json(&json!({"title": "Nope", "article_content": "x"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Create with defaults: unpinned, sentinel cover, creator on the byline.
    let doc = app
        .create_article(
            &ada_token,
            json!({
                "title": "Shipping the parser",
                "article_content": "<p>hello</p>",
                "tags": ["engineering"],
            }),
        )
        .await?;
    assert_eq!(doc["pinned"], json!(false));
    assert_eq!(doc["cover_picture_url"], json!("default-cover.jpg"));
    assert_eq!(doc["tags"], json!(["engineering"]));
    assert_eq!(doc["article_content"], json!({"content": "<p>hello</p>"}));
    assert_eq!(doc["authors"], json!([ada_id]));
    assert_eq!(doc["published_date"], doc["last_edited"]);
    let article_id = doc["id"].as_str().unwrap().to_string();

    // The byline lands on the author's profile.
    let res = app
        .client
        .get(format!("{}/api/users/{}", app.base_url, ada_id))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["articles"][0]["id"], json!(article_id));

    // A missing article reads as missing even to a user who could not edit it.
    let ghost = uuid::Uuid::new_v4();
    let res = app
        .client
        .put(format!("{}/api/articles/{}", app.base_url, ghost))
        .bearer_auth(&bob_token)
        .json(&json!({"title": "X"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // A non-author cannot touch it; an admin can.
    let res = app
        .client
        .put(format!("{}/api/articles/{}", app.base_url, article_id))
        .bearer_auth(&bob_token)
        .json(&json!({"title": "Hijacked"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .put(format!("{}/api/articles/{}", app.base_url, article_id))
        .bearer_auth(&carol_token)
        .json(&json!({"title": "Shipping the parser, redux", "pinned": true}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let updated = &body["data"];
    assert_eq!(updated["title"], json!("Shipping the parser, redux"));
    // published_date survives edits, last_edited moves, pinned is untouchable here
    assert_eq!(updated["published_date"], doc["published_date"]);
    assert_ne!(updated["last_edited"], doc["last_edited"]);
    assert_eq!(updated["pinned"], json!(false));
    // updates expand authors to their summary view
    assert_eq!(updated["authors"][0]["username"], json!("ada"));
    assert!(updated["authors"][0].get("email").is_none());

    // Pinning is admin-only and toggles without a body.
    let res = app
        .client
        .patch(format!("{}/api/articles/{}/pin", app.base_url, article_id))
        .bearer_auth(&ada_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .patch(format!("{}/api/articles/{}/pin", app.base_url, article_id))
        .bearer_auth(&carol_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["pinned"], json!(true));

    let res = app
        .client
        .patch(format!("{}/api/articles/{}/pin", app.base_url, article_id))
        .bearer_auth(&carol_token)
        .json(&json!({"pinned": true}))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["pinned"], json!(true));

    // /mine lists only the caller's articles.
    let res = app
        .client
        .get(format!("{}/api/articles/mine", app.base_url))
        .bearer_auth(&bob_token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["count"], json!(0));

    let res = app
        .client
        .get(format!("{}/api/articles/mine", app.base_url))
        .bearer_auth(&ada_token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["count"], json!(1));

    // Deleting clears the article and the author's back-reference.
    let res = app
        .client
        .delete(format!("{}/api/articles/{}", app.base_url, article_id))
        .bearer_auth(&ada_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client
        .get(format!("{}/api/articles/{}", app.base_url, article_id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .client
        .get(format!("{}/api/users/{}", app.base_url, ada_id))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["articles"], json!([]));

    Ok(())
}

#[tokio::test]
async fn single_article_page_expands_full_author_profiles() -> Result<()> {
    let app = common::spawn_app().await?;
    let (ada_token, _) = app.register("ada").await?;

    app.client
        .put(format!("{}/api/users/me", app.base_url))
        .bearer_auth(&ada_token)
        .json(&json!({"personal_bio": "Compilers person", "github_url": "https://github.com/ada"}))
        .send()
        .await?;

    let doc = app
        .create_article(&ada_token, json!({"title": "T", "article_content": "x"}))
        .await?;

    let res = app
        .client
        .get(format!("{}/api/articles/{}", app.base_url, doc["id"].as_str().unwrap()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let author = &body["data"]["authors"][0];
    assert_eq!(author["personal_bio"], json!("Compilers person"));
    assert_eq!(author["github_url"], json!("https://github.com/ada"));
    assert!(author.get("email").is_none());
    assert!(author.get("password_hash").is_none());

    Ok(())
}

#[tokio::test]
async fn validation_errors_use_the_envelope() -> Result<()> {
    let app = common::spawn_app().await?;
    let (token, _) = app.register("ada").await?;

    // Missing title
    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .bearer_auth(&token)
        .json(&json!({"article_content": "x"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Please add a title"));

    // Over-long title
    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .bearer_auth(&token)
        .json(&json!({"title": "x".repeat(201), "article_content": "x"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!("Title cannot be more than 200 characters"));

    // Missing content
    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .bearer_auth(&token)
        .json(&json!({"title": "T"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unknown tag
    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .bearer_auth(&token)
        .json(&json!({"title": "T", "article_content": "x", "tags": ["sports"]}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn multipart_create_stores_the_cover() -> Result<()> {
    let app = common::spawn_app().await?;
    let (token, _) = app.register("ada").await?;

    let form = reqwest::multipart::Form::new()
        .text("title", "With a cover")
        .text("article_content", "<p>hi</p>")
        .text("tags", r#"["products"]"#)
        .part(
            "coverImage",
            reqwest::multipart::Part::bytes(b"not-really-a-png".to_vec())
                .file_name("Team Photo.PNG"),
        );

    let res = app
        .client
        .post(format!("{}/api/articles", app.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let doc = &body["data"];
    let cover = doc["cover_picture_url"].as_str().unwrap();
    assert!(cover.starts_with("/uploads/covers/"), "got {}", cover);
    assert!(cover.ends_with("-team-photo.png"), "got {}", cover);
    assert_eq!(doc["tags"], json!(["products"]));
    let article_id = doc["id"].as_str().unwrap().to_string();

    // Removing the cover restores the sentinel.
    let res = app
        .client
        .put(format!("{}/api/articles/{}", app.base_url, article_id))
        .bearer_auth(&token)
        .json(&json!({"remove_cover": true}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["cover_picture_url"], json!("default-cover.jpg"));

    Ok(())
}
