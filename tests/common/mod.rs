use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use inkwell_api::handlers;
use inkwell_api::state::AppState;

/// An API instance bound to a free port with a fresh in-memory store.
/// Each test spawns its own so tests never share data.
pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

pub async fn spawn_app() -> Result<TestApp> {
    let state = AppState::in_memory();
    let app = handlers::app(state.clone());

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let base_url = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });

    Ok(TestApp {
        base_url,
        state,
        client: reqwest::Client::new(),
    })
}

impl TestApp {
    /// Register a fresh account and return its token and id.
    pub async fn register(&self, username: &str) -> Result<(String, String)> {
        let res = self
            .client
            .post(format!("{}/api/users/register", self.base_url))
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "name": username,
                "password": "hunter22",
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status().as_u16() == 201, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        let token = body["token"].as_str().context("missing token")?.to_string();
        let id = body["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, id))
    }

    /// Promote an account straight in the store; there is no bootstrap admin
    /// over HTTP.
    pub async fn promote_to_admin(&self, user_id: &str) -> Result<()> {
        let id = uuid::Uuid::parse_str(user_id)?;
        let mut patch = Map::new();
        patch.insert("admin_status".to_string(), json!("admin"));
        self.state
            .users
            .update(id, patch)
            .await?
            .context("user to promote not found")?;
        Ok(())
    }

    /// Create an article as the given user, returning the response body's data.
    pub async fn create_article(&self, token: &str, body: Value) -> Result<Value> {
        let res = self
            .client
            .post(format!("{}/api/articles", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(res.status().as_u16() == 201, "create failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }
}
