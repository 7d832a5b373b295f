use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use course_catalog::{auth::TOKEN_HEADER, user::UserService};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestSetup {
    /// Send a request through the full router
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> ApiResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        ApiResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> ApiResponse {
        self.send("GET", uri, None, None).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResponse {
        self.send(
            "POST",
            "/register",
            None,
            Some(json!({"name": name, "email": email, "password": password})),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResponse {
        self.send(
            "POST",
            "/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Register and log in, returning the issued token
    pub async fn token_for_new_user(&self, name: &str, email: &str) -> String {
        let registered = self.register(name, email, "pa55word").await;
        assert_eq!(registered.status, StatusCode::CREATED);
        self.login_token(email, "pa55word").await
    }

    /// Create the administrator the way startup does, then log in as them
    pub async fn admin_token(&self, name: &str, email: &str) -> String {
        UserService::new(self.users.clone(), self.token_service.clone())
            .bootstrap_admin(name, email, "adm1n-pass".to_string())
            .await
            .unwrap()
            .expect("administrator should not exist yet");
        self.login_token(email, "adm1n-pass").await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> String {
        let logged_in = self.login(email, password).await;
        assert_eq!(logged_in.status, StatusCode::OK);
        logged_in.body["token"].as_str().unwrap().to_string()
    }

    pub fn course_ids(response: &ApiResponse) -> Vec<i64> {
        response
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect()
    }
}
