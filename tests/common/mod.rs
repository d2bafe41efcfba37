//! Shared helpers for the HTTP integration tests

use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use worko::configuration::JwtSettings;
use worko::startup::run;
use worko::store::{AccountStore, InMemoryAccountStore};

pub const TEST_HASH_COST: u32 = 4;
pub const TEST_PASSWORD: &str = "s3cret-password";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret-0123456789abcdef".to_string(),
        refresh_secret: "integration-refresh-secret-0123456789abcdef".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "worko-tests".to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    let store: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
    spawn_app_with_store(store)
}

pub fn spawn_app_with_store(store: Arc<dyn AccountStore>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server =
        run(listener, store, test_jwt_settings(), TEST_HASH_COST).expect("Failed to create server");

    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// Registration body for the n-th test user; email and zipcode are unique per `n`
pub fn registration_body(n: u32) -> Value {
    json!({
        "email": format!("user{}@example.com", n),
        "name": format!("User{}", n),
        "age": 30,
        "city": "Seoul",
        "zipcode": 10000 + n,
        "password": TEST_PASSWORD,
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/worko/user/CreateUser"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/worko/user/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register user `n`, log in and return (account id, access token, refresh token)
    pub async fn signed_in_user(&self, n: u32) -> (String, String, String) {
        let body = registration_body(n);
        let response = self.register(&body).await;
        assert_eq!(201, response.status().as_u16());

        let response = self
            .login(body["email"].as_str().unwrap(), TEST_PASSWORD)
            .await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.unwrap();
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }
}
