//! Integration tests for account listing, lookup, profile updates and deletion

mod common;

use common::spawn_app;
use serde_json::{json, Value};

#[tokio::test]
async fn list_accounts_returns_every_registered_user() {
    let app = spawn_app();
    let (_, access_token, _) = app.signed_in_user(1).await;
    app.signed_in_user(2).await;

    let response = app
        .client
        .get(app.url("/worko/user"))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn get_account_by_id() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;

    let response = app
        .client
        .get(app.url(&format!("/worko/user/{}", id)))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], id.as_str());
    assert_eq!(body["data"]["user"]["city"], "Seoul");
}

#[tokio::test]
async fn get_account_reports_404_and_400() {
    let app = spawn_app();
    let (_, access_token, _) = app.signed_in_user(1).await;

    let response = app
        .client
        .get(app.url(&format!("/worko/user/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(404, response.status().as_u16());

    let response = app
        .client
        .get(app.url("/worko/user/not-a-uuid"))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn put_update_changes_allowed_fields_only() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;

    let response = app
        .client
        .put(app.url(&format!("/worko/user/update/{}", id)))
        .bearer_auth(&access_token)
        .json(&json!({ "city": "Busan", "age": 41, "password": "ignored-password", "role": "admin" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["data"]["city"], "Busan");
    assert_eq!(body["data"]["age"], 41);
    assert_eq!(body["data"]["name"], "user1");

    // The password was not part of the update
    assert_eq!(
        200,
        app.login("user1@example.com", common::TEST_PASSWORD)
            .await
            .status()
            .as_u16()
    );
}

#[tokio::test]
async fn patch_update_changes_a_single_field() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;

    let response = app
        .client
        .patch(app.url(&format!("/worko/user/update-patch/{}", id)))
        .bearer_auth(&access_token)
        .json(&json!({ "zipcode": 55555 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["zipcode"], "55555");
    assert_eq!(body["data"]["city"], "Seoul");
}

#[tokio::test]
async fn update_rejects_payloads_without_allowed_fields() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;

    for body in [json!({}), json!({ "password": "new-password-123" })] {
        let response = app
            .client
            .put(app.url(&format!("/worko/user/update/{}", id)))
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(400, response.status().as_u16());
    }

    let response = app
        .client
        .patch(app.url(&format!("/worko/user/update-patch/{}", id)))
        .bearer_auth(&access_token)
        .json(&json!({ "age": "old" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn update_conflicts_with_another_accounts_email() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;
    app.signed_in_user(2).await;

    let response = app
        .client
        .patch(app.url(&format!("/worko/user/update-patch/{}", id)))
        .bearer_auth(&access_token)
        .json(&json!({ "email": "user2@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn update_of_another_account_is_forbidden() {
    let app = spawn_app();
    let (_, access_token, _) = app.signed_in_user(1).await;
    let (other_id, _, _) = app.signed_in_user(2).await;

    let response = app
        .client
        .put(app.url(&format!("/worko/user/update/{}", other_id)))
        .bearer_auth(&access_token)
        .json(&json!({ "city": "Incheon" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(403, response.status().as_u16());

    let response = app
        .client
        .patch(app.url(&format!("/worko/user/update-patch/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&access_token)
        .json(&json!({ "city": "Incheon" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn delete_removes_the_account_and_its_session() {
    let app = spawn_app();
    let (id, access_token, _) = app.signed_in_user(1).await;
    let (_, other_token, _) = app.signed_in_user(2).await;

    let response = app
        .client
        .delete(app.url("/worko/user/delete"))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    // The access token no longer resolves to an account
    let response = app
        .client
        .get(app.url("/worko/user"))
        .bearer_auth(&access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/worko/user/{}", id)))
        .bearer_auth(&other_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(404, response.status().as_u16());

    // Email and zipcode are free again
    assert_eq!(
        201,
        app.register(&common::registration_body(1)).await.status().as_u16()
    );
}
