use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use user_gateway::framework::controller;
use user_gateway::lifecycle::{with_middleware, Config, Gateway};
use user_gateway::store::mock::MockStore;
use user_gateway::user::{self, USER_PATH};

/// Starts a gateway on an ephemeral port and returns its base URL.
async fn start_server() -> String {
    let config = Config {
        port: 0,
        request_timeout: Duration::from_secs(5),
        store_buffer: 16,
    };
    let gateway = Gateway::new(&config);
    serve(gateway.router()).await
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn users_url(base: &str) -> String {
    format!("{base}/api/v1/user")
}

async fn post_user(client: &Client, base: &str, body: Value) -> StatusCode {
    client
        .post(users_url(base))
        .json(&body)
        .send()
        .await
        .unwrap()
        .status()
}

async fn search(client: &Client, base: &str, query: &str) -> reqwest::Response {
    client
        .get(format!("{}?{query}", users_url(base)))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_pong() {
    let base = start_server().await;

    let response = reqwest::get(&base).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Pong!");
}

#[tokio::test]
async fn test_user_lifecycle() {
    let base = start_server().await;
    let client = Client::new();

    // Create
    let status = post_user(&client, &base, json!({ "id": "u1", "name": "Ann" })).await;
    assert_eq!(status, StatusCode::CREATED);

    // Read: timestamps never leave the server.
    let response = client
        .get(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "id": "u1", "name": "Ann" }));

    // Update
    let response = client
        .patch(users_url(&base))
        .json(&json!({ "id": "u1", "name": "Annie" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "Annie");

    // Delete
    let response = client
        .delete(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "user not found: u1" }));
}

#[tokio::test]
async fn test_create_rejections() {
    let base = start_server().await;
    let client = Client::new();

    // Empty id fails validation.
    let status = post_user(&client, &base, json!({ "id": "", "name": "Ann" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing id does not decode.
    let status = post_user(&client, &base, json!({ "name": "Ann" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not JSON at all.
    let response = client
        .post(users_url(&base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    // Overlong name.
    let status = post_user(&client, &base, json!({ "id": "u2", "name": "a".repeat(101) })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate id.
    let status = post_user(&client, &base, json!({ "id": "u1", "name": "Ann" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let status = post_user(&client, &base, json!({ "id": "u1", "name": "Bob" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let base = start_server().await;
    let client = Client::new();

    let response = client
        .patch(users_url(&base))
        .json(&json!({ "id": "ghost", "name": "Boo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .delete(format!("{}/ghost", users_url(&base)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_name_keeps_name() {
    let base = start_server().await;
    let client = Client::new();

    post_user(&client, &base, json!({ "id": "u1", "name": "Ann" })).await;
    let response = client
        .patch(users_url(&base))
        .json(&json!({ "id": "u1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "Ann");
}

#[tokio::test]
async fn test_search() {
    let base = start_server().await;
    let client = Client::new();

    // No records: an empty array, never null.
    let response = search(&client, &base, "q=name,EQ,Alice").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));

    for (id, name) in [("a", "Alice"), ("b", "Bob"), ("c", "Alice")] {
        post_user(&client, &base, json!({ "id": id, "name": name })).await;
    }

    let body: Value = search(&client, &base, "q=name,EQ,Alice")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!([{ "id": "a", "name": "Alice" }, { "id": "c", "name": "Alice" }])
    );

    // Predicates are ANDed.
    let body: Value = search(&client, &base, "q=name,NE,Bob&q=id,GT,a")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!([{ "id": "c", "name": "Alice" }]));

    let body: Value = search(&client, &base, "q=created,GE,2000-01-01_00:00")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    // No predicates lists everything.
    let body: Value = search(&client, &base, "").await.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_search_rejections() {
    let base = start_server().await;
    let client = Client::new();

    // Malformed term.
    let response = search(&client, &base, "q=name,EQ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown key.
    let response = search(&client, &base, "q=bogus,EQ,x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "invalid query: (key[bogus]: invalid)" }));

    // Unknown operator.
    let response = search(&client, &base, "q=name,LIKE,x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Bad timestamp.
    let response = search(&client, &base, "q=created,GT,yesterday").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_handler_panic_becomes_500() {
    // Nothing scripted: the first store call panics inside the handler.
    let users = Arc::new(user::new(MockStore::new()));
    let app = with_middleware(controller::router(USER_PATH, users, Duration::from_secs(5)));
    let base = serve(app).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/u1", users_url(&base)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Unexpected store call"), "{message}");

    // The server survives and keeps answering.
    let response = search(&client, &base, "q=bogus,EQ,x").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
