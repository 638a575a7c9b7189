//! HTTP 层集成测试
//!
//! 使用内存存储组装完整路由，通过 `oneshot` 发送请求。

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use aid_api::{routes, state::AppState};
use aid_coordination::{Repositories, User};
use aid_shared::config::LifecycleConfig;

struct TestServer {
    repos: Repositories,
    app: Router,
}

impl TestServer {
    fn new() -> Self {
        let repos = Repositories::in_memory();
        let state = AppState::in_memory(repos.clone(), LifecycleConfig::default());
        Self {
            repos,
            app: routes::app(state),
        }
    }

    async fn user(&self, name: &str, neighborhood: &str, verified: bool) -> User {
        let user = User::new(
            name,
            format!("{}@example.com", name.to_lowercase()),
            neighborhood,
            verified,
        );
        self.repos.users.create(&user).await.unwrap();
        user
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        as_user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = as_user {
            builder = builder
                .header("x-user-id", user.id.to_string())
                .header("x-user-name", &user.name)
                .header("x-user-neighborhood", &user.neighborhood)
                .header("x-user-verified", user.verified.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn post_body(title: &str) -> Value {
    json!({
        "type": "request",
        "category": "food",
        "title": title,
        "description": "Could use a hand",
        "coordinates": [-122.4194, 37.7749]
    })
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::new();
    let (status, body) = server.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let server = TestServer::new();
    let (status, body) = server
        .send("GET", "/api/posts/neighborhood/Oak", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unverified_cannot_create_post() {
    let server = TestServer::new();
    let newcomer = server.user("Nina", "Oak", false).await;

    let (status, body) = server
        .send("POST", "/api/posts", Some(&newcomer), Some(post_body("Groceries")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // 非认证用户仍可浏览
    let (status, _) = server
        .send("GET", "/api/posts/neighborhood/Oak", Some(&newcomer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_post_lifecycle_over_http() {
    let server = TestServer::new();
    let alice = server.user("Alice", "Oak", true).await;
    let bob = server.user("Bob", "Oak", true).await;

    let (status, body) = server
        .send("POST", "/api/posts", Some(&alice), Some(post_body("Groceries")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["location"]["type"], "Point");
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .send(
            "POST",
            &format!("/api/posts/{post_id}/respond"),
            Some(&bob),
            Some(json!({"message": "I can help"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["responses"][0]["message"], "I can help");

    let (status, body) = server
        .send(
            "POST",
            &format!("/api/posts/{post_id}/assign/{}", bob.id),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in-progress");
    assert_eq!(body["data"]["assignedTo"]["id"], bob.id.to_string());

    let (status, _) = server
        .send("POST", &format!("/api/posts/{post_id}/complete"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let rate_uri = format!("/api/posts/{post_id}/rate");
    let (status, body) = server
        .send("POST", &rate_uri, Some(&alice), Some(json!({"rating": 5})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"], 5);

    let (status, body) = server
        .send("POST", &rate_uri, Some(&alice), Some(json!({"rating": 4})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");

    let (status, body) = server
        .send("GET", &format!("/api/users/profile/{}", bob.id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["karma"], 15);
    assert_eq!(body["data"]["ratings"]["count"], 1);
    assert!(body["data"].get("email").is_none());
}

#[tokio::test]
async fn test_validation_and_not_found() {
    let server = TestServer::new();
    let alice = server.user("Alice", "Oak", true).await;

    let mut bad = post_body("");
    bad["coordinates"] = json!([1.0, 2.0, 3.0]);
    let (status, body) = server
        .send("POST", "/api/posts", Some(&alice), Some(bad))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = server
        .send("GET", &format!("/api/posts/{}", Uuid::new_v4()), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "POST_NOT_FOUND");

    let (status, _) = server
        .send("GET", "/api/posts/nearby?lng=-122.4194&lat=37.7749", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_emergency_over_http() {
    let server = TestServer::new();
    let carol = server.user("Carol", "Oak", true).await;
    let dave = server.user("Dave", "Oak", true).await;

    let (status, body) = server
        .send(
            "POST",
            "/api/emergency/alert",
            Some(&carol),
            Some(json!({
                "type": "medical",
                "message": "Need AED",
                "coordinates": [-122.4194, 37.7749]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .send("POST", &format!("/api/emergency/{id}/respond"), Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PERMISSION_DENIED");

    let (status, body) = server
        .send("POST", &format!("/api/emergency/{id}/respond"), Some(&dave), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["responders"][0]["user"]["id"], dave.id.to_string());

    let (status, body) = server
        .send("GET", "/api/emergency/neighborhood/Oak", Some(&dave), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = server
        .send("POST", &format!("/api/emergency/{id}/resolve"), Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");

    let (status, _) = server
        .send("POST", &format!("/api/emergency/{id}/resolve"), Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_chat_gate_over_http() {
    let server = TestServer::new();
    let alice = server.user("Alice", "Oak", true).await;
    let bob = server.user("Bob", "Oak", true).await;
    let eve = server.user("Eve", "Oak", true).await;

    let (_, body) = server
        .send("POST", "/api/posts", Some(&alice), Some(post_body("Ride")))
        .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();
    let chat_uri = format!("/api/chat/post/{post_id}");

    // 指派前没有会话
    let (status, body) = server.send("GET", &chat_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PRECONDITION_FAILED");

    server
        .send(
            "POST",
            &format!("/api/posts/{post_id}/assign/{}", bob.id),
            Some(&alice),
            None,
        )
        .await;

    let (status, body) = server
        .send(
            "POST",
            &format!("{chat_uri}/message"),
            Some(&bob),
            Some(json!({"content": "On my way"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "On my way");

    let (status, _) = server
        .send(
            "POST",
            &format!("{chat_uri}/message"),
            Some(&eve),
            Some(json!({"content": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .send("POST", &format!("{chat_uri}/read"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["marked"], 1);
}

#[tokio::test]
async fn test_chat_stream_is_gated() {
    let server = TestServer::new();
    let alice = server.user("Alice", "Oak", true).await;
    let bob = server.user("Bob", "Oak", true).await;
    let eve = server.user("Eve", "Oak", true).await;

    let (_, body) = server
        .send("POST", "/api/posts", Some(&alice), Some(post_body("Tools")))
        .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();
    server
        .send(
            "POST",
            &format!("/api/posts/{post_id}/assign/{}", bob.id),
            Some(&alice),
            None,
        )
        .await;

    let (status, _) = server
        .send("GET", &format!("/api/stream/chat/{post_id}"), Some(&eve), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // SSE 响应体不会结束，只检查响应头
    let request = Request::builder()
        .uri(format!("/api/stream/chat/{post_id}"))
        .header("x-user-id", bob.id.to_string())
        .header("x-user-neighborhood", "Oak")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_neighborhood_stream_delivers_events() {
    let server = TestServer::new();
    let carol = server.user("Carol", "Oak", true).await;

    let request = Request::builder()
        .uri("/api/stream/neighborhood/Oak")
        .header("x-user-id", carol.id.to_string())
        .header("x-user-name", &carol.name)
        .header("x-user-neighborhood", "Oak")
        .header("x-user-verified", "true")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let (status, _) = server
        .send(
            "POST",
            "/api/emergency/alert",
            Some(&carol),
            Some(json!({
                "type": "safety",
                "message": "Downed wire",
                "coordinates": [-122.4194, 37.7749]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), body.frame())
        .await
        .expect("stream frame")
        .expect("stream open")
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: new-emergency"), "{text}");
    assert!(text.contains("Downed wire"));
}
