//! 会话门禁集成测试

mod common;

use aid_coordination::error::CoordinationError;
use aid_coordination::models::{PostCategory, PostType};
use aid_coordination::service::dto::CreatePostInput;
use aid_shared::events::{EventKind, Topic};
use aid_shared::fanout::EventBroker;
use common::{OAK, TestApp, next_event};
use uuid::Uuid;

fn offer() -> CreatePostInput {
    CreatePostInput {
        post_type: PostType::Offer,
        category: PostCategory::Petcare,
        title: "Dog walking".to_string(),
        description: "Weekday mornings".to_string(),
        coordinates: OAK.to_vec(),
        urgency: None,
        images: vec![],
    }
}

#[tokio::test]
async fn test_stranger_cannot_send_message() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let e = app.user("Eve", "Oak").await;

    let post = app.services.posts.create(&a, offer()).await.unwrap();
    app.services.posts.assign(&a, post.id, b.user_id).await.unwrap();

    let result = app
        .services
        .chats
        .send_message(&e, post.id, "let me in".to_string())
        .await;
    assert!(matches!(result, Err(CoordinationError::Permission(_))));

    // 非参与者即使内容非法也只得到权限错误
    for content in ["   ".to_string(), "x".repeat(5000)] {
        assert!(matches!(
            app.services.chats.send_message(&e, post.id, content).await,
            Err(CoordinationError::Permission(_))
        ));
    }

    assert!(matches!(
        app.services.chats.open(&e, post.id).await,
        Err(CoordinationError::Permission(_))
    ));
}

#[tokio::test]
async fn test_chat_requires_assignment() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let e = app.user("Eve", "Oak").await;
    let post = app.services.posts.create(&a, offer()).await.unwrap();

    assert!(matches!(
        app.services.chats.open(&a, post.id).await,
        Err(CoordinationError::Precondition(_))
    ));
    assert!(matches!(
        app.services.chats.open(&e, post.id).await,
        Err(CoordinationError::Permission(_))
    ));
    assert!(matches!(
        app.services.chats.open(&a, Uuid::new_v4()).await,
        Err(CoordinationError::PostNotFound(_))
    ));
    assert!(app.repos.chats.get_by_post(post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_or_create_returns_same_chat() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let post = app.services.posts.create(&a, offer()).await.unwrap();
    app.services.posts.assign(&a, post.id, b.user_id).await.unwrap();

    let first = app.services.chats.open(&a, post.id).await.unwrap();
    let second = app.services.chats.open(&b, post.id).await.unwrap();
    assert_eq!(first.id, second.id);

    let participants: Vec<Uuid> = first.participants.iter().map(|u| u.id).collect();
    assert_eq!(participants, vec![a.user_id, b.user_id]);
}

#[tokio::test]
async fn test_message_flow_and_mark_read() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let post = app.services.posts.create(&a, offer()).await.unwrap();
    app.services.posts.assign(&a, post.id, b.user_id).await.unwrap();

    let mut stream = app.broker.subscribe(&Topic::chat(post.id));
    let chats = &app.services.chats;

    // 首条消息惰性创建会话
    let sent = chats
        .send_message(&b, post.id, "Tuesday works?".to_string())
        .await
        .unwrap();
    assert!(!sent.read);
    assert_eq!(sent.sender.id, b.user_id);
    chats
        .send_message(&b, post.id, "Or Wednesday".to_string())
        .await
        .unwrap();
    chats
        .send_message(&a, post.id, "Tuesday!".to_string())
        .await
        .unwrap();

    let event = next_event(&mut stream).await.expect("new-message");
    assert_eq!(event.kind, EventKind::NewMessage);
    assert_eq!(event.topic, format!("chat:{}", post.id));
    assert_eq!(event.payload["message"]["content"], "Tuesday works?");

    let marked = chats.mark_read(&a, post.id).await.unwrap();
    assert_eq!(marked.marked, 2);

    let chat = chats.open(&a, post.id).await.unwrap();
    assert_eq!(chat.messages.len(), 3);
    assert!(chat.messages[0].read && chat.messages[1].read);
    assert!(!chat.messages[2].read);

    assert!(matches!(
        chats.send_message(&a, post.id, "   ".to_string()).await,
        Err(CoordinationError::Validation(_))
    ));
}

#[tokio::test]
async fn test_chat_survives_completion() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let post = app.services.posts.create(&a, offer()).await.unwrap();
    app.services.posts.assign(&a, post.id, b.user_id).await.unwrap();
    app.services.posts.complete(&a, post.id).await.unwrap();

    let sent = app
        .services
        .chats
        .send_message(&a, post.id, "Thanks again".to_string())
        .await
        .unwrap();
    assert_eq!(sent.content, "Thanks again");
}
