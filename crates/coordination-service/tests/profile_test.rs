//! 用户资料与排行榜集成测试

mod common;

use aid_coordination::error::CoordinationError;
use aid_coordination::models::User;
use common::TestApp;
use uuid::Uuid;

#[tokio::test]
async fn test_leaderboard_orders_verified_by_karma() {
    let app = TestApp::new();
    let mut users = Vec::new();
    for (name, karma, verified, neighborhood) in [
        ("Low", 5, true, "Oak"),
        ("High", 90, true, "Oak"),
        ("Mid", 40, true, "Oak"),
        ("Unverified", 500, false, "Oak"),
        ("Elsewhere", 300, true, "Elm"),
    ] {
        let mut user = User::new(name, format!("{name}@example.com"), neighborhood, verified);
        user.karma = karma;
        app.repos.users.create(&user).await.unwrap();
        users.push(user);
    }

    let board = app.services.profiles.leaderboard("Oak", None).await.unwrap();
    let names: Vec<&str> = board.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["High", "Mid", "Low"]);

    let top = app.services.profiles.leaderboard("Oak", Some(1)).await.unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn test_profile_lookup() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;

    let profile = app.services.profiles.profile(a.user_id).await.unwrap();
    assert_eq!(profile.name, "Alice");
    assert_eq!(profile.karma, 0);

    let json = serde_json::to_value(&profile).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("email").is_none());

    assert!(matches!(
        app.services.profiles.profile(Uuid::new_v4()).await,
        Err(CoordinationError::UserNotFound(_))
    ));
}
