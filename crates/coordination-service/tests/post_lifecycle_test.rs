//! 帖子生命周期集成测试
//!
//! 覆盖 respond → assign → complete → rate 完整流程、指派不变量、评分唯一性和各类拒绝路径。

mod common;

use aid_coordination::error::CoordinationError;
use aid_coordination::models::{Badge, PostCategory, PostFilter, PostStatus, PostType};
use aid_coordination::service::dto::{CreatePostInput, PostView};
use common::{OAK, TestApp};
use uuid::Uuid;

fn request(title: &str) -> CreatePostInput {
    CreatePostInput {
        post_type: PostType::Request,
        category: PostCategory::Food,
        title: title.to_string(),
        description: "Could use a hand".to_string(),
        coordinates: OAK.to_vec(),
        urgency: None,
        images: vec![],
    }
}

fn assert_assignment_invariant(view: &PostView) {
    let requires = matches!(view.status, PostStatus::InProgress | PostStatus::Completed);
    assert_eq!(
        view.assigned_to.is_some(),
        requires,
        "status {:?} with assigned_to {:?}",
        view.status,
        view.assigned_to.as_ref().map(|u| u.id)
    );
}

#[tokio::test]
async fn test_oak_request_full_flow() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    let post = posts.create(&a, request("Groceries")).await.unwrap();
    assert_eq!(post.status, PostStatus::Active);
    assert_eq!(post.neighborhood, "Oak");
    assert_eq!(post.author.id, a.user_id);
    assert_assignment_invariant(&post);

    let post = posts
        .respond(&b, post.id, "I can help".to_string())
        .await
        .unwrap();
    assert_eq!(post.responses.len(), 1);
    assert_eq!(post.responses[0].user.id, b.user_id);
    assert_eq!(post.responses[0].message, "I can help");

    let post = posts.assign(&a, post.id, b.user_id).await.unwrap();
    assert_eq!(post.status, PostStatus::InProgress);
    assert_eq!(post.assigned_to.as_ref().map(|u| u.id), Some(b.user_id));
    assert_assignment_invariant(&post);

    let post = posts.complete(&a, post.id).await.unwrap();
    assert_eq!(post.status, PostStatus::Completed);
    assert!(post.completed_at.is_some());
    assert_assignment_invariant(&post);

    let helper = app.load_user(&b).await;
    assert_eq!(helper.karma, 10);
    assert_eq!(helper.helped_count, 1);

    let rating = posts
        .rate(&a, post.id, 5, Some("Thanks!".to_string()))
        .await
        .unwrap();
    assert_eq!(rating.rating, 5);
    assert_eq!(rating.rated_user, b.user_id);
    assert_eq!(rating.rated_by.id, a.user_id);

    let helper = app.load_user(&b).await;
    assert_eq!(helper.ratings.count, 1);
    assert!((helper.ratings.average - 5.0).abs() < f64::EPSILON);
    assert_eq!(helper.karma, 15);
}

#[tokio::test]
async fn test_second_rating_is_duplicate() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    let post = posts.create(&a, request("Ride")).await.unwrap();
    posts.assign(&a, post.id, b.user_id).await.unwrap();
    posts.complete(&b, post.id).await.unwrap();

    posts.rate(&a, post.id, 3, None).await.unwrap();
    let second = posts.rate(&a, post.id, 5, None).await;
    assert!(matches!(second, Err(CoordinationError::Duplicate(_))));

    // 低分无奖励，重复评分不改变汇总
    let helper = app.load_user(&b).await;
    assert_eq!(helper.karma, 10);
    assert_eq!(helper.ratings.count, 1);
    assert!((helper.ratings.average - 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_rating_average_spans_posts() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    for value in [5, 2] {
        let post = posts.create(&a, request("Errand")).await.unwrap();
        posts.assign(&a, post.id, b.user_id).await.unwrap();
        posts.complete(&a, post.id).await.unwrap();
        posts.rate(&a, post.id, value, None).await.unwrap();
    }

    let helper = app.load_user(&b).await;
    assert_eq!(helper.ratings.count, 2);
    assert!((helper.ratings.average - 3.5).abs() < f64::EPSILON);
    // 2 次帮助 + 一次 ≥4 的评分
    assert_eq!(helper.karma, 25);

    let received = app.services.profiles.ratings_received(b.user_id).await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_rate_rejections() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    let post = posts.create(&a, request("Tools")).await.unwrap();
    assert!(matches!(
        posts.rate(&a, post.id, 5, None).await,
        Err(CoordinationError::InvalidState(_))
    ));

    posts.assign(&a, post.id, b.user_id).await.unwrap();
    posts.complete(&a, post.id).await.unwrap();

    // 帮助者不能给自己评分
    assert!(matches!(
        posts.rate(&b, post.id, 5, None).await,
        Err(CoordinationError::Permission(_))
    ));
    assert!(matches!(
        posts.rate(&a, post.id, 6, None).await,
        Err(CoordinationError::Validation(_))
    ));
}

#[tokio::test]
async fn test_assign_and_complete_permissions() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let e = app.user("Eve", "Oak").await;
    let posts = &app.services.posts;

    let post = posts.create(&a, request("Help")).await.unwrap();

    assert!(matches!(
        posts.assign(&b, post.id, b.user_id).await,
        Err(CoordinationError::Permission(_))
    ));
    assert!(matches!(
        posts.assign(&a, post.id, Uuid::new_v4()).await,
        Err(CoordinationError::UserNotFound(_))
    ));

    // 未指派时不能完成
    assert!(matches!(
        posts.complete(&a, post.id).await,
        Err(CoordinationError::InvalidState(_))
    ));

    // 帮助者无需出现在响应列表中
    let post = posts.assign(&a, post.id, b.user_id).await.unwrap();
    assert!(post.responses.is_empty());

    // 只能指派一次
    assert!(matches!(
        posts.assign(&a, post.id, e.user_id).await,
        Err(CoordinationError::InvalidState(_))
    ));

    assert!(matches!(
        posts.complete(&e, post.id).await,
        Err(CoordinationError::Permission(_))
    ));

    let post = posts.complete(&b, post.id).await.unwrap();
    assert_eq!(post.assigned_to.as_ref().map(|u| u.id), Some(b.user_id));

    // 重复完成不会重复记功
    assert!(matches!(
        posts.complete(&a, post.id).await,
        Err(CoordinationError::InvalidState(_))
    ));
    assert_eq!(app.load_user(&b).await.helped_count, 1);
}

#[tokio::test]
async fn test_respond_rules() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    let post = posts.create(&a, request("Mow lawn")).await.unwrap();

    // 作者可以响应自己的帖子
    let post = posts
        .respond(&a, post.id, "bump".to_string())
        .await
        .unwrap();
    assert_eq!(post.responses.len(), 1);

    posts.assign(&a, post.id, b.user_id).await.unwrap();
    assert!(matches!(
        posts.respond(&b, post.id, "too late".to_string()).await,
        Err(CoordinationError::InvalidState(_))
    ));
    assert!(matches!(
        posts.respond(&b, Uuid::new_v4(), "ghost".to_string()).await,
        Err(CoordinationError::PostNotFound(_))
    ));
}

#[tokio::test]
async fn test_top_helper_badge_through_lifecycle() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let posts = &app.services.posts;

    for i in 0..10 {
        let post = posts.create(&a, request(&format!("Task {i}"))).await.unwrap();
        posts.assign(&a, post.id, b.user_id).await.unwrap();
        posts.complete(&a, post.id).await.unwrap();
    }

    let helper = app.load_user(&b).await;
    assert_eq!(helper.helped_count, 10);
    assert_eq!(helper.karma, 100);
    assert!(helper.has_badge(Badge::TopHelper));
    assert!(!helper.has_badge(Badge::CommunityElder));
}

#[tokio::test]
async fn test_queries() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    let b = app.user("Bob", "Oak").await;
    let c = app.user("Carol", "Elm").await;
    let posts = &app.services.posts;

    let first = posts.create(&a, request("First")).await.unwrap();
    let mut offer = request("Offer");
    offer.post_type = PostType::Offer;
    let second = posts.create(&a, offer).await.unwrap();
    let done = posts.create(&a, request("Done")).await.unwrap();
    posts.assign(&a, done.id, b.user_id).await.unwrap();
    posts.complete(&a, done.id).await.unwrap();

    let mut far = request("Far away");
    far.coordinates = vec![-74.0060, 40.7128];
    posts.create(&c, far).await.unwrap();

    let oak = posts
        .list_neighborhood(PostFilter::for_neighborhood("Oak"))
        .await
        .unwrap();
    let ids: Vec<Uuid> = oak.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id) && ids.contains(&second.id));

    let offers = posts
        .list_neighborhood(PostFilter {
            post_type: Some(PostType::Offer),
            ..PostFilter::for_neighborhood("Oak")
        })
        .await
        .unwrap();
    assert_eq!(offers.len(), 1);

    let completed = posts
        .list_neighborhood(PostFilter {
            statuses: vec![PostStatus::Completed],
            ..PostFilter::for_neighborhood("Oak")
        })
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, done.id);

    let nearby = posts.list_nearby(&OAK, None).await.unwrap();
    assert_eq!(nearby.len(), 2);
    assert!(nearby.iter().all(|p| p.neighborhood == "Oak"));

    assert!(matches!(
        posts.list_nearby(&[1.0], None).await,
        Err(CoordinationError::Validation(_))
    ));

    let mine = posts.list_by_author(a.user_id).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_post_listings_capped_at_fifty() {
    let app = TestApp::new();
    let a = app.user("Alice", "Oak").await;
    for i in 0..55 {
        app.services
            .posts
            .create(&a, request(&format!("Groceries {i}")))
            .await
            .unwrap();
    }

    let listed = app
        .services
        .posts
        .list_neighborhood(PostFilter::for_neighborhood("Oak"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 50);

    let nearby = app.services.posts.list_nearby(&OAK, None).await.unwrap();
    assert_eq!(nearby.len(), 50);

    let own = app.services.posts.list_by_author(a.user_id).await.unwrap();
    assert_eq!(own.len(), 55);
}
