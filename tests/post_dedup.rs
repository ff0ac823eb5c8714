//! Integration tests for post storage: URL deduplication and browsing.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use graze::storage::{Database, NewPost, PostInsert};
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn test_post(feed_id: i64, url: &str, published_at: i64) -> NewPost {
    NewPost {
        feed_id,
        title: format!("Post at {url}"),
        url: url.to_string(),
        description: "Test description".to_string(),
        published_at,
    }
}

/// user + owned/followed feed, the usual fixture
async fn seed_user_and_feed(db: &Database) -> (i64, i64) {
    let user = db.create_user("alice").await.unwrap();
    let feed = db
        .create_feed("Blog", "https://blog.example.com/rss", user.id)
        .await
        .unwrap();
    db.create_follow(user.id, feed.id).await.unwrap();
    (user.id, feed.id)
}

// ============================================================================
// Deduplication
// ============================================================================

#[tokio::test]
async fn test_same_url_inserted_once() {
    let db = test_db().await;
    let (user_id, feed_id) = seed_user_and_feed(&db).await;

    let post = test_post(feed_id, "https://blog.example.com/1", 1_700_000_000);
    assert_eq!(db.insert_post(&post).await.unwrap(), PostInsert::Inserted);
    // The second attempt is a no-op, not an error.
    assert_eq!(db.insert_post(&post).await.unwrap(), PostInsert::Duplicate);

    let posts = db.posts_for_user(user_id, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn test_duplicate_across_feeds_is_still_duplicate() {
    // URL uniqueness is global, not per feed.
    let db = test_db().await;
    let (_, feed_id) = seed_user_and_feed(&db).await;
    let user2 = db.create_user("bob").await.unwrap();
    let other = db
        .create_feed("Mirror", "https://mirror.example.com/rss", user2.id)
        .await
        .unwrap();

    let post = test_post(feed_id, "https://blog.example.com/1", 1_700_000_000);
    assert_eq!(db.insert_post(&post).await.unwrap(), PostInsert::Inserted);

    let mirrored = test_post(other.id, "https://blog.example.com/1", 1_700_000_000);
    assert_eq!(
        db.insert_post(&mirrored).await.unwrap(),
        PostInsert::Duplicate
    );
}

// ============================================================================
// Browsing
// ============================================================================

#[tokio::test]
async fn test_browse_newest_first_with_limit() {
    let db = test_db().await;
    let (user_id, feed_id) = seed_user_and_feed(&db).await;

    for (i, published_at) in [1_700_000_000i64, 1_700_000_100, 1_700_000_050]
        .iter()
        .enumerate()
    {
        let post = test_post(
            feed_id,
            &format!("https://blog.example.com/{i}"),
            *published_at,
        );
        db.insert_post(&post).await.unwrap();
    }

    let posts = db.posts_for_user(user_id, 2).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].published_at, 1_700_000_100);
    assert_eq!(posts[1].published_at, 1_700_000_050);
}

#[tokio::test]
async fn test_browse_only_followed_feeds() {
    let db = test_db().await;
    let (user_id, _) = seed_user_and_feed(&db).await;

    // bob's feed, which alice does not follow
    let bob = db.create_user("bob").await.unwrap();
    let bobs_feed = db
        .create_feed("Other", "https://other.example.com/rss", bob.id)
        .await
        .unwrap();
    db.insert_post(&test_post(
        bobs_feed.id,
        "https://other.example.com/1",
        1_700_000_000,
    ))
    .await
    .unwrap();

    assert!(db.posts_for_user(user_id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unfollow_hides_posts_from_browse() {
    let db = test_db().await;
    let (user_id, feed_id) = seed_user_and_feed(&db).await;
    db.insert_post(&test_post(feed_id, "https://blog.example.com/1", 1))
        .await
        .unwrap();

    assert_eq!(db.posts_for_user(user_id, 10).await.unwrap().len(), 1);
    assert!(db.delete_follow(user_id, feed_id).await.unwrap());
    assert!(db.posts_for_user(user_id, 10).await.unwrap().is_empty());
}

// ============================================================================
// Follow Bookkeeping
// ============================================================================

#[tokio::test]
async fn test_follow_is_idempotent() {
    let db = test_db().await;
    let (user_id, feed_id) = seed_user_and_feed(&db).await;

    // Already following via the fixture; a second follow reports false.
    assert!(!db.create_follow(user_id, feed_id).await.unwrap());
    assert_eq!(db.following(user_id).await.unwrap(), vec!["Blog"]);
}

#[tokio::test]
async fn test_reset_cascades_to_posts() {
    let db = test_db().await;
    let (user_id, feed_id) = seed_user_and_feed(&db).await;
    db.insert_post(&test_post(feed_id, "https://blog.example.com/1", 1))
        .await
        .unwrap();

    assert_eq!(db.delete_all_users().await.unwrap(), 1);
    assert!(db.next_feed_due().await.unwrap().is_none());
    assert!(db.posts_for_user(user_id, 10).await.unwrap().is_empty());
}
