//! Integration tests for the due ordering: which feed the ingestion cycle
//! selects next.
//!
//! Each test creates its own in-memory SQLite database for isolation. The
//! contract under test: feeds are ordered by last-fetched ascending with
//! never-fetched (NULL) feeds first, and marking a feed fetched moves it to
//! the back of the line.

use chrono::{TimeZone, Utc};
use graze::storage::Database;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

async fn seed_user(db: &Database) -> i64 {
    db.create_user("alice").await.unwrap().id
}

// ============================================================================
// Empty Set
// ============================================================================

#[tokio::test]
async fn test_no_feeds_yields_none() {
    let db = test_db().await;
    assert!(db.next_feed_due().await.unwrap().is_none());
}

// ============================================================================
// Nulls First
// ============================================================================

#[tokio::test]
async fn test_never_fetched_selected_before_fetched() {
    let db = test_db().await;
    let user_id = seed_user(&db).await;

    let a = db
        .create_feed("A", "https://a.example.com/rss", user_id)
        .await
        .unwrap();
    let b = db
        .create_feed("B", "https://b.example.com/rss", user_id)
        .await
        .unwrap();
    let c = db
        .create_feed("C", "https://c.example.com/rss", user_id)
        .await
        .unwrap();

    // Only B has ever been fetched.
    let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    db.mark_feed_fetched(b.id, past).await.unwrap();

    // A never-fetched feed comes first...
    let first = db.next_feed_due().await.unwrap().unwrap();
    assert!(first.id == a.id || first.id == c.id, "expected A or C before B");

    // ...and after marking it, the other never-fetched feed is due.
    db.mark_feed_fetched(first.id, Utc::now()).await.unwrap();
    let second = db.next_feed_due().await.unwrap().unwrap();
    assert!(second.id == a.id || second.id == c.id);
    assert_ne!(second.id, first.id);

    // Once every feed has been fetched, the least recent (B) is due.
    db.mark_feed_fetched(second.id, Utc::now()).await.unwrap();
    let third = db.next_feed_due().await.unwrap().unwrap();
    assert_eq!(third.id, b.id);
}

// ============================================================================
// Rotation
// ============================================================================

#[tokio::test]
async fn test_marking_fetched_moves_feed_to_back() {
    let db = test_db().await;
    let user_id = seed_user(&db).await;

    let a = db
        .create_feed("A", "https://a.example.com/rss", user_id)
        .await
        .unwrap();
    let b = db
        .create_feed("B", "https://b.example.com/rss", user_id)
        .await
        .unwrap();

    db.mark_feed_fetched(a.id, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();
    db.mark_feed_fetched(b.id, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap())
        .await
        .unwrap();

    // A is older, so it rotates to the front.
    let due = db.next_feed_due().await.unwrap().unwrap();
    assert_eq!(due.id, a.id);

    db.mark_feed_fetched(a.id, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap())
        .await
        .unwrap();
    let due = db.next_feed_due().await.unwrap().unwrap();
    assert_eq!(due.id, b.id);
}

#[tokio::test]
async fn test_mark_fetched_stamp_is_persisted() {
    let db = test_db().await;
    let user_id = seed_user(&db).await;
    let feed = db
        .create_feed("A", "https://a.example.com/rss", user_id)
        .await
        .unwrap();
    assert!(feed.last_fetched_at.is_none());

    let stamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    db.mark_feed_fetched(feed.id, stamp).await.unwrap();

    let reloaded = db
        .feed_by_url("https://a.example.com/rss")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.last_fetched_at, Some(stamp.timestamp()));
}
