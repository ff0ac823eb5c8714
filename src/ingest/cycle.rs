use chrono::Utc;
use thiserror::Error;

use crate::feed::{fetch_feed, normalize_pub_date, parse_feed, FetchError, ParseError};
use crate::storage::{Database, NewPost, PostInsert};

// ============================================================================
// Cycle Outcome
// ============================================================================

/// Why a cycle stopped early. The tag classifies the operator-facing log
/// line; control flow treats every variant the same way (skip this feed
/// until its next turn).
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl CycleError {
    /// Coarse cause label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Fetch(FetchError::Timeout) => "timeout",
            CycleError::Fetch(_) => "network",
            CycleError::Parse(_) => "parse",
            CycleError::Persistence(_) => "unknown",
        }
    }
}

/// What a single ingestion cycle did
#[derive(Debug)]
pub enum CycleReport {
    /// No feeds are registered; the tick was a no-op
    Idle,
    /// The selected feed was fetched, parsed, and ingested
    Completed {
        feed_url: String,
        inserted: usize,
        duplicates: usize,
        skipped: usize,
    },
    /// A step failed; the feed keeps its place at the back of the due
    /// ordering and the scheduler carries on
    Failed {
        feed_url: Option<String>,
        error: CycleError,
    },
}

// ============================================================================
// Ingestion Cycle
// ============================================================================

/// Run one select → fetch → parse → ingest pass over the next due feed.
///
/// Failures never escape this function: each step funnels into
/// [`CycleReport::Failed`] with a classified cause, so one broken feed
/// cannot stop the scheduler. The selected feed's last-fetched stamp is
/// written exactly once per cycle, whether or not the fetch succeeded —
/// that is what rotates a persistently-broken feed to the back of the due
/// ordering instead of letting it starve the others.
pub async fn run_cycle(db: &Database, client: &reqwest::Client) -> CycleReport {
    // SELECT
    let feed = match db.next_feed_due().await {
        Ok(Some(feed)) => feed,
        Ok(None) => {
            tracing::debug!("No feeds registered, skipping cycle");
            return CycleReport::Idle;
        }
        Err(e) => return fail(None, CycleError::Persistence(e)),
    };
    tracing::debug!(feed = %feed.url, "Selected feed for refresh");

    // FETCH — the outcome is held until the feed has been marked fetched
    let fetched = fetch_feed(client, &feed.url).await;

    // MARK_FETCHED
    if let Err(e) = db.mark_feed_fetched(feed.id, Utc::now()).await {
        return fail(Some(feed.url), CycleError::Persistence(e));
    }

    let body = match fetched {
        Ok(body) => body,
        Err(e) => return fail(Some(feed.url), e.into()),
    };

    // PARSE
    let parsed = match parse_feed(body.as_bytes()) {
        Ok(parsed) => parsed,
        Err(e) => return fail(Some(feed.url), e.into()),
    };

    // INGEST_ITEMS
    let mut inserted = 0;
    let mut duplicates = 0;
    let mut skipped = 0;
    for item in parsed.items {
        let post = NewPost {
            feed_id: feed.id,
            title: item.title,
            url: item.link,
            description: item.description,
            published_at: normalize_pub_date(&item.pub_date).timestamp(),
        };
        match db.insert_post(&post).await {
            Ok(PostInsert::Inserted) => inserted += 1,
            // Already seen in an earlier cycle; idempotent re-ingestion
            Ok(PostInsert::Duplicate) => duplicates += 1,
            Err(e) => {
                skipped += 1;
                tracing::warn!(
                    feed = %feed.url,
                    post = %post.url,
                    error = %e,
                    "Failed to store post, skipping"
                );
            }
        }
    }

    tracing::info!(
        feed = %feed.url,
        inserted = inserted,
        duplicates = duplicates,
        skipped = skipped,
        "Ingestion cycle complete"
    );
    CycleReport::Completed {
        feed_url: feed.url,
        inserted,
        duplicates,
        skipped,
    }
}

fn fail(feed_url: Option<String>, error: CycleError) -> CycleReport {
    tracing::warn!(
        feed = feed_url.as_deref().unwrap_or("<selection>"),
        kind = error.kind(),
        error = %error,
        "Ingestion cycle failed"
    );
    CycleReport::Failed { feed_url, error }
}
