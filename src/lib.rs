//! graze — a multi-user RSS aggregation CLI.
//!
//! Users register, follow feeds, and run `graze agg <interval>` to drive the
//! ingestion loop: each tick selects the least-recently-fetched feed, pulls
//! and parses its RSS document, and stores new posts deduplicated by URL.

pub mod cli;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod storage;
