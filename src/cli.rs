//! Subcommand definitions and handlers.
//!
//! Handlers that act on behalf of a user receive the resolved [`User`] as an
//! explicit argument; [`require_user`] does the lookup once per command
//! rather than each query re-reading the session from config.

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::watch;

use crate::config::Config;
use crate::feed::build_client;
use crate::ingest::{parse_interval, run_scheduler};
use crate::storage::{Database, User};

// ============================================================================
// Command Surface
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "graze", about = "Multi-user RSS aggregator", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch to an existing user
    Login { name: String },
    /// List registered users
    Users,
    /// Delete all users (and, via cascade, their feeds, follows, and posts)
    Reset,
    /// Register a feed owned by the current user and follow it
    Addfeed { name: String, url: String },
    /// List all feeds with their owners
    Feeds,
    /// Follow an existing feed by URL
    Follow { url: String },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed by URL
    Unfollow { url: String },
    /// Run the aggregation loop until Ctrl-C, e.g. `graze agg 30s`
    Agg { interval: String },
    /// Show the latest posts from followed feeds
    Browse {
        #[arg(default_value_t = 2)]
        limit: i64,
    },
}

/// Everything a handler needs: the open database plus the session config
/// and where to write it back.
pub struct AppContext {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

pub async fn run(command: Command, ctx: &mut AppContext) -> Result<()> {
    match command {
        Command::Register { name } => register(ctx, &name).await,
        Command::Login { name } => login(ctx, &name).await,
        Command::Users => users(ctx).await,
        Command::Reset => reset(ctx).await,
        Command::Addfeed { name, url } => {
            let user = require_user(ctx).await?;
            add_feed(ctx, &user, &name, &url).await
        }
        Command::Feeds => feeds(ctx).await,
        Command::Follow { url } => {
            let user = require_user(ctx).await?;
            follow(ctx, &user, &url).await
        }
        Command::Following => {
            let user = require_user(ctx).await?;
            following(ctx, &user).await
        }
        Command::Unfollow { url } => {
            let user = require_user(ctx).await?;
            unfollow(ctx, &user, &url).await
        }
        Command::Agg { interval } => aggregate(ctx, &interval).await,
        Command::Browse { limit } => {
            let user = require_user(ctx).await?;
            browse(ctx, &user, limit).await
        }
    }
}

/// Resolve the logged-in user from the session config, with guidance when
/// the session is missing or stale.
pub async fn require_user(ctx: &AppContext) -> Result<User> {
    let name = ctx.config.current_user.as_deref().context(
        "No user logged in. Run 'graze register <name>' or 'graze login <name>' first.",
    )?;
    ctx.db
        .user_by_name(name)
        .await?
        .with_context(|| format!("User '{name}' no longer exists. Please register again."))
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    if ctx.db.user_by_name(name).await?.is_some() {
        bail!("User '{name}' already exists. Use 'graze login {name}' instead.");
    }
    let user = ctx.db.create_user(name).await?;
    ctx.config.current_user = Some(user.name.clone());
    ctx.config.save(&ctx.config_path)?;
    println!("Created user '{}' and logged in.", user.name);
    Ok(())
}

async fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx
        .db
        .user_by_name(name)
        .await?
        .with_context(|| format!("User '{name}' not found. Please register first."))?;
    ctx.config.current_user = Some(user.name.clone());
    ctx.config.save(&ctx.config_path)?;
    println!("Logged in as '{}'.", user.name);
    Ok(())
}

async fn users(ctx: &AppContext) -> Result<()> {
    let current = ctx.config.current_user.as_deref();
    for user in ctx.db.all_users().await? {
        if current == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

async fn reset(ctx: &mut AppContext) -> Result<()> {
    let deleted = ctx.db.delete_all_users().await?;
    ctx.config.current_user = None;
    ctx.config.save(&ctx.config_path)?;
    println!("Deleted {deleted} user(s).");
    Ok(())
}

async fn add_feed(ctx: &AppContext, user: &User, name: &str, url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid feed URL '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Feed URL must use http or https, got '{}'", parsed.scheme());
    }
    if ctx.db.feed_by_url(url).await?.is_some() {
        bail!("A feed with URL '{url}' already exists. Use 'graze follow {url}' instead.");
    }

    let feed = ctx.db.create_feed(name, url, user.id).await?;
    ctx.db.create_follow(user.id, feed.id).await?;
    println!("Added feed '{}' ({}) for {}.", feed.name, feed.url, user.name);
    Ok(())
}

async fn feeds(ctx: &AppContext) -> Result<()> {
    for feed in ctx.db.all_feeds_with_owners().await? {
        println!("* {} ({}) added by {}", feed.name, feed.url, feed.owner);
    }
    Ok(())
}

async fn follow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx
        .db
        .feed_by_url(url)
        .await?
        .with_context(|| format!("No feed found with URL '{url}'. Add it with 'graze addfeed'."))?;
    if ctx.db.create_follow(user.id, feed.id).await? {
        println!("{} is now following '{}'.", user.name, feed.name);
    } else {
        println!("{} already follows '{}'.", user.name, feed.name);
    }
    Ok(())
}

async fn following(ctx: &AppContext, user: &User) -> Result<()> {
    for name in ctx.db.following(user.id).await? {
        println!("* {name}");
    }
    Ok(())
}

async fn unfollow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx
        .db
        .feed_by_url(url)
        .await?
        .with_context(|| format!("No feed found with URL '{url}'."))?;
    if ctx.db.delete_follow(user.id, feed.id).await? {
        println!("{} unfollowed '{}'.", user.name, feed.name);
    } else {
        println!("{} was not following '{}'.", user.name, feed.name);
    }
    Ok(())
}

async fn aggregate(ctx: &AppContext, interval: &str) -> Result<()> {
    // A malformed interval is a startup error; nothing runs past this point.
    let period = parse_interval(interval)?;
    let client = build_client().context("Failed to build HTTP client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    println!("Collecting feeds every {interval}. Press Ctrl-C to stop.");
    run_scheduler(ctx.db.clone(), client, period, shutdown_rx).await;
    Ok(())
}

async fn browse(ctx: &AppContext, user: &User, limit: i64) -> Result<()> {
    let posts = ctx.db.posts_for_user(user.id, limit).await?;
    if posts.is_empty() {
        println!("No posts yet. Run 'graze agg <interval>' to start collecting.");
        return Ok(());
    }
    for post in posts {
        let published = DateTime::from_timestamp(post.published_at, 0)
            .map(|instant| instant.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{} ({})", post.title, published);
        println!("  {}", post.url);
        if !post.description.is_empty() {
            println!("  {}", post.description);
        }
    }
    Ok(())
}
