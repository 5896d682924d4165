//! CLI administration tool for clickstream.
//!
//! Inspects the durable and real-time stores and performs maintenance
//! without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Event, user and real-time counters
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Show a user's profile
//! cargo run --bin admin -- user u-123
//!
//! # Delete events older than 30 days
//! cargo run --bin admin -- cleanup --days 30
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `REDIS_URL` (optional): real-time counters are shown when set

use clickstream::domain::repositories::{EventRepository, UserRepository};
use clickstream::infrastructure::persistence::{PgEventRepository, PgUserRepository};
use clickstream::infrastructure::store::{RealtimeStore, RedisStore, keys};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing clickstream.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show durable and real-time statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Show the profile of a user
    User {
        /// User id as reported by clients
        user_id: String,
    },

    /// Delete stored events older than the given number of days
    Cleanup {
        #[arg(short, long, default_value_t = 7)]
        days: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
        Commands::User { user_id } => show_user(&pool, &user_id).await?,
        Commands::Cleanup { days, yes } => cleanup(&pool, days, yes).await?,
    }

    Ok(())
}

/// Displays stored event and user counts, plus real-time counters when
/// Redis is configured.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let pool = Arc::new(pool.clone());
    let events = PgEventRepository::new(pool.clone())
        .count()
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;
    let users = PgUserRepository::new(pool)
        .count()
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    println!("  Stored events: {}", events.to_string().bright_green().bold());
    println!("  Known users:   {}", users.to_string().bright_green().bold());

    match std::env::var("REDIS_URL") {
        Ok(redis_url) => match RedisStore::connect(&redis_url).await {
            Ok(store) => {
                let total = store.get_counter(keys::TOTAL_EVENTS).await?;
                let online = store.set_cardinality(keys::ONLINE_USERS).await?;
                println!("  Total events:  {}", total.to_string().bright_green().bold());
                println!("  Online users:  {}", online.to_string().bright_green().bold());
            }
            Err(e) => println!("  {}", format!("Redis unavailable: {}", e).yellow()),
        },
        Err(_) => println!("  {}", "Real-time counters: REDIS_URL not set".bright_black()),
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let size: String =
                sqlx::query_scalar("SELECT pg_size_pretty(pg_database_size(current_database()))")
                    .fetch_one(pool)
                    .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Size:       {}", size.bright_white());
            println!();
        }
    }

    Ok(())
}

async fn show_user(pool: &PgPool, user_id: &str) -> Result<()> {
    let repo = PgUserRepository::new(Arc::new(pool.clone()));
    let profile = repo
        .find(user_id)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    let Some(profile) = profile else {
        println!("{}", format!("User '{}' not found", user_id).yellow());
        return Ok(());
    };

    let format_time = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M:%S").to_string();

    println!("{}", "👤 User Profile".bright_blue().bold());
    println!();
    println!("  User:         {}", profile.user_id.cyan());
    println!("  First visit:  {}", format_time(profile.first_visit));
    println!("  Last visit:   {}", format_time(profile.last_visit));
    println!(
        "  Events:       {}",
        profile.total_events.to_string().bright_green().bold()
    );
    println!("  Sessions:     {}", profile.total_sessions);
    println!(
        "  Device:       {}",
        profile.device_type.as_deref().unwrap_or("-")
    );
    println!("  Browser:      {}", profile.browser.as_deref().unwrap_or("-"));
    println!();

    Ok(())
}

/// Deletes events older than `days` after confirmation (default: No).
async fn cleanup(pool: &PgPool, days: i64, yes: bool) -> Result<()> {
    if days < 1 {
        anyhow::bail!("--days must be at least 1");
    }

    println!("{}", "🧹 Event cleanup".bright_blue().bold());
    println!();
    println!("  Deleting events older than {} days", days.to_string().cyan());
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Proceed?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let deleted = PgEventRepository::new(Arc::new(pool.clone()))
        .delete_older_than(days)
        .await
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {}", e))?;

    println!();
    println!(
        "{}",
        format!("✅ Deleted {} events", deleted).green().bold()
    );
    println!();

    Ok(())
}
