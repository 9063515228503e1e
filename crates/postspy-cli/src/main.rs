mod collect;
mod export;
mod probe;
mod report;
mod runs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use postspy_collector::SnapshotFeed;
use postspy_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::collect::{build_web_feed, CollectArgs};

#[derive(Debug, Parser)]
#[command(name = "postspy")]
#[command(about = "Collect and compare public channel posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect posts from one or more channels and print per-channel statistics
    Collect(CollectArgs),
    /// Check that a channel resolves, without collecting anything
    Probe {
        channel: String,
        /// Resolve against a JSON snapshot instead of the web preview
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print statistics for the posts stored by the last collection
    Report {
        /// Restrict to these channels (comma- or newline-separated)
        #[arg(long)]
        channels: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write the stored posts to a CSV file
    Export {
        #[arg(long, default_value = "posts.csv")]
        out: PathBuf,
    },
    /// List recent collection runs
    Runs {
        #[arg(long, default_value = "10")]
        limit: i64,
        /// Include per-channel outcomes
        #[arg(long)]
        details: bool,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = postspy_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, config = ?config, "configuration loaded");

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Collect(args)) => {
            if args.no_store || args.dry_run {
                collect::run_collect(&config, None, &args).await
            } else {
                let pool = connect(&config).await?;
                collect::run_collect(&config, Some(&pool), &args).await
            }
        }
        Some(Commands::Probe { channel, snapshot }) => match snapshot {
            Some(path) => probe::run_probe(&SnapshotFeed::from_path(&path)?, &channel).await,
            None => probe::run_probe(&build_web_feed(&config)?, &channel).await,
        },
        Some(Commands::Report { channels, json }) => {
            let pool = connect(&config).await?;
            report::run_report(&pool, channels.as_deref(), json).await
        }
        Some(Commands::Export { out }) => {
            let pool = connect(&config).await?;
            export::run_export(&pool, &out).await
        }
        Some(Commands::Runs { limit, details }) => {
            let pool = connect(&config).await?;
            runs::run_runs(&pool, limit, details).await
        }
        Some(Commands::Db { command }) => run_db(&config, command).await,
        None => {
            println!("postspy ready; see `postspy --help`");
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = postspy_db::connect_pool_from_config(config).await?;
    let applied = postspy_db::run_migrations(&pool).await?;
    tracing::debug!(applied, "migrations checked");
    Ok(pool)
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = postspy_db::connect_pool_from_config(config).await?;
    match command {
        DbCommands::Ping => {
            postspy_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = postspy_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
    }
    Ok(())
}

/// Attempt to mark a collection run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = postspy_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
