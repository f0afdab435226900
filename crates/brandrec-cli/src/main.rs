mod compare;
mod render;
mod snapshots;

use std::path::PathBuf;

use anyhow::Context;
use brandrec_core::{AppConfig, SnapshotStore};
use brandrec_db::PgSnapshotStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::compare::CompareArgs;
use crate::render::OutputFormat;
use crate::snapshots::SnapshotCommands;

#[derive(Debug, Parser)]
#[command(name = "brandrec-cli")]
#[command(about = "Reconcile and compare brand listings between two retailers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile two JSON brand lists into a comparison
    Compare {
        /// JSON brand list extracted from source A
        #[arg(long)]
        source_a: PathBuf,
        /// JSON brand list extracted from source B
        #[arg(long)]
        source_b: PathBuf,
        /// Identifier recorded for source A (defaults to the file path)
        #[arg(long)]
        id_a: Option<String>,
        /// Identifier recorded for source B (defaults to the file path)
        #[arg(long)]
        id_b: Option<String>,
        /// Exact matching only, even if fuzzy matching is configured
        #[arg(long)]
        no_fuzzy: bool,
        /// Persist the comparison as a snapshot (requires `DATABASE_URL`)
        #[arg(long)]
        save: bool,
        /// Display name for the saved snapshot
        #[arg(long, requires = "save")]
        name: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Browse, inspect, diff and delete saved snapshots
    Snapshots {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = brandrec_core::load_app_config_from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("brandrec-cli: no command given; see --help");
        return Ok(());
    };

    match command {
        Commands::Compare {
            source_a,
            source_b,
            id_a,
            id_b,
            no_fuzzy,
            save,
            name,
            format,
        } => {
            let args = CompareArgs {
                source_a,
                source_b,
                id_a,
                id_b,
                no_fuzzy,
            };
            let record = compare::run_compare(&config, &args)?;
            print!("{}", render::comparison(&record, format)?);

            if save {
                let store = connect_store(&config).await?;
                let id = store
                    .save(&record, name.as_deref())
                    .await
                    .context("failed to save comparison snapshot")?;
                eprintln!("saved snapshot {id}");
            }
        }
        Commands::Snapshots { command } => {
            let store = connect_store(&config).await?;
            let output = snapshots::run_snapshots(&store, command).await?;
            print!("{output}");
        }
        Commands::Db { command } => {
            let pool = brandrec_db::connect_pool_from_config(&config).await?;
            match command {
                DbCommands::Ping => {
                    brandrec_db::ping(&pool).await?;
                    println!("database reachable");
                }
                DbCommands::Migrate => {
                    let applied = brandrec_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
    }

    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<PgSnapshotStore> {
    let pool = brandrec_db::connect_pool_from_config(config)
        .await
        .context("snapshot store unavailable")?;
    Ok(PgSnapshotStore::new(pool))
}

#[cfg(test)]
mod tests;
