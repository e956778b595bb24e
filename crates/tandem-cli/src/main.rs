//! Tandem CLI - Command-line interface for tandem change capture and snapshots

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tandem::ConnectorConfig;

mod commands;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database file (":memory:" for a private in-memory database)
    #[arg(short, long, default_value = "./tandem.db")]
    db: String,

    /// Node name stamped on captured changesets
    #[arg(short, long)]
    node: Option<String>,

    /// Connector configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute SQL with change capture and print each published changeset
    Exec {
        /// SQL to execute (one or more statements)
        sql: Option<String>,

        /// Read the SQL from a file instead
        #[arg(short, long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Print compact single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Export a consistent snapshot of the database
    Backup {
        /// Output file ("-" for stdout)
        #[arg(short, long)]
        out: PathBuf,

        /// Pages copied per step (-1 copies everything in one step)
        #[arg(long)]
        pages_per_step: Option<i32>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Replace the database with a snapshot
    Restore {
        /// Snapshot file produced by `tandem backup`
        #[arg(short, long)]
        from: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<ConnectorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ConnectorConfig::default(),
    };
    if let Some(node) = &cli.node {
        config.node_name = node.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = load_config(&cli)?;

    // Execute command
    match cli.command {
        Commands::Exec { sql, file, compact } => {
            commands::exec::execute(&cli.db, config, sql, file, compact)?;
        }
        Commands::Backup {
            out,
            pages_per_step,
            timeout_secs,
        } => {
            commands::backup::execute(&cli.db, config, out, pages_per_step, timeout_secs)?;
        }
        Commands::Restore { from } => {
            commands::restore::execute(&cli.db, from)?;
        }
    }

    Ok(())
}
