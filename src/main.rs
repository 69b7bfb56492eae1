mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{KeyArgs, NodeArgs, QueryCommand, TxCommand};
use interstellar::config::{self, Config};

#[derive(Parser)]
#[command(name = "interstellar")]
#[command(about = "Query a Cosmos SDK chain and send transactions over gRPC", version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    node: NodeArgs,

    #[command(flatten)]
    key: KeyArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query chain via gRPC
    #[command(visible_alias = "q")]
    Query {
        #[command(subcommand)]
        command: QueryCommand,
    },

    /// Send a transaction via gRPC. Queries chain and account info if not provided
    #[command(visible_alias = "tx")]
    Transact {
        #[command(subcommand)]
        command: TxCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "interstellar=debug" } else { "interstellar=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { output } => {
            let path = output
                .or_else(config::default_path)
                .ok_or_else(|| anyhow::anyhow!("no config directory on this platform; pass --output"))?;
            Config::default().save(&path)?;
            info!("Configuration file created at: {}", path.display());
            commands::print_json(&serde_json::json!({ "config": path }))?;
        }
        Commands::Query { command } => {
            let config = cli.node.apply(Config::load_or_default(cli.config.as_deref())?);
            commands::query::run(command, &config, &cli.key).await?;
        }
        Commands::Transact { command } => {
            let config = cli.node.apply(Config::load_or_default(cli.config.as_deref())?);
            commands::tx::run(command, &config, &cli.key).await?;
        }
    }

    Ok(())
}
