//! datums CLI - trade warehouse updater and query tool.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use datums_lib::{Warehouse, WarehouseConfig};

mod commands;

#[derive(Parser)]
#[command(name = "datums")]
#[command(about = "OHLCV trade data warehouse", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Warehouse configuration file (JSON)
    #[arg(short, long, global = true, default_value = "warehouse.json")]
    config: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Update packets from their remote source
    Update {
        /// Packet ids to update (all configured packets when omitted)
        packets: Vec<String>,
    },

    /// Print stored datums for a packet as CSV
    Retrieve {
        /// Packet id
        packet: String,

        /// Lower bound: epoch seconds or YYYY-MM-DD
        #[arg(short, long)]
        since: Option<String>,

        /// Upper bound: epoch seconds or YYYY-MM-DD
        #[arg(short, long)]
        until: Option<String>,
    },

    /// List configured packets
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = WarehouseConfig::load(&cli.config)?;
    let warehouse = Warehouse::new(config);

    match cli.command {
        Commands::Update { packets } => commands::update::update(&warehouse, packets).await,
        Commands::Retrieve {
            packet,
            since,
            until,
        } => commands::retrieve::retrieve(&warehouse, &packet, since.as_deref(), until.as_deref()),
        Commands::List => commands::list::list(&warehouse),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}
