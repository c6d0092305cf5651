//! `voucher`: single-use redemption code registry.
//!
//! Generates batches of codes, redeems them exactly once, and exports
//! printable sheets. `voucher serve` exposes the same operations over HTTP.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use codes::service::DEFAULT_EXPORT_LIMIT;
use config::{Overrides, VoucherConfig};
use voucher_core::ListParams;

/// Redemption code registry.
#[derive(Parser, Debug)]
#[command(name = "voucher", about = "Single-use redemption code registry")]
struct Cli {
    /// Path to config file (default: ~/.voucher/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file).
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Database file (overrides data dir and config file).
    #[arg(long = "db", global = true)]
    db: Option<PathBuf>,

    /// Output format.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value_t = Output::Table)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a batch of new codes.
    Generate {
        /// Number of codes (default from config, 100).
        #[arg(long, short = 'n')]
        count: Option<usize>,
        /// Batch id (default: generated).
        #[arg(long)]
        batch: Option<String>,
    },

    /// Show one code.
    Lookup {
        code: String,
    },

    /// Redeem a code. Exit status: 0 redeemed, 3 already used, 4 not found.
    Redeem {
        code: String,
    },

    /// List codes, newest first.
    List {
        /// Only codes with this status (unused, used).
        #[arg(long)]
        status: Option<String>,
        /// Only codes of this batch.
        #[arg(long)]
        batch: Option<String>,
        /// Limit results.
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Offset for pagination.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show total / unused / used counts.
    Stats,

    /// Print unused codes as sheet pages.
    Export {
        /// Only codes of this batch.
        #[arg(long)]
        batch: Option<String>,
        /// Maximum number of codes.
        #[arg(long, default_value_t = DEFAULT_EXPORT_LIMIT)]
        limit: usize,
    },

    /// Delete every code.
    Clear {
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Serve the HTTP API.
    Serve {
        /// Listen address (overrides config, default 0.0.0.0:8080).
        #[arg(long)]
        listen: Option<String>,
    },

    /// Show version.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Quiet by default for one-shot commands; the server logs requests.
    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("voucher v{}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = cli.config.unwrap_or_else(VoucherConfig::default_path);
    let file_config = VoucherConfig::load(&config_path)?;

    let listen = match &cli.command {
        Commands::Serve { listen } => listen.clone(),
        _ => None,
    };
    let service_config = file_config.service_config(&Overrides {
        data_dir: cli.data_dir,
        db_path: cli.db,
        listen,
    });
    let svc = commands::open_service(
        &service_config,
        file_config.generator_config(),
        file_config.sheet_layout(),
    )?;

    let json = cli.output == Output::Json;
    match cli.command {
        Commands::Generate { count, batch } => {
            commands::codes::generate(&svc, count, batch, json).await
        }
        Commands::Lookup { code } => commands::codes::lookup(&svc, &code, json).await,
        Commands::Redeem { code } => commands::codes::redeem(&svc, &code, json).await,
        Commands::List {
            status,
            batch,
            limit,
            offset,
        } => {
            let params = ListParams { limit, offset };
            commands::codes::list(&svc, status, batch, params, json).await
        }
        Commands::Stats => commands::codes::stats(&svc, json).await,
        Commands::Export { batch, limit } => {
            commands::codes::export(&svc, batch, limit, json).await
        }
        Commands::Clear { yes } => commands::codes::clear(&svc, yes).await,
        Commands::Serve { .. } => {
            commands::serve::run(svc, &service_config.listen).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => Ok(ExitCode::SUCCESS),
    }
}
