//! vecbase server binary.
//!
//! Loads configuration from the environment (with CLI overrides), opens the
//! store from its snapshot, and serves the HTTP API until CTRL-C. Exits 0 on
//! clean shutdown and non-zero when startup fails.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vecbase::config::Settings;
use vecbase::constants::SHUTDOWN_REQUESTED;
use vecbase::services::Services;
use vecbase::store::{Store, StoreOptions};
use vecbase::{logging, server};

#[derive(Debug, Parser)]
#[command(
    name = "vecbase",
    version,
    about = "In-memory vector database with pluggable similarity indexes"
)]
struct Cli {
    /// Bind address (overrides VECBASE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides VECBASE_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Snapshot file path (overrides VECBASE_PERSISTENCE_PATH)
    #[arg(long)]
    persistence_path: Option<PathBuf>,

    /// Run without snapshot persistence
    #[arg(long)]
    no_persistence: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(path) = cli.persistence_path {
        settings.persistence_path = Some(path);
    }
    if cli.no_persistence {
        settings.persistence_path = None;
    }

    let _log_guard = logging::init(&settings);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
            shutdown.cancel();
        })?;
    }

    let store = Store::open(StoreOptions {
        persistence_path: settings.persistence_path.clone(),
        default_index_type: settings.default_index_type,
        lsh_num_hashes: settings.lsh_num_hashes,
        lsh_num_buckets: settings.lsh_num_buckets,
    })?;
    let stats = store.stats().await;
    info!(
        "📦 Store ready: {} libraries, {} documents, {} chunks",
        stats.total_libraries, stats.total_documents, stats.total_chunks
    );

    let services = Services::new(Arc::new(store));
    server::serve(&settings, services, shutdown).await
}
