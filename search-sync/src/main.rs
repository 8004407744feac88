//! Search Sync Main Entry Point
//!
//! CLI for synchronizing records from the source store into the search
//! engine: batch imports, index creation and engine statistics.

use clap::Parser;
use dotenv::dotenv;
use search_sync::commands::{self, Cli};
use search_sync::SyncError;
use std::env;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("search_sync=info,search_sync_repository=info"));

    let json_output = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "search-sync failed");
            Err(e)
        }
    }
}
