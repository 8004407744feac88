//! The `import` command.

use clap::{ArgAction, Args};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::ConsoleEventListener;
use crate::config::{resolve_batch_size, Dependencies, DEFAULT_RESPONSE_TIMEOUT_MS};
use crate::errors::SyncError;
use crate::importer::ImportOptions;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Comma-separated list of index names.
    #[arg(short, long, value_delimiter = ',')]
    pub indices: Vec<String>,

    /// Update settings related to indices in the search engine.
    #[arg(
        long = "no-update-settings",
        action = ArgAction::SetFalse,
        default_value_t = true
    )]
    pub update_settings: bool,

    /// Number of records per batch.
    #[arg(long)]
    pub batch_size: Option<String>,

    /// Skip the first N batches and start importing from the N+1 batch.
    #[arg(long, default_value_t = 0)]
    pub skip_batches: usize,

    /// Timeout (in ms) to get a response from the search engine.
    #[arg(short = 't', long, default_value_t = DEFAULT_RESPONSE_TIMEOUT_MS)]
    pub response_timeout: u64,

    /// Import into temporary indices and swap them live to prevent downtime.
    #[arg(long)]
    pub swap_indices: bool,
}

pub async fn run(deps: &Dependencies, args: &ImportArgs) -> Result<(), SyncError> {
    let importer = deps.importer(Arc::new(ConsoleEventListener));

    let response_timeout = if args.response_timeout == 0 {
        DEFAULT_RESPONSE_TIMEOUT_MS
    } else {
        args.response_timeout
    };

    let options = ImportOptions {
        indices: args.indices.clone(),
        batch_size: Some(resolve_batch_size(
            args.batch_size.as_deref(),
            deps.registry.batch_size(),
        )),
        skip_batches: args.skip_batches,
        response_timeout: Duration::from_millis(response_timeout),
        update_settings: args.update_settings,
        swap_indices: args.swap_indices,
    };

    importer.import(&options).await?;

    println!("Done!");
    Ok(())
}
