//! The `create` command.

use clap::{ArgAction, Args};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::ConsoleEventListener;
use crate::config::{Dependencies, DEFAULT_RESPONSE_TIMEOUT_MS};
use crate::errors::SyncError;
use crate::resolver::EntityResolver;

#[derive(Args, Debug)]
pub struct CreateArgs {
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
}

pub async fn run(deps: &Dependencies, args: &CreateArgs) -> Result<(), SyncError> {
    let resolver = EntityResolver::new(deps.registry.clone());
    let resolved = resolver.resolve(&args.indices);

    if resolved.is_empty() {
        println!(
            "No indices specified. Please either specify indices using the cli option or configuration."
        );
        return Ok(());
    }

    let listener = Arc::new(ConsoleEventListener);
    let creator = deps.creator(listener.clone());
    let updater = deps.settings_updater(listener);
    let timeout = Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS);

    // Aggregator constituents share an index; create each index once.
    let mut created: HashSet<String> = HashSet::new();

    for entry in &resolved {
        if !created.insert(entry.name.clone()) {
            continue;
        }

        creator.create(&entry.name, timeout).await?;

        if args.update_settings {
            updater
                .update(&entry.name, &entry.prefixed_name, timeout)
                .await?;
        }
    }

    println!("Done!");
    Ok(())
}
