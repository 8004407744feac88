//! CLI surface: `import`, `create` and `stats` subcommands.

use clap::{Parser, Subcommand};

use crate::config::Dependencies;
use crate::errors::SyncError;
use crate::events::{EventListener, ImportEvent};

pub mod create;
pub mod import;
pub mod stats;

pub use create::CreateArgs;
pub use import::ImportArgs;

#[derive(Parser, Debug)]
#[command(
    name = "search-sync",
    about = "Synchronize records from the source store into the search engine",
    version
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import configured entities into the search engine.
    Import(ImportArgs),
    /// Create configured indices in the search engine.
    Create(CreateArgs),
    /// Print search engine statistics.
    Stats,
}

/// Run the parsed command against initialized dependencies.
pub async fn run(cli: Cli) -> Result<(), SyncError> {
    let deps = Dependencies::new(cli.config.as_deref())?;

    match cli.command {
        Command::Import(args) => import::run(&deps, &args).await,
        Command::Create(args) => create::run(&deps, &args).await,
        Command::Stats => stats::run(&deps).await,
    }
}

/// Event listener that renders import progress on standard output.
pub struct ConsoleEventListener;

impl EventListener for ConsoleEventListener {
    fn on_event(&self, event: &ImportEvent) {
        match event {
            ImportEvent::IndexCreationStarted { entity, index } => {
                println!("Creating index {} for {}", index, entity);
            }
            ImportEvent::BeforeIndexImport { entity, .. } => {
                println!("Importing for index {}", entity);
            }
            ImportEvent::BatchesSkipped { batches, records } => {
                println!("Skipping first {} batches ({} records)", batches, records);
            }
            ImportEvent::BatchIndexed {
                entity,
                index,
                indexed,
                batch_records,
                total_indexed,
            } => {
                println!(
                    "Indexed a batch of {} / {} {} records into {} index ({} indexed since start)",
                    indexed, batch_records, entity, index, total_indexed
                );
            }
            ImportEvent::SettingsUpdated { index } => {
                println!("Settings updated of \"{}\".", index);
            }
        }
    }
}
