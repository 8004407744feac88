//! The `stats` command: engine statistics as two tables.

use bytesize::ByteSize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::config::Dependencies;
use crate::errors::SyncError;

pub async fn run(deps: &Dependencies) -> Result<(), SyncError> {
    let stats = deps.engine.stats().await?;

    let fragmentation = if stats.database_size > 0 {
        (stats.database_size.saturating_sub(stats.used_database_size)) as f64
            / stats.database_size as f64
            * 100.0
    } else {
        0.0
    };

    let last_update = stats
        .last_update
        .map(|ts| ts.format("%Y %b %d, %H:%M:%S%.6f").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut global = Table::new();
    global.load_preset(UTF8_FULL);
    global.set_header(vec![
        "Database size",
        "Used database size",
        "Fragmentation ratio",
        "Last update",
    ]);
    global.add_row(vec![
        ByteSize(stats.database_size).to_string(),
        ByteSize(stats.used_database_size).to_string(),
        format!("{:.2}%", fragmentation),
        last_update,
    ]);

    println!("Global stats");
    println!("{global}");
    println!();

    let mut per_index = Table::new();
    per_index.load_preset(UTF8_FULL);
    per_index.set_header(vec![
        "Index",
        "No of documents",
        "Document DB size",
        "Avg document size",
        "Indexing",
        "No of embeddings",
        "No of embedded documents",
    ]);

    // HashMap order is unstable; sort by index name.
    let mut names: Vec<&String> = stats.indexes.keys().collect();
    names.sort();

    for name in names {
        let index = &stats.indexes[name];
        per_index.add_row(vec![
            name.clone(),
            format_count(index.number_of_documents),
            ByteSize(index.raw_document_db_size).to_string(),
            ByteSize(index.avg_document_size).to_string(),
            if index.is_indexing { "Yes" } else { "No" }.to_string(),
            format_count(index.number_of_embeddings.unwrap_or(0)),
            format_count(index.number_of_embedded_documents.unwrap_or(0)),
        ]);
    }

    println!("Indexes stats");
    println!("{per_index}");

    Ok(())
}

/// Render a count with thousands separators.
fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);

    for (position, ch) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }

    formatted
}
