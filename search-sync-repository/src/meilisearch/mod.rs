//! Meilisearch backend implementation.

mod client;

pub use client::MeilisearchClient;
