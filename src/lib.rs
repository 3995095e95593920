//! WordWell — an offline-first dictionary fetch-and-cache pipeline.
//!
//! Words are looked up against a remote dictionary service, cached in a
//! local SQLite store, and served from cache thereafter. Batches of words
//! are grouped into named sets and fetched through a durable job queue
//! that survives restarts. Pronunciation audio is downloaded in the
//! background with per-word deduplication, and every read surface is a
//! live stream that re-emits as the cache changes.
//!
//! [`server::WordWell::open`] wires everything together;
//! [`repository::DictionaryRepository`] is the facade applications use.

pub mod api;
pub mod audio;
pub mod config;
pub mod database;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod repository;
pub mod server;

#[cfg(test)]
mod tests;

pub use config::WordWellConfig;
pub use models::{FetchResult, Word, WordSet};
pub use repository::DictionaryRepository;
pub use server::WordWell;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
