//! Snowball storage layer
//!
//! A JSON-file store for one review project: one record per paper under
//! `papers/`, a lightweight `papers.json` listing and the `project.json`
//! review state. Paper writes go through a write-behind queue drained by a
//! dedicated thread; reads are served from an in-memory cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use snowball_common::{Paper, PaperSource};
//! use snowball_db::PaperStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PaperStore::open("./reviews/my-review")?;
//!
//!     let paper = Paper::new("Attention Is All You Need", PaperSource::Seed);
//!     store.save_paper(&paper)?;
//!     store.flush().await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod index;
pub mod schema;
pub mod store;
mod writer;

pub use error::{DbError, Result};
pub use index::{identifiers_conflict, IdentifierIndex};
pub use schema::{IndexEntry, PaperIndex, StoreStatistics, INDEX_FILE, PAPERS_DIR, PROJECT_FILE};
pub use store::PaperStore;
