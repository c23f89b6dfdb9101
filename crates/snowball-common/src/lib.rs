//! snowball-common — Shared domain types and errors used across all Snowball crates.

pub mod dedup;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use dedup::{are_duplicates, authors_similarity, title_similarity, DedupResult};
pub use error::{Result, SnowballError};
pub use models::{
    Author, ExclusionType, FilterCriteria, IterationStats, Paper, PaperSource, PaperStatus,
    ReviewProject, Venue,
};
