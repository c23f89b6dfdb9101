//! snowball-engine — Citation-graph expansion for systematic literature reviews.
//!
//! - Reference/citation providers (`sources`)
//! - Inclusion-criteria filtering (`filter`)
//! - PDF-extracted reference handling (`references`)
//! - The generation-by-generation snowball pipeline (`pipeline`)

pub mod filter;
pub mod pipeline;
pub mod references;
pub mod sources;

pub use filter::{estimate_venue_quality, CriteriaFilter, FilterEvaluator, VenueQuality};
pub use pipeline::{
    CitationRefresh, Direction, EngineConfig, IterationGate, IterationOutcome, ReviewDecision, SnowballEngine,
};
pub use references::{ExtractedReference, ExtractedSeed};
pub use sources::{LiteratureSource, SourceAggregator};
