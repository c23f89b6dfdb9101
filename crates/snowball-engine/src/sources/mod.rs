//! Reference and citation providers.

pub mod aggregator;

pub use aggregator::SourceAggregator;

use async_trait::async_trait;
use snowball_common::Paper;

/// Common interface for academic metadata providers.
///
/// Returned papers are candidates: the engine assigns ids, provenance and
/// review state, so providers only need to fill in bibliographic fields.
/// Errors are reported per call and never abort an iteration.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Works cited by `paper` (backward direction).
    async fn get_references(&self, paper: &Paper, limit: usize) -> anyhow::Result<Vec<Paper>>;

    /// Works citing `paper` (forward direction).
    async fn get_citations(&self, paper: &Paper, limit: usize) -> anyhow::Result<Vec<Paper>>;

    async fn search_by_doi(&self, _doi: &str) -> anyhow::Result<Option<Paper>> {
        Ok(None)
    }

    async fn search_by_title(&self, _title: &str) -> anyhow::Result<Option<Paper>> {
        Ok(None)
    }

    /// Fill in missing external identifiers (DOI, provider ids).
    async fn identify_paper(&self, paper: Paper) -> anyhow::Result<Paper> {
        Ok(paper)
    }

    /// Fill in missing bibliographic metadata (abstract, counts, venue).
    async fn enrich_metadata(&self, paper: Paper) -> anyhow::Result<Paper> {
        Ok(paper)
    }

    /// Current citation count, if this provider tracks one.
    async fn get_citation_count(&self, _paper: &Paper) -> anyhow::Result<Option<u32>> {
        Ok(None)
    }
}
