//! On-disk layout of a project directory.
//!
//! ```text
//! <project>/
//!   project.json        ReviewProject
//!   papers.json         id -> IndexEntry (lightweight listing)
//!   papers/<id>.json    one full Paper record per file
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snowball_common::{Paper, PaperSource, PaperStatus};

use crate::error::{DbError, Result};

pub const PROJECT_FILE: &str = "project.json";
pub const INDEX_FILE: &str = "papers.json";
pub const PAPERS_DIR: &str = "papers";

// =============================================================================
// Index Schema
// =============================================================================

/// Projection of a paper kept in `papers.json` for listing without loading
/// every full record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub title: String,
    pub year: Option<i32>,
    pub status: PaperStatus,
    pub source: PaperSource,
    pub doi: Option<String>,
    pub citation_count: Option<u32>,
}

impl From<&Paper> for IndexEntry {
    fn from(paper: &Paper) -> Self {
        Self {
            title: paper.title.clone(),
            year: paper.year,
            status: paper.status,
            source: paper.source,
            doi: paper.doi.clone(),
            citation_count: paper.citation_count,
        }
    }
}

pub type PaperIndex = BTreeMap<String, IndexEntry>;

// =============================================================================
// Statistics
// =============================================================================

/// Paper counts over a whole project.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StoreStatistics {
    pub total: usize,
    pub by_status: BTreeMap<PaperStatus, usize>,
    pub by_iteration: BTreeMap<u32, usize>,
    pub by_source: BTreeMap<PaperSource, usize>,
}

impl StoreStatistics {
    pub fn from_papers<'a>(papers: impl IntoIterator<Item = &'a Paper>) -> Self {
        let mut stats = Self::default();
        for paper in papers {
            stats.total += 1;
            *stats.by_status.entry(paper.status).or_default() += 1;
            *stats.by_iteration.entry(paper.snowball_iteration).or_default() += 1;
            *stats.by_source.entry(paper.source).or_default() += 1;
        }
        stats
    }

    pub fn count_status(&self, status: PaperStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Path of a paper record. Ids become file names, so anything that could
/// escape the papers directory is rejected.
pub fn paper_path(papers_dir: &Path, id: &str) -> Result<PathBuf> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0']);
    if !valid {
        return Err(DbError::InvalidId(id.to_string()));
    }
    Ok(papers_dir.join(format!("{id}.json")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_path_rejects_traversal() {
        let dir = Path::new("/tmp/project/papers");
        assert!(paper_path(dir, "abc-123").is_ok());
        assert!(paper_path(dir, "").is_err());
        assert!(paper_path(dir, "../project").is_err());
        assert!(paper_path(dir, "..").is_err());
    }

    #[test]
    fn test_statistics_counts() {
        let mut a = Paper::new("A", PaperSource::Seed);
        a.status = PaperStatus::Included;
        let mut b = Paper::new("B", PaperSource::Backward);
        b.snowball_iteration = 1;
        let c = Paper::new("C", PaperSource::Forward);

        let stats = StoreStatistics::from_papers([&a, &b, &c]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count_status(PaperStatus::Pending), 2);
        assert_eq!(stats.count_status(PaperStatus::Excluded), 0);
        assert_eq!(stats.by_iteration[&0], 2);
        assert_eq!(stats.by_source[&PaperSource::Backward], 1);
    }
}
