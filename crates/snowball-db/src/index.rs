//! Known-identifier index.
//!
//! Maps normalized DOIs, arXiv ids and lower-cased titles to paper ids so that
//! obvious repeats resolve in O(1) before the fuzzy duplicate scan. Every hit
//! is checked against the DOI/arXiv veto of the duplicate predicate.

use std::collections::HashMap;

use snowball_common::dedup::{normalize_arxiv_id, normalize_doi, normalize_title};
use snowball_common::Paper;

#[derive(Debug, Default, Clone)]
pub struct IdentifierIndex {
    by_doi: HashMap<String, String>,
    by_arxiv: HashMap<String, String>,
    by_title: HashMap<String, String>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every identifier of `paper`. Keys already present keep
    /// pointing at the first paper that claimed them.
    pub fn insert(&mut self, paper: &Paper) {
        if paper.title.trim().is_empty() {
            return;
        }
        if let Some(doi) = doi_key(paper) {
            self.by_doi.entry(doi).or_insert_with(|| paper.id.clone());
        }
        if let Some(arxiv) = arxiv_key(paper) {
            self.by_arxiv.entry(arxiv).or_insert_with(|| paper.id.clone());
        }
        self.by_title
            .entry(normalize_title(&paper.title))
            .or_insert_with(|| paper.id.clone());
    }

    /// Id registered under the candidate's DOI, else its arXiv id.
    pub fn lookup_exact(&self, candidate: &Paper) -> Option<&str> {
        doi_key(candidate)
            .and_then(|k| self.by_doi.get(&k))
            .or_else(|| arxiv_key(candidate).and_then(|k| self.by_arxiv.get(&k)))
            .map(String::as_str)
    }

    /// Id registered under the candidate's lower-cased title.
    pub fn lookup_title(&self, candidate: &Paper) -> Option<&str> {
        if candidate.title.trim().is_empty() {
            return None;
        }
        self.by_title
            .get(&normalize_title(&candidate.title))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_doi.clear();
        self.by_arxiv.clear();
        self.by_title.clear();
    }
}

/// `true` when the external identifiers alone prove the two records distinct:
/// both carry a DOI and they differ, or (absent a DOI pair) both carry an
/// arXiv id and they differ.
pub fn identifiers_conflict(a: &Paper, b: &Paper) -> bool {
    if let (Some(da), Some(db)) = (doi_key(a), doi_key(b)) {
        return da != db;
    }
    if let (Some(xa), Some(xb)) = (arxiv_key(a), arxiv_key(b)) {
        return xa != xb;
    }
    false
}

fn doi_key(paper: &Paper) -> Option<String> {
    paper.doi.as_deref()
        .map(normalize_doi)
        .filter(|s| !s.is_empty())
}

fn arxiv_key(paper: &Paper) -> Option<String> {
    paper.arxiv_id.as_deref()
        .map(normalize_arxiv_id)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowball_common::PaperSource;

    fn paper(title: &str, doi: Option<&str>) -> Paper {
        let mut p = Paper::new(title, PaperSource::Backward);
        p.doi = doi.map(String::from);
        p
    }

    #[test]
    fn test_lookup_by_normalized_doi_and_title() {
        let mut index = IdentifierIndex::new();
        let known = paper("Deep Learning for X", Some("10.1/R"));
        index.insert(&known);

        let by_doi = paper("Other title", Some("https://doi.org/10.1/r"));
        assert_eq!(index.lookup_exact(&by_doi), Some(known.id.as_str()));

        let by_title = paper("deep  learning for x", None);
        assert_eq!(index.lookup_title(&by_title), Some(known.id.as_str()));
        assert_eq!(index.lookup_exact(&by_title), None);
    }

    #[test]
    fn test_arxiv_key_ignores_version() {
        let mut index = IdentifierIndex::new();
        let mut known = paper("Preprint", None);
        known.arxiv_id = Some("2301.00001v1".into());
        index.insert(&known);

        let mut candidate = paper("Preprint (revised)", None);
        candidate.arxiv_id = Some("arXiv:2301.00001v2".into());
        assert_eq!(index.lookup_exact(&candidate), Some(known.id.as_str()));
    }

    #[test]
    fn test_identifiers_conflict() {
        let a = paper("Same", Some("10.1/a"));
        let b = paper("Same", Some("10.1/b"));
        let c = paper("Same", None);
        assert!(identifiers_conflict(&a, &b));
        assert!(!identifiers_conflict(&a, &c));
        assert!(!identifiers_conflict(&a, &a));
    }

    #[test]
    fn test_empty_titles_not_indexed() {
        let mut index = IdentifierIndex::new();
        index.insert(&paper("", Some("10.1/x")));
        assert!(index.is_empty());
        assert_eq!(index.lookup_exact(&paper("T", Some("10.1/x"))), None);
    }
}
