//! Core domain model for snowball reviews.
//!
//! A `Paper` is the unit of discovery: created once (as a seed or by expansion)
//! and afterwards only mutated in place. A `ReviewProject` carries the review
//! configuration together with the generation cursor and per-generation stats.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::SnowballError;

// ── Enumerations ─────────────────────────────────────────────────────────────

/// Review status of a paper.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PaperStatus {
    #[default]
    Pending,
    Included,
    Excluded,
    /// Decision deferred by the reviewer. Not pending for the iteration gate,
    /// not included for frontier selection.
    Maybe,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Pending  => "pending",
            PaperStatus::Included => "included",
            PaperStatus::Excluded => "excluded",
            PaperStatus::Maybe    => "maybe",
        }
    }
}

/// How a paper entered the project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PaperSource {
    Seed,
    /// Found in a frontier paper's references.
    Backward,
    /// Found in a frontier paper's citations.
    Forward,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::Seed     => "seed",
            PaperSource::Backward => "backward",
            PaperSource::Forward  => "forward",
        }
    }
}

/// Who excluded a paper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionType {
    /// Rejected by the filter criteria during an iteration.
    Auto,
    /// Rejected by a reviewer.
    Manual,
}

impl ExclusionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionType::Auto   => "auto",
            ExclusionType::Manual => "manual",
        }
    }
}

macro_rules! impl_display_from_str {
    ($ty:ty, $what:literal, [$($text:literal => $variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SnowballError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(SnowballError::Config(format!("unknown {}: {other}", $what))),
                }
            }
        }
    };
}

impl_display_from_str!(PaperStatus, "paper status", [
    "pending"  => PaperStatus::Pending,
    "included" => PaperStatus::Included,
    "excluded" => PaperStatus::Excluded,
    "maybe"    => PaperStatus::Maybe,
]);

impl_display_from_str!(PaperSource, "paper source", [
    "seed"     => PaperSource::Seed,
    "backward" => PaperSource::Backward,
    "forward"  => PaperSource::Forward,
]);

impl_display_from_str!(ExclusionType, "exclusion type", [
    "auto"   => ExclusionType::Auto,
    "manual" => ExclusionType::Manual,
]);

// ── Paper ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), affiliations: Vec::new() }
    }
}

/// Publication venue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub name: Option<String>,
    /// journal, conference, workshop, …
    #[serde(rename = "type")]
    pub venue_type: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
}

/// A scholarly work known to a review project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: String,

    // Identifiers
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub arxiv_id: Option<String>,
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub semantic_scholar_id: Option<String>,
    #[serde(default)]
    pub openalex_id: Option<String>,

    // Metadata
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub venue: Option<Venue>,

    // Metrics
    #[serde(default)]
    pub citation_count: Option<u32>,
    #[serde(default)]
    pub influential_citation_count: Option<u32>,

    // Provenance
    pub source: PaperSource,
    #[serde(default)]
    pub source_paper_ids: Vec<String>,
    #[serde(default)]
    pub snowball_iteration: u32,

    // Review state
    #[serde(default)]
    pub status: PaperStatus,
    #[serde(default)]
    pub exclusion_type: Option<ExclusionType>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub review_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub pdf_path: Option<String>,
    /// Set when neither the provider nor an extractor could supply references.
    #[serde(default)]
    pub references_unavailable: bool,

    #[serde(default = "default_observation_count")]
    pub observation_count: u32,

    /// Opaque per-source payloads (provider responses, extracted reference lists).
    #[serde(default)]
    pub raw_data: Map<String, Value>,
}

fn default_observation_count() -> u32 { 1 }

impl Paper {
    /// Create a paper with a fresh id and pending status.
    pub fn new(title: impl Into<String>, source: PaperSource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doi: None,
            arxiv_id: None,
            pmid: None,
            semantic_scholar_id: None,
            openalex_id: None,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            abstract_text: None,
            venue: None,
            citation_count: None,
            influential_citation_count: None,
            source,
            source_paper_ids: Vec::new(),
            snowball_iteration: 0,
            status: PaperStatus::Pending,
            exclusion_type: None,
            notes: String::new(),
            tags: Vec::new(),
            review_date: None,
            pdf_path: None,
            references_unavailable: false,
            observation_count: 1,
            raw_data: Map::new(),
        }
    }

    /// Apply a reviewer decision. Excluding through this path is always manual;
    /// any other status clears the exclusion type.
    pub fn set_status(&mut self, status: PaperStatus) {
        self.status = status;
        self.exclusion_type = match status {
            PaperStatus::Excluded => Some(ExclusionType::Manual),
            _ => None,
        };
    }

    pub fn exclude(&mut self, kind: ExclusionType) {
        self.status = PaperStatus::Excluded;
        self.exclusion_type = Some(kind);
    }

    /// Record that `other` was observed again as this paper.
    ///
    /// Bumps `observation_count`, backfills `doi`, `abstract`, `year` and
    /// `citation_count` only where this record has none, and remembers the
    /// frontier paper that led to the observation. Existing values are never
    /// overwritten, even when the new observation looks fresher.
    pub fn merge_observation(&mut self, other: &Paper, via: Option<&str>) {
        self.observation_count = self.observation_count.saturating_add(1);

        if self.doi.is_none() {
            self.doi = other.doi.clone();
        }
        if self.abstract_text.is_none() {
            self.abstract_text = other.abstract_text.clone();
        }
        if self.year.is_none() {
            self.year = other.year;
        }
        if self.citation_count.is_none() {
            self.citation_count = other.citation_count;
        }

        if let Some(id) = via {
            if id != self.id && !self.source_paper_ids.iter().any(|s| s == id) {
                self.source_paper_ids.push(id.to_string());
            }
        }
    }
}

// ── Project ──────────────────────────────────────────────────────────────────

/// Inclusion criteria consumed by the filter evaluator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterCriteria {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_citations: Option<u32>,
    pub max_citations: Option<u32>,
    pub keywords: Vec<String>,
    pub excluded_keywords: Vec<String>,
    /// journal, conference, …
    pub venue_types: Vec<String>,
    pub min_influential_citations: Option<u32>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }
}

/// Statistics for a single snowball generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationStats {
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,

    // Discovery (set when the generation is produced)
    #[serde(default)]
    pub discovered: usize,
    #[serde(default)]
    pub backward: usize,
    #[serde(default)]
    pub forward: usize,
    #[serde(default)]
    pub auto_excluded: usize,
    #[serde(default)]
    pub for_review: usize,

    // Review (updated as decisions are made)
    #[serde(default)]
    pub manual_included: usize,
    #[serde(default)]
    pub manual_excluded: usize,
    #[serde(default)]
    pub manual_maybe: usize,
    #[serde(default)]
    pub reviewed: usize,
}

impl IterationStats {
    pub fn new(iteration: u32) -> Self {
        Self {
            iteration,
            timestamp: Utc::now(),
            discovered: 0,
            backward: 0,
            forward: 0,
            auto_excluded: 0,
            for_review: 0,
            manual_included: 0,
            manual_excluded: 0,
            manual_maybe: 0,
            reviewed: 0,
        }
    }

    fn manual_counter(&mut self, status: PaperStatus) -> Option<&mut usize> {
        match status {
            PaperStatus::Included => Some(&mut self.manual_included),
            PaperStatus::Excluded => Some(&mut self.manual_excluded),
            PaperStatus::Maybe    => Some(&mut self.manual_maybe),
            PaperStatus::Pending  => None,
        }
    }

    /// Move one paper's tally from `old` to `new`.
    pub fn record_review(&mut self, old: PaperStatus, new: PaperStatus) {
        if old == new {
            return;
        }

        if let Some(counter) = self.manual_counter(old) {
            *counter = counter.saturating_sub(1);
        }
        if let Some(counter) = self.manual_counter(new) {
            *counter += 1;
        }

        match (old, new) {
            (PaperStatus::Pending, _) => self.reviewed += 1,
            (_, PaperStatus::Pending) => self.reviewed = self.reviewed.saturating_sub(1),
            _ => {}
        }
    }
}

/// A systematic literature review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub filter_criteria: FilterCriteria,

    /// Ordered, duplicate-free.
    #[serde(default)]
    pub seed_paper_ids: Vec<String>,

    #[serde(default)]
    pub current_iteration: u32,

    #[serde(default)]
    pub iteration_stats: BTreeMap<u32, IterationStats>,
}

impl ReviewProject {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            filter_criteria: FilterCriteria::default(),
            seed_paper_ids: Vec::new(),
            current_iteration: 0,
            iteration_stats: BTreeMap::new(),
        }
    }

    /// Returns `false` if the id was already a seed.
    pub fn add_seed_id(&mut self, id: &str) -> bool {
        if self.seed_paper_ids.iter().any(|s| s == id) {
            return false;
        }
        self.seed_paper_ids.push(id.to_string());
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn stats_mut(&mut self, iteration: u32) -> &mut IterationStats {
        self.iteration_stats
            .entry(iteration)
            .or_insert_with(|| IterationStats::new(iteration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enums_serialize_lowercase() {
        let mut paper = Paper::new("A Study", PaperSource::Backward);
        paper.exclude(ExclusionType::Auto);
        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["source"], "backward");
        assert_eq!(json["status"], "excluded");
        assert_eq!(json["exclusion_type"], "auto");
        assert_eq!(json["observation_count"], 1);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Included".parse::<PaperStatus>().unwrap(), PaperStatus::Included);
        assert_eq!(" forward ".parse::<PaperSource>().unwrap(), PaperSource::Forward);
        assert!("unknown".parse::<PaperStatus>().is_err());
    }

    #[test]
    fn test_set_status_maintains_exclusion_type() {
        let mut paper = Paper::new("A Study", PaperSource::Forward);
        paper.exclude(ExclusionType::Auto);
        assert_eq!(paper.exclusion_type, Some(ExclusionType::Auto));

        paper.set_status(PaperStatus::Included);
        assert_eq!(paper.exclusion_type, None);

        paper.set_status(PaperStatus::Excluded);
        assert_eq!(paper.exclusion_type, Some(ExclusionType::Manual));

        paper.set_status(PaperStatus::Pending);
        assert_eq!(paper.exclusion_type, None);
    }

    #[test]
    fn test_merge_observation_backfills_only_missing_fields() {
        let mut existing = Paper::new("Deep Learning for X", PaperSource::Backward);
        existing.year = Some(2020);
        existing.source_paper_ids.push("s1".into());

        let mut seen = Paper::new("Deep Learning for X", PaperSource::Forward);
        seen.doi = Some("10.1/x".into());
        seen.year = Some(2021);
        seen.citation_count = Some(12);
        seen.abstract_text = Some("abstract".into());

        existing.merge_observation(&seen, Some("s2"));
        existing.merge_observation(&seen, Some("s2"));

        assert_eq!(existing.observation_count, 3);
        assert_eq!(existing.year, Some(2020));
        assert_eq!(existing.doi.as_deref(), Some("10.1/x"));
        assert_eq!(existing.citation_count, Some(12));
        assert_eq!(existing.abstract_text.as_deref(), Some("abstract"));
        assert_eq!(existing.source_paper_ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn test_record_review_transitions() {
        let mut stats = IterationStats::new(1);
        stats.record_review(PaperStatus::Pending, PaperStatus::Included);
        assert_eq!((stats.reviewed, stats.manual_included), (1, 1));

        stats.record_review(PaperStatus::Included, PaperStatus::Excluded);
        assert_eq!((stats.reviewed, stats.manual_included, stats.manual_excluded), (1, 0, 1));

        stats.record_review(PaperStatus::Excluded, PaperStatus::Pending);
        assert_eq!((stats.reviewed, stats.manual_excluded), (0, 0));

        // Never underflows
        stats.record_review(PaperStatus::Maybe, PaperStatus::Pending);
        assert_eq!((stats.reviewed, stats.manual_maybe), (0, 0));
    }

    #[test]
    fn test_project_stats_survive_json() {
        let mut project = ReviewProject::new("Review");
        project.stats_mut(2).discovered = 7;
        assert!(project.add_seed_id("a"));
        assert!(!project.add_seed_id("a"));

        let json = serde_json::to_string(&project).unwrap();
        let back: ReviewProject = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iteration_stats[&2].discovered, 7);
        assert_eq!(back.seed_paper_ids, vec!["a".to_string()]);
    }

    #[test]
    fn test_paper_defaults_when_fields_missing() {
        let paper: Paper = serde_json::from_str(
            r#"{"id": "p1", "title": "Minimal", "source": "seed"}"#,
        ).unwrap();
        assert_eq!(paper.status, PaperStatus::Pending);
        assert_eq!(paper.observation_count, 1);
        assert!(paper.raw_data.is_empty());
    }
}
