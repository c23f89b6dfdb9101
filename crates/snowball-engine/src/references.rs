//! Reference lists extracted from PDFs.
//!
//! A seed parsed from a PDF carries its bibliography under
//! `raw_data["extracted_references"]`. Backward expansion prefers that list
//! over a provider lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snowball_common::{Author, Paper, PaperSource};
use tracing::warn;

pub const EXTRACTED_REFERENCES_KEY: &str = "extracted_references";

/// Key under which a reference paper keeps the record it was built from.
pub const EXTRACTED_REFERENCE_KEY: &str = "extracted_reference";

/// Title given to references with no usable text.
pub const UNKNOWN_REFERENCE: &str = "Unknown reference";
const MAX_RAW_TITLE_CHARS: usize = 200;
const MIN_PARSED_TITLE_CHARS: usize = 10;

/// One bibliography entry as produced by the PDF extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractedReference {
    pub title: Option<String>,
    /// Unparsed citation string.
    pub raw: Option<String>,
    pub doi: Option<String>,
    pub year: Option<i32>,
    pub authors: Vec<String>,
}

impl ExtractedReference {
    /// Best available title: the parsed one, else the text following the
    /// year in the raw string up to the first sentence break, else the start
    /// of the raw string.
    pub fn best_title(&self) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        let Some(raw) = self.raw.as_deref().filter(|r| !r.is_empty()) else {
            return UNKNOWN_REFERENCE.to_string();
        };
        if let Some(title) = self.title_after_year(raw) {
            return title;
        }
        raw.chars().take(MAX_RAW_TITLE_CHARS).collect()
    }

    fn title_after_year(&self, raw: &str) -> Option<String> {
        let year = self.year?.to_string();
        let (_, rest) = raw.split_once(year.as_str())?;
        let rest = rest.trim_matches(|c| c == '.' || c == ' ');
        let candidate = rest.split(". ").next().unwrap_or(rest);
        (candidate.chars().count() > MIN_PARSED_TITLE_CHARS).then(|| candidate.to_string())
    }

    /// Candidate paper for backward expansion.
    pub fn to_paper(&self) -> Paper {
        let mut paper = Paper::new(self.best_title(), PaperSource::Backward);
        paper.doi = self.doi.clone().filter(|d| !d.trim().is_empty());
        paper.year = self.year;
        paper.authors = self
            .authors
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(Author::new)
            .collect();
        if let Ok(value) = serde_json::to_value(self) {
            paper.raw_data.insert(EXTRACTED_REFERENCE_KEY.to_string(), value);
        }
        paper
    }
}

/// Metadata the PDF extractor produced for a prospective seed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractedSeed {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub doi: Option<String>,
    pub references: Vec<ExtractedReference>,
    pub pdf_path: Option<String>,
}

/// Extracted references stored on `paper`. Malformed entries are skipped.
pub fn extracted_references(paper: &Paper) -> Vec<ExtractedReference> {
    let Some(Value::Array(entries)) = paper.raw_data.get(EXTRACTED_REFERENCES_KEY) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!(paper_id = %paper.id, error = %e, "Skipping malformed extracted reference");
                None
            }
        })
        .collect()
}

pub fn store_extracted_references(paper: &mut Paper, references: &[ExtractedReference]) {
    let entries = references
        .iter()
        .filter_map(|r| serde_json::to_value(r).ok())
        .collect();
    paper.raw_data.insert(EXTRACTED_REFERENCES_KEY.to_string(), Value::Array(entries));
}
