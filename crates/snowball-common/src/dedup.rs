//! Duplicate detection between paper records.
//!
//! Staged decision, first applicable rule wins:
//! 1. DOI exact match (case-insensitive). Differing DOIs veto the match.
//! 2. arXiv id match, version suffix ignored. Differing ids veto the match.
//! 3. Fuzzy: title Jaccard ≥ 0.85, years within one, author last-name overlap ≥ 0.3.
//!
//! When unsure the records are treated as distinct.

use std::collections::HashSet;

use crate::models::Paper;

/// Minimum title Jaccard similarity for a fuzzy match.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Minimum author last-name Jaccard similarity when both sides list authors.
pub const AUTHOR_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Maximum publication-year gap (preprint vs. published version).
pub const MAX_YEAR_GAP: i32 = 1;

/// Result of a duplicate check.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupResult {
    Distinct,
    DuplicateDoi,
    DuplicateArxiv,
    /// Matched on title, year and authors.
    ProbableDuplicate { title_similarity: f64 },
}

impl DedupResult {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DedupResult::Distinct)
    }
}

/// Decide whether two records denote the same work, reporting the deciding rule.
pub fn check_duplicate(a: &Paper, b: &Paper) -> DedupResult {
    if a.title.trim().is_empty() || b.title.trim().is_empty() {
        return DedupResult::Distinct;
    }

    if let (Some(da), Some(db)) = (non_blank(&a.doi), non_blank(&b.doi)) {
        return if normalize_doi(da) == normalize_doi(db) {
            DedupResult::DuplicateDoi
        } else {
            DedupResult::Distinct
        };
    }

    if let (Some(xa), Some(xb)) = (non_blank(&a.arxiv_id), non_blank(&b.arxiv_id)) {
        return if normalize_arxiv_id(xa) == normalize_arxiv_id(xb) {
            DedupResult::DuplicateArxiv
        } else {
            DedupResult::Distinct
        };
    }

    let similarity = title_similarity(&a.title, &b.title);
    if similarity < TITLE_SIMILARITY_THRESHOLD {
        return DedupResult::Distinct;
    }

    if let (Some(ya), Some(yb)) = (a.year, b.year) {
        if (ya - yb).abs() > MAX_YEAR_GAP {
            return DedupResult::Distinct;
        }
    }

    if !a.authors.is_empty() && !b.authors.is_empty() {
        let names_a: Vec<&str> = a.authors.iter().map(|x| x.name.as_str()).collect();
        let names_b: Vec<&str> = b.authors.iter().map(|x| x.name.as_str()).collect();
        if authors_similarity(&names_a, &names_b) < AUTHOR_SIMILARITY_THRESHOLD {
            return DedupResult::Distinct;
        }
    }

    DedupResult::ProbableDuplicate { title_similarity: similarity }
}

pub fn are_duplicates(a: &Paper, b: &Paper) -> bool {
    check_duplicate(a, b).is_duplicate()
}

/// Jaccard similarity of stop-word-filtered, lower-cased title tokens.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ta = title_tokens(a);
    let tb = title_tokens(b);

    if ta.is_empty() && tb.is_empty() {
        // Titles made only of stop words: fall back to exact comparison.
        let (na, nb) = (normalize_title(a), normalize_title(b));
        return if !na.is_empty() && na == nb { 1.0 } else { 0.0 };
    }

    jaccard(&ta, &tb)
}

/// Jaccard similarity of normalized author last names.
pub fn authors_similarity(a: &[&str], b: &[&str]) -> f64 {
    let la: HashSet<String> = a.iter().filter_map(|n| last_name(n)).collect();
    let lb: HashSet<String> = b.iter().filter_map(|n| last_name(n)).collect();
    jaccard(&la, &lb)
}

/// `true` when two raw titles are close enough to denote the same work.
/// Used to validate title lookups returned by providers.
pub fn titles_match(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && !b.trim().is_empty()
        && title_similarity(a, b) >= TITLE_SIMILARITY_THRESHOLD
}

// ── Normalisation ────────────────────────────────────────────────────────────

pub fn normalize_doi(doi: &str) -> String {
    let lower = doi.trim().to_lowercase();
    let stripped = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"]
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
        .unwrap_or(lower.as_str());
    stripped.trim().to_string()
}

/// Lower-case, drop an `arXiv:` prefix and a trailing `vN` version suffix.
pub fn normalize_arxiv_id(id: &str) -> String {
    let lower = id.trim().to_lowercase();
    let base = lower.strip_prefix("arxiv:").unwrap_or(lower.as_str());
    match base.rfind('v') {
        Some(pos)
            if pos > 0
                && pos + 1 < base.len()
                && base[pos + 1..].bytes().all(|c| c.is_ascii_digit()) =>
        {
            base[..pos].to_string()
        }
        _ => base.to_string(),
    }
}

/// Lower-case with whitespace runs collapsed.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// "Doe, John" → "doe"; "John Doe" → "doe".
fn last_name(name: &str) -> Option<String> {
    let name = name.trim();
    let last = match name.split_once(',') {
        Some((surname, _)) => surname.trim(),
        None => name.split_whitespace().last()?,
    };
    let last = last.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    (!last.is_empty()).then_some(last)
}

fn title_tokens(title: &str) -> HashSet<String> {
    title.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Stop words excluded from title comparison.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "in", "of", "to", "is", "was",
    "for", "on", "with", "this", "that", "are", "were", "be", "been",
    "by", "from", "we", "our", "their", "which", "also", "at", "as",
    "into", "via", "its",
];
