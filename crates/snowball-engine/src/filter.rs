//! Inclusion-criteria filtering.
//!
//! Metadata a paper lacks never counts against it: a paper without a year
//! passes year bounds, one without citation data passes citation bounds, and
//! so on. Only evidence that contradicts the criteria rejects a paper.

use std::fmt;

use snowball_common::{FilterCriteria, Paper};

/// Decides which candidates of an iteration go to human review.
pub trait FilterEvaluator: Send + Sync {
    /// The subset of `papers` that satisfies `criteria`, in input order.
    fn apply_filters(&self, papers: &[Paper], criteria: &FilterCriteria) -> Vec<Paper>;
}

/// Default evaluator over [`FilterCriteria`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CriteriaFilter;

impl CriteriaFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn passes(&self, paper: &Paper, criteria: &FilterCriteria) -> bool {
        passes_year(paper, criteria)
            && passes_citations(paper, criteria)
            && passes_influential(paper, criteria)
            && passes_keywords(paper, criteria)
            && passes_excluded_keywords(paper, criteria)
            && passes_venue_type(paper, criteria)
    }
}

impl FilterEvaluator for CriteriaFilter {
    fn apply_filters(&self, papers: &[Paper], criteria: &FilterCriteria) -> Vec<Paper> {
        if criteria.is_empty() {
            return papers.to_vec();
        }
        papers.iter().filter(|p| self.passes(p, criteria)).cloned().collect()
    }
}

fn passes_year(paper: &Paper, criteria: &FilterCriteria) -> bool {
    let Some(year) = paper.year else { return true };
    criteria.min_year.map_or(true, |min| year >= min)
        && criteria.max_year.map_or(true, |max| year <= max)
}

fn passes_citations(paper: &Paper, criteria: &FilterCriteria) -> bool {
    let Some(count) = paper.citation_count else { return true };
    criteria.min_citations.map_or(true, |min| count >= min)
        && criteria.max_citations.map_or(true, |max| count <= max)
}

fn passes_influential(paper: &Paper, criteria: &FilterCriteria) -> bool {
    match (paper.influential_citation_count, criteria.min_influential_citations) {
        (Some(count), Some(min)) => count >= min,
        _ => true,
    }
}

/// Lower-cased title and abstract, or `None` when the paper has neither.
fn searchable_text(paper: &Paper) -> Option<String> {
    let text = [Some(paper.title.as_str()), paper.abstract_text.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!text.is_empty()).then_some(text)
}

fn passes_keywords(paper: &Paper, criteria: &FilterCriteria) -> bool {
    if criteria.keywords.is_empty() {
        return true;
    }
    let Some(text) = searchable_text(paper) else { return true };
    criteria.keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}

fn passes_excluded_keywords(paper: &Paper, criteria: &FilterCriteria) -> bool {
    if criteria.excluded_keywords.is_empty() {
        return true;
    }
    let Some(text) = searchable_text(paper) else { return true };
    !criteria.excluded_keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}

fn passes_venue_type(paper: &Paper, criteria: &FilterCriteria) -> bool {
    if criteria.venue_types.is_empty() {
        return true;
    }
    let Some(kind) = paper.venue.as_ref().and_then(|v| v.venue_type.as_deref()) else {
        return true;
    };
    criteria.venue_types.iter().any(|t| t.eq_ignore_ascii_case(kind.trim()))
}

// ── Venue quality ────────────────────────────────────────────────────────────

/// Rough venue-quality bucket derived from the paper's citation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueQuality {
    High,
    Medium,
    Low,
    Unknown,
}

impl VenueQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueQuality::High    => "high",
            VenueQuality::Medium  => "medium",
            VenueQuality::Low     => "low",
            VenueQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VenueQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn estimate_venue_quality(paper: &Paper) -> VenueQuality {
    if paper.venue.is_none() {
        return VenueQuality::Unknown;
    }
    match paper.citation_count {
        Some(c) if c >= 100 => VenueQuality::High,
        Some(c) if c >= 20  => VenueQuality::Medium,
        Some(_)             => VenueQuality::Low,
        None                => VenueQuality::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowball_common::{PaperSource, Venue};

    fn paper(title: &str) -> Paper {
        Paper::new(title, PaperSource::Backward)
    }

    fn titles(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.title.as_str()).collect()
    }

    fn with_year(title: &str, year: Option<i32>) -> Paper {
        let mut p = paper(title);
        p.year = year;
        p
    }

    #[test]
    fn test_empty_criteria_passes_everything() {
        let papers = vec![with_year("A", Some(1990)), with_year("B", None)];
        let out = CriteriaFilter.apply_filters(&papers, &FilterCriteria::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_year_bounds_inclusive_and_missing_year_passes() {
        let papers = vec![
            with_year("2019", Some(2019)),
            with_year("2020", Some(2020)),
            with_year("2021", Some(2021)),
            with_year("2022", Some(2022)),
            with_year("none", None),
        ];
        let criteria = FilterCriteria { min_year: Some(2020), max_year: Some(2021), ..Default::default() };
        let out = CriteriaFilter.apply_filters(&papers, &criteria);
        assert_eq!(titles(&out), vec!["2020", "2021", "none"]);
    }

    #[test]
    fn test_citation_bounds() {
        let mut papers: Vec<Paper> = [5, 50, 500].iter().map(|c| {
            let mut p = paper(&format!("c{c}"));
            p.citation_count = Some(*c);
            p
        }).collect();
        papers.push(paper("unknown"));

        let criteria = FilterCriteria { min_citations: Some(50), ..Default::default() };
        assert_eq!(titles(&CriteriaFilter.apply_filters(&papers, &criteria)), vec!["c50", "c500", "unknown"]);

        let criteria = FilterCriteria { max_citations: Some(100), ..Default::default() };
        assert_eq!(titles(&CriteriaFilter.apply_filters(&papers, &criteria)), vec!["c5", "c50", "unknown"]);
    }

    #[test]
    fn test_influential_citations() {
        let mut low = paper("low");
        low.influential_citation_count = Some(2);
        let mut high = paper("high");
        high.influential_citation_count = Some(20);
        let none = paper("none");

        let criteria = FilterCriteria { min_influential_citations: Some(10), ..Default::default() };
        let out = CriteriaFilter.apply_filters(&[low, high, none], &criteria);
        assert_eq!(titles(&out), vec!["high", "none"]);
    }

    #[test]
    fn test_keywords_in_title_or_abstract_case_insensitive() {
        let mut in_abstract = paper("Paper One");
        in_abstract.abstract_text = Some("This paper discusses machine learning applications.".into());
        let papers = vec![
            paper("MACHINE LEARNING Study"),
            paper("Deep Learning Methods"),
            paper("Statistical Analysis"),
            in_abstract,
        ];
        let criteria = FilterCriteria {
            keywords: vec!["machine learning".into(), "deep learning".into()],
            ..Default::default()
        };
        let out = CriteriaFilter.apply_filters(&papers, &criteria);
        assert_eq!(titles(&out), vec!["MACHINE LEARNING Study", "Deep Learning Methods", "Paper One"]);
    }

    #[test]
    fn test_keywords_pass_papers_without_text() {
        let criteria = FilterCriteria { keywords: vec!["graphs".into()], ..Default::default() };
        assert!(CriteriaFilter.passes(&paper(""), &criteria));
    }

    #[test]
    fn test_excluded_keywords() {
        let papers = vec![
            paper("Machine Learning Survey"),
            paper("Machine Learning Methods"),
            paper("Deep Learning Review"),
        ];
        let criteria = FilterCriteria {
            excluded_keywords: vec!["survey".into(), "review".into()],
            ..Default::default()
        };
        assert_eq!(titles(&CriteriaFilter.apply_filters(&papers, &criteria)), vec!["Machine Learning Methods"]);
    }

    #[test]
    fn test_venue_types() {
        let venue = |kind: &str| Venue { name: Some("V".into()), venue_type: Some(kind.into()), ..Default::default() };
        let mut journal = paper("journal");
        journal.venue = Some(venue("Journal"));
        let mut workshop = paper("workshop");
        workshop.venue = Some(venue("workshop"));
        let no_venue = paper("none");

        let criteria = FilterCriteria {
            venue_types: vec!["journal".into(), "conference".into()],
            ..Default::default()
        };
        let out = CriteriaFilter.apply_filters(&[journal, workshop, no_venue], &criteria);
        assert_eq!(titles(&out), vec!["journal", "none"]);
    }

    #[test]
    fn test_combined_criteria() {
        let mut a = with_year("ML 2022", Some(2022));
        a.citation_count = Some(100);
        let mut b = with_year("ML 2019", Some(2019));
        b.citation_count = Some(100);
        let mut c = with_year("Stats 2022", Some(2022));
        c.citation_count = Some(5);

        let criteria = FilterCriteria { min_year: Some(2020), min_citations: Some(50), ..Default::default() };
        assert_eq!(titles(&CriteriaFilter.apply_filters(&[a, b, c], &criteria)), vec!["ML 2022"]);
        assert!(CriteriaFilter.apply_filters(&[], &criteria).is_empty());
    }

    #[test]
    fn test_venue_quality() {
        let mut p = paper("q");
        assert_eq!(estimate_venue_quality(&p), VenueQuality::Unknown);

        p.venue = Some(Venue::default());
        assert_eq!(estimate_venue_quality(&p), VenueQuality::Unknown);
        p.citation_count = Some(150);
        assert_eq!(estimate_venue_quality(&p), VenueQuality::High);
        p.citation_count = Some(20);
        assert_eq!(estimate_venue_quality(&p), VenueQuality::Medium);
        p.citation_count = Some(3);
        assert_eq!(estimate_venue_quality(&p).to_string(), "low");
    }
}
