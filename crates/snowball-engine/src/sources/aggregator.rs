//! Provider fan-out.
//!
//! Sources are consulted in registration order. Lookups return the first
//! useful answer; enrichment runs every source in turn. A failing source is
//! logged and skipped.

use std::sync::Arc;

use async_trait::async_trait;
use snowball_common::dedup::titles_match;
use snowball_common::Paper;
use tracing::{debug, info, warn};

use super::LiteratureSource;

#[derive(Debug, Clone, Copy)]
enum Neighbours {
    References,
    Citations,
}

impl Neighbours {
    fn as_str(self) -> &'static str {
        match self {
            Neighbours::References => "references",
            Neighbours::Citations  => "citations",
        }
    }
}

#[derive(Default, Clone)]
pub struct SourceAggregator {
    sources: Vec<Arc<dyn LiteratureSource>>,
}

impl SourceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn LiteratureSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First non-empty neighbour list. Fails only when every source failed.
    async fn first_non_empty(&self, paper: &Paper, limit: usize, kind: Neighbours) -> anyhow::Result<Vec<Paper>> {
        let mut last_error = None;
        let mut answered = false;

        for source in &self.sources {
            let result = match kind {
                Neighbours::References => source.get_references(paper, limit).await,
                Neighbours::Citations  => source.get_citations(paper, limit).await,
            };
            match result {
                Ok(found) if !found.is_empty() => {
                    info!(source = source.name(), n = found.len(), "Found {}", kind.as_str());
                    return Ok(found);
                }
                Ok(_) => answered = true,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Error getting {}", kind.as_str());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e.context(format!("no source could provide {}", kind.as_str()))),
            _ => {
                debug!(title = %paper.title, "No {} found", kind.as_str());
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl LiteratureSource for SourceAggregator {
    fn name(&self) -> &str {
        "aggregator"
    }

    async fn get_references(&self, paper: &Paper, limit: usize) -> anyhow::Result<Vec<Paper>> {
        self.first_non_empty(paper, limit, Neighbours::References).await
    }

    async fn get_citations(&self, paper: &Paper, limit: usize) -> anyhow::Result<Vec<Paper>> {
        self.first_non_empty(paper, limit, Neighbours::Citations).await
    }

    async fn search_by_doi(&self, doi: &str) -> anyhow::Result<Option<Paper>> {
        for source in &self.sources {
            match source.search_by_doi(doi).await {
                Ok(Some(found)) => {
                    info!(source = source.name(), doi, "Found paper by DOI");
                    return self.enrich_metadata(found).await.map(Some);
                }
                Ok(None) => {}
                Err(e) => warn!(source = source.name(), error = %e, "Error searching by DOI"),
            }
        }
        warn!(doi, "Paper not found for DOI");
        Ok(None)
    }

    /// Only answers whose title actually matches the query are accepted.
    async fn search_by_title(&self, title: &str) -> anyhow::Result<Option<Paper>> {
        for source in &self.sources {
            match source.search_by_title(title).await {
                Ok(Some(found)) if titles_match(title, &found.title) => {
                    info!(source = source.name(), title, "Found paper by title");
                    return self.enrich_metadata(found).await.map(Some);
                }
                Ok(Some(found)) => {
                    debug!(source = source.name(), searched = title, got = %found.title, "Non-matching title");
                }
                Ok(None) => {}
                Err(e) => warn!(source = source.name(), error = %e, "Error searching by title"),
            }
        }
        warn!(title, "Paper not found for title");
        Ok(None)
    }

    /// Copy missing external identifiers from a DOI lookup, or from a title
    /// lookup when the paper has no DOI.
    async fn identify_paper(&self, mut paper: Paper) -> anyhow::Result<Paper> {
        if let Some(doi) = paper.doi.clone() {
            if paper.semantic_scholar_id.is_some() && paper.openalex_id.is_some() {
                return Ok(paper);
            }
            if let Some(found) = self.search_by_doi(&doi).await? {
                fill_identifiers(&mut paper, found);
            }
        } else if !paper.title.trim().is_empty() {
            if let Some(found) = self.search_by_title(&paper.title).await? {
                if titles_match(&paper.title, &found.title) {
                    fill_identifiers(&mut paper, found);
                } else {
                    warn!(searched = %paper.title, got = %found.title, "Title mismatch, skipping identifier merge");
                }
            }
        }
        Ok(paper)
    }

    async fn enrich_metadata(&self, mut paper: Paper) -> anyhow::Result<Paper> {
        for source in &self.sources {
            match source.enrich_metadata(paper.clone()).await {
                Ok(enriched) => paper = enriched,
                Err(e) => warn!(source = source.name(), error = %e, "Error enriching metadata"),
            }
        }
        Ok(paper)
    }

    async fn get_citation_count(&self, paper: &Paper) -> anyhow::Result<Option<u32>> {
        for source in &self.sources {
            match source.get_citation_count(paper).await {
                Ok(Some(count)) => return Ok(Some(count)),
                Ok(None) => {}
                Err(e) => warn!(source = source.name(), error = %e, "Error getting citation count"),
            }
        }
        Ok(None)
    }
}

fn fill_identifiers(paper: &mut Paper, found: Paper) {
    if paper.doi.is_none() {
        paper.doi = found.doi;
    }
    if paper.arxiv_id.is_none() {
        paper.arxiv_id = found.arxiv_id;
    }
    if paper.semantic_scholar_id.is_none() {
        paper.semantic_scholar_id = found.semantic_scholar_id;
    }
    if paper.openalex_id.is_none() {
        paper.openalex_id = found.openalex_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use snowball_common::PaperSource;

    /// Canned answers; `None` means the call fails.
    struct Canned {
        name: &'static str,
        references: Option<Vec<Paper>>,
        by_title: Option<Paper>,
        abstract_text: Option<&'static str>,
    }

    impl Canned {
        fn new(name: &'static str) -> Self {
            Self { name, references: Some(Vec::new()), by_title: None, abstract_text: None }
        }
    }

    #[async_trait]
    impl LiteratureSource for Canned {
        fn name(&self) -> &str {
            self.name
        }

        async fn get_references(&self, _paper: &Paper, _limit: usize) -> anyhow::Result<Vec<Paper>> {
            self.references.clone().ok_or_else(|| anyhow!("{} unavailable", self.name))
        }

        async fn get_citations(&self, _paper: &Paper, _limit: usize) -> anyhow::Result<Vec<Paper>> {
            Err(anyhow!("{} unavailable", self.name))
        }

        async fn search_by_title(&self, _title: &str) -> anyhow::Result<Option<Paper>> {
            Ok(self.by_title.clone())
        }

        async fn enrich_metadata(&self, mut paper: Paper) -> anyhow::Result<Paper> {
            match self.abstract_text {
                Some(text) => {
                    paper.abstract_text.get_or_insert_with(|| text.to_string());
                    Ok(paper)
                }
                None => Err(anyhow!("{} cannot enrich", self.name)),
            }
        }
    }

    fn seed() -> Paper {
        Paper::new("Seed Paper on Graphs", PaperSource::Seed)
    }

    #[tokio::test]
    async fn test_first_non_empty_source_wins() {
        let mut failing = Canned::new("failing");
        failing.references = None;
        let empty = Canned::new("empty");
        let mut full = Canned::new("full");
        full.references = Some(vec![Paper::new("Reference", PaperSource::Backward)]);

        let agg = SourceAggregator::new()
            .with_source(Arc::new(failing))
            .with_source(Arc::new(empty))
            .with_source(Arc::new(full));
        assert_eq!(agg.len(), 3);
        assert!(SourceAggregator::new().is_empty());

        let refs = agg.get_references(&seed(), 10).await.unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_an_error() {
        let agg = SourceAggregator::new()
            .with_source(Arc::new(Canned::new("a")))
            .with_source(Arc::new(Canned::new("b")));
        assert!(agg.get_citations(&seed(), 10).await.is_err());

        // Empty answers are not failures.
        assert!(agg.get_references(&seed(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_survives_failing_source() {
        let mut enricher = Canned::new("enricher");
        enricher.abstract_text = Some("An abstract.");
        let agg = SourceAggregator::new()
            .with_source(Arc::new(Canned::new("broken")))
            .with_source(Arc::new(enricher));

        let enriched = agg.enrich_metadata(seed()).await.unwrap();
        assert_eq!(enriched.abstract_text.as_deref(), Some("An abstract."));
    }

    #[tokio::test]
    async fn test_identify_by_title_requires_matching_title() {
        let mut wrong = Canned::new("wrong");
        let mut other = Paper::new("Completely Unrelated Work", PaperSource::Seed);
        other.doi = Some("10.9/wrong".into());
        wrong.by_title = Some(other);

        let mut right = Canned::new("right");
        let mut same = Paper::new("Seed paper on graphs", PaperSource::Seed);
        same.doi = Some("10.9/right".into());
        same.openalex_id = Some("W123".into());
        right.by_title = Some(same);
        right.abstract_text = Some("x");

        let agg = SourceAggregator::new()
            .with_source(Arc::new(wrong))
            .with_source(Arc::new(right));

        let identified = agg.identify_paper(seed()).await.unwrap();
        assert_eq!(identified.doi.as_deref(), Some("10.9/right"));
        assert_eq!(identified.openalex_id.as_deref(), Some("W123"));
    }
}
