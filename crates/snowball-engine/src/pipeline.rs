//! Snowball iteration pipeline.
//!
//! One call to [`SnowballEngine::run_snowball_iteration`] produces one
//! generation:
//!   1. Select the frontier (seeds at iteration 0, else the included papers
//!      of the current generation) and promote it to INCLUDED
//!   2. Expand each frontier paper backward (references) and/or forward
//!      (citations), preferring PDF-extracted references over the provider
//!   3. Resolve every candidate against the store and this run's discoveries;
//!      repeats are merged into the existing record, the rest become new
//!      PENDING papers of the next generation
//!   4. Auto-exclude new papers that fail the project's filter criteria
//!   5. Persist papers and record the generation's statistics
//!
//! The pipeline is non-destructive: provider failures are logged, collected
//! in the outcome and treated as zero candidates.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use snowball_common::dedup::are_duplicates;
use snowball_common::{Author, ExclusionType, Paper, PaperSource, PaperStatus, ReviewProject, SnowballError, Result};
use snowball_db::{identifiers_conflict, IdentifierIndex, PaperStore};
use tracing::{debug, info, instrument, warn};

use crate::filter::{CriteriaFilter, FilterEvaluator};
use crate::references::{
    extracted_references, store_extracted_references, ExtractedSeed, EXTRACTED_REFERENCES_KEY, UNKNOWN_REFERENCE,
};
use crate::sources::LiteratureSource;

pub const AUTO_EXCLUDED_NOTE: &str = "Auto-excluded by filters";

/// `raw_data` key holding the most recent refreshed citation count.
pub const REFRESHED_CITATIONS_KEY: &str = "refreshed_citation_count";

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Maximum references requested per frontier paper.
    pub reference_limit: usize,
    /// Maximum citations requested per frontier paper.
    pub citation_limit: usize,
    /// Run PDF-extracted references through the provider's enrichment.
    pub enrich_extracted_references: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_limit: 1000,
            citation_limit: 1000,
            enrich_extracted_references: true,
        }
    }
}

/// Which links to follow from the frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Backward,
    Forward,
    #[default]
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Backward => "backward",
            Direction::Forward  => "forward",
            Direction::Both     => "both",
        }
    }

    pub fn includes_backward(&self) -> bool {
        matches!(self, Direction::Backward | Direction::Both)
    }

    pub fn includes_forward(&self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = SnowballError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "backward" => Ok(Direction::Backward),
            "forward"  => Ok(Direction::Forward),
            "both"     => Ok(Direction::Both),
            other => Err(SnowballError::Config(format!("unknown direction: {other}"))),
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Whether a new generation may be started, and why not.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IterationGate {
    pub can_start: bool,
    pub reason: Option<String>,
}

impl IterationGate {
    fn open() -> Self {
        Self { can_start: true, reason: None }
    }

    fn closed(reason: impl Into<String>) -> Self {
        Self { can_start: false, reason: Some(reason.into()) }
    }
}

/// Summary of one generation.
#[derive(Debug, Clone, Serialize)]
pub struct IterationOutcome {
    /// Generation produced (unchanged when the frontier was empty).
    pub iteration: u32,
    pub added: usize,
    pub backward: usize,
    pub forward: usize,
    pub auto_excluded: usize,
    pub for_review: usize,
    /// Existing papers that absorbed a repeat observation, in final state.
    pub merged: Vec<Paper>,
    pub errors: Vec<String>,
}

impl IterationOutcome {
    fn empty(iteration: u32) -> Self {
        Self {
            iteration,
            added: 0,
            backward: 0,
            forward: 0,
            auto_excluded: 0,
            for_review: 0,
            merged: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// A reviewer's decision on one paper. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDecision {
    pub status: PaperStatus,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ReviewDecision {
    pub fn new(status: PaperStatus) -> Self {
        Self { status, notes: None, tags: None }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CitationRefresh {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
}

// ── Per-run discovery state ───────────────────────────────────────────────────

/// Papers first seen in this run, with their own identifier index.
#[derive(Default)]
struct Discoveries {
    papers: Vec<Paper>,
    positions: HashMap<String, usize>,
    index: IdentifierIndex,
}

impl Discoveries {
    /// Exact DOI or arXiv hit.
    fn exact_hit(&self, candidate: &Paper) -> Option<usize> {
        self.checked(candidate, self.index.lookup_exact(candidate))
    }

    /// Lower-cased title hit, subject to the identifier veto.
    fn title_hit(&self, candidate: &Paper) -> Option<usize> {
        self.checked(candidate, self.index.lookup_title(candidate))
    }

    fn checked(&self, candidate: &Paper, id: Option<&str>) -> Option<usize> {
        id.and_then(|id| self.positions.get(id).copied())
            .filter(|&i| !identifiers_conflict(candidate, &self.papers[i]))
    }

    fn fuzzy_hit(&self, candidate: &Paper) -> Option<usize> {
        self.papers.iter().position(|p| are_duplicates(candidate, p))
    }

    fn push(&mut self, paper: Paper) {
        self.index.insert(&paper);
        self.positions.insert(paper.id.clone(), self.papers.len());
        self.papers.push(paper);
    }
}

/// Ids of merged papers in first-merge order.
#[derive(Default)]
struct MergedIds {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl MergedIds {
    fn record(&mut self, id: &str) {
        if self.seen.insert(id.to_string()) {
            self.order.push(id.to_string());
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct SnowballEngine {
    store: Arc<PaperStore>,
    source: Arc<dyn LiteratureSource>,
    filter: Arc<dyn FilterEvaluator>,
    config: EngineConfig,
}

impl SnowballEngine {
    pub fn new(store: Arc<PaperStore>, source: Arc<dyn LiteratureSource>) -> Self {
        Self {
            store,
            source,
            filter: Arc::new(CriteriaFilter::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn FilterEvaluator>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<PaperStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Gate ─────────────────────────────────────────────────────────────────

    /// Every paper must be decided before the next generation is discovered.
    pub async fn can_start_iteration(&self, project: &ReviewProject) -> Result<IterationGate> {
        let pending = self.store.get_papers_by_status(PaperStatus::Pending).await?.len();
        if pending > 0 {
            return Ok(IterationGate::closed(format!(
                "{pending} paper(s) still pending review; decide them before starting a new iteration"
            )));
        }

        if self.frontier(project).await?.is_empty() {
            let reason = if project.current_iteration == 0 {
                "No seed papers to expand".to_string()
            } else {
                format!("No included papers in iteration {} to expand", project.current_iteration)
            };
            return Ok(IterationGate::closed(reason));
        }

        Ok(IterationGate::open())
    }

    pub async fn should_continue_snowballing(&self, project: &ReviewProject) -> Result<bool> {
        if project.current_iteration == 0 {
            return Ok(!project.seed_paper_ids.is_empty());
        }
        let included = self
            .store
            .get_papers_by_iteration(project.current_iteration)
            .await?
            .into_iter()
            .any(|p| p.status == PaperStatus::Included);
        Ok(included)
    }

    async fn frontier(&self, project: &ReviewProject) -> Result<Vec<Paper>> {
        if project.current_iteration == 0 {
            let mut seeds = Vec::with_capacity(project.seed_paper_ids.len());
            for id in &project.seed_paper_ids {
                match self.store.load_paper(id).await? {
                    Some(paper) if paper.status != PaperStatus::Excluded => seeds.push(paper),
                    Some(_) => {}
                    None => warn!(paper_id = %id, "Seed paper missing from store"),
                }
            }
            return Ok(seeds);
        }

        Ok(self
            .store
            .get_papers_by_iteration(project.current_iteration)
            .await?
            .into_iter()
            .filter(|p| p.status == PaperStatus::Included)
            .collect())
    }

    // ── Iteration ────────────────────────────────────────────────────────────

    /// Produce generation `current_iteration + 1` from the current frontier.
    ///
    /// Does not consult the gate; callers decide whether to check
    /// [`can_start_iteration`](Self::can_start_iteration) first. Only storage
    /// failures are returned as errors.
    #[instrument(skip(self, project), fields(project = %project.name, iteration = project.current_iteration))]
    pub async fn run_snowball_iteration(
        &self,
        project: &mut ReviewProject,
        direction: Direction,
    ) -> Result<IterationOutcome> {
        let next = project.current_iteration + 1;

        // ── 1. Frontier ──────────────────────────────────────────────────────
        let mut frontier = self.frontier(project).await?;
        if frontier.is_empty() {
            warn!("Empty frontier, nothing to expand");
            return Ok(IterationOutcome::empty(project.current_iteration));
        }
        info!(frontier = frontier.len(), direction = %direction, "Starting snowball iteration");

        // ── 2. Promote ───────────────────────────────────────────────────────
        for paper in frontier.iter_mut().filter(|p| p.status != PaperStatus::Included) {
            paper.set_status(PaperStatus::Included);
            self.store.save_paper(paper)?;
            debug!(paper_id = %paper.id, "Promoted frontier paper to included");
        }

        let mut outcome = IterationOutcome::empty(next);
        let mut discoveries = Discoveries::default();
        let mut merged = MergedIds::default();

        // ── 3. Expand and resolve ────────────────────────────────────────────
        for parent in &frontier {
            if direction.includes_backward() {
                match self.fetch_references(parent).await {
                    Ok(candidates) => {
                        if candidates.is_empty() {
                            self.mark_references_unavailable(&parent.id).await?;
                        }
                        for candidate in candidates {
                            self.resolve(candidate, parent, PaperSource::Backward, next, &mut discoveries, &mut merged)
                                .await?;
                        }
                    }
                    Err(e) => {
                        let msg = format!("references of {} ({}): {e:#}", parent.id, parent.title);
                        warn!("{}", &msg);
                        outcome.errors.push(msg);
                    }
                }
            }

            if direction.includes_forward() {
                match self.source.get_citations(parent, self.config.citation_limit).await {
                    Ok(candidates) => {
                        debug!(paper_id = %parent.id, n = candidates.len(), "Citations retrieved");
                        for candidate in candidates {
                            self.resolve(candidate, parent, PaperSource::Forward, next, &mut discoveries, &mut merged)
                                .await?;
                        }
                    }
                    Err(e) => {
                        let msg = format!("citations of {} ({}): {e:#}", parent.id, parent.title);
                        warn!("{}", &msg);
                        outcome.errors.push(msg);
                    }
                }
            }
        }

        // ── 4. Filter ────────────────────────────────────────────────────────
        let mut discovered = discoveries.papers;
        let accepted: HashSet<String> = self
            .filter
            .apply_filters(&discovered, &project.filter_criteria)
            .into_iter()
            .map(|p| p.id)
            .collect();

        for paper in discovered.iter_mut().filter(|p| !accepted.contains(&p.id)) {
            paper.exclude(ExclusionType::Auto);
            paper.notes = AUTO_EXCLUDED_NOTE.to_string();
            outcome.auto_excluded += 1;
        }

        // ── 5. Persist ───────────────────────────────────────────────────────
        self.store.save_papers(&discovered)?;

        outcome.added = discovered.len();
        outcome.backward = discovered.iter().filter(|p| p.source == PaperSource::Backward).count();
        outcome.forward = discovered.iter().filter(|p| p.source == PaperSource::Forward).count();
        outcome.for_review = outcome.added - outcome.auto_excluded;

        for id in &merged.order {
            if let Some(paper) = self.store.load_paper(id).await? {
                outcome.merged.push(paper);
            }
        }

        let stats = project.stats_mut(next);
        stats.timestamp = Utc::now();
        stats.discovered = outcome.added;
        stats.backward = outcome.backward;
        stats.forward = outcome.forward;
        stats.auto_excluded = outcome.auto_excluded;
        stats.for_review = outcome.for_review;
        project.current_iteration = next;
        self.store.save_project(project)?;

        info!(
            iteration = next,
            added = outcome.added,
            backward = outcome.backward,
            forward = outcome.forward,
            auto_excluded = outcome.auto_excluded,
            merged = outcome.merged.len(),
            errors = outcome.errors.len(),
            "Snowball iteration complete"
        );
        Ok(outcome)
    }

    /// Backward candidates: PDF-extracted references when present, else the
    /// provider's reference list.
    async fn fetch_references(&self, paper: &Paper) -> anyhow::Result<Vec<Paper>> {
        let extracted = extracted_references(paper);
        if extracted.is_empty() {
            let references = self.source.get_references(paper, self.config.reference_limit).await?;
            debug!(paper_id = %paper.id, n = references.len(), "References retrieved");
            return Ok(references);
        }

        info!(paper_id = %paper.id, n = extracted.len(), "Using extracted references");
        let mut references: Vec<Paper> = extracted.iter().map(|r| r.to_paper()).collect();

        if self.config.enrich_extracted_references {
            let mut enriched = 0;
            for reference in references.iter_mut() {
                match self.source.enrich_metadata(reference.clone()).await {
                    Ok(better) => {
                        if better.citation_count.is_some() || better.abstract_text.is_some() {
                            enriched += 1;
                        }
                        *reference = better;
                    }
                    Err(e) => debug!(title = %reference.title, error = %e, "Could not enrich reference"),
                }
            }
            info!(enriched, total = references.len(), "Enriched extracted references");
        }

        Ok(references)
    }

    async fn mark_references_unavailable(&self, paper_id: &str) -> Result<()> {
        if let Some(mut paper) = self.store.load_paper(paper_id).await? {
            if !paper.references_unavailable {
                paper.references_unavailable = true;
                self.store.save_paper(&paper)?;
            }
        }
        Ok(())
    }

    /// Merge `candidate` into a known paper, or record it as a new discovery.
    async fn resolve(
        &self,
        candidate: Paper,
        parent: &Paper,
        source: PaperSource,
        next: u32,
        discoveries: &mut Discoveries,
        merged: &mut MergedIds,
    ) -> Result<()> {
        if candidate.title.trim().is_empty() {
            debug!(parent = %parent.id, "Skipping candidate without title");
            return Ok(());
        }

        // Exact identifiers first, then titles, then the fuzzy predicate;
        // at each stage this run's discoveries before the store.
        if let Some(pos) = discoveries.exact_hit(&candidate) {
            merge_discovery(discoveries, pos, &candidate, parent, merged);
            return Ok(());
        }
        if let Some(existing) = self.store.find_by_exact_identifier(&candidate).await? {
            return self.merge_stored(existing, &candidate, parent, merged);
        }
        if let Some(pos) = discoveries.title_hit(&candidate) {
            merge_discovery(discoveries, pos, &candidate, parent, merged);
            return Ok(());
        }
        let stored = match self.store.find_by_title_key(&candidate).await? {
            Some(hit) => Some(hit),
            None => self.store.find_duplicate_paper(&candidate).await?,
        };
        if let Some(existing) = stored {
            return self.merge_stored(existing, &candidate, parent, merged);
        }
        if let Some(pos) = discoveries.fuzzy_hit(&candidate) {
            merge_discovery(discoveries, pos, &candidate, parent, merged);
            return Ok(());
        }

        let mut paper = candidate;
        paper.id = self.store.generate_id();
        paper.source = source;
        paper.source_paper_ids = vec![parent.id.clone()];
        paper.snowball_iteration = next;
        paper.status = PaperStatus::Pending;
        paper.exclusion_type = None;
        paper.review_date = None;
        paper.observation_count = 1;
        discoveries.push(paper);
        Ok(())
    }

    fn merge_stored(&self, mut existing: Paper, candidate: &Paper, parent: &Paper, merged: &mut MergedIds) -> Result<()> {
        existing.merge_observation(candidate, Some(parent.id.as_str()));
        self.store.save_paper(&existing)?;
        debug!(paper_id = %existing.id, observations = existing.observation_count, "Merged repeat observation");
        merged.record(&existing.id);
        Ok(())
    }

    // ── Review ───────────────────────────────────────────────────────────────

    /// Apply a reviewer decision. With a project, that generation's review
    /// statistics are adjusted and the project is saved.
    #[instrument(skip(self, decision, project), fields(status = %decision.status))]
    pub async fn update_paper_review(
        &self,
        paper_id: &str,
        decision: ReviewDecision,
        project: Option<&mut ReviewProject>,
    ) -> Result<Option<Paper>> {
        let Some(mut paper) = self.store.load_paper(paper_id).await? else {
            warn!("Unknown paper id");
            return Ok(None);
        };

        let old = paper.status;
        paper.set_status(decision.status);
        if let Some(notes) = decision.notes {
            paper.notes = notes;
        }
        if let Some(tags) = decision.tags {
            paper.tags = tags;
        }
        paper.review_date = Some(Utc::now());
        self.store.save_paper(&paper)?;

        if let Some(project) = project {
            project.stats_mut(paper.snowball_iteration).record_review(old, paper.status);
            self.store.save_project(project)?;
        }

        info!(title = %paper.title, from = %old, to = %paper.status, "Updated paper review");
        Ok(Some(paper))
    }

    /// Pending papers, optionally restricted to one generation.
    pub async fn get_papers_for_review(&self, iteration: Option<u32>) -> Result<Vec<Paper>> {
        let pending = self.store.get_papers_by_status(PaperStatus::Pending).await?;
        Ok(match iteration {
            Some(n) => pending.into_iter().filter(|p| p.snowball_iteration == n).collect(),
            None => pending,
        })
    }

    // ── Seeds ────────────────────────────────────────────────────────────────

    /// Look `doi` up through the provider and register the result as a seed.
    #[instrument(skip(self, project))]
    pub async fn add_seed_from_doi(&self, doi: &str, project: &mut ReviewProject) -> Result<Option<Paper>> {
        let found = match self.source.search_by_doi(doi).await {
            Ok(Some(paper)) => paper,
            Ok(None) => {
                warn!("Could not find paper for DOI");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "DOI lookup failed");
                return Ok(None);
            }
        };

        if let Some(existing) = self.existing_seed(&found).await? {
            info!(paper_id = %existing.id, "Seed already present");
            return Ok(Some(existing));
        }

        let mut paper = found;
        if paper.id.trim().is_empty() {
            paper.id = self.store.generate_id();
        }
        paper.source = PaperSource::Seed;
        paper.snowball_iteration = 0;
        paper.source_paper_ids.clear();

        self.register_seed(&paper, project)?;
        Ok(Some(paper))
    }

    /// Register PDF extractor output as a seed. Without a title nothing is
    /// created.
    #[instrument(skip(self, extracted, project), fields(pdf = ?extracted.pdf_path))]
    pub async fn add_seed_from_extraction(
        &self,
        extracted: ExtractedSeed,
        project: &mut ReviewProject,
    ) -> Result<Option<Paper>> {
        let Some(title) = extracted.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            warn!("Could not extract title from PDF");
            return Ok(None);
        };

        let mut paper = Paper::new(title, PaperSource::Seed);
        paper.authors = extracted
            .authors
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(Author::new)
            .collect();
        paper.year = extracted.year;
        paper.abstract_text = extracted.abstract_text.clone();
        paper.doi = extracted.doi.clone();
        paper.pdf_path = extracted.pdf_path.clone();
        store_extracted_references(&mut paper, &extracted.references);
        info!(references = extracted.references.len(), "Extracted references from PDF");

        match self.source.identify_paper(paper.clone()).await {
            Ok(identified) => paper = identified,
            Err(e) => warn!(error = %e, "Could not identify paper"),
        }
        match self.source.enrich_metadata(paper.clone()).await {
            Ok(enriched) => paper = enriched,
            Err(e) => warn!(error = %e, "Could not enrich paper"),
        }

        if paper.id.trim().is_empty() {
            paper.id = self.store.generate_id();
        }
        paper.source = PaperSource::Seed;
        paper.snowball_iteration = 0;
        if !paper.raw_data.contains_key(EXTRACTED_REFERENCES_KEY) {
            store_extracted_references(&mut paper, &extracted.references);
        }

        if let Some(existing) = self.existing_seed(&paper).await? {
            info!(paper_id = %existing.id, "Seed already present");
            return Ok(Some(existing));
        }

        self.register_seed(&paper, project)?;
        Ok(Some(paper))
    }

    /// A stored seed denoting the same work as `paper`.
    async fn existing_seed(&self, paper: &Paper) -> Result<Option<Paper>> {
        let existing = match self.store.find_by_identifier(paper).await? {
            Some(hit) => Some(hit),
            None => self.store.find_duplicate_paper(paper).await?,
        };
        Ok(existing.filter(|p| p.source == PaperSource::Seed))
    }

    fn register_seed(&self, paper: &Paper, project: &mut ReviewProject) -> Result<()> {
        self.store.save_paper(paper)?;
        project.add_seed_id(&paper.id);
        self.store.save_project(project)?;
        info!(paper_id = %paper.id, title = %paper.title, "Added seed paper");
        Ok(())
    }

    // ── Citation counts ──────────────────────────────────────────────────────

    /// Refresh citation counts through the provider. `None` refreshes every
    /// stored paper.
    #[instrument(skip(self, papers))]
    pub async fn update_citation_counts(&self, papers: Option<Vec<Paper>>) -> Result<CitationRefresh> {
        let papers = match papers {
            Some(papers) => papers,
            None => self.store.load_all_papers().await?,
        };

        let mut refresh = CitationRefresh { total: papers.len(), ..Default::default() };
        info!(total = refresh.total, "Refreshing citation counts");

        for mut paper in papers {
            if paper.title.trim().is_empty() || paper.title == UNKNOWN_REFERENCE {
                refresh.skipped += 1;
                continue;
            }
            match self.source.get_citation_count(&paper).await {
                Ok(Some(count)) => {
                    if paper.citation_count != Some(count) {
                        debug!(paper_id = %paper.id, old = ?paper.citation_count, new = count, "Citation count changed");
                    }
                    paper.citation_count = Some(count);
                    paper.raw_data.insert(REFRESHED_CITATIONS_KEY.to_string(), count.into());
                    self.store.save_paper(&paper)?;
                    refresh.updated += 1;
                }
                Ok(None) => refresh.failed += 1,
                Err(e) => {
                    debug!(paper_id = %paper.id, error = %e, "Citation count lookup failed");
                    refresh.failed += 1;
                }
            }
        }

        info!(updated = refresh.updated, failed = refresh.failed, skipped = refresh.skipped, "Citation refresh complete");
        Ok(refresh)
    }
}

/// Merge a repeat into a paper first seen in this run; it is persisted with
/// the rest of the generation.
fn merge_discovery(discoveries: &mut Discoveries, pos: usize, candidate: &Paper, parent: &Paper, merged: &mut MergedIds) {
    let existing = &mut discoveries.papers[pos];
    existing.merge_observation(candidate, Some(parent.id.as_str()));
    merged.record(&existing.id);
}
