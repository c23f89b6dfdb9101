//! Paper store.
//!
//! Reads are served from an in-memory cache that is populated from disk on
//! first use. Writes update the cache synchronously and are persisted by the
//! write-behind thread, so the cache is always at least as fresh as the disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use snowball_common::dedup::{are_duplicates, normalize_doi, normalize_title};
use snowball_common::{Paper, PaperStatus, ReviewProject};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::index::{identifiers_conflict, IdentifierIndex};
use crate::schema::{paper_path, IndexEntry, PaperIndex, StoreStatistics, INDEX_FILE, PAPERS_DIR, PROJECT_FILE};
use crate::writer::{write_json_atomic, WriteBehind};

#[derive(Default)]
struct PaperCache {
    papers: BTreeMap<String, Paper>,
    /// Every record on disk has been read into `papers`.
    loaded: bool,
    index: IdentifierIndex,
}

impl PaperCache {
    fn upsert(&mut self, paper: Paper) {
        self.index.insert(&paper);
        self.papers.insert(paper.id.clone(), paper);
    }
}

#[derive(Clone, Copy)]
enum IndexKey {
    Exact,
    Title,
}

/// JSON-file store for one review project.
pub struct PaperStore {
    dir: PathBuf,
    papers_dir: PathBuf,
    cache: RwLock<PaperCache>,
    writer: WriteBehind,
}

impl PaperStore {
    /// Open (or create) the project directory and start its writer thread.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let papers_dir = dir.join(PAPERS_DIR);
        fs::create_dir_all(&papers_dir)?;

        let index_path = dir.join(INDEX_FILE);
        let index = read_index(&index_path, &papers_dir);
        let writer = WriteBehind::start(papers_dir.clone(), index_path, index)?;

        info!(dir = %dir.display(), "Opened paper store");
        Ok(Self {
            dir,
            papers_dir,
            cache: RwLock::new(PaperCache::default()),
            writer,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Upsert into the cache and queue the disk write. Does not wait for I/O.
    pub fn save_paper(&self, paper: &Paper) -> Result<()> {
        paper_path(&self.papers_dir, &paper.id)?;
        self.writer.enqueue(paper.clone())?;
        self.write_cache().upsert(paper.clone());
        debug!(paper_id = %paper.id, "Queued paper write");
        Ok(())
    }

    pub fn save_papers(&self, papers: &[Paper]) -> Result<()> {
        for paper in papers {
            self.save_paper(paper)?;
        }
        Ok(())
    }

    /// Wait until every write queued before this call is on disk.
    pub async fn flush(&self) -> Result<()> {
        self.writer.flush().await
    }

    /// Flush and stop the writer thread. Later saves fail with `WriterClosed`.
    pub async fn shutdown(&self) -> Result<()> {
        self.writer.shutdown().await?;
        info!(dir = %self.dir.display(), "Paper store shut down");
        Ok(())
    }

    /// Drop every cached record; the next read reloads from disk.
    pub async fn invalidate_cache(&self) -> Result<()> {
        self.flush().await?;
        let mut cache = self.write_cache();
        cache.papers.clear();
        cache.index.clear();
        cache.loaded = false;
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub async fn load_paper(&self, id: &str) -> Result<Option<Paper>> {
        let loaded = {
            let cache = self.read_cache();
            if let Some(paper) = cache.papers.get(id) {
                return Ok(Some(paper.clone()));
            }
            cache.loaded
        };
        if loaded {
            return Ok(None);
        }

        let Ok(path) = paper_path(&self.papers_dir, id) else {
            return Ok(None);
        };
        let Some(paper) = read_paper_file(&path).await? else {
            return Ok(None);
        };

        let mut cache = self.write_cache();
        // A save may have raced the read; the cached copy is newer.
        if let Some(cached) = cache.papers.get(id) {
            return Ok(Some(cached.clone()));
        }
        cache.upsert(paper.clone());
        Ok(Some(paper))
    }

    pub async fn load_all_papers(&self) -> Result<Vec<Paper>> {
        self.ensure_loaded().await?;
        Ok(self.read_cache().papers.values().cloned().collect())
    }

    pub async fn get_papers_by_status(&self, status: PaperStatus) -> Result<Vec<Paper>> {
        self.select(|p| p.status == status).await
    }

    pub async fn get_papers_by_iteration(&self, iteration: u32) -> Result<Vec<Paper>> {
        self.select(|p| p.snowball_iteration == iteration).await
    }

    pub async fn find_paper_by_doi(&self, doi: &str) -> Result<Option<Paper>> {
        let wanted = normalize_doi(doi);
        if wanted.is_empty() {
            return Ok(None);
        }
        self.find(|p| p.doi.as_deref().is_some_and(|d| normalize_doi(d) == wanted)).await
    }

    pub async fn find_paper_by_title(&self, title: &str) -> Result<Option<Paper>> {
        let wanted = normalize_title(title);
        if wanted.is_empty() {
            return Ok(None);
        }
        self.find(|p| normalize_title(&p.title) == wanted).await
    }

    pub async fn get_statistics(&self) -> Result<StoreStatistics> {
        self.ensure_loaded().await?;
        Ok(StoreStatistics::from_papers(self.read_cache().papers.values()))
    }

    /// Listing index as last written by the writer thread.
    pub async fn load_index(&self) -> Result<PaperIndex> {
        let path = self.dir.join(INDEX_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PaperIndex::new()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Duplicate oracle ─────────────────────────────────────────────────────

    /// An already-stored paper denoting the same work as `candidate`.
    ///
    /// Exact DOI/arXiv hits are answered from the identifier index; otherwise
    /// every stored paper is checked with the duplicate predicate and the
    /// first match is returned. The candidate's own record never matches.
    pub async fn find_duplicate_paper(&self, candidate: &Paper) -> Result<Option<Paper>> {
        self.ensure_loaded().await?;
        let cache = self.read_cache();

        if let Some(hit) = cache.index.lookup_exact(candidate).and_then(|id| cache.papers.get(id)) {
            if hit.id != candidate.id && are_duplicates(candidate, hit) {
                return Ok(Some(hit.clone()));
            }
        }

        Ok(cache
            .papers
            .values()
            .find(|p| p.id != candidate.id && are_duplicates(candidate, p))
            .cloned())
    }

    /// Exact lookup by normalized DOI or arXiv id, falling back to the
    /// lower-cased title.
    pub async fn find_by_identifier(&self, candidate: &Paper) -> Result<Option<Paper>> {
        match self.find_by_exact_identifier(candidate).await? {
            Some(hit) => Ok(Some(hit)),
            None => self.find_by_title_key(candidate).await,
        }
    }

    /// Stored paper registered under the candidate's DOI, else its arXiv id.
    pub async fn find_by_exact_identifier(&self, candidate: &Paper) -> Result<Option<Paper>> {
        self.indexed_hit(candidate, IndexKey::Exact).await
    }

    /// Stored paper with the same lower-cased title. Rejected when the
    /// external identifiers prove the records distinct.
    pub async fn find_by_title_key(&self, candidate: &Paper) -> Result<Option<Paper>> {
        self.indexed_hit(candidate, IndexKey::Title).await
    }

    // ── Project ──────────────────────────────────────────────────────────────

    /// Stamp `updated_at` and write `project.json` directly.
    pub fn save_project(&self, project: &mut ReviewProject) -> Result<()> {
        project.touch();
        write_json_atomic(&self.dir.join(PROJECT_FILE), project)?;
        debug!(project = %project.name, iteration = project.current_iteration, "Saved project");
        Ok(())
    }

    pub fn load_project(&self) -> Result<Option<ReviewProject>> {
        let path = self.dir.join(PROJECT_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn select(&self, pred: impl Fn(&Paper) -> bool) -> Result<Vec<Paper>> {
        self.ensure_loaded().await?;
        Ok(self.read_cache().papers.values().filter(|p| pred(p)).cloned().collect())
    }

    async fn find(&self, pred: impl Fn(&Paper) -> bool) -> Result<Option<Paper>> {
        self.ensure_loaded().await?;
        Ok(self.read_cache().papers.values().find(|p| pred(p)).cloned())
    }

    async fn indexed_hit(&self, candidate: &Paper, key: IndexKey) -> Result<Option<Paper>> {
        if candidate.title.trim().is_empty() {
            return Ok(None);
        }
        self.ensure_loaded().await?;
        let cache = self.read_cache();

        let id = match key {
            IndexKey::Exact => cache.index.lookup_exact(candidate),
            IndexKey::Title => cache.index.lookup_title(candidate),
        };
        Ok(id
            .and_then(|id| cache.papers.get(id))
            .filter(|p| p.id != candidate.id && !identifiers_conflict(candidate, p))
            .cloned())
    }

    async fn ensure_loaded(&self) -> Result<()> {
        if self.read_cache().loaded {
            return Ok(());
        }

        let mut from_disk = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.papers_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(paper) = read_paper_file(&path).await? {
                from_disk.push(paper);
            }
        }

        let mut cache = self.write_cache();
        if cache.loaded {
            return Ok(());
        }
        let count = from_disk.len();
        for paper in from_disk {
            if !cache.papers.contains_key(&paper.id) {
                cache.upsert(paper);
            }
        }
        cache.loaded = true;
        debug!(count, "Loaded papers from disk");
        Ok(())
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, PaperCache> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, PaperCache> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read one record. Missing files are `None`; unreadable records are logged
/// and skipped so one corrupt file does not take the project down.
async fn read_paper_file(path: &Path) -> Result<Option<Paper>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DbError::Io(e)),
    };
    match serde_json::from_slice::<Paper>(&bytes) {
        Ok(paper) => Ok(Some(paper)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable paper record");
            Ok(None)
        }
    }
}

/// Load `papers.json`, rebuilding it from the record files when it is
/// missing or unreadable.
fn read_index(index_path: &Path, papers_dir: &Path) -> PaperIndex {
    match fs::read(index_path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(index) => return index,
            Err(e) => warn!(error = %e, "Paper index unreadable, rebuilding"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "Paper index unreadable, rebuilding"),
    }

    let mut index = PaperIndex::new();
    let Ok(entries) = fs::read_dir(papers_dir) else {
        return index;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let paper = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Paper>(&bytes).ok());
        if let Some(paper) = paper {
            index.insert(paper.id.clone(), IndexEntry::from(&paper));
        }
    }
    index
}
