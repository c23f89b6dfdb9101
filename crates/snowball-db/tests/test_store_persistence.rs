//! Persistence and cache coherence of the paper store.
//!
//! Run with: cargo test --package snowball-db --test test_store_persistence

use pretty_assertions::assert_eq;
use snowball_common::{Author, Paper, PaperSource, PaperStatus};
use snowball_db::{PaperStore, INDEX_FILE, PAPERS_DIR};

fn paper(title: &str, iteration: u32) -> Paper {
    let mut p = Paper::new(title, PaperSource::Backward);
    p.snowball_iteration = iteration;
    p
}

#[tokio::test]
async fn test_flush_durability_across_instances() {
    let dir = tempfile::tempdir().unwrap();

    let saved: Vec<Paper> = (0..25).map(|i| paper(&format!("Paper number {i}"), 1)).collect();
    {
        let store = PaperStore::open(dir.path()).unwrap();
        store.save_papers(&saved).unwrap();
        store.flush().await.unwrap();

        for p in &saved {
            assert!(dir.path().join(PAPERS_DIR).join(format!("{}.json", p.id)).exists());
        }
        store.shutdown().await.unwrap();
    }

    let reopened = PaperStore::open(dir.path()).unwrap();
    for p in &saved {
        let loaded = reopened.load_paper(&p.id).await.unwrap();
        assert_eq!(loaded.as_ref(), Some(p));
    }
    assert_eq!(reopened.load_all_papers().await.unwrap().len(), saved.len());

    let index = reopened.load_index().await.unwrap();
    assert_eq!(index.len(), saved.len());
    reopened.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_drop_drains_queue() {
    let dir = tempfile::tempdir().unwrap();
    let p = paper("Written On Drop", 0);
    {
        let store = PaperStore::open(dir.path()).unwrap();
        store.save_paper(&p).unwrap();
    }

    let reopened = PaperStore::open(dir.path()).unwrap();
    assert_eq!(reopened.load_paper(&p.id).await.unwrap(), Some(p));
    assert!(dir.path().join(INDEX_FILE).exists());
}

#[tokio::test]
async fn test_cache_wins_over_disk_and_invalidate_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let store = PaperStore::open(dir.path()).unwrap();

    let mut p = paper("Mutable Record", 1);
    store.save_paper(&p).unwrap();
    store.flush().await.unwrap();

    p.status = PaperStatus::Included;
    store.save_paper(&p).unwrap();
    let all = store.load_all_papers().await.unwrap();
    assert_eq!(all[0].status, PaperStatus::Included);

    store.invalidate_cache().await.unwrap();
    let reloaded = store.load_paper(&p.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, PaperStatus::Included);
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_oracle() {
    let dir = tempfile::tempdir().unwrap();
    let store = PaperStore::open(dir.path()).unwrap();

    let mut by_doi = paper("Graph Methods for Bibliometrics", 1);
    by_doi.doi = Some("10.1000/GRAPH".into());
    let mut fuzzy = paper("Attention Is All You Need", 1);
    fuzzy.year = Some(2017);
    fuzzy.authors = vec![Author::new("Ashish Vaswani"), Author::new("Noam Shazeer")];
    store.save_papers(&[by_doi.clone(), fuzzy.clone()]).unwrap();

    let mut same_doi = paper("A different rendering of the title", 2);
    same_doi.doi = Some("https://doi.org/10.1000/graph".into());
    let hit = store.find_duplicate_paper(&same_doi).await.unwrap();
    assert_eq!(hit.map(|p| p.id), Some(by_doi.id.clone()));

    let mut near_title = paper("Attention is all you need", 2);
    near_title.year = Some(2018);
    near_title.authors = vec![Author::new("Vaswani, A.")];
    let hit = store.find_duplicate_paper(&near_title).await.unwrap();
    assert_eq!(hit.map(|p| p.id), Some(fuzzy.id.clone()));

    let unrelated = paper("Protein Folding at Scale", 2);
    assert_eq!(store.find_duplicate_paper(&unrelated).await.unwrap(), None);

    // A stored record is not its own duplicate.
    assert_eq!(store.find_duplicate_paper(&fuzzy).await.unwrap(), None);
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queries_and_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let store = PaperStore::open(dir.path()).unwrap();

    let seed = Paper::new("Seed Paper", PaperSource::Seed);
    let mut included = paper("Included Paper", 1);
    included.status = PaperStatus::Included;
    included.doi = Some("10.5/inc".into());
    let pending = paper("Pending Paper", 1);
    store.save_papers(&[seed, included.clone(), pending.clone()]).unwrap();

    let gen1 = store.get_papers_by_iteration(1).await.unwrap();
    assert_eq!(gen1.len(), 2);

    let pending_ids: Vec<String> = store
        .get_papers_by_status(PaperStatus::Pending)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(pending_ids.len(), 2);
    assert!(pending_ids.contains(&pending.id));

    let found = store.find_paper_by_doi("DOI:10.5/INC").await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(included.id));
    let found = store.find_paper_by_title("  pending   PAPER ").await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(pending.id));

    let stats = store.get_statistics().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.count_status(PaperStatus::Included), 1);
    assert_eq!(stats.by_iteration[&0], 1);
    assert_eq!(stats.by_source[&PaperSource::Seed], 1);
    store.shutdown().await.unwrap();
}
