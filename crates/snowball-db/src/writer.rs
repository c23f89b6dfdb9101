//! Write-behind persistence.
//!
//! A single dedicated thread drains an unbounded FIFO queue and performs every
//! paper write for one store, strictly one at a time. Flush requests travel
//! through the same queue, so their acknowledgement implies that every write
//! enqueued before them has been committed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;

use serde::Serialize;
use snowball_common::Paper;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::{DbError, Result};
use crate::schema::{paper_path, IndexEntry, PaperIndex};

pub(crate) enum WriteCommand {
    Paper(Box<Paper>),
    /// Acknowledged with the failures recorded since the previous flush.
    Flush(oneshot::Sender<Vec<String>>),
}

/// Handle to the background writer of one store.
pub(crate) struct WriteBehind {
    tx: Mutex<Option<mpsc::UnboundedSender<WriteCommand>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WriteBehind {
    pub(crate) fn start(papers_dir: PathBuf, index_path: PathBuf, index: PaperIndex) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<WriteCommand>();

        let handle = std::thread::Builder::new()
            .name("snowball-writer".to_string())
            .spawn(move || {
                let mut worker = Worker { papers_dir, index_path, index, dirty: false, failures: Vec::new() };
                worker.run(rx);
            })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue a paper write. Never touches the disk.
    pub(crate) fn enqueue(&self, paper: Paper) -> Result<()> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let tx = guard.as_ref().ok_or(DbError::WriterClosed)?;
        tx.send(WriteCommand::Paper(Box::new(paper)))
            .map_err(|_| DbError::WriterClosed)
    }

    /// Resolve once every write enqueued before this call is on disk.
    pub(crate) async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
            let tx = guard.as_ref().ok_or(DbError::WriterClosed)?;
            tx.send(WriteCommand::Flush(ack_tx))
                .map_err(|_| DbError::WriterClosed)?;
        }

        let failures = ack_rx.await.map_err(|_| DbError::WriterPanicked)?;
        match failures.first() {
            None => Ok(()),
            Some(first) => Err(DbError::WriteFailed { count: failures.len(), first: first.clone() }),
        }
    }

    /// Flush, close the queue and join the writer thread.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        let flushed = match self.flush().await {
            Err(DbError::WriterClosed) => Ok(()),
            other => other,
        };

        drop(self.take_sender());
        if let Some(handle) = self.take_handle() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|_| DbError::WriterPanicked)?
                .map_err(|_| DbError::WriterPanicked)?;
        }
        flushed
    }

    fn take_sender(&self) -> Option<mpsc::UnboundedSender<WriteCommand>> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn take_handle(&self) -> Option<JoinHandle<()>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Drop for WriteBehind {
    /// Closing the queue lets the writer drain what is left; joining waits for it.
    fn drop(&mut self) {
        drop(self.take_sender());
        if let Some(handle) = self.take_handle() {
            if handle.join().is_err() {
                error!("Background writer panicked during shutdown");
            }
        }
    }
}

struct Worker {
    papers_dir: PathBuf,
    index_path: PathBuf,
    index: PaperIndex,
    dirty: bool,
    failures: Vec<String>,
}

impl Worker {
    fn run(&mut self, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
        debug!(dir = %self.papers_dir.display(), "Write-behind worker started");

        while let Some(command) = rx.blocking_recv() {
            match command {
                WriteCommand::Paper(paper) => self.write_paper(&paper),
                WriteCommand::Flush(ack) => {
                    self.write_index();
                    let _ = ack.send(std::mem::take(&mut self.failures));
                }
            }

            // Queue drained: bring the listing index up to date.
            if rx.is_empty() {
                self.write_index();
            }
        }

        self.write_index();
        info!(dir = %self.papers_dir.display(), "Write-behind worker stopped");
    }

    fn write_paper(&mut self, paper: &Paper) {
        let result = paper_path(&self.papers_dir, &paper.id)
            .and_then(|path| write_json_atomic(&path, paper));

        match result {
            Ok(()) => {
                self.index.insert(paper.id.clone(), IndexEntry::from(paper));
                self.dirty = true;
            }
            Err(e) => {
                error!(paper_id = %paper.id, error = %e, "Failed to write paper");
                self.failures.push(format!("{}: {e}", paper.id));
            }
        }
    }

    fn write_index(&mut self) {
        if !self.dirty {
            return;
        }
        match write_json_atomic(&self.index_path, &self.index) {
            Ok(()) => {
                self.dirty = false;
                debug!(entries = self.index.len(), "Paper index written");
            }
            Err(e) => {
                error!(error = %e, "Failed to write paper index");
                self.failures.push(format!("{}: {e}", self.index_path.display()));
            }
        }
    }
}

/// Write `value` as pretty JSON next to `path`, then rename over it, so a
/// reader never observes a partially written record.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
