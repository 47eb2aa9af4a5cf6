//! Critical-section sink contract.
//!
//! The sink is the shared resource the token protects: an append-only log the
//! holder writes one record to per entry. Storage is swappable; the state
//! machine never sees it. A failed append is reported and counted but does
//! not roll back the entry, which the peer has already used.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokenring_proto::PeerId;

use crate::error::SinkError;

/// Append-only destination for critical-section records.
#[async_trait]
pub trait CriticalSectionSink: Send + Sync + 'static {
    /// Record one entry made by `peer`.
    ///
    /// Implementations must not drop entries silently: either the record is
    /// stored or an error is returned.
    async fn append(&self, peer: PeerId, payload: &str) -> Result<(), SinkError>;
}

/// One recorded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    /// Peer that entered
    pub peer: PeerId,
    /// Application-defined content
    pub payload: String,
}

impl SinkEntry {
    /// Entry by `peer` with `payload`.
    pub fn new(peer: PeerId, payload: impl Into<String>) -> Self {
        Self { peer, payload: payload.into() }
    }

    /// Single-line text form, `"<peer> <payload>\n"`.
    ///
    /// Line breaks inside the payload are flattened to spaces so one entry is
    /// always exactly one line.
    pub fn to_line(&self) -> String {
        let flat: String = self
            .payload
            .trim_end_matches(['\r', '\n'])
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!("{} {}\n", self.peer, flat)
    }
}

/// In-memory sink, shared between clones.
///
/// Used by tests and simulations to observe the order of entries across the
/// whole ring. Can be switched into a failing mode to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<SinkEntry>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far, in append order.
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of entries recorded.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries recorded by `peer`.
    pub fn entries_by(&self, peer: PeerId) -> Vec<SinkEntry> {
        self.entries().into_iter().filter(|e| e.peer == peer).collect()
    }

    /// Make subsequent appends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CriticalSectionSink for MemorySink {
    async fn append(&self, peer: PeerId, payload: &str) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("memory sink set to fail".into()));
        }

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SinkEntry::new(peer, payload));
        Ok(())
    }
}
