/// Scan result types.
///
/// A scan owns one [`ResultAggregator`] and one [`FailureLog`] for its whole
/// lifetime. Workers borrow both, merge into them concurrently, and once every
/// worker has been joined the scan consumes them into a [`ScanReport`].
///
/// ```rust,ignore
/// let totals = ResultAggregator::new();
/// std::thread::scope(|s| {
///     s.spawn(|| totals.merge(3));
///     s.spawn(|| totals.merge(4));
/// });
/// // every borrow has ended, so the total can be taken
/// assert_eq!(totals.finalize(), 7);
/// ```
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::document::DocumentId;
use crate::errors::ScanError;

/// Scan-scoped match total shared by all workers
#[derive(Debug, Default)]
pub struct ResultAggregator {
    total: AtomicUsize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one worker's local count
    pub fn merge(&self, local: usize) {
        self.total.fetch_add(local, Ordering::Relaxed);
    }

    /// Takes the total. Consuming `self` means no worker can still hold a borrow.
    pub fn finalize(self) -> usize {
        self.total.into_inner()
    }
}

/// Step of the unit of work at which a document failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePhase {
    Open,
    Read,
    Decode,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePhase::Open => f.write_str("open"),
            FailurePhase::Read => f.write_str("read"),
            FailurePhase::Decode => f.write_str("decode"),
        }
    }
}

/// A document that contributed nothing because it could not be processed
#[derive(Debug)]
pub struct DocumentFailure {
    pub id: DocumentId,
    pub phase: FailurePhase,
    pub error: ScanError,
}

/// Per-scan record of failed documents, safe to fill from many workers.
///
/// An id listed more than once in the input is processed once per listing,
/// so it can fail more than once; every failure is kept.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: DashMap<DocumentId, Vec<DocumentFailure>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &DocumentId, phase: FailurePhase, error: ScanError) {
        let failure = DocumentFailure {
            id: id.clone(),
            phase,
            error,
        };
        let mut entry = self.failures.entry(id.clone()).or_default();
        entry.push(failure);
        if entry.len() > 1 {
            debug!("Document {} has failed {} times", id, entry.len());
        }
    }

    pub fn len(&self) -> usize {
        self.failures.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Drains the log, ordered by document id
    pub fn into_sorted(self) -> Vec<DocumentFailure> {
        let mut failures: Vec<_> = self.failures.into_iter().flat_map(|(_, f)| f).collect();
        failures.sort_by(|a, b| a.id.cmp(&b.id));
        failures
    }
}

/// Outcome of one scan
#[derive(Debug)]
pub struct ScanReport {
    /// Name of the strategy that produced the report
    pub strategy: &'static str,
    /// Matching items across every document that was processed
    pub total: usize,
    /// Number of ids attempted
    pub documents: usize,
    /// Documents that contributed zero because of a load or decode failure
    pub failures: Vec<DocumentFailure>,
    pub elapsed: Duration,
}

impl ScanReport {
    /// Report for an empty corpus
    pub fn empty(strategy: &'static str) -> Self {
        Self {
            strategy,
            total: 0,
            documents: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&DocumentId> {
        self.failures.iter().map(|f| &f.id).collect()
    }

    /// Documents that were processed successfully. Repeated ids count once
    /// per listing, like `documents`.
    pub fn succeeded(&self) -> usize {
        self.documents.saturating_sub(self.failures.len())
    }
}
