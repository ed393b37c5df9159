use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks document throughput and concurrency during scans
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    // Document lifecycle
    documents_attempted: Arc<AtomicU64>,
    documents_loaded: Arc<AtomicU64>,
    documents_parsed: Arc<AtomicU64>,
    documents_failed: Arc<AtomicU64>,

    // Volume
    bytes_read: Arc<AtomicU64>,
    items_searched: Arc<AtomicU64>,

    // Concurrency
    in_flight: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            documents_attempted: Arc::new(AtomicU64::new(0)),
            documents_loaded: Arc::new(AtomicU64::new(0)),
            documents_parsed: Arc::new(AtomicU64::new(0)),
            documents_failed: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            items_searched: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records that a document was picked up
    pub fn record_attempt(&self) {
        self.documents_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks the start of a unit of work; the guard marks its end
    pub fn enter(&self) -> InFlightGuard<'_> {
        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
        InFlightGuard { metrics: self }
    }

    /// Records a successfully loaded document
    pub fn record_load(&self, bytes: u64) {
        self.documents_loaded.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Loaded {} bytes, total read: {} bytes", bytes, total);
    }

    /// Records a successfully parsed document and its item count
    pub fn record_parse(&self, items: u64) {
        self.documents_parsed.fetch_add(1, Ordering::Relaxed);
        self.items_searched.fetch_add(items, Ordering::Relaxed);
    }

    /// Records a document that failed to load or decode
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Units of work currently running
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of concurrent units of work observed
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Resets every counter, e.g. between benchmark runs
    pub fn reset(&self) {
        for counter in [
            &self.documents_attempted,
            &self.documents_loaded,
            &self.documents_parsed,
            &self.documents_failed,
            &self.bytes_read,
            &self.items_searched,
            &self.in_flight,
            &self.peak_in_flight,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Gets current statistics
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            documents_attempted: self.documents_attempted.load(Ordering::Relaxed),
            documents_loaded: self.documents_loaded.load(Ordering::Relaxed),
            documents_parsed: self.documents_parsed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            items_searched: self.items_searched.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Documents attempted/loaded/parsed/failed: {}/{}/{}/{}\n\
             Bytes read: {}\n\
             Items searched: {}\n\
             Peak in-flight: {}",
            stats.documents_attempted,
            stats.documents_loaded,
            stats.documents_parsed,
            stats.documents_failed,
            stats.bytes_read,
            stats.items_searched,
            stats.peak_in_flight
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count when dropped
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    metrics: &'a ScanMetrics,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Snapshot of scan statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub documents_attempted: u64,
    pub documents_loaded: u64,
    pub documents_parsed: u64,
    pub documents_failed: u64,
    pub bytes_read: u64,
    pub items_searched: u64,
    pub peak_in_flight: u64,
}
