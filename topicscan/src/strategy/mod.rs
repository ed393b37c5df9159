/// Scan strategies.
///
/// Six interchangeable ways to drive load → parse → match over a corpus. All of
/// them return the same total for the same input; they differ only in how work
/// is scheduled:
///
/// 1. [`SharedQueue`]: one worker per document, all pulling from one queue
/// 2. [`PerDocument`]: one rayon task per document, unbounded
/// 3. [`Bounded`]: as 2, but a semaphore caps how many run at once
/// 4. [`CpuPool`]: a fixed pool sized to the machine, pulling from one queue
/// 5. [`TracedPool`]: as 4, with task/region markers around every step
/// 6. [`Pipeline`]: four stages (open, read, decode, search) joined by queues
///
/// ```rust,ignore
/// let ctx = ScanContext::new(Arc::new(FsLoader::new("data")), Arc::new(RssParser));
/// let strategy = Strategy::CpuPool.build(ctx, &ScanConfig::default());
/// let report = strategy.scan("president", &ids);
/// println!("found {} ({} failed)", report.total, report.failures.len());
/// ```
///
/// A document that fails to open, read or decode is logged, recorded in the
/// report and counted as zero. It never stops the scan.
mod bounded;
mod per_document;
mod pipeline;
mod pool;
mod semaphore;
mod shared_queue;

pub use bounded::Bounded;
pub use per_document::PerDocument;
pub use pipeline::{Pipeline, StageState};
pub use pool::{CpuPool, TracedPool};
pub use semaphore::{Permit, Semaphore};
pub use shared_queue::SharedQueue;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::document::{DocumentId, RawDocument, StructuredRecord};
use crate::errors::{ScanError, ScanResult};
use crate::loader::DocumentLoader;
use crate::matcher::TopicMatcher;
use crate::metrics::ScanMetrics;
use crate::parser::DocumentParser;
use crate::results::{FailureLog, FailurePhase, ResultAggregator, ScanReport};
use crate::trace::{NoopRecorder, Recorder, TracingRecorder};

/// Common entry point of every strategy
pub trait ScanStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scans `ids` for `topic`. Per-document failures are reported, not returned.
    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport;

    /// Just the match total
    fn count(&self, topic: &str, ids: &[DocumentId]) -> usize {
        self.scan(topic, ids).total
    }
}

/// Collaborators shared by every unit of work
#[derive(Clone)]
pub struct ScanContext {
    loader: Arc<dyn DocumentLoader>,
    parser: Arc<dyn DocumentParser>,
    recorder: Arc<dyn Recorder>,
    metrics: ScanMetrics,
}

impl fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanContext")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl ScanContext {
    pub fn new(loader: Arc<dyn DocumentLoader>, parser: Arc<dyn DocumentParser>) -> Self {
        Self {
            loader,
            parser,
            recorder: Arc::new(NoopRecorder),
            metrics: ScanMetrics::new(),
        }
    }

    /// Filesystem loader, parser and recorder as configured
    pub fn from_config(config: &ScanConfig) -> Self {
        let ctx = Self::new(Arc::new(config.loader()), Arc::from(config.format.parser()));
        if config.trace {
            ctx.with_recorder(Arc::new(TracingRecorder))
        } else {
            ctx
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    pub fn recorder(&self) -> &dyn Recorder {
        self.recorder.as_ref()
    }

    /// Runs one whole unit of work, returning the document's match count
    pub(crate) fn process(
        &self,
        id: &DocumentId,
        matcher: &TopicMatcher,
        failures: &FailureLog,
    ) -> usize {
        self.metrics.record_attempt();
        let _in_flight = self.metrics.enter();
        self.open(id, failures)
            .and_then(|source| self.read(id, source, failures))
            .and_then(|raw| self.decode(&raw, failures))
            .map(|record| self.search(&record, matcher))
            .unwrap_or(0)
    }

    pub(crate) fn open(
        &self,
        id: &DocumentId,
        failures: &FailureLog,
    ) -> Option<Box<dyn Read + Send>> {
        self.loader
            .open(id)
            .map_err(|e| self.fail(failures, id, FailurePhase::Open, e))
            .ok()
    }

    pub(crate) fn read(
        &self,
        id: &DocumentId,
        source: Box<dyn Read + Send>,
        failures: &FailureLog,
    ) -> Option<RawDocument> {
        match self.loader.read(id, source) {
            Ok(raw) => {
                self.metrics.record_load(raw.len() as u64);
                Some(raw)
            }
            Err(e) => {
                self.fail(failures, id, FailurePhase::Read, e);
                None
            }
        }
    }

    pub(crate) fn decode(
        &self,
        raw: &RawDocument,
        failures: &FailureLog,
    ) -> Option<StructuredRecord> {
        match self.parser.parse(raw) {
            Ok(record) => {
                self.metrics.record_parse(record.len() as u64);
                Some(record)
            }
            Err(e) => {
                self.fail(failures, &raw.id, FailurePhase::Decode, e);
                None
            }
        }
    }

    pub(crate) fn search(&self, record: &StructuredRecord, matcher: &TopicMatcher) -> usize {
        matcher.count(record)
    }

    fn fail(&self, failures: &FailureLog, id: &DocumentId, phase: FailurePhase, err: ScanError) {
        match phase {
            FailurePhase::Open => warn!("Opening document [{}] failed: {}", id, err),
            FailurePhase::Read => warn!("Reading document [{}] failed: {}", id, err),
            FailurePhase::Decode => warn!("Decoding document [{}] failed: {}", id, err),
        }
        self.metrics.record_failure();
        failures.record(id, phase, err);
    }
}

/// Bookkeeping for one scan, from first spawn to final report
pub(crate) struct ScanRun {
    strategy: &'static str,
    documents: usize,
    started: Instant,
    pub(crate) failures: FailureLog,
}

impl ScanRun {
    pub(crate) fn start(strategy: &'static str, topic: &str, documents: usize) -> Self {
        info!(
            "Starting {} scan for '{}' over {} documents",
            strategy, topic, documents
        );
        Self {
            strategy,
            documents,
            started: Instant::now(),
            failures: FailureLog::new(),
        }
    }

    pub(crate) fn finish(self, ctx: &ScanContext, total: usize) -> ScanReport {
        let report = ScanReport {
            strategy: self.strategy,
            total,
            documents: self.documents,
            failures: self.failures.into_sorted(),
            elapsed: self.started.elapsed(),
        };
        ctx.metrics().log_stats();
        info!(
            "Scan complete ({}): found {} matches in {} documents, {} failed",
            report.strategy,
            report.total,
            report.documents,
            report.failures.len()
        );
        report
    }
}

/// Runs `workers` threads that pull ids from one queue of `capacity` until it
/// is drained and closed. Each worker sums locally and merges once.
pub(crate) fn run_pool<W>(
    label: &str,
    ids: &[DocumentId],
    workers: usize,
    capacity: usize,
    work: W,
) -> usize
where
    W: Fn(&DocumentId) -> usize + Sync,
{
    let totals = ResultAggregator::new();
    let (tx, rx) = crossbeam_channel::bounded::<DocumentId>(capacity);

    let worker = |idx: usize| {
        let mut local = 0;
        let mut handled = 0;
        for id in rx.iter() {
            local += work(&id);
            handled += 1;
        }
        debug!(
            "{} worker {} finished: {} documents, {} matches",
            label, idx, handled, local
        );
        totals.merge(local);
    };

    thread::scope(|s| {
        let mut spawned = 0;
        for idx in 0..workers {
            let worker = &worker;
            match thread::Builder::new()
                .name(format!("{}-{}", label, idx))
                .spawn_scoped(s, move || worker(idx))
            {
                Ok(_) => spawned += 1,
                Err(e) => {
                    error!("Failed to spawn {} worker {}: {}", label, idx, e);
                    break;
                }
            }
        }

        if spawned == 0 {
            warn!("No {} workers could be started, scanning on the caller", label);
            drop(tx);
            totals.merge(ids.iter().map(&work).sum());
            return;
        }
        debug!("Started {} of {} {} workers", spawned, workers, label);

        for id in ids {
            if tx.send(id.clone()).is_err() {
                break;
            }
        }
        // Workers drain what is left, then see the queue closed and exit
        drop(tx);
    });

    totals.finalize()
}

/// Runs `op` in a rayon scope on a dedicated pool with one thread per task.
///
/// Tasks block in I/O, so on the global pool at most one task per core would
/// ever be in flight. A pool sized to the task count leaves concurrency to
/// the caller. Falls back to the global pool if the dedicated one cannot be
/// built.
pub(crate) fn task_scope<'scope, OP>(label: &'static str, tasks: usize, op: OP)
where
    OP: FnOnce(&rayon::Scope<'scope>) + Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(tasks.max(1))
        .thread_name(move |idx| format!("{}-{}", label, idx))
        .build()
    {
        Ok(pool) => {
            debug!("Started {} pool with {} threads", label, pool.current_num_threads());
            pool.scope(op)
        }
        Err(e) => {
            error!("Failed to build {} pool, using the global pool: {}", label, e);
            rayon::scope(op)
        }
    }
}

/// Selects one of the six scheduling topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    SharedQueue,
    PerDocument,
    Bounded,
    #[default]
    CpuPool,
    TracedPool,
    Pipeline,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::SharedQueue,
        Strategy::PerDocument,
        Strategy::Bounded,
        Strategy::CpuPool,
        Strategy::TracedPool,
        Strategy::Pipeline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::SharedQueue => "shared-queue",
            Strategy::PerDocument => "per-document",
            Strategy::Bounded => "bounded",
            Strategy::CpuPool => "cpu-pool",
            Strategy::TracedPool => "traced-pool",
            Strategy::Pipeline => "pipeline",
        }
    }

    pub fn build(self, ctx: ScanContext, config: &ScanConfig) -> Box<dyn ScanStrategy> {
        match self {
            Strategy::SharedQueue => Box::new(SharedQueue::new(ctx)),
            Strategy::PerDocument => Box::new(PerDocument::new(ctx)),
            Strategy::Bounded => Box::new(Bounded::new(ctx).with_capacity(config.parallelism)),
            Strategy::CpuPool => Box::new(CpuPool::new(ctx).with_workers(config.parallelism)),
            Strategy::TracedPool => {
                Box::new(TracedPool::new(ctx).with_workers(config.parallelism))
            }
            Strategy::Pipeline => {
                Box::new(Pipeline::new(ctx).with_capacity(config.pipeline_capacity))
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ScanError;

    fn from_str(s: &str) -> ScanResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == wanted)
            .ok_or_else(|| ScanError::invalid_strategy(s))
    }
}

/// Available parallelism, never zero
pub(crate) fn available_parallelism() -> NonZeroUsize {
    crate::config::default_parallelism()
}
