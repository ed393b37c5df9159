use std::num::NonZeroUsize;
use tracing::debug_span;

use crate::document::DocumentId;
use crate::matcher::TopicMatcher;
use crate::results::{FailureLog, ScanReport};
use crate::trace::{Region, TaskScope};

use super::{available_parallelism, run_pool, ScanContext, ScanRun, ScanStrategy};

/// A fixed pool of worker threads, one per available core, pulling ids from a
/// shared queue.
///
/// Same shape as [`SharedQueue`](super::SharedQueue), except the number of
/// workers does not depend on the corpus size.
#[derive(Debug, Clone)]
pub struct CpuPool {
    ctx: ScanContext,
    workers: NonZeroUsize,
}

impl CpuPool {
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx,
            workers: available_parallelism(),
        }
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }
}

impl ScanStrategy for CpuPool {
    fn name(&self) -> &'static str {
        "cpu-pool"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let workers = self.workers();
        let total = run_pool(self.name(), ids, workers, workers, |id| {
            self.ctx.process(id, &matcher, &run.failures)
        });
        run.finish(&self.ctx, total)
    }
}

/// [`CpuPool`] with every unit of work wrapped in a task marker and four
/// region markers: `open`, `read`, `decode` and `search`.
///
/// Markers go to the context's [`Recorder`](crate::trace::Recorder). Each
/// region brackets exactly one step and is closed by a guard, so a failing
/// step still ends its region and the task.
#[derive(Debug, Clone)]
pub struct TracedPool {
    ctx: ScanContext,
    workers: NonZeroUsize,
}

impl TracedPool {
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx,
            workers: available_parallelism(),
        }
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    fn process(&self, id: &DocumentId, matcher: &TopicMatcher, failures: &FailureLog) -> usize {
        let span = debug_span!("document", id = %id);
        let _entered = span.enter();

        let ctx = &self.ctx;
        ctx.metrics().record_attempt();
        let _in_flight = ctx.metrics().enter();
        let task = TaskScope::begin(ctx.recorder(), id);

        let region = task.region(Region::Open);
        let Some(source) = ctx.open(id, failures) else {
            return 0;
        };
        region.end();

        let region = task.region(Region::Read);
        let Some(raw) = ctx.read(id, source, failures) else {
            return 0;
        };
        region.end();

        let region = task.region(Region::Decode);
        let Some(record) = ctx.decode(&raw, failures) else {
            return 0;
        };
        region.end();

        let region = task.region(Region::Search);
        let found = ctx.search(&record, matcher);
        region.end();

        found
    }
}

impl ScanStrategy for TracedPool {
    fn name(&self) -> &'static str {
        "traced-pool"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let workers = self.workers();
        let total = run_pool(self.name(), ids, workers, workers, |id| {
            self.process(id, &matcher, &run.failures)
        });
        run.finish(&self.ctx, total)
    }
}
