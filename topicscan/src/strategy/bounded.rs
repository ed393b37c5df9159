use std::num::NonZeroUsize;
use tracing::trace;

use crate::document::DocumentId;
use crate::matcher::TopicMatcher;
use crate::results::{ResultAggregator, ScanReport};

use super::{available_parallelism, task_scope, ScanContext, ScanRun, ScanStrategy, Semaphore};

/// One task per document, gated by a counting semaphore.
///
/// Every task is created up front on a pool with a thread per document, so
/// the semaphore is the only bound. A task must hold a permit before it
/// touches the loader and keeps it until its count is merged. At most
/// `capacity` units of work are past that point at any moment.
#[derive(Debug, Clone)]
pub struct Bounded {
    ctx: ScanContext,
    capacity: NonZeroUsize,
}

impl Bounded {
    /// Capacity defaults to the available parallelism
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx,
            capacity: available_parallelism(),
        }
    }

    pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl ScanStrategy for Bounded {
    fn name(&self) -> &'static str {
        "bounded"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let totals = ResultAggregator::new();
        let semaphore = Semaphore::new(self.capacity());

        task_scope(self.name(), ids.len(), |s| {
            for id in ids {
                let (ctx, matcher, totals) = (&self.ctx, &matcher, &totals);
                let (semaphore, failures) = (&semaphore, &run.failures);
                s.spawn(move |_| {
                    let permit = semaphore.acquire();
                    trace!("Acquired slot for {} ({} in use)", id, semaphore.in_use());
                    totals.merge(ctx.process(id, matcher, failures));
                    drop(permit);
                });
            }
        });

        run.finish(&self.ctx, totals.finalize())
    }
}
