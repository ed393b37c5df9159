use crate::document::DocumentId;
use crate::matcher::TopicMatcher;
use crate::results::{ResultAggregator, ScanReport};

use super::{task_scope, ScanContext, ScanRun, ScanStrategy};

/// Spawns one task per document, all at once.
///
/// Tasks run on a pool with a thread for every document, so nothing limits
/// how many documents are loaded and parsed at the same time.
/// [`Bounded`](super::Bounded) is the same topology with a semaphore in front
/// of the I/O.
#[derive(Debug, Clone)]
pub struct PerDocument {
    ctx: ScanContext,
}

impl PerDocument {
    pub fn new(ctx: ScanContext) -> Self {
        Self { ctx }
    }
}

impl ScanStrategy for PerDocument {
    fn name(&self) -> &'static str {
        "per-document"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let totals = ResultAggregator::new();

        task_scope(self.name(), ids.len(), |s| {
            for id in ids {
                let (ctx, matcher, totals) = (&self.ctx, &matcher, &totals);
                let failures = &run.failures;
                s.spawn(move |_| {
                    totals.merge(ctx.process(id, matcher, failures));
                });
            }
        });

        run.finish(&self.ctx, totals.finalize())
    }
}
