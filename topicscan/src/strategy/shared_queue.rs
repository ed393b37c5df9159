use crate::document::DocumentId;
use crate::matcher::TopicMatcher;
use crate::results::ScanReport;

use super::{run_pool, ScanContext, ScanRun, ScanStrategy};

/// One worker thread per document, all pulling from a single queue sized to
/// the corpus.
///
/// Ids are pushed into a buffered queue that is closed once the last id is
/// in. Workers take ids until the queue is empty and closed, so whichever
/// worker is free picks up the next document rather than each worker owning
/// a fixed slice. With as many workers as documents this is close to one
/// worker per document, but assignment is still pull-based.
#[derive(Debug, Clone)]
pub struct SharedQueue {
    ctx: ScanContext,
}

impl SharedQueue {
    pub fn new(ctx: ScanContext) -> Self {
        Self { ctx }
    }
}

impl ScanStrategy for SharedQueue {
    fn name(&self) -> &'static str {
        "shared-queue"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let total = run_pool(self.name(), ids, ids.len(), ids.len(), |id| {
            self.ctx.process(id, &matcher, &run.failures)
        });
        run.finish(&self.ctx, total)
    }
}
