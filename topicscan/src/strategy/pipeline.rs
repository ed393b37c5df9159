use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::Read;
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

use crate::config::default_pipeline_capacity;
use crate::document::{DocumentId, RawDocument, StructuredRecord};
use crate::matcher::TopicMatcher;
use crate::results::{FailureLog, ScanReport};

use super::{ScanContext, ScanRun, ScanStrategy};

type OpenedDocument = (DocumentId, Box<dyn Read + Send>);

/// Lifecycle of one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Taking input and producing output
    Running,
    /// Input is exhausted and closed; finishing the last items
    Draining,
    /// Output closed; nothing more will be produced
    Closed,
}

/// Tracks one stage's state. A stage closes its output only by handing its
/// sender to [`Stage::close`], which requires it to be draining first.
#[derive(Debug)]
struct Stage {
    name: &'static str,
    state: StageState,
    processed: usize,
}

impl Stage {
    fn new(name: &'static str) -> Self {
        debug!("Pipeline stage {} running", name);
        Self {
            name,
            state: StageState::Running,
            processed: 0,
        }
    }

    fn advance(&mut self) {
        self.processed += 1;
    }

    fn drain(&mut self) {
        debug_assert_eq!(self.state, StageState::Running);
        self.state = StageState::Draining;
        debug!(
            "Pipeline stage {} draining after {} items",
            self.name, self.processed
        );
    }

    fn close<T>(&mut self, output: Sender<T>) {
        drop(output);
        self.finish();
    }

    /// Closes a stage with no output queue
    fn finish(&mut self) {
        debug_assert_eq!(self.state, StageState::Draining);
        self.state = StageState::Closed;
        debug!("Pipeline stage {} closed", self.name);
    }
}

/// Four stages connected by bounded queues: open → read → decode → search.
///
/// Each stage runs on its own thread and closes its output queue only after
/// its input is exhausted and closed. The search stage is the only writer of
/// the total, so it keeps a plain counter and hands it back when joined.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: ScanContext,
    capacity: NonZeroUsize,
}

impl Pipeline {
    /// Queues hold 100 items unless configured otherwise
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx,
            capacity: default_pipeline_capacity(),
        }
    }

    pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn open_stage(
        &self,
        ids: &[DocumentId],
        output: Sender<OpenedDocument>,
        failures: &FailureLog,
    ) {
        let mut stage = Stage::new("open");
        for id in ids {
            self.ctx.metrics().record_attempt();
            if let Some(source) = self.ctx.open(id, failures) {
                if output.send((id.clone(), source)).is_err() {
                    break;
                }
            }
            stage.advance();
        }
        stage.drain();
        stage.close(output);
    }

    fn read_stage(
        &self,
        input: Receiver<OpenedDocument>,
        output: Sender<RawDocument>,
        failures: &FailureLog,
    ) {
        let mut stage = Stage::new("read");
        for (id, source) in input.iter() {
            if let Some(raw) = self.ctx.read(&id, source, failures) {
                if output.send(raw).is_err() {
                    break;
                }
            }
            stage.advance();
        }
        stage.drain();
        stage.close(output);
    }

    fn decode_stage(
        &self,
        input: Receiver<RawDocument>,
        output: Sender<StructuredRecord>,
        failures: &FailureLog,
    ) {
        let mut stage = Stage::new("decode");
        for raw in input.iter() {
            if let Some(record) = self.ctx.decode(&raw, failures) {
                if output.send(record).is_err() {
                    break;
                }
            }
            stage.advance();
        }
        stage.drain();
        stage.close(output);
    }

    fn search_stage(&self, input: Receiver<StructuredRecord>, matcher: &TopicMatcher) -> usize {
        let mut stage = Stage::new("search");
        let mut found = 0;
        for record in input.iter() {
            found += self.ctx.search(&record, matcher);
            stage.advance();
        }
        stage.drain();
        debug!(
            "Pipeline stage search counted {} matches in {} records",
            found, stage.processed
        );
        stage.finish();
        found
    }
}

impl ScanStrategy for Pipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn scan(&self, topic: &str, ids: &[DocumentId]) -> ScanReport {
        if ids.is_empty() {
            return ScanReport::empty(self.name());
        }

        let run = ScanRun::start(self.name(), topic, ids.len());
        let matcher = TopicMatcher::new(topic);
        let failures = &run.failures;

        let (opened_tx, opened_rx) = bounded::<OpenedDocument>(self.capacity());
        let (raw_tx, raw_rx) = bounded::<RawDocument>(self.capacity());
        let (record_tx, record_rx) = bounded::<StructuredRecord>(self.capacity());

        let total = thread::scope(|s| {
            s.spawn(|| self.open_stage(ids, opened_tx, failures));
            s.spawn(|| self.read_stage(opened_rx, raw_tx, failures));
            s.spawn(|| self.decode_stage(raw_rx, record_tx, failures));
            let search = s.spawn(|| self.search_stage(record_rx, &matcher));

            match search.join() {
                Ok(total) => total,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        });

        run.finish(&self.ctx, total)
    }
}
