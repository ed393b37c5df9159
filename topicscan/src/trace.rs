//! Instrumentation hooks.
//!
//! Strategies report a task per document and, where they support it, a region
//! per step of the unit of work. What happens to those markers is up to the
//! [`Recorder`]; the default does nothing.

use std::fmt;
use std::sync::Mutex;
use tracing::trace;

use crate::document::DocumentId;

/// Step of a unit of work bracketed by a region marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Open,
    Read,
    Decode,
    Search,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Open, Region::Read, Region::Decode, Region::Search];

    pub fn name(self) -> &'static str {
        match self {
            Region::Open => "open",
            Region::Read => "read",
            Region::Decode => "decode",
            Region::Search => "search",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives task and region markers
pub trait Recorder: Send + Sync {
    fn begin_task(&self, _id: &DocumentId) {}
    fn end_task(&self, _id: &DocumentId) {}
    fn begin_region(&self, _id: &DocumentId, _region: Region) {}
    fn end_region(&self, _id: &DocumentId, _region: Region) {}
}

/// Ignores every marker
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {}

/// Forwards markers to `tracing` at trace level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn begin_task(&self, id: &DocumentId) {
        trace!("task begin: {}", id);
    }

    fn end_task(&self, id: &DocumentId) {
        trace!("task end: {}", id);
    }

    fn begin_region(&self, id: &DocumentId, region: Region) {
        trace!("region begin: {} {}", id, region);
    }

    fn end_region(&self, id: &DocumentId, region: Region) {
        trace!("region end: {} {}", id, region);
    }
}

/// What a recorded marker bracketed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Task,
    Region(Region),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Begin(DocumentId, Marker),
    End(DocumentId, Marker),
}

/// Keeps every marker in arrival order
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<TraceEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    /// Copy of the events recorded so far
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events for one document, in the order they were recorded
    pub fn events_for(&self, id: &DocumentId) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|event| match event {
                TraceEvent::Begin(doc, _) | TraceEvent::End(doc, _) => doc == id,
            })
            .collect()
    }

    /// Number of tasks that have been opened
    pub fn task_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, TraceEvent::Begin(_, Marker::Task)))
            .count()
    }
}

impl Recorder for EventRecorder {
    fn begin_task(&self, id: &DocumentId) {
        self.push(TraceEvent::Begin(id.clone(), Marker::Task));
    }

    fn end_task(&self, id: &DocumentId) {
        self.push(TraceEvent::End(id.clone(), Marker::Task));
    }

    fn begin_region(&self, id: &DocumentId, region: Region) {
        self.push(TraceEvent::Begin(id.clone(), Marker::Region(region)));
    }

    fn end_region(&self, id: &DocumentId, region: Region) {
        self.push(TraceEvent::End(id.clone(), Marker::Region(region)));
    }
}

/// Open task marker; ends the task when dropped
pub struct TaskScope<'a> {
    recorder: &'a dyn Recorder,
    id: &'a DocumentId,
}

impl<'a> TaskScope<'a> {
    pub fn begin(recorder: &'a dyn Recorder, id: &'a DocumentId) -> Self {
        recorder.begin_task(id);
        Self { recorder, id }
    }

    /// Opens a region inside this task
    pub fn region(&self, region: Region) -> RegionScope<'a> {
        RegionScope::begin(self.recorder, self.id, region)
    }
}

impl Drop for TaskScope<'_> {
    fn drop(&mut self) {
        self.recorder.end_task(self.id);
    }
}

/// Open region marker; ends the region when dropped
pub struct RegionScope<'a> {
    recorder: &'a dyn Recorder,
    id: &'a DocumentId,
    region: Region,
}

impl<'a> RegionScope<'a> {
    pub fn begin(recorder: &'a dyn Recorder, id: &'a DocumentId, region: Region) -> Self {
        recorder.begin_region(id, region);
        Self {
            recorder,
            id,
            region,
        }
    }

    /// Ends the region now
    pub fn end(self) {}
}

impl Drop for RegionScope<'_> {
    fn drop(&mut self) {
        self.recorder.end_region(self.id, self.region);
    }
}
