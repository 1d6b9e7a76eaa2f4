//! Where poller and form transitions go.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, Level};

/// One recorded transition: event name plus its payload.
pub type RecordedEvent = (String, Option<Value>);

/// Receives state transitions from the pollers and the upload form.
///
/// Poll tasks await [`emit`](Self::emit) between fetches. Synchronous state
/// changes (switching the tracked job, validating or submitting the form)
/// use [`try_emit`](Self::try_emit), which must return immediately.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event from inside a poll task.
    async fn emit(&self, event_type: &str, data: Option<Value>);

    /// Delivers an event without awaiting. Must not panic.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Drops every event. The default for pollers and forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes each event as a `tracing` record.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    verbose: bool,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingEventSink {
    /// Logs at `DEBUG` when `level` is `DEBUG` or finer, otherwise at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self {
            verbose: level >= Level::DEBUG,
        }
    }

    /// Logs every event at `DEBUG`.
    #[must_use]
    pub const fn debug() -> Self {
        Self { verbose: true }
    }

    fn record(&self, event_type: &str, data: Option<&Value>) {
        if self.verbose {
            debug!(event = %event_type, data = ?data, "dashboard event");
        } else {
            info!(event = %event_type, data = ?data, "dashboard event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.record(event_type, data.as_ref());
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Event names, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Events whose name starts with `prefix`, e.g. `"job."`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn push(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.push(event_type, data);
    }
}
