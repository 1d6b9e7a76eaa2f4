//! Event sinks for poller and form transitions.
//!
//! Every poller takes an `Arc<dyn EventSink>`; the dashboard defaults to
//! [`NoOpEventSink`] and the CLI installs a [`LoggingEventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// A job poller began tracking an identifier.
pub const JOB_TRACKING_STARTED: &str = "job.tracking_started";
/// A polled job changed status.
pub const JOB_STATUS_CHANGED: &str = "job.status_changed";
/// A polled job reached `completed`.
pub const JOB_COMPLETED: &str = "job.completed";
/// A polled job reached `failed`.
pub const JOB_FAILED: &str = "job.failed";
/// The result payload of a completed job arrived.
pub const JOB_RESULT_READY: &str = "job.result_ready";
/// A job fetch failed and polling stopped.
pub const JOB_POLL_ERROR: &str = "job.poll_error";
/// The roster was refreshed.
pub const JOB_LIST_REFRESHED: &str = "job_list.refreshed";
/// A roster fetch failed.
pub const JOB_LIST_ERROR: &str = "job_list.error";
/// The health indicator changed.
pub const HEALTH_CHANGED: &str = "health.changed";
/// A document was accepted by the service.
pub const UPLOAD_SUBMITTED: &str = "upload.submitted";
/// The upload form rejected input or the service refused it.
pub const UPLOAD_REJECTED: &str = "upload.rejected";
