//! Interval-driven pollers.
//!
//! Each poller owns one tokio task through a [`PollHandle`] and publishes
//! its state on a `watch` channel:
//! - [`JobListPoller`] refreshes the roster and survives fetch errors
//! - [`JobPoller`] follows one job until it settles, then fetches its result
//! - [`HealthMonitor`] drives the service status indicator
//!
//! [`PollHandle`]: crate::cancellation::PollHandle

mod health;
mod job;
mod job_list;

pub use health::{probe_health, HealthMonitor, HealthStatus};
pub use job::{JobPollState, JobPoller};
pub use job_list::{JobListPoller, JobListState};
