//! Job, stage and health status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an analysis job, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// A worker is running the agent pipeline.
    Processing,
    /// All stages finished and the result is stored.
    Completed,
    /// The pipeline aborted.
    Failed,
    /// A status string this client does not know.
    #[serde(other)]
    Unknown,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl JobStatus {
    /// Returns true once the service will no longer change the job.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Badge label shown next to a job.
    #[must_use]
    pub const fn badge_label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "ANALYZING",
            Self::Completed => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Display state of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Not reached yet.
    Waiting,
    /// The stage currently running.
    Active,
    /// Output received, or the whole job completed.
    Completed,
    /// The job failed before this stage produced output.
    Failed,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Waiting
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageState {
    /// Human label used by the stage rows.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::Active => "Processing",
            Self::Completed => "Complete",
            Self::Failed => "Failed",
        }
    }
}

/// Tri-state API health indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No response received yet.
    Checking,
    /// Last check answered `healthy`.
    Online,
    /// Last check failed or answered anything else.
    Offline,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::Checking
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "CHECKING"),
            Self::Online => write!(f, "ONLINE"),
            Self::Offline => write!(f, "OFFLINE"),
        }
    }
}

impl HealthState {
    /// Maps a health check outcome onto the indicator.
    #[must_use]
    pub const fn from_healthy(healthy: bool) -> Self {
        if healthy {
            Self::Online
        } else {
            Self::Offline
        }
    }
}
