//! Core domain model types.
//!
//! This module contains the types every other module shares:
//! - Job, stage and health status enums
//! - Wire models for jobs, results, submissions and health reports

mod job;
mod status;

pub use job::{AnalysisResult, HealthReport, Job, JobPage, SubmittedJob, DEFAULT_QUERY};
pub use status::{HealthState, JobStatus, StageState};
