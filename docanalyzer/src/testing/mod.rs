//! Testing utilities for code built on the analysis client.
//!
//! This module provides:
//! - `ScriptedApi`, an in-memory service with scripted replies
//! - Fixture builders for jobs and results

mod fixtures;
mod scripted;

pub use fixtures::{completed_result, job_page, processing_result, sample_pdf};
pub use scripted::{Reply, ScriptedApi};
