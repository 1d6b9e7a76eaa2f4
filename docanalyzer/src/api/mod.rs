//! Client for the analysis service REST API.
//!
//! This module provides:
//! - The `AnalyzerApi` trait every component talks to
//! - `HttpAnalyzerClient`, the reqwest implementation
//! - Request types for submissions and roster queries

mod client;
mod request;

#[cfg(test)]
pub use client::MockAnalyzerApi;
pub use client::{
    AnalyzerApi, HttpAnalyzerClient, HEALTH_CHECK_FAILED, JOB_FETCH_FAILED, LIST_FETCH_FAILED,
    SUBMIT_FAILED,
};
pub use request::{AnalysisRequest, DocumentFile, JobListQuery, ProcessingMode, PDF_CONTENT_TYPE};
