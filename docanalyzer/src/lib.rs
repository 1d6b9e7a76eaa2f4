//! # Docanalyzer
//!
//! Client and terminal dashboard for the financial document analysis
//! service.
//!
//! The service accepts a PDF plus a question, runs it through a fixed
//! pipeline of four analysis agents, and stores the outputs. This crate
//! provides:
//!
//! - **API client**: submissions, job status, results, roster and health
//!   over HTTP, behind the [`AnalyzerApi`](api::AnalyzerApi) trait
//! - **Pollers**: interval-driven tasks that keep the roster, the selected
//!   job and the health indicator fresh, each cancelled with its handle
//! - **Stage derivation**: per-stage state and progress inferred from the
//!   job status and the outputs received so far
//! - **Upload form**: client-side validation and submission
//! - **Views**: plain-text rendering of all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docanalyzer::prelude::*;
//! use std::sync::Arc;
//!
//! let config = DashboardConfig::from_env()?;
//! let api = Arc::new(HttpAnalyzerClient::from_config(&config)?);
//! let mut dashboard = Dashboard::new(api, &config);
//! dashboard.start();
//!
//! loop {
//!     dashboard.changed().await;
//!     println!("{}", dashboard.render());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod api;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod observability;
pub mod polling;
pub mod stages;
pub mod testing;
pub mod upload;
pub mod views;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{
        AnalysisRequest, AnalyzerApi, DocumentFile, HttpAnalyzerClient, JobListQuery,
        ProcessingMode,
    };
    pub use crate::cancellation::{CancellationToken, PollHandle};
    pub use crate::config::DashboardConfig;
    pub use crate::core::{
        AnalysisResult, HealthReport, HealthState, Job, JobPage, JobStatus, StageState,
        SubmittedJob,
    };
    pub use crate::dashboard::Dashboard;
    pub use crate::errors::{AnalyzerError, AnalyzerResult};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogConfig, LogFormat};
    pub use crate::polling::{HealthMonitor, JobListPoller, JobPoller};
    pub use crate::stages::{derive_pipeline, PipelineStage, PipelineView};
    pub use crate::upload::{FileSource, UploadForm, UploadLimits};
}
