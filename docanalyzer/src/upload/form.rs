//! Upload drawer state.

use std::sync::Arc;
use tracing::{info, warn};

use super::validate::{effective_query, UploadLimits, SELECT_PDF};
use crate::api::{AnalysisRequest, AnalyzerApi, DocumentFile, ProcessingMode, SUBMIT_FAILED};
use crate::core::SubmittedJob;
use crate::errors::{AnalyzerError, AnalyzerResult};
use crate::events::{EventSink, NoOpEventSink, UPLOAD_REJECTED, UPLOAD_SUBMITTED};

/// Where a file selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    /// The file picker; a rejected pick clears the selection.
    Picker,
    /// Drag and drop; a rejected drop keeps the previous selection.
    Drop,
}

/// The upload drawer: selected file, query, mode and submission state.
pub struct UploadForm {
    limits: UploadLimits,
    events: Arc<dyn EventSink>,
    file: Option<DocumentFile>,
    query: String,
    mode: ProcessingMode,
    submitting: bool,
    error: Option<String>,
    open: bool,
}

impl UploadForm {
    /// Creates an empty form with the drawer open.
    #[must_use]
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            events: Arc::new(NoOpEventSink),
            file: None,
            query: String::new(),
            mode: ProcessingMode::default(),
            submitting: false,
            error: None,
            open: true,
        }
    }

    /// Routes submissions and rejections to an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Selects a file, validating its type and size.
    ///
    /// On rejection the error is shown inline. A rejected pick clears the
    /// selection; a rejected drop keeps whatever was selected before.
    pub fn select_file(&mut self, file: DocumentFile, source: FileSource) -> AnalyzerResult<()> {
        match self.limits.check_file(&file) {
            Ok(()) => {
                self.file = Some(file);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                if source == FileSource::Picker {
                    self.file = None;
                }
                self.reject(&e, Some(file.name.as_str()));
                Err(e)
            }
        }
    }

    /// Drops the selected file.
    pub fn clear_file(&mut self) {
        self.file = None;
    }

    /// Replaces the query text.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Chooses queued or blocking processing.
    pub fn set_mode(&mut self, mode: ProcessingMode) {
        self.mode = mode;
    }

    /// Whether the submit control is enabled.
    #[must_use]
    pub const fn can_submit(&self) -> bool {
        self.file.is_some() && !self.submitting
    }

    /// Expands the drawer.
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Collapses the drawer; the form keeps its contents.
    pub fn collapse(&mut self) {
        self.open = false;
    }

    /// Flips the drawer.
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Whether the drawer is expanded.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// The selected file.
    #[must_use]
    pub const fn file(&self) -> Option<&DocumentFile> {
        self.file.as_ref()
    }

    /// The query as typed.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The processing mode.
    #[must_use]
    pub const fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The inline error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates the form and marks it submitting.
    ///
    /// Returns the request to send. Pair with [`finish_submit`] when the
    /// request is sent elsewhere; [`submit`] does both.
    ///
    /// [`finish_submit`]: Self::finish_submit
    /// [`submit`]: Self::submit
    pub fn begin_submit(&mut self) -> AnalyzerResult<(AnalysisRequest, ProcessingMode)> {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                let name = self.file.as_ref().map(|f| f.name.clone());
                self.reject(&e, name.as_deref());
                return Err(e);
            }
        };
        self.submitting = true;
        self.error = None;
        Ok((request, self.mode))
    }

    /// Applies the outcome of a submission started with [`begin_submit`].
    ///
    /// Success clears the form and collapses the drawer. Failure keeps the
    /// form and shows the service's message.
    ///
    /// [`begin_submit`]: Self::begin_submit
    pub fn finish_submit(
        &mut self,
        outcome: AnalyzerResult<SubmittedJob>,
    ) -> AnalyzerResult<SubmittedJob> {
        self.submitting = false;
        match outcome {
            Ok(job) => {
                info!(job_id = %job.job_id, mode = %self.mode, "analysis submitted");
                self.events.try_emit(
                    UPLOAD_SUBMITTED,
                    Some(serde_json::json!({
                        "job_id": job.job_id,
                        "mode": self.mode,
                        "filename": self.file.as_ref().map(|f| f.name.clone()),
                    })),
                );
                self.file = None;
                self.query.clear();
                self.error = None;
                self.open = false;
                Ok(job)
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                let message = match &e {
                    AnalyzerError::Api { detail, .. } => detail.clone(),
                    AnalyzerError::Validation(message) => message.clone(),
                    _ => SUBMIT_FAILED.to_string(),
                };
                self.error = Some(message);
                Err(e)
            }
        }
    }

    /// Validates and submits the form.
    ///
    /// Validation failures never reach the network. The submitting flag is
    /// released even if this future is dropped before the reply arrives.
    pub async fn submit(&mut self, api: &dyn AnalyzerApi) -> AnalyzerResult<SubmittedJob> {
        let (request, mode) = self.begin_submit()?;
        let outcome = {
            let _release = ReleaseOnDrop(&mut self.submitting);
            api.submit_analysis(&request, mode).await
        };
        self.finish_submit(outcome)
    }

    fn build_request(&self) -> AnalyzerResult<AnalysisRequest> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| AnalyzerError::validation(SELECT_PDF))?;
        self.limits.check_file(file)?;
        Ok(AnalysisRequest {
            file: file.clone(),
            query: effective_query(&self.query)?,
        })
    }

    fn reject(&mut self, error: &AnalyzerError, filename: Option<&str>) {
        let message = error.user_message();
        warn!(reason = %message, filename = ?filename, "upload rejected");
        self.events.try_emit(
            UPLOAD_REJECTED,
            Some(serde_json::json!({ "reason": message, "filename": filename })),
        );
        self.error = Some(message);
    }
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new(UploadLimits::default())
    }
}

impl std::fmt::Debug for UploadForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadForm")
            .field("limits", &self.limits)
            .field("file", &self.file)
            .field("query", &self.query)
            .field("mode", &self.mode)
            .field("submitting", &self.submitting)
            .field("error", &self.error)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

struct ReleaseOnDrop<'a>(&'a mut bool);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
