//! Client-side checks run before a submission leaves the machine.

use crate::api::DocumentFile;
use crate::config::{DashboardConfig, BYTES_PER_MB};
use crate::core::DEFAULT_QUERY;
use crate::errors::{AnalyzerError, AnalyzerResult};

/// Shown when the selected file is not a PDF.
pub const ONLY_PDF: &str = "Only PDF files are supported.";
/// Shown when submitting without a file.
pub const SELECT_PDF: &str = "Please select a PDF file.";
/// Shown when the query is too short or too long.
pub const QUERY_LENGTH: &str = "Query must be between 5 and 500 characters.";

/// Shortest accepted query, in characters.
pub const MIN_QUERY_CHARS: usize = 5;
/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

/// Upload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest accepted file, in megabytes.
    pub max_file_size_mb: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
        }
    }
}

impl UploadLimits {
    /// Limits taken from the dashboard configuration.
    #[must_use]
    pub const fn from_config(config: &DashboardConfig) -> Self {
        Self {
            max_file_size_mb: config.max_file_size_mb,
        }
    }

    /// Largest accepted file, in bytes.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Rejects files that are not PDFs or that exceed the size limit.
    pub fn check_file(&self, file: &DocumentFile) -> AnalyzerResult<()> {
        if !file.is_pdf() {
            return Err(AnalyzerError::validation(ONLY_PDF));
        }
        if file.size() > self.max_file_size_bytes() {
            return Err(AnalyzerError::validation(format!(
                "File too large. Maximum allowed size is {}MB.",
                self.max_file_size_mb
            )));
        }
        Ok(())
    }
}

/// The query actually sent: trimmed, or the default when blank.
pub fn effective_query(query: &str) -> AnalyzerResult<String> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(DEFAULT_QUERY.to_string());
    }
    let chars = query.chars().count();
    if !(MIN_QUERY_CHARS..=MAX_QUERY_CHARS).contains(&chars) {
        return Err(AnalyzerError::validation(QUERY_LENGTH));
    }
    Ok(query.to_string())
}
