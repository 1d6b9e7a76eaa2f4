//! Request types sent to the analysis service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::JobStatus;
use crate::errors::AnalyzerError;

/// Content type the service accepts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// How the service should process a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Queue the job and return its id immediately (`POST /analyze/async`).
    Async,
    /// Block until the analysis finishes (`POST /analyze`).
    Sync,
}

impl Default for ProcessingMode {
    fn default() -> Self {
        Self::Async
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => write!(f, "async"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" | "queue" => Ok(Self::Async),
            "sync" => Ok(Self::Sync),
            other => Err(AnalyzerError::validation(format!(
                "unknown processing mode '{other}', expected async or sync"
            ))),
        }
    }
}

impl ProcessingMode {
    /// Path segments of the submission endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &'static [&'static str] {
        match self {
            Self::Async => &["analyze", "async"],
            Self::Sync => &["analyze"],
        }
    }
}

/// A file picked for upload, held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    /// File name as shown to the user and sent to the service.
    pub name: String,
    /// MIME type reported by the picker.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    /// Creates a document from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Whether the reported content type is PDF.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// The PDF to analyze.
    pub file: DocumentFile,
    /// The question to answer.
    pub query: String,
}

/// Filter and paging for `GET /jobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListQuery {
    /// Maximum number of jobs.
    pub limit: u32,
    /// Jobs to skip.
    pub offset: u32,
    /// Only jobs in this status.
    pub status: Option<JobStatus>,
}

impl Default for JobListQuery {
    fn default() -> Self {
        Self {
            limit: 30,
            offset: 0,
            status: None,
        }
    }
}

impl JobListQuery {
    /// A first page of the given size.
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Query-string pairs; defaults are left out.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if self.offset > 0 {
            pairs.push(("offset", self.offset.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(DocumentFile::new("a.pdf", "application/pdf", vec![]).is_pdf());
        assert!(DocumentFile::new("a.pdf", "Application/PDF; charset=binary", vec![]).is_pdf());
        assert!(!DocumentFile::new("a.pdf", "text/plain", vec![]).is_pdf());
        assert!(!DocumentFile::new("a.pdf", "", vec![]).is_pdf());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let file = DocumentFile::new("a.pdf", PDF_CONTENT_TYPE, vec![0; 2048]);
        let debug = format!("{file:?}");
        assert!(debug.contains("size: 2048"));
        assert_eq!(file.size(), 2048);
    }

    #[test]
    fn test_processing_mode() {
        assert_eq!(ProcessingMode::default(), ProcessingMode::Async);
        assert_eq!("SYNC".parse::<ProcessingMode>().unwrap(), ProcessingMode::Sync);
        assert!("batch".parse::<ProcessingMode>().is_err());
        assert_eq!(ProcessingMode::Async.endpoint(), &["analyze", "async"]);
        assert_eq!(ProcessingMode::Sync.endpoint(), &["analyze"]);
    }

    #[test]
    fn test_list_query_pairs() {
        assert_eq!(JobListQuery::default().to_pairs(), vec![("limit", "30".to_string())]);

        let query = JobListQuery {
            limit: 10,
            offset: 20,
            status: Some(JobStatus::Failed),
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("limit", "10".to_string()),
                ("offset", "20".to_string()),
                ("status", "failed".to_string()),
            ]
        );
    }
}
