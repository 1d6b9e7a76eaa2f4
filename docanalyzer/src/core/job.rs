//! Wire models returned by the analysis service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::status::JobStatus;

/// Query sent when the user leaves the query box empty.
pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

/// A snapshot of one submitted analysis job.
///
/// The client never mutates a job; every poll replaces the whole snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JobRecord")]
pub struct Job {
    /// Service-assigned identifier.
    pub job_id: String,
    /// Lifecycle status.
    pub status: JobStatus,
    /// The analysis question.
    #[serde(default)]
    pub query: Option<String>,
    /// Name of the uploaded PDF.
    #[serde(default)]
    pub original_filename: Option<String>,
    /// ISO-8601 creation time; the service may omit the offset.
    #[serde(default)]
    pub created_at: Option<String>,
    /// ISO-8601 completion time.
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Wall-clock duration once finished.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Final synthesized answer.
    #[serde(default)]
    pub result: Option<String>,
    /// Failure text, read from either `error_message` or `error`.
    pub error_message: Option<String>,
}

/// Job body as sent by the service, which may carry both error fields.
#[derive(Deserialize)]
struct JobRecord {
    job_id: String,
    status: JobStatus,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    duration_seconds: Option<f64>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            status: record.status,
            query: record.query,
            original_filename: record.original_filename,
            created_at: record.created_at,
            completed_at: record.completed_at,
            duration_seconds: record.duration_seconds,
            result: record.result,
            error_message: record.error_message.or(record.error),
        }
    }
}

impl Job {
    /// Creates a job snapshot with the given id and status.
    #[must_use]
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            ..Default::default()
        }
    }

    /// Sets the query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the original filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Sets the final result text.
    #[must_use]
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub const fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// The query, or an empty string.
    #[must_use]
    pub fn query_text(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// The filename, or an empty string.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.original_filename.as_deref().unwrap_or("")
    }
}

/// Collected outputs of a completed job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Output text per stage key, e.g. `verification`.
    #[serde(default)]
    pub agent_outputs: BTreeMap<String, String>,
    /// Job this result belongs to.
    #[serde(default)]
    pub job_id: Option<String>,
    /// The analysis question.
    #[serde(default)]
    pub query: Option<String>,
    /// Name of the uploaded PDF.
    #[serde(default)]
    pub original_filename: Option<String>,
    /// Full analysis text.
    #[serde(default)]
    pub analysis: Option<String>,
    /// Short summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Wall-clock duration.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// ISO-8601 creation time.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AnalysisResult {
    /// Creates a result from stage outputs.
    #[must_use]
    pub fn with_outputs<I, K, V>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            agent_outputs: outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    /// Output text for a stage key, ignoring empty outputs.
    #[must_use]
    pub fn output_for(&self, key: &str) -> Option<&str> {
        self.agent_outputs
            .get(key)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }
}

/// Response of a submission, async or sync.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// Identifier of the created job.
    pub job_id: String,
    /// Queue task id (async mode only).
    #[serde(default)]
    pub task_id: Option<String>,
    /// `queued` for async, `success` for sync.
    #[serde(default)]
    pub status: String,
    /// The query the service accepted.
    #[serde(default)]
    pub query: Option<String>,
    /// Name of the processed file.
    #[serde(default)]
    pub file_processed: Option<String>,
    /// Analysis text (sync mode only).
    #[serde(default)]
    pub analysis: Option<String>,
    /// Duration (sync mode only).
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Informational message.
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of the job roster.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobPage {
    /// Jobs, newest first.
    #[serde(default)]
    pub jobs: Vec<Job>,
    /// Total number of jobs matching the filter.
    #[serde(default)]
    pub total: u64,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy` when the service is up.
    #[serde(default)]
    pub status: String,
    /// Database connectivity.
    #[serde(default)]
    pub database: Option<String>,
    /// Queue connectivity.
    #[serde(default)]
    pub redis_queue: Option<String>,
    /// Server time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthReport {
    /// Whether the service reported itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_job_decodes_service_shape() {
        let json = r#"{
            "job_id": "7f1c",
            "status": "failed",
            "query": "Summarize Q2",
            "result": null,
            "error": "LLM quota exceeded",
            "created_at": "2025-07-01T10:00:00.123456",
            "completed_at": null,
            "duration_seconds": 42
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.job_id, "7f1c");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("LLM quota exceeded"));
        assert_eq!(job.duration_seconds, Some(42.0));
        assert_eq!(job.original_filename, None);
        assert_eq!(job.filename(), "");
    }

    #[test]
    fn test_job_accepts_error_message_field() {
        let job: Job = serde_json::from_str(
            r#"{"job_id": "a", "status": "failed", "error_message": "bad pdf"}"#,
        )
        .unwrap();
        assert_eq!(job.error_message.as_deref(), Some("bad pdf"));
    }

    #[test]
    fn test_job_with_both_error_fields() {
        let job: Job = serde_json::from_str(
            r#"{"job_id": "a", "status": "failed", "error": "raw", "error_message": "readable"}"#,
        )
        .unwrap();
        assert_eq!(job.error_message.as_deref(), Some("readable"));

        let job: Job = serde_json::from_str(
            r#"{"job_id": "a", "status": "failed", "error": "raw", "error_message": null}"#,
        )
        .unwrap();
        assert_eq!(job.error_message.as_deref(), Some("raw"));
    }

    #[test]
    fn test_result_without_outputs() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"job_id": "a", "analysis": "Buy."}"#).unwrap();
        assert!(result.agent_outputs.is_empty());
        assert_eq!(result.analysis.as_deref(), Some("Buy."));
    }

    #[test]
    fn test_output_for_ignores_empty_text() {
        let result = AnalysisResult::with_outputs([("verification", ""), ("financial_analysis", "ok")]);
        assert_eq!(result.output_for("verification"), None);
        assert_eq!(result.output_for("financial_analysis"), Some("ok"));
        assert_eq!(result.output_for("risk_assessment"), None);
    }

    #[test]
    fn test_submitted_job_async_shape() {
        let json = r#"{
            "status": "queued",
            "job_id": "j-1",
            "task_id": "t-1",
            "query": "q",
            "file_processed": "report.pdf",
            "message": "Job submitted to queue."
        }"#;
        let submitted: SubmittedJob = serde_json::from_str(json).unwrap();
        assert_eq!(submitted.task_id.as_deref(), Some("t-1"));
        assert_eq!(submitted.analysis, None);
    }

    #[test]
    fn test_health_report() {
        let report: HealthReport = serde_json::from_str(r#"{"status": "healthy"}"#).unwrap();
        assert!(report.is_healthy());
        let report: HealthReport = serde_json::from_str(r#"{"status": "degraded"}"#).unwrap();
        assert!(!report.is_healthy());
    }
}
