//! The analysis service API and its HTTP implementation.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::request::{AnalysisRequest, JobListQuery, ProcessingMode};
use crate::config::DashboardConfig;
use crate::core::{AnalysisResult, HealthReport, Job, JobPage, SubmittedJob};
use crate::errors::{AnalyzerError, AnalyzerResult};

/// Fallback detail for a refused submission.
pub const SUBMIT_FAILED: &str = "Failed to submit analysis";
/// Fallback detail for a failed status fetch.
pub const JOB_FETCH_FAILED: &str = "Failed to fetch job status";
/// Fallback detail for a failed roster fetch.
pub const LIST_FETCH_FAILED: &str = "Failed to fetch jobs list";
/// Fallback detail for a failed health check.
pub const HEALTH_CHECK_FAILED: &str = "Health check failed";

/// Operations the dashboard needs from the analysis service.
///
/// Pollers and the upload form only see this trait, so tests can run them
/// against scripted or mocked services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// Uploads a document for analysis.
    async fn submit_analysis(
        &self,
        request: &AnalysisRequest,
        mode: ProcessingMode,
    ) -> AnalyzerResult<SubmittedJob>;

    /// Fetches the current snapshot of a job.
    async fn get_job(&self, job_id: &str) -> AnalyzerResult<Job>;

    /// Fetches the result of a job; `None` means it is not ready.
    async fn get_result(&self, job_id: &str) -> AnalyzerResult<Option<AnalysisResult>>;

    /// Fetches one page of the roster.
    async fn list_jobs(&self, query: &JobListQuery) -> AnalyzerResult<JobPage>;

    /// Fetches the health report.
    async fn check_health(&self) -> AnalyzerResult<HealthReport>;
}

/// [`AnalyzerApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAnalyzerClient {
    http: Client,
    base_url: Url,
}

impl HttpAnalyzerClient {
    /// Creates a client for the given base URL.
    pub fn new(base_url: &str) -> AnalyzerResult<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Creates a client from the dashboard configuration.
    pub fn from_config(config: &DashboardConfig) -> AnalyzerResult<Self> {
        config.validate()?;
        Self::new(&config.api_url)
    }

    /// Creates a client reusing an existing reqwest client.
    pub fn with_client(base_url: &str, http: Client) -> AnalyzerResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| AnalyzerError::Config(format!("invalid API URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AnalyzerError::Config(format!(
                "API URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { http, base_url })
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL below the base URL.
    ///
    /// Segments are percent-encoded, so a job id can never escape its path.
    pub fn endpoint(&self, segments: &[&str]) -> AnalyzerResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AnalyzerError::Config(format!("API URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AnalyzerResult<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> AnalyzerResult<T> {
        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            let err = AnalyzerError::from_response(response, fallback).await;
            debug!(url = %url, error = %err, "request refused");
            return Err(err);
        }
        Self::decode(response).await
    }
}

#[async_trait]
impl AnalyzerApi for HttpAnalyzerClient {
    async fn submit_analysis(
        &self,
        request: &AnalysisRequest,
        mode: ProcessingMode,
    ) -> AnalyzerResult<SubmittedJob> {
        let url = self.endpoint(mode.endpoint())?;
        let part = Part::bytes(request.file.bytes.clone())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("query", request.query.clone());

        debug!(
            url = %url,
            mode = %mode,
            file = %request.file.name,
            size = request.file.bytes.len(),
            "submitting document"
        );
        let response = self.http.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            let err = AnalyzerError::from_response(response, SUBMIT_FAILED).await;
            warn!(file = %request.file.name, error = %err, "submission refused");
            return Err(err);
        }
        Self::decode(response).await
    }

    async fn get_job(&self, job_id: &str) -> AnalyzerResult<Job> {
        let url = self.endpoint(&["jobs", job_id])?;
        self.fetch(url, JOB_FETCH_FAILED).await
    }

    async fn get_result(&self, job_id: &str) -> AnalyzerResult<Option<AnalysisResult>> {
        let url = self.endpoint(&["results", job_id])?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            debug!(job_id = %job_id, status = response.status().as_u16(), "result not ready");
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn list_jobs(&self, query: &JobListQuery) -> AnalyzerResult<JobPage> {
        let mut url = self.endpoint(&["jobs"])?;
        url.query_pairs_mut()
            .extend_pairs(query.to_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        self.fetch(url, LIST_FETCH_FAILED).await
    }

    async fn check_health(&self) -> AnalyzerResult<HealthReport> {
        let url = self.endpoint(&["health"])?;
        self.fetch(url, HEALTH_CHECK_FAILED).await
    }
}
