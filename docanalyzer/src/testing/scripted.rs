//! A scripted in-memory analysis service.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::api::{AnalysisRequest, AnalyzerApi, JobListQuery, ProcessingMode};
use crate::core::{AnalysisResult, HealthReport, Job, JobPage, SubmittedJob};
use crate::errors::{AnalyzerError, AnalyzerResult};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// A 2xx response with this body.
    Ok(T),
    /// A non-2xx response with this status and detail.
    Fail(u16, String),
}

impl<T: Clone> Reply<T> {
    fn to_result(&self) -> AnalyzerResult<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Fail(status, detail) => Err(AnalyzerError::Api {
                status: *status,
                detail: detail.clone(),
            }),
        }
    }
}

/// Replies consumed front to back; the last one repeats forever.
#[derive(Debug)]
struct Script<T> {
    replies: VecDeque<Reply<T>>,
}

impl<T: Clone> Script<T> {
    const fn new() -> Self {
        Self {
            replies: VecDeque::new(),
        }
    }

    fn push(&mut self, reply: Reply<T>) {
        self.replies.push_back(reply);
    }

    fn next(&mut self) -> Option<Reply<T>> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

#[derive(Debug, Default)]
struct Calls {
    jobs: HashMap<String, usize>,
    results: HashMap<String, usize>,
    lists: usize,
    health: usize,
    submissions: Vec<(AnalysisRequest, ProcessingMode)>,
}

/// An [`AnalyzerApi`] that answers from scripts and counts every call.
///
/// Delays use `tokio::time::sleep`, so tests running with paused time can
/// stage slow responses without waiting for them.
#[derive(Debug)]
pub struct ScriptedApi {
    jobs: Mutex<HashMap<String, Script<Job>>>,
    results: Mutex<HashMap<String, AnalysisResult>>,
    pages: Mutex<Script<JobPage>>,
    health: Mutex<Script<HealthReport>>,
    submit: Mutex<Script<SubmittedJob>>,
    job_delays: Mutex<HashMap<String, Duration>>,
    list_delay: Mutex<Duration>,
    calls: Mutex<Calls>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    /// Creates a service with nothing scripted.
    ///
    /// Unscripted jobs answer 404, an unscripted roster is empty, and an
    /// unscripted health check is healthy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            pages: Mutex::new(Script::new()),
            health: Mutex::new(Script::new()),
            submit: Mutex::new(Script::new()),
            job_delays: Mutex::new(HashMap::new()),
            list_delay: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Queues a snapshot for `job.job_id`.
    pub fn push_job(&self, job: Job) {
        self.jobs
            .lock()
            .entry(job.job_id.clone())
            .or_insert_with(Script::new)
            .push(Reply::Ok(job));
    }

    /// Queues a failed status fetch for a job.
    pub fn push_job_error(&self, job_id: &str, status: u16, detail: &str) {
        self.jobs
            .lock()
            .entry(job_id.to_string())
            .or_insert_with(Script::new)
            .push(Reply::Fail(status, detail.to_string()));
    }

    /// Stores the result returned for a job.
    pub fn set_result(&self, job_id: &str, result: AnalysisResult) {
        self.results.lock().insert(job_id.to_string(), result);
    }

    /// Delays every status fetch for a job.
    pub fn set_job_delay(&self, job_id: &str, delay: Duration) {
        self.job_delays.lock().insert(job_id.to_string(), delay);
    }

    /// Delays every roster fetch.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    /// Queues a roster page.
    pub fn push_page(&self, page: JobPage) {
        self.pages.lock().push(Reply::Ok(page));
    }

    /// Queues a failed roster fetch.
    pub fn push_page_error(&self, status: u16, detail: &str) {
        self.pages.lock().push(Reply::Fail(status, detail.to_string()));
    }

    /// Queues a health report.
    pub fn push_health(&self, report: HealthReport) {
        self.health.lock().push(Reply::Ok(report));
    }

    /// Queues a failed health check.
    pub fn push_health_error(&self, status: u16) {
        self.health
            .lock()
            .push(Reply::Fail(status, "Service Unavailable".to_string()));
    }

    /// Queues a submission reply.
    pub fn push_submit(&self, reply: Reply<SubmittedJob>) {
        self.submit.lock().push(reply);
    }

    /// Status fetches issued for a job.
    #[must_use]
    pub fn job_calls(&self, job_id: &str) -> usize {
        self.calls.lock().jobs.get(job_id).copied().unwrap_or(0)
    }

    /// Result fetches issued for a job.
    #[must_use]
    pub fn result_calls(&self, job_id: &str) -> usize {
        self.calls.lock().results.get(job_id).copied().unwrap_or(0)
    }

    /// Roster fetches issued.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls.lock().lists
    }

    /// Health checks issued.
    #[must_use]
    pub fn health_calls(&self) -> usize {
        self.calls.lock().health
    }

    /// Submissions received, oldest first.
    #[must_use]
    pub fn submissions(&self) -> Vec<(AnalysisRequest, ProcessingMode)> {
        self.calls.lock().submissions.clone()
    }
}

#[async_trait]
impl AnalyzerApi for ScriptedApi {
    async fn submit_analysis(
        &self,
        request: &AnalysisRequest,
        mode: ProcessingMode,
    ) -> AnalyzerResult<SubmittedJob> {
        self.calls.lock().submissions.push((request.clone(), mode));
        let reply = self.submit.lock().next();
        reply.map_or_else(
            || {
                Ok(SubmittedJob {
                    job_id: format!("job-{}", self.calls.lock().submissions.len()),
                    status: "queued".to_string(),
                    query: Some(request.query.clone()),
                    file_processed: Some(request.file.name.clone()),
                    ..Default::default()
                })
            },
            |reply| reply.to_result(),
        )
    }

    async fn get_job(&self, job_id: &str) -> AnalyzerResult<Job> {
        *self.calls.lock().jobs.entry(job_id.to_string()).or_insert(0) += 1;
        let delay = self.job_delays.lock().get(job_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.jobs.lock().get_mut(job_id).and_then(Script::next);
        reply.map_or_else(
            || {
                Err(AnalyzerError::Api {
                    status: 404,
                    detail: format!("Job {job_id} not found"),
                })
            },
            |reply| reply.to_result(),
        )
    }

    async fn get_result(&self, job_id: &str) -> AnalyzerResult<Option<AnalysisResult>> {
        *self.calls.lock().results.entry(job_id.to_string()).or_insert(0) += 1;
        Ok(self.results.lock().get(job_id).cloned())
    }

    async fn list_jobs(&self, query: &JobListQuery) -> AnalyzerResult<JobPage> {
        self.calls.lock().lists += 1;
        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = self.pages.lock().next();
        reply.map_or_else(
            || Ok(JobPage::default()),
            |reply| {
                reply.to_result().map(|mut page| {
                    page.jobs.truncate(query.limit as usize);
                    page
                })
            },
        )
    }

    async fn check_health(&self) -> AnalyzerResult<HealthReport> {
        self.calls.lock().health += 1;
        let reply = self.health.lock().next();
        reply.map_or_else(
            || {
                Ok(HealthReport {
                    status: "healthy".to_string(),
                    ..Default::default()
                })
            },
            |reply| reply.to_result(),
        )
    }
}
