//! The assembled dashboard: roster, detail, health and upload drawer.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::api::AnalyzerApi;
use crate::config::DashboardConfig;
use crate::core::{HealthState, SubmittedJob};
use crate::errors::AnalyzerResult;
use crate::events::EventSink;
use crate::polling::{
    HealthMonitor, HealthStatus, JobListPoller, JobListState, JobPollState, JobPoller,
};
use crate::upload::{UploadForm, UploadLimits};
use crate::views;

/// Owns every poller plus the selection and drawer state.
///
/// At most three poll tasks run at a time, one per poller; all of them stop
/// when the dashboard is dropped.
pub struct Dashboard {
    api: Arc<dyn AnalyzerApi>,
    jobs: JobListPoller,
    job: JobPoller,
    health: HealthMonitor,
    upload: UploadForm,
    jobs_rx: watch::Receiver<JobListState>,
    job_rx: watch::Receiver<JobPollState>,
    health_rx: watch::Receiver<HealthStatus>,
}

impl Dashboard {
    /// Builds a dashboard; nothing polls until [`start`](Self::start).
    #[must_use]
    pub fn new(api: Arc<dyn AnalyzerApi>, config: &DashboardConfig) -> Self {
        let jobs = JobListPoller::new(api.clone(), config);
        let job = JobPoller::new(api.clone(), config);
        let health = HealthMonitor::new(api.clone(), config);
        let jobs_rx = jobs.subscribe();
        let job_rx = job.subscribe();
        let health_rx = health.subscribe();
        Self {
            api,
            jobs,
            job,
            health,
            upload: UploadForm::new(UploadLimits::from_config(config)),
            jobs_rx,
            job_rx,
            health_rx,
        }
    }

    /// Routes every component's events to one sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.jobs = self.jobs.with_events(events.clone());
        self.job = self.job.with_events(events.clone());
        self.health = self.health.with_events(events.clone());
        self.upload = self.upload.with_events(events);
        self
    }

    /// Starts the roster and health pollers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        self.jobs.start();
        self.health.start();
    }

    /// Stops every poller; the last state stays visible.
    pub fn stop(&mut self) {
        self.jobs.stop();
        self.job.stop();
        self.health.stop();
    }

    /// Shows a job in the detail pane and collapses the drawer.
    pub fn select_job(&mut self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        debug!(job_id = %job_id, "job selected");
        self.job.set_job(Some(job_id));
        self.upload.collapse();
    }

    /// Empties the detail pane.
    pub fn clear_selection(&mut self) {
        self.job.set_job(None);
    }

    /// The job shown in the detail pane.
    #[must_use]
    pub fn selected_job(&self) -> Option<String> {
        self.job.job_id()
    }

    /// Requests a roster refresh.
    pub fn refresh_jobs(&self) {
        self.jobs.refetch();
    }

    /// Polls the selected job again after an error stopped it.
    pub fn retry_job(&mut self) {
        self.job.restart();
    }

    /// The upload drawer.
    #[must_use]
    pub const fn upload(&self) -> &UploadForm {
        &self.upload
    }

    /// The upload drawer, for editing.
    pub fn upload_mut(&mut self) -> &mut UploadForm {
        &mut self.upload
    }

    /// Submits the upload form.
    ///
    /// On success the roster is refreshed and the new job selected.
    pub async fn submit(&mut self) -> AnalyzerResult<SubmittedJob> {
        let job = self.upload.submit(self.api.as_ref()).await?;
        self.jobs.refetch();
        self.select_job(job.job_id.clone());
        Ok(job)
    }

    /// Current roster.
    #[must_use]
    pub fn job_list(&self) -> JobListState {
        self.jobs.state()
    }

    /// Current detail state.
    #[must_use]
    pub fn job_detail(&self) -> JobPollState {
        self.job.state()
    }

    /// Current health indicator.
    #[must_use]
    pub fn health(&self) -> HealthState {
        self.health.state()
    }

    /// Resolves when any poller publishes new state.
    pub async fn changed(&mut self) {
        tokio::select! {
            _ = self.jobs_rx.changed() => {}
            _ = self.job_rx.changed() => {}
            _ = self.health_rx.changed() => {}
        }
    }

    /// Renders every pane.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_at(Utc::now())
    }

    /// Renders every pane with ages measured from `now`.
    #[must_use]
    pub fn render_at(&self, now: DateTime<Utc>) -> String {
        let selected = self.selected_job();
        [
            views::render_header(self.health()),
            views::render_upload(&self.upload),
            views::render_job_list(&self.job_list(), selected.as_deref(), now),
            views::render_job_detail(&self.job_detail(), now),
        ]
        .join("\n\n")
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("jobs", &self.jobs)
            .field("job", &self.job)
            .field("health", &self.health)
            .field("upload", &self.upload)
            .finish_non_exhaustive()
    }
}
