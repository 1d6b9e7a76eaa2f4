//! Single-job poller.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::AnalyzerApi;
use crate::cancellation::{CancellationToken, PollHandle};
use crate::config::DashboardConfig;
use crate::core::{AnalysisResult, Job, JobStatus};
use crate::events::{
    EventSink, NoOpEventSink, JOB_COMPLETED, JOB_FAILED, JOB_POLL_ERROR, JOB_RESULT_READY,
    JOB_STATUS_CHANGED, JOB_TRACKING_STARTED,
};
use crate::stages::{derive_pipeline, PipelineView};

/// What the detail view shows for the tracked job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPollState {
    /// The tracked identifier.
    pub job_id: Option<String>,
    /// Latest snapshot, `None` until the first fetch resolves.
    pub job: Option<Job>,
    /// Result payload, fetched once after completion.
    pub result: Option<AnalysisResult>,
    /// Error that stopped polling.
    pub error: Option<String>,
    /// Whether the poll task is still running. A completed job keeps this
    /// set until its result fetch settles.
    pub is_polling: bool,
    generation: u64,
}

impl JobPollState {
    /// State for a job whose first fetch has not resolved yet.
    #[must_use]
    pub fn tracking(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            is_polling: true,
            ..Self::default()
        }
    }

    /// Identifier change counter this state belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Stage states for the current snapshot.
    #[must_use]
    pub fn pipeline(&self) -> Option<PipelineView> {
        self.job
            .as_ref()
            .map(|job| derive_pipeline(job.status, self.result.as_ref()))
    }
}

/// Writes state for one generation; writes from an older one are dropped.
#[derive(Clone)]
struct Publisher {
    state: Arc<watch::Sender<JobPollState>>,
    generation: u64,
}

impl Publisher {
    fn update(&self, f: impl FnOnce(&mut JobPollState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation != self.generation {
                return false;
            }
            f(state);
            true
        })
    }
}

/// Polls one job until it reaches a terminal state.
///
/// Pointing the poller at another job cancels the running task and resets
/// the visible state in one step. Dropping the poller cancels its task.
pub struct JobPoller {
    api: Arc<dyn AnalyzerApi>,
    interval: Duration,
    events: Arc<dyn EventSink>,
    state: Arc<watch::Sender<JobPollState>>,
    generation: u64,
    handle: Option<PollHandle>,
}

impl JobPoller {
    /// Creates an idle poller.
    #[must_use]
    pub fn new(api: Arc<dyn AnalyzerApi>, config: &DashboardConfig) -> Self {
        Self::with_interval(api, config.job_poll_interval())
    }

    /// Creates an idle poller with an explicit interval.
    #[must_use]
    pub fn with_interval(api: Arc<dyn AnalyzerApi>, interval: Duration) -> Self {
        let (state, _) = watch::channel(JobPollState::default());
        Self {
            api,
            interval,
            events: Arc::new(NoOpEventSink),
            state: Arc::new(state),
            generation: 0,
            handle: None,
        }
    }

    /// Routes transitions to an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The tracked identifier.
    #[must_use]
    pub fn job_id(&self) -> Option<String> {
        self.state.borrow().job_id.clone()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn state(&self) -> JobPollState {
        self.state.borrow().clone()
    }

    /// Receives every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobPollState> {
        self.state.subscribe()
    }

    /// Tracks a new job, or nothing.
    ///
    /// Must be called inside a tokio runtime when `job_id` is `Some`.
    /// Setting the identifier already tracked does nothing.
    pub fn set_job(&mut self, job_id: Option<String>) {
        let job_id = job_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if job_id == self.state.borrow().job_id {
            return;
        }
        self.track(job_id);
    }

    /// Polls the tracked job again from scratch.
    ///
    /// Used to recover after a fetch error stopped polling.
    pub fn restart(&mut self) {
        let job_id = self.job_id();
        if job_id.is_some() {
            self.track(job_id);
        }
    }

    /// Stops polling; the last state stays visible.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel("job poller stopped");
        }
        let publisher = self.publisher();
        publisher.update(|state| state.is_polling = false);
    }

    /// Whether a poll task is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.state.borrow().is_polling
    }

    fn publisher(&self) -> Publisher {
        Publisher {
            state: self.state.clone(),
            generation: self.generation,
        }
    }

    fn track(&mut self, job_id: Option<String>) {
        // Release the old task before the new state becomes visible.
        self.handle = None;
        self.generation += 1;
        self.state.send_replace(JobPollState {
            job_id: job_id.clone(),
            is_polling: job_id.is_some(),
            generation: self.generation,
            ..Default::default()
        });

        let Some(job_id) = job_id else {
            debug!("job poller cleared");
            return;
        };

        self.events.try_emit(
            JOB_TRACKING_STARTED,
            Some(serde_json::json!({ "job_id": job_id, "generation": self.generation })),
        );
        let task = JobPollTask {
            api: self.api.clone(),
            events: self.events.clone(),
            interval: self.interval,
            job_id: job_id.clone(),
            publisher: self.publisher(),
        };
        self.handle = Some(PollHandle::spawn(format!("job:{job_id}"), move |token| {
            task.run(token)
        }));
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("interval", &self.interval)
            .field("generation", &self.generation)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

struct JobPollTask {
    api: Arc<dyn AnalyzerApi>,
    events: Arc<dyn EventSink>,
    interval: Duration,
    job_id: String,
    publisher: Publisher,
}

impl JobPollTask {
    async fn run(self, token: Arc<CancellationToken>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<JobStatus> = None;

        loop {
            tokio::select! {
                () = token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            debug!(job_id = %self.job_id, "polling job status");
            let fetched = tokio::select! {
                () = token.cancelled() => return,
                fetched = self.api.get_job(&self.job_id) => fetched,
            };

            let job = match fetched {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %self.job_id, error = %e, "job poll failed, polling stopped");
                    let message = e.user_message();
                    if self.publisher.update(|state| {
                        state.error = Some(message.clone());
                        state.is_polling = false;
                    }) {
                        self.emit(JOB_POLL_ERROR, serde_json::json!({ "error": message })).await;
                    }
                    return;
                }
            };

            let status = job.status;
            let applied = self.publisher.update(|state| {
                state.job = Some(job);
                if status == JobStatus::Failed {
                    state.is_polling = false;
                }
            });
            if !applied {
                return;
            }
            if last_status != Some(status) {
                self.emit(JOB_STATUS_CHANGED, serde_json::json!({ "status": status })).await;
                last_status = Some(status);
            }

            match status {
                JobStatus::Completed => {
                    info!(job_id = %self.job_id, "job completed");
                    self.emit(JOB_COMPLETED, serde_json::json!({})).await;
                    self.fetch_result(&token).await;
                    return;
                }
                JobStatus::Failed => {
                    info!(job_id = %self.job_id, "job failed");
                    self.emit(JOB_FAILED, serde_json::json!({})).await;
                    return;
                }
                _ => {}
            }
        }
    }

    async fn fetch_result(&self, token: &CancellationToken) {
        let fetched = tokio::select! {
            () = token.cancelled() => return,
            fetched = self.api.get_result(&self.job_id) => fetched,
        };
        match fetched {
            Ok(Some(result)) => {
                let stages = result.agent_outputs.len();
                if self.publisher.update(|state| {
                    state.result = Some(result);
                    state.is_polling = false;
                }) {
                    self.emit(JOB_RESULT_READY, serde_json::json!({ "outputs": stages })).await;
                }
            }
            Ok(None) => {
                debug!(job_id = %self.job_id, "result not available for completed job");
                self.publisher.update(|state| state.is_polling = false);
            }
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "result fetch failed");
                let message = e.user_message();
                if self.publisher.update(|state| {
                    state.error = Some(message.clone());
                    state.is_polling = false;
                }) {
                    self.emit(JOB_POLL_ERROR, serde_json::json!({ "error": message })).await;
                }
            }
        }
    }

    async fn emit(&self, event_type: &str, mut data: serde_json::Value) {
        if let Some(map) = data.as_object_mut() {
            map.insert("job_id".to_string(), serde_json::json!(self.job_id));
        }
        self.events.emit(event_type, Some(data)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::{completed_result, processing_result, ScriptedApi};
    use pretty_assertions::assert_eq;

    const TICK: Duration = Duration::from_millis(2_500);

    fn poller(api: &Arc<ScriptedApi>) -> JobPoller {
        JobPoller::with_interval(api.clone(), TICK)
    }

    async fn settle() {
        // Lets spawned tasks run without moving the paused clock.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed_then_fetches_result_once() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Pending));
        api.push_job(Job::new("a", JobStatus::Processing));
        api.push_job(Job::new("a", JobStatus::Completed).with_result("Hold."));
        api.set_result("a", completed_result("a"));

        let mut poller = poller(&api);
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));

        let state = rx
            .wait_for(|s| s.result.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.job.as_ref().map(|j| j.status), Some(JobStatus::Completed));
        assert!(!state.is_polling);
        assert_eq!(state.error, None);
        assert_eq!(api.job_calls("a"), 3);
        assert_eq!(api.result_calls("a"), 1);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(api.job_calls("a"), 3);
        assert_eq!(api.result_calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        assert_eq!(api.job_calls("a"), 1);
        assert!(poller.state().job.is_some());

        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        assert_eq!(api.job_calls("a"), 2);
        assert!(poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_stops_without_result_fetch() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Failed).with_error("Not a financial document"));

        let mut poller = poller(&api);
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));
        rx.wait_for(|s| !s.is_polling && s.job.is_some()).await.unwrap();

        tokio::time::sleep(TICK * 4).await;
        assert_eq!(api.job_calls("a"), 1);
        assert_eq!(api.result_calls("a"), 0);

        let pipeline = poller.state().pipeline().unwrap();
        assert!(pipeline.progress_percent.abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_stops_polling() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));
        api.push_job_error("a", 500, "database unavailable");

        let mut poller = poller(&api);
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));

        let state = rx.wait_for(|s| s.error.is_some()).await.unwrap().clone();
        assert_eq!(state.error.as_deref(), Some("database unavailable"));
        assert!(!state.is_polling);
        assert_eq!(state.job.map(|j| j.status), Some(JobStatus::Processing));

        tokio::time::sleep(TICK * 4).await;
        assert_eq!(api.job_calls("a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_error() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job_error("a", 503, "busy");
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));
        rx.wait_for(|s| s.error.is_some()).await.unwrap();

        poller.restart();
        assert_eq!(poller.state().error, None);
        rx.wait_for(|s| s.job.is_some()).await.unwrap();
        assert!(poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_result_leaves_result_empty() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Completed));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;

        let state = poller.state();
        assert_eq!(api.result_calls("a"), 1);
        assert_eq!(state.result, None);
        assert_eq!(state.error, None);
        assert!(!state.is_polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_resets_state_immediately() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Completed));
        api.set_result("a", completed_result("a"));
        api.push_job(Job::new("b", JobStatus::Processing));
        api.set_job_delay("b", Duration::from_secs(1));

        let mut poller = poller(&api);
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));
        rx.wait_for(|s| s.result.is_some()).await.unwrap();

        poller.set_job(Some("b".to_string()));
        let state = poller.state();
        assert_eq!(state.job_id.as_deref(), Some("b"));
        assert_eq!(state.job, None);
        assert_eq!(state.result, None);
        assert!(state.is_polling);
    }

    #[test]
    fn test_tracking_state_before_first_fetch() {
        let state = JobPollState::tracking("a");
        assert_eq!(state.job_id.as_deref(), Some("a"));
        assert!(state.is_polling);
        assert_eq!(state.generation(), 0);
        assert_eq!(state.pipeline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_fetch_for_previous_job_is_ignored() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing).with_query("slow job"));
        api.set_job_delay("a", Duration::from_secs(10));
        api.push_job(Job::new("b", JobStatus::Pending).with_query("fast job"));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        assert_eq!(api.job_calls("a"), 1);

        poller.set_job(Some("b".to_string()));
        tokio::time::sleep(Duration::from_secs(30)).await;

        let state = poller.state();
        assert_eq!(state.job_id.as_deref(), Some("b"));
        let job = state.job.unwrap();
        assert_eq!(job.job_id, "b");
        assert_eq!(job.query_text(), "fast job");
        assert_eq!(api.job_calls("a"), 1);
    }

    #[tokio::test]
    async fn test_stale_publisher_cannot_write() {
        let api = Arc::new(ScriptedApi::new());
        let mut poller = poller(&api);
        let stale = poller.publisher();

        poller.set_job(None);
        poller.generation += 1;
        poller.state.send_replace(JobPollState {
            job_id: Some("b".to_string()),
            generation: poller.generation,
            ..Default::default()
        });

        let applied = stale.update(|state| state.job = Some(Job::new("a", JobStatus::Completed)));
        assert!(!applied);
        assert_eq!(poller.state().job, None);
        assert!(poller.publisher().update(|state| state.error = Some("x".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_selection() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        poller.set_job(None);

        assert_eq!(poller.state(), JobPollState { generation: 2, ..Default::default() });
        tokio::time::sleep(TICK * 4).await;
        assert_eq!(api.job_calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_id_is_noop() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        let generation = poller.state().generation();
        poller.set_job(Some(" a ".to_string()));
        assert_eq!(poller.state().generation(), generation);
        assert!(poller.state().job.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_polling() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        drop(poller);

        tokio::time::sleep(TICK * 4).await;
        assert_eq!(api.job_calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_last_state() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;
        poller.stop();

        assert!(!poller.is_polling());
        assert!(poller.state().job.is_some());
        tokio::time::sleep(TICK * 4).await;
        assert_eq!(api.job_calls("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_follows_partial_results() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));

        let mut poller = poller(&api);
        poller.set_job(Some("a".to_string()));
        settle().await;

        let mut state = poller.state();
        state.result = Some(processing_result(2));
        let pipeline = state.pipeline().unwrap();
        assert!((pipeline.progress_percent - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_transitions() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Processing));
        api.push_job(Job::new("a", JobStatus::Processing));
        api.push_job(Job::new("a", JobStatus::Completed));
        api.set_result("a", completed_result("a"));
        let sink = Arc::new(CollectingEventSink::new());

        let mut poller = poller(&api).with_events(sink.clone());
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));
        rx.wait_for(|s| s.result.is_some()).await.unwrap();
        settle().await;

        assert_eq!(
            sink.event_types(),
            vec![
                JOB_TRACKING_STARTED,
                JOB_STATUS_CHANGED,
                JOB_STATUS_CHANGED,
                JOB_COMPLETED,
                JOB_RESULT_READY,
            ]
        );
    }

    #[derive(Default)]
    struct PathSink {
        seen: parking_lot::Mutex<Vec<(&'static str, String)>>,
    }

    #[async_trait::async_trait]
    impl EventSink for PathSink {
        async fn emit(&self, event_type: &str, _data: Option<serde_json::Value>) {
            self.seen.lock().push(("async", event_type.to_string()));
        }

        fn try_emit(&self, event_type: &str, _data: Option<serde_json::Value>) {
            self.seen.lock().push(("sync", event_type.to_string()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_task_awaits_sink() {
        let api = Arc::new(ScriptedApi::new());
        api.push_job(Job::new("a", JobStatus::Failed));
        let sink = Arc::new(PathSink::default());

        let mut poller = poller(&api).with_events(sink.clone());
        let mut rx = poller.subscribe();
        poller.set_job(Some("a".to_string()));
        rx.wait_for(|s| !s.is_polling).await.unwrap();
        settle().await;

        let seen = sink.seen.lock().clone();
        assert_eq!(
            seen,
            vec![
                ("sync", JOB_TRACKING_STARTED.to_string()),
                ("async", JOB_STATUS_CHANGED.to_string()),
                ("async", JOB_FAILED.to_string()),
            ]
        );
    }
}
