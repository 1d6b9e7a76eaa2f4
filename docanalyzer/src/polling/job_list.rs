//! Roster poller.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::{AnalyzerApi, JobListQuery};
use crate::cancellation::{CancellationToken, PollHandle};
use crate::config::DashboardConfig;
use crate::core::Job;
use crate::events::{EventSink, NoOpEventSink, JOB_LIST_ERROR, JOB_LIST_REFRESHED};

/// The roster as the list view sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobListState {
    /// Jobs in the order the service returned them.
    pub jobs: Vec<Job>,
    /// Total jobs known to the service.
    pub total: u64,
    /// True until the first fetch settles.
    pub loading: bool,
    /// Error from the latest fetch; cleared by the next success.
    pub error: Option<String>,
    /// When the roster was last replaced.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Default for JobListState {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            total: 0,
            loading: true,
            error: None,
            refreshed_at: None,
        }
    }
}

/// Keeps the roster fresh on a fixed interval.
///
/// Fetch errors are recorded and the timer keeps running.
pub struct JobListPoller {
    api: Arc<dyn AnalyzerApi>,
    interval: Duration,
    query: JobListQuery,
    events: Arc<dyn EventSink>,
    state: Arc<watch::Sender<JobListState>>,
    refetch: Arc<Notify>,
    handle: Option<PollHandle>,
}

impl JobListPoller {
    /// Creates a stopped poller.
    #[must_use]
    pub fn new(api: Arc<dyn AnalyzerApi>, config: &DashboardConfig) -> Self {
        Self::with_interval(api, config.list_refresh_interval())
            .with_query(JobListQuery::with_limit(config.list_limit))
    }

    /// Creates a stopped poller with an explicit interval.
    #[must_use]
    pub fn with_interval(api: Arc<dyn AnalyzerApi>, interval: Duration) -> Self {
        let (state, _) = watch::channel(JobListState::default());
        Self {
            api,
            interval,
            query: JobListQuery::default(),
            events: Arc::new(NoOpEventSink),
            state: Arc::new(state),
            refetch: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Sets the roster query.
    #[must_use]
    pub fn with_query(mut self, query: JobListQuery) -> Self {
        self.query = query;
        self
    }

    /// Routes refreshes and errors to an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Starts polling; the first fetch is immediate.
    ///
    /// Must be called inside a tokio runtime. Does nothing if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        // A permit left over from an earlier run would cause a second fetch
        // right after the immediate one.
        self.refetch = Arc::new(Notify::new());
        let task = JobListTask {
            api: self.api.clone(),
            events: self.events.clone(),
            interval: self.interval,
            query: self.query.clone(),
            state: self.state.clone(),
            refetch: self.refetch.clone(),
        };
        self.handle = Some(PollHandle::spawn("job-list", move |token| task.run(token)));
    }

    /// Requests an out-of-band fetch without resetting the timer.
    ///
    /// A request made while a fetch is in flight runs once that fetch ends.
    /// Does nothing while the poller is stopped.
    pub fn refetch(&self) {
        if self.handle.is_some() {
            self.refetch.notify_one();
        }
    }

    /// Stops polling.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel("job list poller stopped");
        }
    }

    /// Whether the poll task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// A copy of the current roster.
    #[must_use]
    pub fn state(&self) -> JobListState {
        self.state.borrow().clone()
    }

    /// Receives every roster change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobListState> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for JobListPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobListPoller")
            .field("interval", &self.interval)
            .field("query", &self.query)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

struct JobListTask {
    api: Arc<dyn AnalyzerApi>,
    events: Arc<dyn EventSink>,
    interval: Duration,
    query: JobListQuery,
    state: Arc<watch::Sender<JobListState>>,
    refetch: Arc<Notify>,
}

impl JobListTask {
    async fn run(self, token: Arc<CancellationToken>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => return,
                _ = ticker.tick() => {}
                () = self.refetch.notified() => debug!("roster refetch requested"),
            }

            let fetched = tokio::select! {
                () = token.cancelled() => return,
                fetched = self.api.list_jobs(&self.query) => fetched,
            };

            match fetched {
                Ok(page) => {
                    let count = page.jobs.len();
                    let total = page.total;
                    self.state.send_modify(|state| {
                        state.jobs = page.jobs;
                        state.total = total;
                        state.loading = false;
                        state.error = None;
                        state.refreshed_at = Some(Utc::now());
                    });
                    self.events
                        .emit(
                            JOB_LIST_REFRESHED,
                            Some(serde_json::json!({ "count": count, "total": total })),
                        )
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "roster fetch failed");
                    let message = e.user_message();
                    self.state.send_modify(|state| {
                        state.loading = false;
                        state.error = Some(message.clone());
                    });
                    self.events
                        .emit(JOB_LIST_ERROR, Some(serde_json::json!({ "error": message })))
                        .await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobStatus;
    use crate::events::CollectingEventSink;
    use crate::testing::{job_page, ScriptedApi};
    use pretty_assertions::assert_eq;

    const TICK: Duration = Duration::from_millis(5_000);

    fn jobs(ids: &[&str]) -> Vec<Job> {
        ids.iter().map(|id| Job::new(*id, JobStatus::Pending)).collect()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_loading() {
        let api = Arc::new(ScriptedApi::new());
        let poller = JobListPoller::with_interval(api, TICK);
        let state = poller.state();
        assert!(state.loading);
        assert!(state.jobs.is_empty());
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_and_on_interval() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page(job_page(jobs(&["a", "b"])));
        api.push_page(job_page(jobs(&["c", "a", "b"])));

        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        poller.start();
        settle().await;

        let state = poller.state();
        assert!(!state.loading);
        assert_eq!(state.total, 2);
        assert!(state.refreshed_at.is_some());
        assert_eq!(api.list_calls(), 1);

        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        let ids: Vec<String> = poller.state().jobs.into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_keeps_polling_and_clears_on_success() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page(job_page(jobs(&["a"])));
        api.push_page_error(500, "database unavailable");
        api.push_page(job_page(jobs(&["a", "b"])));

        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        let mut rx = poller.subscribe();
        poller.start();

        let state = rx.wait_for(|s| s.error.is_some()).await.unwrap().clone();
        assert_eq!(state.error.as_deref(), Some("database unavailable"));
        assert_eq!(state.jobs.len(), 1);

        let state = rx
            .wait_for(|s| s.error.is_none() && s.jobs.len() == 2)
            .await
            .unwrap()
            .clone();
        assert!(!state.loading);
        assert_eq!(api.list_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_error_ends_loading() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page_error(502, "bad gateway");

        let mut poller = JobListPoller::with_interval(api, TICK);
        poller.start();
        settle().await;

        let state = poller.state();
        assert!(!state.loading);
        assert!(state.jobs.is_empty());
        assert_eq!(state.error.as_deref(), Some("bad gateway"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_does_not_wait_for_timer() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page(job_page(jobs(&["a"])));
        api.push_page(job_page(jobs(&["new", "a"])));

        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        poller.start();
        settle().await;
        assert_eq!(api.list_calls(), 1);

        poller.refetch();
        settle().await;
        assert_eq!(api.list_calls(), 2);
        assert_eq!(poller.state().jobs[0].job_id, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_during_fetch_runs_after_it() {
        let api = Arc::new(ScriptedApi::new());
        api.set_list_delay(Duration::from_millis(200));

        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        poller.start();
        settle().await;
        assert_eq!(api.list_calls(), 1);

        poller.refetch();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_while_stopped_is_dropped() {
        let api = Arc::new(ScriptedApi::new());
        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        poller.refetch();
        poller.start();
        settle().await;
        assert_eq!(api.list_calls(), 1);

        tokio::time::sleep(TICK / 2).await;
        assert_eq!(api.list_calls(), 1);

        poller.stop();
        poller.refetch();
        poller.start();
        settle().await;
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_is_sent() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page(job_page(jobs(&["a", "b", "c"])));

        let mut poller = JobListPoller::with_interval(api, TICK)
            .with_query(JobListQuery::with_limit(2));
        poller.start();
        settle().await;
        assert_eq!(poller.state().jobs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_polling() {
        let api = Arc::new(ScriptedApi::new());
        let mut poller = JobListPoller::with_interval(api.clone(), TICK);
        poller.start();
        poller.start();
        settle().await;
        assert!(poller.is_running());

        poller.stop();
        tokio::time::sleep(TICK * 3).await;
        assert_eq!(api.list_calls(), 1);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_refresh_and_error_events() {
        let api = Arc::new(ScriptedApi::new());
        api.push_page(job_page(jobs(&["a"])));
        api.push_page_error(500, "boom");
        let sink = Arc::new(CollectingEventSink::new());

        let mut poller = JobListPoller::with_interval(api, TICK).with_events(sink.clone());
        poller.start();
        settle().await;
        tokio::time::sleep(TICK + Duration::from_millis(1)).await;

        assert_eq!(sink.event_types(), vec![JOB_LIST_REFRESHED, JOB_LIST_ERROR]);
    }
}
