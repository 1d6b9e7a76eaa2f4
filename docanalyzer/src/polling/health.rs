//! Service health indicator.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::AnalyzerApi;
use crate::cancellation::{CancellationToken, PollHandle};
use crate::config::DashboardConfig;
use crate::core::HealthState;
use crate::events::{EventSink, NoOpEventSink, HEALTH_CHANGED};

/// One health check, reduced to the indicator state.
///
/// Any failure, including a body that does not decode, reads as offline.
pub async fn probe_health(api: &dyn AnalyzerApi) -> HealthState {
    match api.check_health().await {
        Ok(report) => HealthState::from_healthy(report.is_healthy()),
        Err(e) => {
            debug!(error = %e, "health check failed");
            HealthState::Offline
        }
    }
}

/// The indicator plus when it was last confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    /// Result of the latest check.
    pub state: HealthState,
    /// When the latest check settled.
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            state: HealthState::Checking,
            checked_at: None,
        }
    }
}

/// Checks service health on a fixed interval, independent of any job.
pub struct HealthMonitor {
    api: Arc<dyn AnalyzerApi>,
    interval: Duration,
    events: Arc<dyn EventSink>,
    state: Arc<watch::Sender<HealthStatus>>,
    handle: Option<PollHandle>,
}

impl HealthMonitor {
    /// Creates a stopped monitor in the `checking` state.
    #[must_use]
    pub fn new(api: Arc<dyn AnalyzerApi>, config: &DashboardConfig) -> Self {
        Self::with_interval(api, config.health_interval())
    }

    /// Creates a stopped monitor with an explicit interval.
    #[must_use]
    pub fn with_interval(api: Arc<dyn AnalyzerApi>, interval: Duration) -> Self {
        let (state, _) = watch::channel(HealthStatus::default());
        Self {
            api,
            interval,
            events: Arc::new(NoOpEventSink),
            state: Arc::new(state),
            handle: None,
        }
    }

    /// Routes indicator changes to an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Starts checking; the first check is immediate.
    ///
    /// Must be called inside a tokio runtime. Does nothing if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let api = self.api.clone();
        let events = self.events.clone();
        let state = self.state.clone();
        let interval = self.interval;
        self.handle = Some(PollHandle::spawn("health", move |token| {
            run_health(api, events, state, interval, token)
        }));
    }

    /// Stops checking; the last state stays visible.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel("health monitor stopped");
        }
    }

    /// The current indicator.
    #[must_use]
    pub fn state(&self) -> HealthState {
        self.state.borrow().state
    }

    /// The current indicator with its timestamp.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        *self.state.borrow()
    }

    /// Receives every completed check.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_health(
    api: Arc<dyn AnalyzerApi>,
    events: Arc<dyn EventSink>,
    state: Arc<watch::Sender<HealthStatus>>,
    interval: Duration,
    token: Arc<CancellationToken>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let health = tokio::select! {
            () = token.cancelled() => return,
            health = probe_health(api.as_ref()) => health,
        };

        let previous = state.borrow().state;
        state.send_replace(HealthStatus {
            state: health,
            checked_at: Some(Utc::now()),
        });
        if previous != health {
            info!(from = %previous, to = %health, "service health changed");
            events
                .emit(
                    HEALTH_CHANGED,
                    Some(serde_json::json!({ "from": previous, "to": health })),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HealthReport;
    use crate::errors::AnalyzerError;
    use crate::events::CollectingEventSink;
    use crate::api::MockAnalyzerApi;
    use crate::testing::ScriptedApi;
    use pretty_assertions::assert_eq;

    const TICK: Duration = Duration::from_secs(30);

    fn report(status: &str) -> HealthReport {
        HealthReport {
            status: status.to_string(),
            ..Default::default()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_probe_healthy() {
        let api = ScriptedApi::new();
        api.push_health(report("healthy"));
        assert_eq!(probe_health(&api).await, HealthState::Online);
    }

    #[tokio::test]
    async fn test_probe_degraded_is_offline() {
        let api = ScriptedApi::new();
        api.push_health(report("degraded"));
        assert_eq!(probe_health(&api).await, HealthState::Offline);
    }

    #[tokio::test]
    async fn test_probe_non_2xx_is_offline() {
        let api = ScriptedApi::new();
        api.push_health_error(503);
        assert_eq!(probe_health(&api).await, HealthState::Offline);
    }

    #[tokio::test]
    async fn test_probe_undecodable_is_offline() {
        let mut api = MockAnalyzerApi::new();
        api.expect_check_health().times(1).returning(|| {
            Err(AnalyzerError::Decode(
                serde_json::from_str::<HealthReport>("<html>").unwrap_err(),
            ))
        });
        assert_eq!(probe_health(&api).await, HealthState::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_checking() {
        let api = Arc::new(ScriptedApi::new());
        let monitor = HealthMonitor::with_interval(api, TICK);
        assert_eq!(monitor.state(), HealthState::Checking);
        assert_eq!(monitor.status().checked_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_latest_response() {
        let api = Arc::new(ScriptedApi::new());
        api.push_health(report("healthy"));
        api.push_health_error(500);
        api.push_health(report("healthy"));
        let sink = Arc::new(CollectingEventSink::new());

        let mut monitor = HealthMonitor::with_interval(api.clone(), TICK).with_events(sink.clone());
        monitor.start();
        settle().await;
        assert_eq!(monitor.state(), HealthState::Online);
        assert!(monitor.status().checked_at.is_some());

        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        assert_eq!(monitor.state(), HealthState::Offline);

        tokio::time::sleep(TICK).await;
        assert_eq!(monitor.state(), HealthState::Online);
        assert_eq!(api.health_calls(), 3);
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_state_emits_once() {
        let api = Arc::new(ScriptedApi::new());
        let sink = Arc::new(CollectingEventSink::new());

        let mut monitor = HealthMonitor::with_interval(api.clone(), TICK).with_events(sink.clone());
        monitor.start();
        tokio::time::sleep(TICK * 3 + Duration::from_millis(1)).await;

        assert_eq!(api.health_calls(), 4);
        assert_eq!(sink.event_types(), vec![HEALTH_CHANGED]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_last_state() {
        let api = Arc::new(ScriptedApi::new());
        let mut monitor = HealthMonitor::with_interval(api.clone(), TICK);
        monitor.start();
        settle().await;
        monitor.stop();

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(api.health_calls(), 1);
        assert_eq!(monitor.state(), HealthState::Online);
    }
}
