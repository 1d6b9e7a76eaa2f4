//! Owned handle for a spawned poll task.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::CancellationToken;

/// Owns one poll task and its cancellation token.
///
/// The task is cancelled when the handle is dropped, so a poller that goes
/// away, or replaces its handle, never leaves a timer running behind it.
pub struct PollHandle {
    name: String,
    token: Arc<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawns `task` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(Arc<CancellationToken>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let token = Arc::new(CancellationToken::new());
        let handle = tokio::spawn(task(token.clone()));
        debug!(poller = %name, "poll task started");
        Self {
            name,
            token,
            task: Some(handle),
        }
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task's cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Requests cancellation; the task exits at its next await point.
    pub fn cancel(&self, reason: &str) {
        self.token.cancel(reason);
    }

    /// Whether the task has run to completion.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the task to exit on its own.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel("poll handle released");
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(poller = %self.name, "poll task released");
        }
    }
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("name", &self.name)
            .field("cancelled", &self.token.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
