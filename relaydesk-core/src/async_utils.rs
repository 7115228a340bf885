//! Async utilities and patterns
//!
//! Timeouts and a cancellable repeating background task.

use crate::error::{ErrorContext, RelayDeskError, RelayDeskResult};
use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tracing::debug;

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(
    future: F,
    timeout_ms: u64,
    operation_name: &str,
) -> RelayDeskResult<T>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(RelayDeskError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase timeout duration")
                .with_suggestion("Check network connectivity"),
        }),
    }
}

/// A repeating background task that runs `tick` once per period until stopped.
///
/// The first tick fires one full period after spawning. Stopping is checked between
/// ticks only: a tick that is already running completes. Dropping the handle stops
/// the task as well.
pub struct PeriodicTask {
    name: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn the task on the current tokio runtime
    pub fn spawn<F, Fut>(name: &str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => tick().await,
                }
            }

            debug!(task = %task_name, "Periodic task stopped");
        });

        debug!(task = name, period_ms = period.as_millis() as u64, "Periodic task started");

        Self {
            name: name.to_string(),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the task to stop after the current tick, if any
    pub fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }

    /// True once the stop signal was sent or the task exited on its own
    pub fn is_stopped(&self) -> bool {
        self.shutdown_tx.is_none()
            || self
                .handle
                .as_ref()
                .map_or(true, |handle| handle.is_finished())
    }

    /// Stop and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
