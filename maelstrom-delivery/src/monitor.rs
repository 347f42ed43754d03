//! Background refresh of provider health
//!
//! The monitor is either [`MonitorState::Running`] (a periodic task is
//! checking every provider) or [`MonitorState::Stopped`]. Health checks never
//! fail upward: an error or a check that outlives its timeout is recorded as
//! unhealthy and the next tick carries on.

use std::{sync::Arc, time::Duration};

use maelstrom_common::{Signal, internal, outgoing};
use parking_lot::Mutex;
use tokio::{sync::broadcast, task::JoinHandle, time::MissedTickBehavior};

use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Stopped,
}

#[derive(Debug)]
struct MonitorTask {
    shutdown: broadcast::Sender<Signal>,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct HealthMonitor {
    registry: Arc<Registry>,
    period: Duration,
    check_timeout: Duration,
    task: Mutex<Option<MonitorTask>>,
}

impl HealthMonitor {
    #[must_use]
    pub const fn new(registry: Arc<Registry>, period: Duration, check_timeout: Duration) -> Self {
        Self {
            registry,
            period,
            check_timeout,
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        match &*self.task.lock() {
            Some(task) if !task.handle.is_finished() => MonitorState::Running,
            _ => MonitorState::Stopped,
        }
    }

    /// Check every provider once, one after another, and record the results.
    ///
    /// Called directly at startup so the first request sees a real health
    /// snapshot, and by the periodic task on every tick.
    pub async fn check_all(&self) {
        check_all(&self.registry, self.check_timeout).await;
    }

    /// Spawn the periodic task.
    ///
    /// The first check happens one full period after this call; run
    /// [`check_all`](Self::check_all) beforehand to seed the registry. Does
    /// nothing if the monitor is already running.
    pub fn start(&self) {
        let mut task = self.task.lock();

        if task.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            tracing::debug!("Health monitor already running");
            return;
        }

        let (shutdown, mut signal) = broadcast::channel(1);
        let registry = Arc::clone(&self.registry);
        let period = self.period;
        let check_timeout = self.check_timeout;

        let handle = tokio::spawn(async move {
            internal!(
                level = INFO,
                "Health monitor started, checking every {}s",
                period.as_secs()
            );

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => check_all(&registry, check_timeout).await,
                    sig = signal.recv() => {
                        match sig {
                            Ok(Signal::Shutdown) => {
                                internal!(level = INFO, "Health monitor stopping");
                            }
                            Err(err) => {
                                tracing::error!("Health monitor shutdown channel error: {err}");
                            }
                        }
                        break;
                    }
                }
            }
        });

        *task = Some(MonitorTask { shutdown, handle });
    }

    /// Stop the periodic task and wait for it to exit.
    ///
    /// Once this returns no further health results are written. Calling it on
    /// a stopped monitor does nothing.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(MonitorTask { shutdown, handle }) = task else {
            return;
        };

        // The task may already have exited, leaving no receiver
        let _ = shutdown.send(Signal::Shutdown);

        if let Err(err) = handle.await {
            tracing::error!("Health monitor task failed: {err}");
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

async fn check_all(registry: &Registry, check_timeout: Duration) {
    for provider in registry.providers() {
        let name = provider.name();

        let healthy = match tokio::time::timeout(check_timeout, provider.health_check()).await {
            Ok(healthy) => healthy,
            Err(_) => {
                tracing::warn!(
                    provider = %name,
                    timeout_secs = check_timeout.as_secs(),
                    "Health check timed out"
                );
                false
            }
        };

        outgoing!("{name} is {}", if healthy { "healthy" } else { "unhealthy" });
        registry.set_health(name, healthy);
    }
}
