//! Warm-up then fixed-interval task scheduling.
//!
//! A [`TaskScheduler`] waits out a task's initial delay, fires once, then
//! fires on every recurring interval until its [`ShutdownSignal`] trips.
//! Each firing is dispatched onto its own Tokio task and never awaited, so a
//! slow job cannot hold back the next tick. Shutdown stops future ticks but
//! leaves in-flight jobs running to completion.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Shortest warm-up delay handed to a scheduler.
pub const MIN_INITIAL_DELAY: Duration = Duration::from_secs(5);
/// Recurring interval once a scheduler is steady.
pub const STEADY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Work fired on every tick.
pub type ScheduledJob = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A named task with its warm-up delay and recurring interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    name: String,
    initial_delay: Duration,
    interval: Duration,
}

impl ScheduledTask {
    /// Describe a task. A zero interval is raised to one millisecond.
    #[must_use]
    pub fn new(name: impl Into<String>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            name: name.into(),
            initial_delay,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Task name used in log lines.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait before the first fire.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Wait between later fires.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting out the initial delay; the first fire has not happened.
    Warming { initial_delay: Duration },
    /// Firing on every interval.
    Steady { interval: Duration },
}

impl SchedulerState {
    /// Time to wait before the next fire.
    #[must_use]
    pub const fn delay(self) -> Duration {
        match self {
            Self::Warming { initial_delay } => initial_delay,
            Self::Steady { interval } => interval,
        }
    }

    /// State after a fire. Both states move to `Steady`.
    #[must_use]
    pub const fn after_fire(self, interval: Duration) -> Self {
        match self {
            Self::Warming { .. } | Self::Steady { .. } => Self::Steady { interval },
        }
    }
}

/// Sending half of a shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    /// Ask every subscribed scheduler to stop.
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}

/// Receiving half of a shutdown signal. Cloning subscribes another listener.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Create a connected trigger and signal.
    #[must_use]
    pub fn new() -> (ShutdownTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownTrigger(sender), Self(receiver))
    }

    /// True once shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once shutdown is requested or the trigger is dropped.
    pub async fn cancelled(&mut self) {
        // An error means the trigger is gone, which is treated as shutdown.
        let _ = self.0.wait_for(|triggered| *triggered).await;
    }
}

/// Spawns scheduler loops.
pub struct TaskScheduler;

impl TaskScheduler {
    /// Run `task` until `shutdown` trips, firing `job` on each tick.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use pulse_backend::domain::scheduler::{
    ///     ScheduledJob, ScheduledTask, ShutdownSignal, TaskScheduler,
    /// };
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (trigger, signal) = ShutdownSignal::new();
    /// let job: ScheduledJob = Arc::new(|| Box::pin(async {}));
    /// let task = ScheduledTask::new("cpi", Duration::from_secs(5), Duration::from_secs(60));
    /// let handle = TaskScheduler::spawn(task, signal, job);
    /// trigger.trigger();
    /// handle.await.expect("scheduler exits cleanly");
    /// # }
    /// ```
    pub fn spawn(task: ScheduledTask, mut shutdown: ShutdownSignal, job: ScheduledJob) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut state = SchedulerState::Warming {
                initial_delay: task.initial_delay,
            };
            let mut deadline = Instant::now() + state.delay();
            info!(task = %task.name, delay_secs = state.delay().as_secs(), "scheduler warming");

            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => {
                        info!(task = %task.name, "scheduler stopped");
                        break;
                    }
                    () = sleep_until(deadline) => {}
                }

                debug!(task = %task.name, state = ?state, "scheduler firing");
                let firing = tokio::spawn(job());
                let name = task.name.clone();
                tokio::spawn(async move {
                    if let Err(error) = firing.await {
                        warn!(task = %name, error = %error, "scheduled job aborted");
                    }
                });

                state = state.after_fire(task.interval);
                // Anchored on the actual fire time: a stalled loop skips the
                // missed ticks instead of firing them back to back.
                deadline = Instant::now() + state.delay();
            }
        })
    }
}

/// Wait for Ctrl-C or SIGTERM, then trip `trigger`.
///
/// # Errors
///
/// Returns the I/O error raised while installing a signal handler.
pub async fn shutdown_on_os_signal(trigger: ShutdownTrigger) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("received Ctrl-C, shutting down");
            }
            _ = terminate.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl-C, shutting down");
    }
    trigger.trigger();
    Ok(())
}

#[cfg(test)]
mod tests;
