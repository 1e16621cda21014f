//! Timing tests for the scheduler loop on a paused Tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rstest::rstest;
use tokio::time::sleep;

use super::*;

const HOUR: Duration = Duration::from_secs(60 * 60);

fn counting_job(counter: &Arc<AtomicUsize>) -> ScheduledJob {
    let counter = Arc::clone(counter);
    Arc::new(move || {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    })
}

fn daily_task() -> ScheduledTask {
    ScheduledTask::new("cpi", MIN_INITIAL_DELAY, STEADY_INTERVAL)
}

#[tokio::test(start_paused = true)]
async fn fires_after_warm_up_then_once_per_interval() {
    let fires = Arc::new(AtomicUsize::new(0));
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, counting_job(&fires));

    sleep(Duration::from_secs(4)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 1);

    sleep(STEADY_INTERVAL - Duration::from_secs(2)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 1, "never twice within one interval");

    sleep(Duration::from_secs(2)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 2);

    trigger.trigger();
    handle.await.expect("scheduler exits");
}

#[tokio::test(start_paused = true)]
async fn a_stalled_loop_does_not_catch_up_missed_ticks() {
    let fires = Arc::new(AtomicUsize::new(0));
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, counting_job(&fires));
    tokio::task::yield_now().await;

    tokio::time::advance(MIN_INITIAL_DELAY + STEADY_INTERVAL * 3).await;
    sleep(Duration::from_millis(1)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 1, "missed ticks are skipped");

    sleep(STEADY_INTERVAL - Duration::from_secs(1)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 2);

    trigger.trigger();
    handle.await.expect("scheduler exits");
}

#[tokio::test(start_paused = true)]
async fn no_fires_after_shutdown() {
    let fires = Arc::new(AtomicUsize::new(0));
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, counting_job(&fires));

    sleep(Duration::from_secs(6)).await;
    trigger.trigger();
    handle.await.expect("scheduler exits");

    sleep(STEADY_INTERVAL * 3).await;
    assert_eq!(fires.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_warm_up_never_fires() {
    let fires = Arc::new(AtomicUsize::new(0));
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, counting_job(&fires));

    trigger.trigger();
    handle.await.expect("scheduler exits");

    sleep(Duration::from_secs(10)).await;
    assert_eq!(fires.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_job_does_not_delay_next_tick() {
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let job: ScheduledJob = {
        let started = Arc::clone(&started);
        let finished = Arc::clone(&finished);
        Arc::new(move || {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            Box::pin(async move {
                started.fetch_add(1, Ordering::SeqCst);
                sleep(HOUR * 36).await;
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
    };
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, job);

    sleep(MIN_INITIAL_DELAY + STEADY_INTERVAL + Duration::from_secs(1)).await;

    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(finished.load(Ordering::SeqCst), 0);
    trigger.trigger();
    handle.await.expect("scheduler exits");
}

#[tokio::test(start_paused = true)]
async fn in_flight_job_survives_shutdown() {
    let finished = Arc::new(AtomicUsize::new(0));
    let job: ScheduledJob = {
        let finished = Arc::clone(&finished);
        Arc::new(move || {
            let finished = Arc::clone(&finished);
            Box::pin(async move {
                sleep(HOUR).await;
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
    };
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, job);

    sleep(Duration::from_secs(6)).await;
    trigger.trigger();
    handle.await.expect("scheduler exits");

    sleep(HOUR).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_trigger_stops_the_scheduler() {
    let fires = Arc::new(AtomicUsize::new(0));
    let (trigger, signal) = ShutdownSignal::new();
    let handle = TaskScheduler::spawn(daily_task(), signal, counting_job(&fires));

    drop(trigger);
    handle.await.expect("scheduler exits");
    assert_eq!(fires.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case::warming(SchedulerState::Warming { initial_delay: MIN_INITIAL_DELAY }, MIN_INITIAL_DELAY)]
#[case::steady(SchedulerState::Steady { interval: STEADY_INTERVAL }, STEADY_INTERVAL)]
fn state_delay_matches_phase(#[case] state: SchedulerState, #[case] expected: Duration) {
    assert_eq!(state.delay(), expected);
}

#[rstest]
fn warming_moves_to_steady_after_fire() {
    let state = SchedulerState::Warming {
        initial_delay: MIN_INITIAL_DELAY,
    };
    assert_eq!(
        state.after_fire(STEADY_INTERVAL),
        SchedulerState::Steady {
            interval: STEADY_INTERVAL
        }
    );
}

#[rstest]
fn signal_reports_trigger_state() {
    let (trigger, signal) = ShutdownSignal::new();
    let observer = signal.clone();
    assert!(!observer.is_triggered());
    trigger.trigger();
    assert!(observer.is_triggered());
}

#[rstest]
fn zero_interval_is_clamped() {
    let task = ScheduledTask::new("noop", Duration::ZERO, Duration::ZERO);
    assert_eq!(task.interval(), Duration::from_millis(1));
    assert_eq!(task.name(), "noop");
}
