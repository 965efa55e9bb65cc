// Countdown scheduler - one tick task per timed alert.
//
// The scheduler only ever holds alert ids. Each tick re-enters the owner through
// `TickTarget`, which looks the alert up and decides whether to keep counting.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::model::AlertId;

/// Default cadence for progress recomputation.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Receiver of countdown ticks. Returning `Break` ends the tick loop.
pub trait TickTarget: Send + Sync + 'static {
    fn on_tick(&self, id: AlertId) -> ControlFlow<()>;
}

/// Elapsed-time bookkeeping for a single countdown, pause-aware.
#[derive(Debug, Clone, Copy)]
pub struct CountdownClock {
    /// Start of the current running stretch
    started: Instant,
    /// Time consumed before the last pause
    banked: Duration,
    paused: bool,
}

impl CountdownClock {
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            banked: Duration::ZERO,
            paused: false,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if self.paused {
            self.banked
        } else {
            self.banked + now.saturating_duration_since(self.started)
        }
    }

    /// `100 * (1 - elapsed / duration)`, clamped to `[0, 100]`.
    pub fn remaining_percent(&self, duration: Duration, now: Instant) -> f64 {
        if duration.is_zero() {
            return 0.0;
        }
        let fraction = self.elapsed(now).as_secs_f64() / duration.as_secs_f64();
        (100.0 * (1.0 - fraction)).clamp(0.0, 100.0)
    }

    pub fn pause(&mut self, now: Instant) {
        if !self.paused {
            self.banked += now.saturating_duration_since(self.started);
            self.paused = true;
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.paused {
            self.started = now;
            self.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

struct Countdown {
    clock: CountdownClock,
    task: JoinHandle<()>,
}

/// Owns the live countdowns, keyed by alert id.
pub struct Scheduler {
    runtime: Handle,
    tick_interval: Duration,
    countdowns: HashMap<AlertId, Countdown>,
}

impl Scheduler {
    pub fn new(runtime: Handle, tick_interval: Duration) -> Self {
        Self {
            runtime,
            tick_interval,
            countdowns: HashMap::new(),
        }
    }

    /// Start (or restart) the countdown for `id`. Any previous countdown for
    /// the same id is cancelled first, so there is never more than one.
    pub fn start(&mut self, id: AlertId, target: Weak<dyn TickTarget>) {
        self.spawn_countdown(id, target, false);
    }

    /// Replace the countdown for `id` with a fresh clock, carrying over
    /// whether the old one was paused.
    pub fn restart(&mut self, id: AlertId, target: Weak<dyn TickTarget>) {
        let paused = self.is_paused(id);
        self.spawn_countdown(id, target, paused);
    }

    fn spawn_countdown(&mut self, id: AlertId, target: Weak<dyn TickTarget>, paused: bool) {
        self.cancel(id);

        let period = self.tick_interval;
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                if target.on_tick(id).is_break() {
                    break;
                }
            }
        });

        let now = Instant::now();
        let mut clock = CountdownClock::start(now);
        if paused {
            clock.pause(now);
        }
        self.countdowns.insert(id, Countdown { clock, task });
    }

    /// Cancel the countdown for `id`. Returns false if there was none.
    pub fn cancel(&mut self, id: AlertId) -> bool {
        match self.countdowns.remove(&id) {
            Some(countdown) => {
                countdown.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, countdown) in self.countdowns.drain() {
            countdown.task.abort();
        }
    }

    /// Remaining percent for `id` against `duration`, or `None` when the
    /// countdown no longer exists.
    pub fn remaining_percent(&self, id: AlertId, duration: Duration, now: Instant) -> Option<f64> {
        self.countdowns
            .get(&id)
            .map(|c| c.clock.remaining_percent(duration, now))
    }

    pub fn pause(&mut self, id: AlertId) -> bool {
        let now = Instant::now();
        self.countdowns
            .get_mut(&id)
            .map(|c| c.clock.pause(now))
            .is_some()
    }

    pub fn resume(&mut self, id: AlertId) -> bool {
        let now = Instant::now();
        self.countdowns
            .get_mut(&id)
            .map(|c| c.clock.resume(now))
            .is_some()
    }

    pub fn is_paused(&self, id: AlertId) -> bool {
        self.countdowns
            .get(&id)
            .is_some_and(|c| c.clock.is_paused())
    }

    pub fn len(&self) -> usize {
        self.countdowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countdowns.is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTarget {
        ticks: AtomicUsize,
        stop_after: usize,
    }

    impl TickTarget for CountingTarget {
        fn on_tick(&self, _id: AlertId) -> ControlFlow<()> {
            let seen = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            if seen >= self.stop_after {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    fn counting(stop_after: usize) -> Arc<CountingTarget> {
        Arc::new(CountingTarget {
            ticks: AtomicUsize::new(0),
            stop_after,
        })
    }

    fn weak(target: &Arc<CountingTarget>) -> Weak<dyn TickTarget> {
        let target: Arc<dyn TickTarget> = target.clone();
        Arc::downgrade(&target)
    }

    #[test]
    fn test_clock_remaining_percent() {
        let t0 = Instant::now();
        let clock = CountdownClock::start(t0);
        let d = Duration::from_millis(1000);

        assert_eq!(clock.remaining_percent(d, t0), 100.0);
        assert!((clock.remaining_percent(d, t0 + Duration::from_millis(250)) - 75.0).abs() < 1e-9);
        assert_eq!(clock.remaining_percent(d, t0 + d), 0.0);
        // Clamped once past the deadline
        assert_eq!(clock.remaining_percent(d, t0 + Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn test_clock_pause_banks_elapsed() {
        let t0 = Instant::now();
        let d = Duration::from_millis(1000);
        let mut clock = CountdownClock::start(t0);

        clock.pause(t0 + Duration::from_millis(400));
        assert!(clock.is_paused());
        let frozen = clock.remaining_percent(d, t0 + Duration::from_millis(900));
        assert!((frozen - 60.0).abs() < 1e-9);

        clock.resume(t0 + Duration::from_millis(2000));
        let later = clock.remaining_percent(d, t0 + Duration::from_millis(2100));
        assert!((later - 50.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_target_breaks() {
        let target = counting(3);
        let mut scheduler = Scheduler::new(Handle::current(), DEFAULT_TICK_INTERVAL);
        let id = AlertId::next();

        scheduler.start(id, weak(&target));
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(target.ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let target = counting(usize::MAX);
        let mut scheduler = Scheduler::new(Handle::current(), DEFAULT_TICK_INTERVAL);
        let id = AlertId::next();

        scheduler.start(id, weak(&target));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(scheduler.cancel(id));
        let seen = target.ticks.load(Ordering::SeqCst);
        assert!(seen >= 2);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(target.ticks.load(Ordering::SeqCst), seen);
        assert!(!scheduler.cancel(id), "second cancel is a no-op");
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_countdown() {
        let target = counting(usize::MAX);
        let mut scheduler = Scheduler::new(Handle::current(), DEFAULT_TICK_INTERVAL);
        let id = AlertId::next();

        scheduler.start(id, weak(&target));
        scheduler.start(id, weak(&target));
        assert_eq!(scheduler.len(), 1);

        scheduler.cancel_all();
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_carries_pause_state() {
        let target = counting(usize::MAX);
        let mut scheduler = Scheduler::new(Handle::current(), DEFAULT_TICK_INTERVAL);
        let running = AlertId::next();
        let held = AlertId::next();
        let d = Duration::from_millis(1000);

        scheduler.start(running, weak(&target));
        scheduler.start(held, weak(&target));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(scheduler.pause(held));

        scheduler.restart(running, weak(&target));
        scheduler.restart(held, weak(&target));
        assert_eq!(scheduler.len(), 2);
        assert!(!scheduler.is_paused(running));
        assert!(scheduler.is_paused(held));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let now = Instant::now();
        assert_eq!(scheduler.remaining_percent(held, d, now), Some(100.0));
        let running_left = scheduler.remaining_percent(running, d, now).unwrap();
        assert!((running_left - 50.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_target_ends_loop() {
        let target = counting(usize::MAX);
        let mut scheduler = Scheduler::new(Handle::current(), DEFAULT_TICK_INTERVAL);
        let id = AlertId::next();

        scheduler.start(id, weak(&target));
        drop(target);
        tokio::time::sleep(Duration::from_millis(300)).await;

        let countdown = scheduler.countdowns.get(&id).unwrap();
        assert!(countdown.task.is_finished());
    }
}
