//! Tokio driver for [`QuestionTimer`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use quiz_core::timer::{QuestionTimer, TimerEvent};

const TICK: Duration = Duration::from_secs(1);

type TimeoutCallback = Arc<dyn Fn() + Send + Sync>;

/// Timer plus the epoch of the ticker allowed to drive it. Every start,
/// reset and pause bumps the epoch, so a ticker from an earlier run that
/// wakes before its abort lands sees a stale epoch and exits untouched.
struct Shared {
    timer: QuestionTimer,
    epoch: u64,
}

impl Shared {
    fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }
}

/// A per-question countdown that ticks once per second on the tokio runtime.
///
/// The ticking task is owned by the countdown: pausing, restarting or dropping
/// it aborts the task. `on_timeout` runs once for every countdown that reaches
/// zero.
pub struct Countdown {
    shared: Arc<Mutex<Shared>>,
    on_timeout: TimeoutCallback,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// A stopped countdown. Must be started from within a tokio runtime.
    pub fn new(duration_secs: u32, on_timeout: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                timer: QuestionTimer::new(duration_secs),
                epoch: 0,
            })),
            on_timeout: Arc::new(on_timeout),
            task: None,
        }
    }

    pub fn start(&mut self, duration_secs: u32) {
        self.stop_task();
        let (event, epoch) = {
            let mut shared = lock(&self.shared);
            (shared.timer.start(duration_secs), shared.next_epoch())
        };
        self.follow(event, epoch);
    }

    pub fn pause(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.timer.pause();
            shared.next_epoch();
        }
        self.stop_task();
    }

    pub fn resume(&mut self) {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let epoch = {
            let mut shared = lock(&self.shared);
            shared.timer.resume();
            shared.timer.is_running().then(|| shared.next_epoch())
        };
        if let Some(epoch) = epoch {
            self.spawn_ticker(epoch);
        }
    }

    /// Restart from the full duration, or from `duration_secs` which becomes
    /// the new duration.
    pub fn reset(&mut self, duration_secs: Option<u32>) {
        self.stop_task();
        let (event, epoch) = {
            let mut shared = lock(&self.shared);
            (shared.timer.reset(duration_secs), shared.next_epoch())
        };
        self.follow(event, epoch);
    }

    /// Stop ticking for good. `remaining_secs` keeps its last value.
    pub fn stop(&mut self) {
        self.pause();
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        lock(&self.shared).timer.remaining_secs()
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        lock(&self.shared).timer.duration_secs()
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        lock(&self.shared).timer.percentage()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.shared).timer.is_running()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        lock(&self.shared).timer.is_expired()
    }

    fn follow(&mut self, event: TimerEvent, epoch: u64) {
        match event {
            TimerEvent::Running { .. } => self.spawn_ticker(epoch),
            TimerEvent::Expired => (self.on_timeout)(),
            TimerEvent::Idle => {}
        }
    }

    fn spawn_ticker(&mut self, epoch: u64) {
        let shared = Arc::clone(&self.shared);
        let on_timeout = Arc::clone(&self.on_timeout);
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                let event = {
                    let mut shared = lock(&shared);
                    if shared.epoch != epoch {
                        break;
                    }
                    shared.timer.tick()
                };
                match event {
                    TimerEvent::Running { remaining_secs } => {
                        log::trace!("countdown at {remaining_secs}s");
                    }
                    TimerEvent::Expired => {
                        log::debug!("countdown expired");
                        on_timeout();
                        break;
                    }
                    TimerEvent::Idle => break,
                }
            }
        }));
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop_task();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counted(duration: u32) -> (Countdown, Arc<AtomicU32>) {
        let fired = Arc::new(AtomicU32::new(0));
        let hits = Arc::clone(&fired);
        let countdown = Countdown::new(duration, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (countdown, fired)
    }

    async fn wait_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_down_and_fires_once() {
        let (mut countdown, fired) = counted(3);
        countdown.start(3);
        assert!(countdown.is_running());

        wait_ms(1_500).await;
        assert_eq!(countdown.remaining_secs(), 2);

        wait_ms(2_000).await;
        assert_eq!(countdown.remaining_secs(), 0);
        assert!(countdown.is_expired());
        assert!(!countdown.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        wait_ms(5_000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_remaining_until_resume() {
        let (mut countdown, fired) = counted(5);
        countdown.start(5);
        wait_ms(2_500).await;
        countdown.pause();
        assert_eq!(countdown.remaining_secs(), 3);

        wait_ms(10_000).await;
        assert_eq!(countdown.remaining_secs(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        countdown.resume();
        wait_ms(3_500).await;
        assert_eq!(countdown.remaining_secs(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Resuming an expired countdown does nothing.
        countdown.resume();
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_starts_a_new_countdown() {
        let (mut countdown, fired) = counted(2);
        countdown.start(2);
        wait_ms(2_500).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        countdown.reset(Some(4));
        assert_eq!(countdown.duration_secs(), 4);
        assert_eq!(countdown.remaining_secs(), 4);
        assert!((countdown.percentage() - 100.0).abs() < f64::EPSILON);

        wait_ms(4_500).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_run_starts_from_full_duration() {
        let (mut countdown, fired) = counted(5);
        countdown.start(5);
        wait_ms(2_500).await;
        assert_eq!(countdown.remaining_secs(), 3);

        countdown.reset(None);
        assert_eq!(countdown.remaining_secs(), 5);
        wait_ms(600).await;
        assert_eq!(countdown.remaining_secs(), 5);
        wait_ms(500).await;
        assert_eq!(countdown.remaining_secs(), 4);

        countdown.start(5);
        wait_ms(5_500).await;
        assert_eq!(countdown.remaining_secs(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_from_an_earlier_run_leaves_the_timer_alone() {
        let (mut countdown, fired) = counted(5);
        countdown.start(5);
        let stale = countdown.task.take();
        let stale_epoch = lock(&countdown.shared).epoch;

        // A new run while the old ticker is still alive and not yet aborted.
        countdown.start(5);
        assert_ne!(lock(&countdown.shared).epoch, stale_epoch);
        wait_ms(1_500).await;
        assert_eq!(countdown.remaining_secs(), 4);
        assert!(stale.is_some_and(|task| task.is_finished()));

        wait_ms(4_000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_fires_immediately() {
        let (mut countdown, fired) = counted(0);
        countdown.start(0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(countdown.is_expired());
        assert!((countdown.percentage()).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_stops_the_task() {
        let (mut countdown, fired) = counted(2);
        countdown.start(2);
        drop(countdown);
        wait_ms(5_000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
