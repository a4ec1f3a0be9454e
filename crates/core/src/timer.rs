//! Countdown state for a single question.
//!
//! `QuestionTimer` holds no clock of its own: the caller delivers one `tick`
//! per elapsed second. The services layer drives it from a tokio interval.

/// What happened as a result of a timer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Nothing changed (timer paused, idle or already expired).
    Idle,
    /// The countdown is running with this many seconds left.
    Running { remaining_secs: u32 },
    /// The countdown just reached zero. Reported once per countdown.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTimer {
    duration_secs: u32,
    remaining_secs: u32,
    running: bool,
    expired: bool,
}

impl QuestionTimer {
    /// A stopped timer loaded with `duration_secs`.
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            running: false,
            expired: false,
        }
    }

    /// Start a fresh countdown of `duration_secs`.
    ///
    /// A zero duration expires immediately.
    pub fn start(&mut self, duration_secs: u32) -> TimerEvent {
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.expired = false;
        if duration_secs == 0 {
            return self.expire();
        }
        self.running = true;
        TimerEvent::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TimerEvent {
        if !self.running {
            return TimerEvent::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return self.expire();
        }
        TimerEvent::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continue from the current remaining time. Does nothing once expired.
    pub fn resume(&mut self) {
        if !self.expired && self.remaining_secs > 0 {
            self.running = true;
        }
    }

    /// Restart the countdown, optionally with a new duration.
    pub fn reset(&mut self, duration_secs: Option<u32>) -> TimerEvent {
        self.start(duration_secs.unwrap_or(self.duration_secs))
    }

    fn expire(&mut self) -> TimerEvent {
        self.remaining_secs = 0;
        self.running = false;
        self.expired = true;
        TimerEvent::Expired
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Remaining time as a share of the duration, for progress bars only.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        f64::from(self.remaining_secs) / f64::from(self.duration_secs) * 100.0
    }
}
