//! Wall clock access and clock change events

use std::sync::Arc;

use cts_proto::AdjustReason;

pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Reasons to push the current time to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Periodic update, nothing changed
    Tick,
    /// The wall clock was set
    TimeChanged,
    /// The time zone changed
    TimezoneChanged,
}

impl ClockEvent {
    pub fn adjust_reason(self) -> AdjustReason {
        match self {
            ClockEvent::Tick => AdjustReason::NONE,
            ClockEvent::TimeChanged => AdjustReason::MANUAL,
            ClockEvent::TimezoneChanged => AdjustReason::TIMEZONE,
        }
    }
}
