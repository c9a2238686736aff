// Motor safety watchdog
// Note: if the code commanding the drive stops calling it (crashed loop, lost
// link), the last output would otherwise stay on the motors forever. The helper
// tracks a deadline that every drive command pushes forward; once it passes,
// the participant is told to stop its motors.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::DEFAULT_SAFETY_EXPIRATION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    Unfed,
    At(Instant),
    Never,
}

/// Deadline bookkeeping for one safety participant
#[derive(Debug, Clone)]
pub struct SafetyHelper {
    expiration: Duration,
    stop_time: Deadline,
    enabled: bool,
    // Set once the current expiration event has been handled
    tripped: bool,
}

impl SafetyHelper {
    /// Helper with the default expiration. It starts expired: nothing is alive
    /// until the first feed.
    pub fn new() -> Self {
        Self::with_expiration(DEFAULT_SAFETY_EXPIRATION)
    }

    pub fn with_expiration(expiration: Duration) -> Self {
        Self {
            expiration,
            stop_time: Deadline::Unfed,
            enabled: false,
            tripped: false,
        }
    }

    /// Mark the participant alive until now + expiration
    pub fn feed(&mut self) {
        self.feed_at(Instant::now());
    }

    /// An expiration too long to represent as an instant never runs out
    pub fn feed_at(&mut self, now: Instant) {
        self.stop_time = match now.checked_add(self.expiration) {
            Some(stop_time) => Deadline::At(stop_time),
            None => Deadline::Never,
        };
        self.tripped = false;
    }

    pub fn set_expiration(&mut self, expiration: Duration) {
        self.expiration = expiration;
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Alive when safety is disabled or the deadline has not passed
    pub fn is_alive(&self) -> bool {
        self.is_alive_at(Instant::now())
    }

    pub fn is_alive_at(&self, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        match self.stop_time {
            Deadline::Unfed => false,
            Deadline::At(stop_time) => now <= stop_time,
            Deadline::Never => true,
        }
    }

    pub fn set_safety_enabled(&mut self, enabled: bool) {
        debug!("Motor safety {}", if enabled { "enabled" } else { "disabled" });
        self.enabled = enabled;
    }

    pub fn is_safety_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true exactly once per expiration event: the first poll after
    /// the deadline passed while enabled. The next feed re-arms it.
    pub fn poll_expired(&mut self) -> bool {
        self.poll_expired_at(Instant::now())
    }

    pub fn poll_expired_at(&mut self, now: Instant) -> bool {
        if self.is_alive_at(now) || self.tripped {
            return false;
        }
        self.tripped = true;
        true
    }
}

impl Default for SafetyHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// A subsystem that can be stopped by the motor safety watchdog
pub trait MotorSafety {
    fn safety(&self) -> &SafetyHelper;

    fn safety_mut(&mut self) -> &mut SafetyHelper;

    /// Immediately command zero output on every motor
    fn stop_motor(&mut self);

    /// Human-readable name used in watchdog logs
    fn description(&self) -> &str;

    /// Poll the watchdog and stop the motors if the deadline just passed.
    /// Returns whether a stop was issued.
    fn check_safety(&mut self) -> bool {
        self.check_safety_at(Instant::now())
    }

    fn check_safety_at(&mut self, now: Instant) -> bool {
        if !self.safety_mut().poll_expired_at(now) {
            return false;
        }
        warn!(
            "{} output not updated within {:?}, stopping motors",
            self.description(),
            self.safety().expiration()
        );
        self.stop_motor();
        true
    }
}
