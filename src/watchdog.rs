//! PPS liveness watchdog
//!
//! # Design
//! The GPS receiver pulses its PPS output once per second while it holds a fix. The PPS
//! interrupt feeds the watchdog and a periodic task calls [PpsWatchdog::check] once per timeout
//! period. If no pulse was seen since the previous check, the watchdog declares the signal lost
//! and disarms itself. It stays expired until re-armed.
//!
//! Arming counts as an observed pulse, so the first check after arming always passes. A lost
//! signal is therefore reported between one and two timeout periods after the last pulse.
use core::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a periodic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Disarmed,
    Alive,
    Expired,
}

#[derive(Debug, Default)]
pub struct PpsWatchdog {
    armed: AtomicBool,
    pulse: AtomicBool,
    expired: AtomicBool,
}

impl PpsWatchdog {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            pulse: AtomicBool::new(false),
            expired: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.expired.store(false, Ordering::Relaxed);
        self.pulse.store(true, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// Record a PPS edge.
    pub fn feed(&self) {
        self.pulse.store(true, Ordering::Release);
    }

    /// Check for a pulse since the previous check.
    pub fn check(&self) -> Check {
        if !self.armed.load(Ordering::Acquire) {
            return Check::Disarmed;
        }

        if self.pulse.swap(false, Ordering::AcqRel) {
            Check::Alive
        } else {
            self.expired.store(true, Ordering::Release);
            self.armed.store(false, Ordering::Release);
            Check::Expired
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn has_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}
