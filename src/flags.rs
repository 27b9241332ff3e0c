//! Event flags shared between interrupt context and the controller.
//!
//! Flags are latched: a flag raised between two consumption points is observed exactly once,
//! and raising it again before it is consumed has no further effect.
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ButtonPressed,
    CaptureCancelled,
    PpsDetected,
}

#[derive(Debug, Default)]
pub struct EventFlags {
    button_pressed: AtomicBool,
    capture_cancelled: AtomicBool,
    pps_detected: AtomicBool,
    // Written by the controller only. Routes button presses.
    capturing: AtomicBool,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            button_pressed: AtomicBool::new(false),
            capture_cancelled: AtomicBool::new(false),
            pps_detected: AtomicBool::new(false),
            capturing: AtomicBool::new(false),
        }
    }

    fn flag(&self, event: Event) -> &AtomicBool {
        match event {
            Event::ButtonPressed => &self.button_pressed,
            Event::CaptureCancelled => &self.capture_cancelled,
            Event::PpsDetected => &self.pps_detected,
        }
    }

    /// Latch an event.
    pub fn raise(&self, event: Event) {
        self.flag(event).store(true, Ordering::Release);
    }

    /// Consume an event, returning whether it was raised.
    pub fn take(&self, event: Event) -> bool {
        self.flag(event).swap(false, Ordering::AcqRel)
    }

    /// Check an event without consuming it.
    pub fn is_raised(&self, event: Event) -> bool {
        self.flag(event).load(Ordering::Acquire)
    }

    pub fn clear(&self, event: Event) {
        self.flag(event).store(false, Ordering::Release);
    }

    /// Handle a button edge.
    ///
    /// # Note
    /// While a capture is in progress the press cancels it, otherwise it requests a new capture.
    pub fn on_button(&self) {
        if self.capturing.load(Ordering::Acquire) {
            self.raise(Event::CaptureCancelled);
        } else {
            self.raise(Event::ButtonPressed);
        }
    }

    pub(crate) fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::Release);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }
}
