//! Status indicator outputs
use embedded_hal::digital::OutputPin;

/// One of the four discrete status outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Waiting for a capture request. Green.
    Ready = 0,
    /// Capture or dump in progress. Yellow.
    Busy = 1,
    /// Record stored. Orange.
    Done = 2,
    /// Fault. Red.
    Fault = 3,
}

/// The status LEDs, indexed by [Indicator].
pub struct StatusLeds<P> {
    pins: [P; 4],
}

impl<P: OutputPin> StatusLeds<P> {
    /// # Args
    /// * `pins` - Outputs in [Indicator] order: ready, busy, done, fault.
    pub fn new(pins: [P; 4]) -> Self {
        let mut leds = Self { pins };
        leds.show(None);
        leds
    }

    /// Light exactly one indicator, or none.
    pub fn show(&mut self, indicator: Option<Indicator>) {
        for (index, pin) in self.pins.iter_mut().enumerate() {
            let lit = indicator.is_some_and(|i| i as usize == index);
            // LED drive failures are not actionable.
            pin.set_state(lit.into()).ok();
        }
    }

    pub fn set(&mut self, indicator: Indicator, lit: bool) {
        self.pins[indicator as usize].set_state(lit.into()).ok();
    }

    pub fn release(self) -> [P; 4] {
        self.pins
    }
}
