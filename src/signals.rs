//! Interrupt context entry points
//!
//! [Signals] bundles everything interrupt handlers touch. It only contains atomics and can be
//! placed in a `static`, giving each handler a one-line body.
use crate::{
    acquisition::{Acquisition, Tick},
    flags::{Event, EventFlags},
    watchdog::{Check, PpsWatchdog},
};

pub struct Signals<const N: usize> {
    pub flags: EventFlags,
    pub watchdog: PpsWatchdog,
    pub acquisition: Acquisition<N>,
}

impl<const N: usize> Default for Signals<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Signals<N> {
    pub const fn new() -> Self {
        Self {
            flags: EventFlags::new(),
            watchdog: PpsWatchdog::new(),
            acquisition: Acquisition::new(),
        }
    }

    /// Button edge interrupt.
    pub fn on_button(&self) {
        self.flags.on_button();
    }

    /// GPS PPS edge interrupt.
    pub fn on_pps(&self) {
        self.watchdog.feed();
        self.flags.raise(Event::PpsDetected);
    }

    /// Sample timer interrupt.
    ///
    /// # Returns
    /// [Tick::Full] once the buffer is complete. The caller may stop its timer then.
    pub fn on_sample(&self, sample: u16) -> Tick {
        self.acquisition.push(sample)
    }

    /// Periodic PPS deadline check.
    pub fn on_watchdog_tick(&self) -> Check {
        let check = self.watchdog.check();
        if check == Check::Expired {
            log::warn!("PPS lost");
        }
        check
    }
}
