//! Basic blocking delay
//!
//! This module provides a basic asm-based blocking delay.
use embedded_hal_02::blocking::delay::DelayUs;
use embedded_hal_1::delay::DelayNs;

/// A basic delay implementation.
#[derive(Clone, Copy)]
pub struct AsmDelay {
    frequency_mhz: u32,
}

impl AsmDelay {
    /// Create a new delay.
    ///
    /// # Args
    /// * `freq` - The CPU core frequency.
    pub fn new(freq: u32) -> AsmDelay {
        AsmDelay {
            frequency_mhz: freq / 1_000_000,
        }
    }
}

impl<U> DelayUs<U> for AsmDelay
where
    U: Into<u32>,
{
    fn delay_us(&mut self, us: U) {
        cortex_m::asm::delay(self.frequency_mhz * us.into())
    }
}

impl DelayNs for AsmDelay {
    fn delay_ns(&mut self, ns: u32) {
        cortex_m::asm::delay((self.frequency_mhz * (ns / 1000)).max(1))
    }

    fn delay_us(&mut self, us: u32) {
        // Split to avoid overflowing the cycle count at 400 MHz.
        for _ in 0..us / 1000 {
            cortex_m::asm::delay(self.frequency_mhz * 1000);
        }
        cortex_m::asm::delay(self.frequency_mhz * (us % 1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            cortex_m::asm::delay(self.frequency_mhz * 1000);
        }
    }
}
