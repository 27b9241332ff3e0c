//! ADC sample acquisition
//!
//! # Design
//! The sample timer interrupt pushes one ADC reading per period into [Acquisition]. The buffer
//! is armed by the controller at the start of a capture and disarms itself when the push that
//! fills it completes. Pushes while disarmed are dropped, so a late timer interrupt can never
//! write into a later capture.
//!
//! The timer interrupt is the only writer while armed, the controller only reads after the
//! buffer reports full. Each cell is an atomic so that no `unsafe` is needed to share the buffer
//! between the two contexts.
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};

/// The default number of samples per capture.
pub const SAMPLE_CAPACITY: usize = 10_000;

/// ADC readings are 12 bit.
pub const SAMPLE_MASK: u16 = 0x0FFF;

/// Control over the hardware timer that paces sampling.
pub trait SampleTimer {
    /// Start periodic sample interrupts.
    fn start(&mut self);

    /// Stop periodic sample interrupts.
    fn stop(&mut self);
}

/// Result of pushing a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The buffer is not armed. The sample was dropped.
    Idle,
    Sampled,
    /// The buffer is full and has disarmed itself.
    Full,
}

pub struct Acquisition<const N: usize> {
    samples: [AtomicU16; N],
    index: AtomicUsize,
    armed: AtomicBool,
}

impl<const N: usize> Default for Acquisition<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Acquisition<N> {
    pub const fn new() -> Self {
        Self {
            samples: [const { AtomicU16::new(0) }; N],
            index: AtomicUsize::new(0),
            armed: AtomicBool::new(false),
        }
    }

    /// Reset the buffer to empty and accept samples.
    pub fn start(&self) {
        self.armed.store(false, Ordering::Release);
        self.index.store(0, Ordering::Release);
        self.armed.store(true, Ordering::Release);
    }

    /// Stop accepting samples and discard anything collected.
    pub fn cancel(&self) {
        self.armed.store(false, Ordering::Release);
        self.index.store(0, Ordering::Release);
    }

    /// Store one ADC reading.
    ///
    /// # Note
    /// This is intended to be called from the sample timer interrupt.
    pub fn push(&self, sample: u16) -> Tick {
        if !self.armed.load(Ordering::Acquire) {
            return Tick::Idle;
        }

        let index = self.index.load(Ordering::Acquire);
        if index >= N {
            self.armed.store(false, Ordering::Release);
            return Tick::Full;
        }

        self.samples[index].store(sample & SAMPLE_MASK, Ordering::Relaxed);
        self.index.store(index + 1, Ordering::Release);

        if index + 1 == N {
            self.armed.store(false, Ordering::Release);
            Tick::Full
        } else {
            Tick::Sampled
        }
    }

    pub fn len(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// The samples collected so far, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u16> + Clone + '_ {
        self.samples[..self.len().min(N)]
            .iter()
            .map(|sample| sample.load(Ordering::Relaxed))
    }
}
