//! ADC sample pacing
//!
//! TIM2 raises an update interrupt once per sample period. The interrupt task reads one
//! conversion from the microphone channel and hands it to the sample buffer.
use embedded_hal_02::adc::OneShot;
use stm32h7xx_hal::{
    adc::{Adc, Enabled},
    gpio::{Analog, PA3},
    stm32::{ADC1, TIM2},
    timer::{Event, Timer},
};

/// The controller's handle on TIM2.
pub struct SampleTimer {
    timer: Timer<TIM2>,
}

impl SampleTimer {
    /// # Args
    /// * `timer` - TIM2 configured for the sample period.
    pub fn new(mut timer: Timer<TIM2>) -> Self {
        timer.pause();
        timer.listen(Event::TimeOut);
        Self { timer }
    }
}

impl noisemap::acquisition::SampleTimer for SampleTimer {
    fn start(&mut self) {
        self.timer.reset_counter();
        self.timer.clear_irq();
        self.timer.resume();
    }

    fn stop(&mut self) {
        self.timer.pause();
        self.timer.clear_irq();
    }
}

/// The interrupt side: the microphone ADC channel.
pub struct Microphone {
    adc: Adc<ADC1, Enabled>,
    pin: PA3<Analog>,
}

impl Microphone {
    pub fn new(adc: Adc<ADC1, Enabled>, pin: PA3<Analog>) -> Self {
        Self { adc, pin }
    }

    /// Acknowledge the timer update and take one 12 bit reading.
    ///
    /// # Note
    /// This is intended to be called from the TIM2 interrupt.
    pub fn sample(&mut self) -> Option<u16> {
        // Note(unsafe): Only the update flag is cleared, TIM2 is otherwise owned by
        // `SampleTimer`.
        let regs = unsafe { &*TIM2::ptr() };
        regs.sr.modify(|_, w| w.uif().clear_bit());

        let reading: Result<u32, _> = nb::block!(self.adc.read(&mut self.pin));
        match reading {
            Ok(value) => Some(value as u16),
            Err(_) => {
                log::warn!("ADC conversion failed");
                None
            }
        }
    }
}
