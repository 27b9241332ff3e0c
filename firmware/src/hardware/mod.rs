//! Module for all hardware-specific setup of the logger
pub use stm32h7xx_hal as hal;

mod delay;
pub mod design_parameters;
pub mod sample_timer;
pub mod serial;
pub mod setup;

pub use delay::AsmDelay;

rtic_monotonics::systick_monotonic!(
    Systick,
    design_parameters::MONOTONIC_FREQUENCY
);

pub type I2c1 = embedded_hal_compat::Forward<hal::i2c::I2c<hal::stm32::I2C1>>;

pub type Eeprom = at24c::At24c<I2c1, AsmDelay>;

pub type Led = embedded_hal_compat::Forward<
    hal::gpio::ErasedPin<hal::gpio::Output>,
    embedded_hal_compat::markers::ForwardOutputPin,
>;

pub type GpsPort = serial::Port<hal::stm32::USART2>;
pub type GpsReceiver = serial::Receiver<hal::stm32::USART2>;
pub type ConsolePort = serial::Port<hal::stm32::USART3>;
pub type ConsoleReceiver = serial::Receiver<hal::stm32::USART3>;

pub type Button = hal::gpio::PC13<hal::gpio::Input>;
pub type Pps = hal::gpio::PD4<hal::gpio::Input>;

#[inline(never)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::{
        fmt::Write,
        sync::atomic::{AtomicBool, Ordering},
    };
    use cortex_m::asm;
    use rtt_target::{ChannelMode, UpChannel};

    cortex_m::interrupt::disable();

    // Recursion protection
    static PANICKED: AtomicBool = AtomicBool::new(false);
    while PANICKED.load(Ordering::Relaxed) {
        asm::bkpt();
    }
    PANICKED.store(true, Ordering::Relaxed);

    // Turn on the red fault LED (PB14).
    let gpiob = unsafe { &*hal::stm32::GPIOB::ptr() };
    gpiob.odr.modify(|_, w| w.odr14().high());

    // Analogous to panic-rtt-target
    if let Some(mut channel) = unsafe { UpChannel::conjure(0) } {
        channel.set_mode(ChannelMode::BlockIfFull);
        writeln!(channel, "{}", info).ok();
    }

    // Abort
    asm::udf();
}

#[cortex_m_rt::exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
