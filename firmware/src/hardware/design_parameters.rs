//! Board constants for the NUCLEO-H743ZI carrier.
//!
//! | Signal       | Pin        | Peripheral             |
//! |--------------|------------|------------------------|
//! | Button       | PC13       | EXTI15_10, rising edge |
//! | GPS PPS      | PD4        | EXTI4, rising edge     |
//! | GPS NMEA     | PD5/PD6    | USART2 TX/RX           |
//! | Console      | PD8/PD9    | USART3 TX/RX (ST-LINK) |
//! | EEPROM       | PB8/PB9    | I2C1 SCL/SDA           |
//! | Microphone   | PA3        | ADC1 INP15             |
//! | Ready LED    | PB0        | green (LD1)            |
//! | Busy LED     | PE1        | yellow (LD2)           |
//! | Done LED     | PE2        | orange (external)      |
//! | Fault LED    | PB14       | red (LD3)              |
use stm32h7xx_hal::time::{Hertz, MegaHertz};

/// The system clock.
pub const SYSCLK: MegaHertz = MegaHertz::from_raw(400);

/// The ADC kernel clock.
pub const ADC_CLOCK: MegaHertz = MegaHertz::from_raw(4);

/// The EEPROM bus speed. 24C04 parts support 400 kHz at 2.5 V and above.
pub const I2C_FREQUENCY: Hertz = Hertz::from_raw(100_000);

/// Number of 256 byte blocks of the 24C04.
pub const EEPROM_BLOCKS: u8 = 2;

/// GPS receiver NMEA baud rate.
pub const GPS_BAUD: u32 = 9_600;

pub const CONSOLE_BAUD: u32 = 115_200;

/// Serial receive queue capacity in bytes. One second of NMEA output at 9600 baud.
pub const RX_QUEUE_SIZE: usize = 1024;

/// Button presses closer than this to the previous one are contact bounce.
pub const BUTTON_DEBOUNCE_MS: u32 = 50;

/// Systick monotonic tick rate.
pub const MONOTONIC_FREQUENCY: u32 = 1_000;
