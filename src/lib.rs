//! GPS tagged noise level logger.
//!
//! A capture request (button press) reads a GNSS fix, samples a microphone through the ADC,
//! reduces the samples to a sound pressure level and appends the record to an I2C EEPROM. The
//! hardware independent parts live here, the STM32H7 application binding them to peripherals
//! lives in `firmware/`.
#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod command;
pub mod controller;
pub mod flags;
pub mod gnss;
pub mod indicator;
pub mod ledger;
pub mod line;
pub mod noise;
pub mod settings;
pub mod signals;
pub mod watchdog;

pub use controller::{Controller, Devices, Fault, State};
pub use ledger::Measurement;
pub use settings::Settings;
pub use signals::Signals;
