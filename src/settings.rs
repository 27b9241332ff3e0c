//! Runtime settings
//!
//! All controller timing and conversion parameters in one place. Hardware constants such as
//! pin assignments and bus speeds are not settings and live with the firmware.
use crate::noise::Calibration;
use fugit::{ExtU32, MicrosDurationU32, MillisDurationU32};

#[derive(Clone, Debug)]
pub struct Settings {
    /// Sleep between checks of flags and ports in every wait loop.
    pub poll_interval: MillisDurationU32,

    /// PPS watchdog check period. A lost PPS is detected within one to two periods.
    pub pps_timeout: MillisDurationU32,

    /// First sleep while waiting for PPS lock after boot or a fault.
    pub init_backoff: MillisDurationU32,

    /// Upper bound of the doubling PPS lock back-off.
    pub init_backoff_max: MillisDurationU32,

    /// How long the done indicator is held after a record was stored.
    pub success_hold: MillisDurationU32,

    /// Total duration of the fault display including the blink pattern.
    pub fault_hold: MillisDurationU32,

    /// On and off time of one fault blink.
    pub blink: MillisDurationU32,

    /// ADC sample period.
    pub sample_period: MicrosDurationU32,

    /// Upper bound of records reported by a single dump.
    pub max_dump_records: usize,

    pub calibration: Calibration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: 10.millis(),
            pps_timeout: 2.secs(),
            init_backoff: 50.millis(),
            init_backoff_max: 1.secs(),
            success_hold: 3.secs(),
            fault_hold: 2.secs(),
            blink: 150.millis(),
            sample_period: 100.micros(),
            max_dump_records: 16,
            calibration: Calibration::default(),
        }
    }
}
