//! Sound pressure level estimation from raw ADC samples.
use num_traits::Float;

/// Full scale of the 12 bit ADC in codes.
const FULL_SCALE_CODES: f64 = 4096.0;

/// 1 Pa RMS corresponds to 94 dB SPL.
const PASCAL_DB_SPL: f64 = 94.0;

/// Analog chain from microphone to ADC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// ADC reference voltage.
    pub full_scale_volts: f64,
    /// Microphone sensitivity in dBV/Pa.
    pub sensitivity_dbv: f64,
    /// Preamplifier gain in dB.
    pub gain_db: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            full_scale_volts: 3.3,
            sensitivity_dbv: -44.0,
            gain_db: 40.0,
        }
    }
}

/// RMS of the AC component of `samples` in ADC codes.
pub fn rms<I>(samples: I) -> f64
where
    I: Iterator<Item = u16> + Clone,
{
    let (count, sum) = samples
        .clone()
        .fold((0usize, 0.0f64), |(n, sum), x| (n + 1, sum + x as f64));
    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    let power = samples
        .map(|x| {
            let ac = x as f64 - mean;
            ac * ac
        })
        .sum::<f64>()
        / count as f64;
    power.sqrt()
}

/// Convert an RMS amplitude in ADC codes to dB SPL.
///
/// A zero amplitude maps to negative infinity.
pub fn spl_db(rms_codes: f64, calibration: &Calibration) -> f64 {
    let volts = rms_codes * calibration.full_scale_volts / FULL_SCALE_CODES;
    20.0 * volts.log10() - calibration.sensitivity_dbv - calibration.gain_db
        + PASCAL_DB_SPL
}

/// The one byte noise level stored with a measurement.
///
/// The level is rounded to whole dB SPL and clamped to `0..=255`.
pub fn level<I>(samples: I, calibration: &Calibration) -> u8
where
    I: Iterator<Item = u16> + Clone,
{
    let db = spl_db(rms(samples), calibration);
    if db.is_nan() {
        return 0;
    }
    db.round().clamp(0.0, 255.0) as u8
}
