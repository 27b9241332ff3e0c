//! Acquisition and storage state machine
//!
//! # Design
//! The controller is polled from the main loop. [Controller::step] runs the body of the current
//! state until it decides on a successor, then enters that state and drives the status
//! indicators for it. Interrupt handlers never touch the controller directly; they only set
//! flags and fill the sample buffer in [Signals], which every wait loop here polls at
//! `poll_interval`.
//!
//! ```text
//!  Init --PPS--> Idle --button--> Capturing --ok--> Storing --ok--> Idle
//!   ^             |  ^                 |               |
//!   |           DUMP |                 | fault         | fault
//!   |             v  |                 v               v
//!   |             Dump ---fault---> Error <------------+
//!   +--------------------------------+
//! ```
//!
//! Whatever way a capture ends, the sample timer is stopped, the sample buffer disarmed, the PPS
//! watchdog disarmed and the button routed back to capture requests before leaving `Capturing`.
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use embedded_io::{Read, ReadReady, Write};
use serde::Serialize;

use crate::{
    acquisition::SampleTimer,
    command::Command,
    flags::Event,
    gnss::{self, Fix, GnssError},
    indicator::{Indicator, StatusLeds},
    ledger::{Ledger, Measurement, Storage},
    line::LineReader,
    noise,
    settings::Settings,
    signals::Signals,
};

/// Longest NMEA sentence is 82 characters.
const GPS_LINE: usize = 96;

const CONSOLE_LINE: usize = 32;

/// Serialization buffer for one console report line.
const REPORT_SIZE: usize = 160;

/// Causes for entering [State::Error].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("GPS fix invalid")]
    GpsFixInvalid,
    #[error("GPS PPS signal lost")]
    GpsSignalLost,
    #[error("Capture cancelled")]
    CaptureCancelled,
    #[error("Storage write failed")]
    StorageWriteFailed,
    #[error("Storage read failed")]
    StorageReadFailed,
}

impl Fault {
    /// Number of fault indicator blinks identifying the cause.
    pub fn blinks(&self) -> u32 {
        match self {
            Fault::CaptureCancelled => 1,
            Fault::GpsFixInvalid => 2,
            Fault::GpsSignalLost => 3,
            Fault::StorageWriteFailed => 4,
            Fault::StorageReadFailed => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, strum::IntoStaticStr)]
pub enum State {
    /// Waiting for PPS lock.
    Init,
    /// Waiting for a capture request or a console command.
    Idle,
    Capturing,
    /// Appending the measurement to storage.
    Storing(Measurement),
    Error(Fault),
    /// Reporting stored records on the console.
    Dump,
}

impl State {
    /// The indicator lit while in this state.
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            State::Init => None,
            State::Idle => Some(Indicator::Ready),
            State::Capturing | State::Dump => Some(Indicator::Busy),
            State::Storing(_) => Some(Indicator::Done),
            State::Error(_) => Some(Indicator::Fault),
        }
    }
}

/// The peripherals the controller owns.
pub struct Devices<S, G, C, P, T, D> {
    /// Measurement storage, usually an [at24c::At24c].
    pub storage: S,
    /// GPS receiver NMEA output.
    pub gps: G,
    /// Serial command console.
    pub console: C,
    /// Status LEDs in [Indicator] order.
    pub leds: [P; 4],
    pub sample_timer: T,
    pub delay: D,
}

#[derive(Serialize)]
struct DumpHeader {
    records: usize,
}

#[derive(Serialize)]
struct Record {
    index: usize,
    measurement: Measurement,
}

#[derive(Serialize)]
struct Status {
    records: usize,
    capacity: usize,
    location_offset: usize,
    noise_offset: usize,
}

#[derive(Serialize)]
struct Rejected<'a> {
    error: &'a str,
}

pub struct Controller<'a, S, G, C, P, T, D, const N: usize> {
    signals: &'a Signals<N>,
    settings: Settings,
    state: State,
    ledger: Ledger<S>,
    gps: G,
    gps_line: LineReader<GPS_LINE>,
    console: C,
    console_line: LineReader<CONSOLE_LINE>,
    leds: StatusLeds<P>,
    sample_timer: T,
    delay: D,
}

impl<'a, S, G, C, P, T, D, const N: usize> Controller<'a, S, G, C, P, T, D, N>
where
    S: Storage,
    G: Read + ReadReady,
    C: Read + ReadReady + Write,
    P: OutputPin,
    T: SampleTimer,
    D: DelayNs,
{
    /// Construct the controller in [State::Init].
    ///
    /// # Args
    /// * `signals` - Shared with the interrupt handlers.
    /// * `devices` - Peripherals owned by the controller from now on.
    /// * `settings` - Timing and calibration.
    pub fn new(
        signals: &'a Signals<N>,
        devices: Devices<S, G, C, P, T, D>,
        settings: Settings,
    ) -> Self {
        let Devices {
            storage,
            gps,
            console,
            leds,
            mut sample_timer,
            delay,
        } = devices;
        sample_timer.stop();

        Self {
            signals,
            settings,
            state: State::Init,
            ledger: Ledger::new(storage),
            gps,
            gps_line: LineReader::new(),
            console,
            console_line: LineReader::new(),
            leds: StatusLeds::new(leds),
            sample_timer,
            delay,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the current state to completion and enter its successor.
    ///
    /// # Returns
    /// The new state.
    pub fn step(&mut self) -> State {
        let next = match self.state {
            State::Init => self.init(),
            State::Idle => self.idle(),
            State::Capturing => self.capture(),
            State::Storing(measurement) => self.store(&measurement),
            State::Error(fault) => self.fault(fault),
            State::Dump => self.dump(),
        };

        log::info!(
            "{} -> {}",
            <&'static str>::from(self.state),
            <&'static str>::from(next)
        );
        self.state = next;
        self.leds.show(next.indicator());
        next
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn sleep(&mut self) {
        self.delay.delay_ms(self.settings.poll_interval.to_millis());
    }

    fn init(&mut self) -> State {
        let signals = self.signals;
        let flags = &signals.flags;
        flags.clear(Event::PpsDetected);

        let mut backoff = self.settings.init_backoff.to_millis();
        let max = self.settings.init_backoff_max.to_millis();
        while !flags.take(Event::PpsDetected) {
            self.drain_gps();
            log::debug!("Waiting {backoff} ms for PPS");
            self.delay.delay_ms(backoff);
            backoff = backoff.saturating_mul(2).min(max);
        }

        State::Idle
    }

    fn idle(&mut self) -> State {
        loop {
            if self.signals.flags.take(Event::ButtonPressed) {
                return State::Capturing;
            }
            // Fixes are only read on request.
            self.drain_gps();

            let command = match self.console_line.poll(&mut self.console) {
                Ok(Some(line)) => {
                    let command = Command::parse(line);
                    if command.is_none() {
                        log::warn!("Unknown command `{line}`");
                    }
                    Some(command)
                }
                Ok(None) => None,
                Err(e) => {
                    log::warn!("Console read failed: {e:?}");
                    None
                }
            };

            match command {
                Some(Some(Command::Dump)) => return State::Dump,
                Some(Some(Command::Status)) => self.status(),
                Some(None) => self.report(&Rejected {
                    error: "unknown command",
                }),
                None => self.sleep(),
            }
        }
    }

    fn capture(&mut self) -> State {
        self.signals.flags.clear(Event::CaptureCancelled);
        self.signals.flags.set_capturing(true);
        self.signals.watchdog.arm();
        self.drain_gps();

        let result = self.acquire();

        self.sample_timer.stop();
        self.signals.acquisition.cancel();
        self.signals.watchdog.disarm();
        self.signals.flags.set_capturing(false);

        match result {
            Ok(measurement) => State::Storing(measurement),
            Err(fault) => {
                log::warn!("Capture failed: {fault}");
                State::Error(fault)
            }
        }
    }

    fn acquire(&mut self) -> Result<Measurement, Fault> {
        let fix = self.await_fix()?;
        log::info!("Fix at {}, {}", fix.latitude, fix.longitude);

        let signals = self.signals;
        let acquisition = &signals.acquisition;
        acquisition.start();
        self.sample_timer.start();
        while !acquisition.is_full() {
            self.check_abort()?;
            self.sleep();
        }
        self.sample_timer.stop();
        self.check_abort()?;

        let noise_level =
            noise::level(acquisition.samples(), &self.settings.calibration);
        log::info!(
            "Captured {} samples, {noise_level} dB SPL",
            acquisition.len()
        );

        Ok(Measurement {
            latitude: fix.latitude,
            longitude: fix.longitude,
            noise_level,
        })
    }

    fn check_abort(&self) -> Result<(), Fault> {
        if self.signals.flags.take(Event::CaptureCancelled) {
            return Err(Fault::CaptureCancelled);
        }
        if self.signals.watchdog.has_expired() {
            return Err(Fault::GpsSignalLost);
        }
        Ok(())
    }

    /// Discard buffered GPS input.
    fn drain_gps(&mut self) {
        self.gps_line.clear();
        let mut buffer = [0u8; 32];
        while let Ok(true) = self.gps.read_ready() {
            if !matches!(self.gps.read(&mut buffer), Ok(len) if len > 0) {
                break;
            }
        }
    }

    fn await_fix(&mut self) -> Result<Fix, Fault> {
        loop {
            self.check_abort()?;

            match self.gps_line.poll(&mut self.gps) {
                // Tail of a sentence cut by the drain.
                Ok(Some(line)) if !line.starts_with('$') => {
                    log::debug!("Skipping partial sentence");
                }
                Ok(Some(line)) => match gnss::parse_rmc(line) {
                    Ok(fix) => return Ok(fix),
                    Err(GnssError::NotRmc) => {
                        log::debug!("Skipping `{line}`");
                    }
                    Err(e) => {
                        log::warn!("Invalid RMC `{line}`: {e}");
                        return Err(Fault::GpsFixInvalid);
                    }
                },
                Ok(None) => self.sleep(),
                Err(e) => {
                    log::warn!("GPS read failed: {e:?}");
                    return Err(Fault::GpsFixInvalid);
                }
            }
        }
    }

    fn store(&mut self, measurement: &Measurement) -> State {
        match self.ledger.append(measurement) {
            Ok(index) => {
                log::info!("Stored record {index}: {measurement:?}");
                self.delay.delay_ms(self.settings.success_hold.to_millis());
                State::Idle
            }
            Err(e) => {
                log::warn!("Storing {measurement:?} failed: {e}");
                State::Error(Fault::StorageWriteFailed)
            }
        }
    }

    fn fault(&mut self, fault: Fault) -> State {
        let blink = self.settings.blink.to_millis();
        for _ in 0..fault.blinks() {
            self.leds.set(Indicator::Fault, false);
            self.delay.delay_ms(blink);
            self.leds.set(Indicator::Fault, true);
            self.delay.delay_ms(blink);
        }

        let shown = 2 * blink * fault.blinks();
        self.delay.delay_ms(
            self.settings.fault_hold.to_millis().saturating_sub(shown),
        );

        // Presses during the fault display are not capture requests.
        self.signals.flags.clear(Event::ButtonPressed);
        self.signals.flags.clear(Event::CaptureCancelled);
        State::Init
    }

    fn dump(&mut self) -> State {
        let records = self.ledger.len().min(self.settings.max_dump_records);
        self.report(&DumpHeader { records });

        for index in 0..records {
            match self.ledger.read(index) {
                Ok(measurement) => self.report(&Record { index, measurement }),
                Err(e) => {
                    log::warn!("Reading record {index} failed: {e}");
                    return State::Error(Fault::StorageReadFailed);
                }
            }
        }

        State::Idle
    }

    fn status(&mut self) {
        let cursors = self.ledger.cursors();
        self.report(&Status {
            records: self.ledger.len(),
            capacity: self.ledger.capacity(),
            location_offset: cursors.location,
            noise_offset: cursors.noise,
        });
    }

    /// Write one JSON line to the console.
    fn report<R: Serialize>(&mut self, report: &R) {
        let mut buffer = [0u8; REPORT_SIZE];
        let len = match serde_json_core::to_slice(report, &mut buffer) {
            Ok(len) => len,
            Err(e) => {
                log::error!("Report serialization failed: {e:?}");
                return;
            }
        };

        if let Err(e) = self
            .console
            .write_all(&buffer[..len])
            .and_then(|()| self.console.write_all(b"\r\n"))
        {
            log::warn!("Console write failed: {e:?}");
        }
    }
}
