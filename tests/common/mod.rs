//! Simulated board for driving the controller on the host.
//!
//! Time only advances inside the controller's delays. While it advances, the simulation delivers
//! PPS pulses, GPS sentences, PPS watchdog checks, sample timer ticks and scripted button presses
//! and console input through [Signals] exactly like the interrupt handlers do on hardware.
#![allow(dead_code)]

use core::convert::Infallible;
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use fugit::ExtU32;
use noisemap::{
    acquisition::SampleTimer, ledger::Storage, Controller, Devices, Settings,
    Signals,
};

pub const SAMPLES: usize = 64;

pub const SECOND: u64 = 1_000_000;

/// Square wave amplitude giving 86 dB SPL with the default calibration.
pub const LOUD: u16 = 300;

/// Square wave amplitude giving 70 dB SPL with the default calibration.
pub const QUIET: u16 = 50;

pub type Bench<'a> =
    Controller<'a, Memory, GpsPort, Console, Led, Timer, Clock<'a>, SAMPLES>;

#[derive(Debug, Clone)]
pub enum Action {
    Button,
    Console(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Pps,
    Gps,
    Watchdog,
    Sample,
    Script,
}

pub struct World {
    /// Simulated time in microseconds.
    pub now: u64,
    /// Time after which the simulation panics.
    pub limit: u64,

    /// PPS pulses are generated at whole seconds in `pps_from..pps_until`.
    pub pps_from: u64,
    pub pps_until: u64,
    next_pps: u64,

    /// Sentences the receiver emits 100 ms after every second.
    pub gps: Vec<String>,
    pub gps_rx: VecDeque<u8>,
    next_gps: u64,

    watchdog_period: u64,
    next_watchdog: u64,

    pub timer_running: bool,
    pub timer_starts: usize,
    pub timer_stops: usize,
    sample_period: u64,
    next_sample: u64,
    sample_count: u64,
    /// Square wave amplitude around mid scale.
    pub amplitude: u16,

    pub console_rx: VecDeque<u8>,
    pub console_tx: String,

    pub leds: [bool; 4],
    /// Rising edges of the fault LED.
    pub fault_edges: usize,

    script: VecDeque<(u64, Action)>,

    pub memory: [[u8; 256]; 2],
    pub fail_write: bool,
    pub fail_read: bool,
    pub bus_accesses: usize,
}

impl World {
    fn new(settings: &Settings) -> Self {
        let watchdog_period = settings.pps_timeout.to_micros() as u64;
        Self {
            now: 0,
            limit: 60 * SECOND,
            pps_from: 0,
            pps_until: u64::MAX,
            next_pps: SECOND,
            gps: vec![],
            gps_rx: VecDeque::new(),
            next_gps: SECOND + SECOND / 10,
            watchdog_period,
            next_watchdog: watchdog_period + SECOND / 2,
            timer_running: false,
            timer_starts: 0,
            timer_stops: 0,
            sample_period: settings.sample_period.to_micros() as u64,
            next_sample: 0,
            sample_count: 0,
            amplitude: LOUD,
            console_rx: VecDeque::new(),
            console_tx: String::new(),
            leds: [false; 4],
            fault_edges: 0,
            script: VecDeque::new(),
            memory: [[0xff; 256]; 2],
            fail_write: false,
            fail_read: false,
            bus_accesses: 0,
        }
    }

    /// Schedule an action at an absolute time in seconds.
    pub fn at(&mut self, seconds: f64, action: Action) {
        let time = (seconds * SECOND as f64) as u64;
        let index = self.script.partition_point(|(t, _)| *t <= time);
        self.script.insert(index, (time, action));
    }

    pub fn console_lines(&self) -> Vec<&str> {
        self.console_tx.lines().collect()
    }

    fn next_event(&self) -> Option<(u64, Source)> {
        let mut events = vec![
            (self.next_pps, Source::Pps),
            (self.next_gps, Source::Gps),
            (self.next_watchdog, Source::Watchdog),
        ];
        if self.timer_running {
            events.push((self.next_sample, Source::Sample));
        }
        if let Some((time, _)) = self.script.front() {
            events.push((*time, Source::Script));
        }
        events.into_iter().min_by_key(|(time, _)| *time)
    }

    fn waveform(&mut self) -> u16 {
        let sample = if self.sample_count % 2 == 0 {
            2048 + self.amplitude
        } else {
            2048 - self.amplitude
        };
        self.sample_count += 1;
        sample
    }
}

/// Build an RMC sentence with checksum.
pub fn rmc(status: char, latitude: &str, longitude: &str) -> String {
    nmea(&format!(
        "GNRMC,123519.00,{status},{latitude},{longitude},0.02,,191026,,,A"
    ))
}

pub fn nmea(body: &str) -> String {
    let sum = body.bytes().fold(0u8, |sum, byte| sum ^ byte);
    format!("${body}*{sum:02X}")
}

pub fn gga() -> String {
    nmea("GNGGA,123519.00,4717.1120,N,00833.9150,E,1,08,0.9,545.4,M,46.9,M,,")
}

/// The default fix used by most scenarios: 47.2852 N, 8.56525 E.
pub fn zurich() -> Vec<String> {
    vec![gga(), rmc('A', "4717.1120,N", "00833.9150,E")]
}

/// 33.859 S, 151.21 E.
pub fn sydney() -> Vec<String> {
    vec![rmc('A', "3351.5400,S", "15112.6000,E"), gga()]
}

pub struct Clock<'a> {
    world: Rc<RefCell<World>>,
    signals: &'a Signals<SAMPLES>,
}

impl Clock<'_> {
    fn advance(&mut self, us: u64) {
        let end = self.world.borrow().now + us;
        loop {
            let mut guard = self.world.borrow_mut();
            let world = &mut *guard;
            let (time, source) = match world.next_event() {
                Some((time, source)) if time <= end => (time, source),
                _ => break,
            };
            world.now = time;

            match source {
                Source::Pps => {
                    world.next_pps += SECOND;
                    if (world.pps_from..world.pps_until).contains(&time) {
                        self.signals.on_pps();
                    }
                }
                Source::Gps => {
                    world.next_gps += SECOND;
                    let sentences: String = world
                        .gps
                        .iter()
                        .map(|sentence| format!("{sentence}\r\n"))
                        .collect();
                    world.gps_rx.extend(sentences.bytes());
                }
                Source::Watchdog => {
                    world.next_watchdog += world.watchdog_period;
                    self.signals.on_watchdog_tick();
                }
                Source::Sample => {
                    world.next_sample += world.sample_period;
                    let sample = world.waveform();
                    self.signals.on_sample(sample);
                }
                Source::Script => match world.script.pop_front() {
                    Some((_, Action::Button)) => self.signals.on_button(),
                    Some((_, Action::Console(line))) => {
                        world.console_rx.extend(line.bytes());
                        world.console_rx.push_back(b'\n');
                    }
                    None => {}
                },
            }
        }

        let mut world = self.world.borrow_mut();
        world.now = end;
        assert!(
            world.now <= world.limit,
            "Simulation exceeded {} s",
            world.limit / SECOND
        );
    }
}

impl DelayNs for Clock<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.advance((ns as u64).div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms as u64 * 1000);
    }
}

pub struct GpsPort(Rc<RefCell<World>>);

impl embedded_io::ErrorType for GpsPort {
    type Error = Infallible;
}

impl embedded_io::Read for GpsPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut world = self.0.borrow_mut();
        let len = buf.len().min(world.gps_rx.len());
        for (slot, byte) in buf.iter_mut().zip(world.gps_rx.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

impl embedded_io::ReadReady for GpsPort {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().gps_rx.is_empty())
    }
}

pub struct Console(Rc<RefCell<World>>);

impl embedded_io::ErrorType for Console {
    type Error = Infallible;
}

impl embedded_io::Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut world = self.0.borrow_mut();
        let len = buf.len().min(world.console_rx.len());
        for (slot, byte) in buf.iter_mut().zip(world.console_rx.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

impl embedded_io::ReadReady for Console {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().console_rx.is_empty())
    }
}

impl embedded_io::Write for Console {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0
            .borrow_mut()
            .console_tx
            .push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct Led(Rc<RefCell<World>>, usize);

impl embedded_hal::digital::ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().leds[self.1] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut world = self.0.borrow_mut();
        if self.1 == 3 && !world.leds[3] {
            world.fault_edges += 1;
        }
        world.leds[self.1] = true;
        Ok(())
    }
}

pub struct Timer(Rc<RefCell<World>>);

impl SampleTimer for Timer {
    fn start(&mut self) {
        let mut guard = self.0.borrow_mut();
        let world = &mut *guard;
        world.timer_running = true;
        world.timer_starts += 1;
        world.sample_count = 0;
        world.next_sample = world.now + world.sample_period;
    }

    fn stop(&mut self) {
        let mut world = self.0.borrow_mut();
        world.timer_running = false;
        world.timer_stops += 1;
    }
}

#[derive(Debug, PartialEq)]
pub struct BusError;

pub struct Memory(Rc<RefCell<World>>);

impl Storage for Memory {
    type Error = BusError;

    fn write(
        &mut self,
        block: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        let mut world = self.0.borrow_mut();
        world.bus_accesses += 1;
        if world.fail_write {
            return Err(BusError);
        }
        let offset = offset as usize;
        world.memory[block as usize][offset..offset + data.len()]
            .copy_from_slice(data);
        Ok(())
    }

    fn read(
        &mut self,
        block: u8,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        let mut world = self.0.borrow_mut();
        world.bus_accesses += 1;
        if world.fail_read {
            return Err(BusError);
        }
        let offset = offset as usize;
        buffer.copy_from_slice(
            &world.memory[block as usize][offset..offset + buffer.len()],
        );
        Ok(())
    }
}

/// Default settings with a 1 ms sample period so a capture takes 64 ms.
pub fn settings() -> Settings {
    Settings {
        sample_period: 1_000.micros(),
        ..Default::default()
    }
}

pub fn bench(
    signals: &Signals<SAMPLES>,
    settings: Settings,
) -> (Rc<RefCell<World>>, Bench<'_>) {
    let world = Rc::new(RefCell::new(World::new(&settings)));
    world.borrow_mut().gps = zurich();

    let devices = Devices {
        storage: Memory(world.clone()),
        gps: GpsPort(world.clone()),
        console: Console(world.clone()),
        leds: [0, 1, 2, 3].map(|index| Led(world.clone(), index)),
        sample_timer: Timer(world.clone()),
        delay: Clock {
            world: world.clone(),
            signals,
        },
    };

    (world, Controller::new(signals, devices, settings))
}

/// Seconds of simulated time.
pub fn now(world: &Rc<RefCell<World>>) -> f64 {
    world.borrow().now as f64 / SECOND as f64
}
