//! # Noise logger
//!
//! Captures a geotagged sound pressure level on each button press and appends it to the
//! on-board EEPROM.
//!
//! ## Tasks
//! * The idle task runs the blocking [Controller] state machine.
//! * Button and PPS edges, sample timer updates and serial receive interrupts are hardware
//!   tasks. They only touch [SIGNALS] and the receive queues.
//! * An async task checks the PPS deadline once per timeout period.
//!
//! ## Console
//! The console USART accepts `DUMP` and `STATUS` lines while the logger is idle. Replies are
//! JSON lines.
#![no_std]
#![no_main]

use noisemap::{acquisition::SAMPLE_CAPACITY, Controller, Devices, Settings, Signals};

mod hardware;

static SIGNALS: Signals<SAMPLE_CAPACITY> = Signals::new();

#[rtic::app(device = stm32h7xx_hal::stm32, peripherals = true, dispatchers=[DCMI, JPEG, SDMMC])]
mod app {
    use super::*;
    use hardware::{
        design_parameters, hal::gpio::ExtiPin, sample_timer::Microphone,
        serial::RxQueue, setup, AsmDelay, Button, ConsolePort,
        ConsoleReceiver, Eeprom, GpsPort, GpsReceiver, Led, Pps, Systick,
    };

    type Logger = Controller<
        'static,
        Eeprom,
        GpsPort,
        ConsolePort,
        Led,
        hardware::sample_timer::SampleTimer,
        AsmDelay,
        SAMPLE_CAPACITY,
    >;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        controller: Logger,
        button: Button,
        last_press: Option<u32>,
        pps: Pps,
        microphone: Microphone,
        gps_receiver: GpsReceiver,
        console_receiver: ConsoleReceiver,
    }

    #[init(local = [queues: [RxQueue; 2] = [RxQueue::new(), RxQueue::new()]])]
    fn init(c: init::Context) -> (Shared, Local) {
        let settings = Settings::default();
        let [gps_queue, console_queue] = c.local.queues;

        let board = setup::setup(
            c.core,
            c.device,
            &settings,
            [gps_queue, console_queue],
        );
        let pps_timeout = settings.pps_timeout;

        log::info!(
            "Sampling {} values every {}",
            SAMPLE_CAPACITY,
            settings.sample_period
        );

        let devices = Devices {
            storage: board.eeprom,
            gps: board.gps,
            console: board.console,
            leds: board.leds,
            sample_timer: board.sample_timer,
            delay: board.delay,
        };

        let local = Local {
            controller: Controller::new(&SIGNALS, devices, settings),
            button: board.button,
            last_press: None,
            pps: board.pps,
            microphone: board.microphone,
            gps_receiver: board.gps_receiver,
            console_receiver: board.console_receiver,
        };

        watchdog::spawn(pps_timeout).unwrap();

        (Shared {}, local)
    }

    #[idle(local=[controller])]
    fn idle(c: idle::Context) -> ! {
        c.local.controller.run()
    }

    /// Periodic PPS deadline check.
    #[task(priority = 1)]
    async fn watchdog(_: watchdog::Context, period: fugit::MillisDurationU32) {
        loop {
            Systick::delay(period).await;
            SIGNALS.on_watchdog_tick();
        }
    }

    #[task(binds = EXTI15_10, priority = 2, local=[button, last_press])]
    fn button(c: button::Context) {
        c.local.button.clear_interrupt_pending_bit();

        let now = Systick::now().ticks();
        let bounce = c.local.last_press.is_some_and(|last| {
            now.wrapping_sub(last) < design_parameters::BUTTON_DEBOUNCE_MS
        });
        if !bounce {
            *c.local.last_press = Some(now);
            SIGNALS.on_button();
        }
    }

    #[task(binds = EXTI4, priority = 3, local=[pps])]
    fn pps(c: pps::Context) {
        c.local.pps.clear_interrupt_pending_bit();
        SIGNALS.on_pps();
    }

    #[task(binds = TIM2, priority = 3, local=[microphone])]
    fn sample(c: sample::Context) {
        if let Some(value) = c.local.microphone.sample() {
            SIGNALS.on_sample(value);
        }
    }

    #[task(binds = USART2, priority = 2, local=[gps_receiver])]
    fn gps_rx(c: gps_rx::Context) {
        c.local.gps_receiver.on_interrupt();
        if let Some(dropped) = c.local.gps_receiver.take_overrun() {
            log::warn!("GPS overrun, {} bytes dropped", dropped);
        }
    }

    #[task(binds = USART3, priority = 2, local=[console_receiver])]
    fn console_rx(c: console_rx::Context) {
        c.local.console_receiver.on_interrupt();
        if let Some(dropped) = c.local.console_receiver.take_overrun() {
            log::warn!("Console overrun, {} bytes dropped", dropped);
        }
    }
}
