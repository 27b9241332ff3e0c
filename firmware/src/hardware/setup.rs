//! Logger hardware configuration
//!
//! This file contains all of the hardware-specific configuration of the logger.
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal_compat::ForwardCompat;
use stm32h7xx_hal::{
    self as hal,
    adc,
    gpio::{Edge, ExtiPin},
    prelude::*,
};

use noisemap::Settings;

use super::{
    design_parameters,
    sample_timer::{Microphone, SampleTimer},
    serial::{Port, Receiver, RxQueue},
    AsmDelay, Button, ConsolePort, ConsoleReceiver, Eeprom, GpsPort,
    GpsReceiver, Led, Pps, Systick,
};

/// The configured peripherals.
pub struct Board {
    pub eeprom: Eeprom,
    pub gps: GpsPort,
    pub gps_receiver: GpsReceiver,
    pub console: ConsolePort,
    pub console_receiver: ConsoleReceiver,
    /// Ready, busy, done, fault.
    pub leds: [Led; 4],
    pub button: Button,
    pub pps: Pps,
    pub sample_timer: SampleTimer,
    pub microphone: Microphone,
    pub delay: AsmDelay,
}

/// Configure the logger hardware for operation.
///
/// # Args
/// * `core` - The cortex-m peripherals.
/// * `device` - The microcontroller peripherals to be configured.
/// * `settings` - Provides the sample period.
/// * `queues` - Receive buffers for the GPS and console ports.
///
/// # Returns
/// All peripherals in an idle state. The sample timer is paused, EXTI and USART receive
/// interrupts are enabled.
pub fn setup(
    mut core: hal::stm32::CorePeripherals,
    device: hal::stm32::Peripherals,
    settings: &Settings,
    queues: [&'static mut RxQueue; 2],
) -> Board {
    // Set up RTT logging
    {
        // Enable debug during WFE/WFI-induced sleep
        device.DBGMCU.cr.modify(|_, w| w.dbgsleep_d1().set_bit());

        // Set up RTT channel to use for `rprintln!()` as "best effort".
        // This removes a critical section around the logging and thus allows
        // high-prio tasks to always interrupt at low latency.
        // It comes at a cost:
        // If a high-priority tasks preempts while we are logging something,
        // and if we then also want to log from within that high-priority task,
        // the high-prio log message will be lost.

        let channels = rtt_target::rtt_init_default!();
        // Note(unsafe): The closure we pass does not establish a critical section
        // as demanded but it does ensure synchronization and implements a lock.
        unsafe {
            rtt_target::set_print_channel_cs(
                channels.up.0,
                &((|arg, f| {
                    static LOCKED: AtomicBool = AtomicBool::new(false);
                    if LOCKED.compare_exchange_weak(
                        false,
                        true,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    ) == Ok(false)
                    {
                        f(arg);
                        LOCKED.store(false, Ordering::Release);
                    }
                }) as rtt_target::CriticalSectionFunc),
            );
        }

        static LOGGER: rtt_logger::RTTLogger =
            rtt_logger::RTTLogger::new(log::LevelFilter::Info);
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(log::LevelFilter::Trace))
            .unwrap();
        log::info!("Starting");
    }

    let pwr = device.PWR.constrain();
    let vos = pwr.freeze();

    // Clear reset flags.
    device.RCC.rsr.write(|w| w.rmvf().set_bit());

    // The ADC runs from per_ck.
    device.RCC.d3ccipr.modify(|_, w| w.adcsel().per());

    let rcc = device.RCC.constrain();
    let ccdr = rcc
        .sysclk(design_parameters::SYSCLK.convert())
        .hclk(200.MHz())
        .per_ck(64.MHz())
        .freeze(vos, &device.SYSCFG);

    Systick::start(core.SYST, ccdr.clocks.sysclk().to_Hz());

    core.SCB.enable_icache();

    let mut delay = AsmDelay::new(ccdr.clocks.c_ck().to_Hz());

    let gpioa = device.GPIOA.split(ccdr.peripheral.GPIOA);
    let gpiob = device.GPIOB.split(ccdr.peripheral.GPIOB);
    let gpioc = device.GPIOC.split(ccdr.peripheral.GPIOC);
    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);
    let gpioe = device.GPIOE.split(ccdr.peripheral.GPIOE);

    let leds = [
        gpiob.pb0.into_push_pull_output().erase().forward(),
        gpioe.pe1.into_push_pull_output().erase().forward(),
        gpioe.pe2.into_push_pull_output().erase().forward(),
        gpiob.pb14.into_push_pull_output().erase().forward(),
    ];

    let eeprom = {
        let scl = gpiob.pb8.into_alternate().set_open_drain();
        let sda = gpiob.pb9.into_alternate().set_open_drain();
        let i2c = device.I2C1.i2c(
            (scl, sda),
            design_parameters::I2C_FREQUENCY,
            ccdr.peripheral.I2C1,
            &ccdr.clocks,
        );
        at24c::At24c::new(
            i2c.forward(),
            delay,
            design_parameters::EEPROM_BLOCKS,
        )
    };

    let [gps_queue, console_queue] = queues;

    let (gps, gps_receiver) = {
        let tx = gpiod.pd5.into_alternate();
        let rx = gpiod.pd6.into_alternate();
        let mut serial = device
            .USART2
            .serial(
                (tx, rx),
                design_parameters::GPS_BAUD.bps(),
                ccdr.peripheral.USART2,
                &ccdr.clocks,
            )
            .unwrap();
        serial.listen(hal::serial::Event::Rxne);
        let (tx, rx) = serial.split();
        let (producer, consumer) = gps_queue.split();
        (Port::new(tx, consumer), Receiver::new(rx, producer))
    };

    let (console, console_receiver) = {
        let tx = gpiod.pd8.into_alternate();
        let rx = gpiod.pd9.into_alternate();
        let mut serial = device
            .USART3
            .serial(
                (tx, rx),
                design_parameters::CONSOLE_BAUD.bps(),
                ccdr.peripheral.USART3,
                &ccdr.clocks,
            )
            .unwrap();
        serial.listen(hal::serial::Event::Rxne);
        let (tx, rx) = serial.split();
        let (producer, consumer) = console_queue.split();
        (Port::new(tx, consumer), Receiver::new(rx, producer))
    };

    let (button, pps) = {
        let mut syscfg = device.SYSCFG;
        let mut exti = device.EXTI;

        let mut button = gpioc.pc13.into_floating_input();
        button.make_interrupt_source(&mut syscfg);
        button.trigger_on_edge(&mut exti, Edge::Rising);
        button.enable_interrupt(&mut exti);

        let mut pps = gpiod.pd4.into_floating_input();
        pps.make_interrupt_source(&mut syscfg);
        pps.trigger_on_edge(&mut exti, Edge::Rising);
        pps.enable_interrupt(&mut exti);

        (button, pps)
    };

    let microphone = {
        let mut adc = adc::Adc::adc1(
            device.ADC1,
            design_parameters::ADC_CLOCK.convert(),
            &mut delay,
            ccdr.peripheral.ADC12,
            &ccdr.clocks,
        )
        .enable();
        adc.set_resolution(adc::Resolution::TwelveBit);
        adc.set_sample_time(adc::AdcSampleTime::T_16);
        Microphone::new(adc, gpioa.pa3.into_analog())
    };

    let sample_timer = {
        let period = settings.sample_period;
        let timer = device.TIM2.timer(
            period.into_rate(),
            ccdr.peripheral.TIM2,
            &ccdr.clocks,
        );
        SampleTimer::new(timer)
    };

    log::info!("Setup complete");

    Board {
        eeprom,
        gps,
        gps_receiver,
        console,
        console_receiver,
        leds,
        button,
        pps,
        sample_timer,
        microphone,
        delay,
    }
}
