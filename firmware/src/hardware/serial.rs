//! Interrupt driven serial ports
//!
//! The USART receive interrupt moves bytes into a single producer single consumer queue, the
//! controller drains the queue through `embedded_io` from the idle loop. Transmission is
//! blocking.
use core::convert::Infallible;

use embedded_hal_02::serial;
use heapless::spsc::{Consumer, Producer};
use stm32h7xx_hal::serial::{Rx, Tx};

use super::design_parameters::RX_QUEUE_SIZE;

pub type RxQueue = heapless::spsc::Queue<u8, RX_QUEUE_SIZE>;

/// Interrupt side of a port.
pub struct Receiver<USART> {
    rx: Rx<USART>,
    queue: Producer<'static, u8, RX_QUEUE_SIZE>,
    dropped: usize,
    overrun: Option<usize>,
}

impl<USART> Receiver<USART>
where
    Rx<USART>: serial::Read<u8>,
{
    pub fn new(
        rx: Rx<USART>,
        queue: Producer<'static, u8, RX_QUEUE_SIZE>,
    ) -> Self {
        Self {
            rx,
            queue,
            dropped: 0,
            overrun: None,
        }
    }

    /// Move all pending bytes into the queue.
    ///
    /// # Note
    /// This is intended to be called from the USART interrupt.
    pub fn on_interrupt(&mut self) {
        loop {
            match serial::Read::read(&mut self.rx) {
                Ok(byte) => {
                    if self.queue.enqueue(byte).is_err() {
                        self.dropped += 1;
                    } else if self.dropped > 0 {
                        self.overrun = Some(core::mem::take(&mut self.dropped));
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                // Overrun and framing errors are cleared by the read.
                Err(nb::Error::Other(_)) => {}
            }
        }
    }

    /// Bytes lost to the last full queue episode.
    ///
    /// An episode is reported once, after the queue accepts input again.
    pub fn take_overrun(&mut self) -> Option<usize> {
        self.overrun.take()
    }
}

/// Controller side of a port.
pub struct Port<USART> {
    tx: Tx<USART>,
    queue: Consumer<'static, u8, RX_QUEUE_SIZE>,
}

impl<USART> Port<USART> {
    pub fn new(
        tx: Tx<USART>,
        queue: Consumer<'static, u8, RX_QUEUE_SIZE>,
    ) -> Self {
        Self { tx, queue }
    }
}

impl<USART> embedded_io::ErrorType for Port<USART> {
    type Error = Infallible;
}

impl<USART> embedded_io::Read for Port<USART> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut len = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.queue.dequeue() else {
                break;
            };
            *slot = byte;
            len += 1;
        }
        Ok(len)
    }
}

impl<USART> embedded_io::ReadReady for Port<USART> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.queue.ready())
    }
}

impl<USART> embedded_io::Write for Port<USART>
where
    Tx<USART>: serial::Write<u8>,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for byte in buf {
            nb::block!(serial::Write::write(&mut self.tx, *byte)).ok();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        nb::block!(serial::Write::flush(&mut self.tx)).ok();
        Ok(())
    }
}
