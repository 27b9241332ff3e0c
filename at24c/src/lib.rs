//! Blocking driver for 24C04/24C08/24C16 style I2C EEPROMs.
//!
//! # Design
//! These devices expose their memory as a number of 256 byte blocks. Each block answers on its own
//! I2C address (`0x50 + block`) and is addressed internally with a single word-address byte. Page
//! writes wrap inside a 16 byte page, so longer writes are split at page boundaries. After every
//! page write the device is busy for the write cycle time and NACKs its address, so the driver
//! waits out the write cycle before returning.
#![no_std]

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, I2c};

/// The size of one addressable block in bytes.
pub const BLOCK_SIZE: usize = 256;

/// The size of one write page in bytes.
pub const PAGE_SIZE: usize = 16;

/// Maximum write cycle time of the device.
pub const WRITE_CYCLE_MS: u32 = 5;

// The 3 LSB of the device address select the block (A0..A2 are not connected on these parts).
const BASE_ADDRESS: u8 = 0x50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Access out of bounds: offset {offset} + {len} bytes exceeds the block")]
    OutOfBounds { offset: u8, len: usize },
    #[error("Block {0} not present")]
    InvalidBlock(u8),
    #[error("I2C error {0}")]
    I2c(i2c::ErrorKind),
}

impl<E: i2c::Error> From<E> for Error {
    fn from(value: E) -> Self {
        Self::I2c(value.kind())
    }
}

pub struct At24c<I2C, D> {
    i2c: I2C,
    delay: D,
    blocks: u8,
}

impl<I2C: I2c, D: DelayNs> At24c<I2C, D> {
    /// Construct the driver.
    ///
    /// # Args
    /// * `i2c` - The bus the device is attached to.
    /// * `delay` - Used to wait out the write cycle after each page write.
    /// * `blocks` - The number of 256 byte blocks of the device (2 for a 24C04).
    pub fn new(i2c: I2C, delay: D, blocks: u8) -> Self {
        assert!(blocks > 0 && blocks <= 8);
        Self { i2c, delay, blocks }
    }

    /// Release the bus and the delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// The number of blocks of the device.
    pub fn blocks(&self) -> u8 {
        self.blocks
    }

    fn address(&self, block: u8) -> Result<u8, Error> {
        if block < self.blocks {
            Ok(BASE_ADDRESS | block)
        } else {
            Err(Error::InvalidBlock(block))
        }
    }

    fn check_bounds(offset: u8, len: usize) -> Result<(), Error> {
        if offset as usize + len > BLOCK_SIZE {
            Err(Error::OutOfBounds { offset, len })
        } else {
            Ok(())
        }
    }

    /// Write `data` to `block` starting at `offset`.
    ///
    /// # Note
    /// This blocks for the device write cycle after every page.
    pub fn write(
        &mut self,
        block: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        Self::check_bounds(offset, data.len())?;
        let address = self.address(block)?;

        let mut pointer = offset as usize;
        let mut remaining = data;
        while !remaining.is_empty() {
            let len = (PAGE_SIZE - pointer % PAGE_SIZE).min(remaining.len());
            let (page, rest) = remaining.split_at(len);

            let mut frame = [0u8; PAGE_SIZE + 1];
            frame[0] = pointer as u8;
            frame[1..=len].copy_from_slice(page);
            self.i2c.write(address, &frame[..=len])?;
            self.delay.delay_ms(WRITE_CYCLE_MS);

            pointer += len;
            remaining = rest;
        }

        Ok(())
    }

    /// Fill `buffer` from `block` starting at `offset`.
    pub fn read(
        &mut self,
        block: u8,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        Self::check_bounds(offset, buffer.len())?;
        let address = self.address(block)?;

        if buffer.is_empty() {
            return Ok(());
        }

        self.i2c.write_read(address, &[offset], buffer)?;
        Ok(())
    }
}
