//! Append-only measurement storage
//!
//! # Design
//! Each measurement is split over two EEPROM blocks: the position as two little endian `f64` in
//! the location block and the one byte noise level in the noise block. Record `i` lives at
//! `i * LOCATION_STRIDE` and `i * NOISE_STRIDE` respectively, so the two blocks stay index
//! aligned as long as both cursors only ever advance together.
//!
//! A cursor advances only after both writes of an append succeeded. A failed append leaves the
//! slot free for the next attempt. Once the location block is full further appends are rejected.
//! Cursors start at zero on boot, nothing about the stored contents is recovered.
use core::fmt::Debug;
use serde::Serialize;

/// EEPROM block holding latitude and longitude.
pub const LOCATION_BLOCK: u8 = 0;

/// EEPROM block holding noise levels.
pub const NOISE_BLOCK: u8 = 1;

pub const LOCATION_STRIDE: usize = 16;
pub const NOISE_STRIDE: usize = 1;

/// Number of records that fit the location block.
pub const CAPACITY: usize = at24c::BLOCK_SIZE / LOCATION_STRIDE;

/// One geotagged noise measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Decimal degrees, north positive.
    pub latitude: f64,
    /// Decimal degrees, east positive.
    pub longitude: f64,
    /// dB SPL.
    pub noise_level: u8,
}

/// Byte addressed block storage.
pub trait Storage {
    type Error: Debug;

    fn write(
        &mut self,
        block: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    fn read(
        &mut self,
        block: u8,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}

impl<I2C, D> Storage for at24c::At24c<I2C, D>
where
    I2C: embedded_hal::i2c::I2c,
    D: embedded_hal::delay::DelayNs,
{
    type Error = at24c::Error;

    fn write(
        &mut self,
        block: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        at24c::At24c::write(self, block, offset, data)
    }

    fn read(
        &mut self,
        block: u8,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        at24c::At24c::read(self, block, offset, buffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError<E> {
    #[error("Ledger full")]
    Full,
    #[error("No record at index {0}")]
    OutOfRange(usize),
    #[error("Storage error: {0:?}")]
    Storage(E),
}

/// Current write offsets into the two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursors {
    pub location: usize,
    pub noise: usize,
}

pub struct Ledger<S> {
    storage: S,
    cursors: Cursors,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cursors: Cursors {
                location: 0,
                noise: 0,
            },
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.cursors.location / LOCATION_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    /// Store a measurement after the last record.
    ///
    /// # Returns
    /// The index of the new record.
    pub fn append(
        &mut self,
        measurement: &Measurement,
    ) -> Result<usize, LedgerError<S::Error>> {
        let index = self.len();
        if index >= CAPACITY {
            return Err(LedgerError::Full);
        }

        let mut location = [0u8; LOCATION_STRIDE];
        location[..8].copy_from_slice(&measurement.latitude.to_le_bytes());
        location[8..].copy_from_slice(&measurement.longitude.to_le_bytes());

        self.storage
            .write(LOCATION_BLOCK, self.cursors.location as u8, &location)
            .map_err(LedgerError::Storage)?;
        self.storage
            .write(
                NOISE_BLOCK,
                self.cursors.noise as u8,
                &[measurement.noise_level],
            )
            .map_err(LedgerError::Storage)?;

        self.cursors.location += LOCATION_STRIDE;
        self.cursors.noise += NOISE_STRIDE;
        Ok(index)
    }

    /// Read back the record at `index`.
    pub fn read(
        &mut self,
        index: usize,
    ) -> Result<Measurement, LedgerError<S::Error>> {
        if index >= self.len() {
            return Err(LedgerError::OutOfRange(index));
        }

        let mut location = [0u8; LOCATION_STRIDE];
        self.storage
            .read(
                LOCATION_BLOCK,
                (index * LOCATION_STRIDE) as u8,
                &mut location,
            )
            .map_err(LedgerError::Storage)?;

        let mut noise = [0u8; NOISE_STRIDE];
        self.storage
            .read(NOISE_BLOCK, (index * NOISE_STRIDE) as u8, &mut noise)
            .map_err(LedgerError::Storage)?;

        let [latitude, longitude] = [0, 8].map(|at| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&location[at..at + 8]);
            f64::from_le_bytes(raw)
        });
        Ok(Measurement {
            latitude,
            longitude,
            noise_level: noise[0],
        })
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn release(self) -> S {
        self.storage
    }
}
