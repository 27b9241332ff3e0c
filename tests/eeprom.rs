//! Ledger layout on a 24C04 through the EEPROM driver.
use at24c::At24c;
use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation},
};
use noisemap::ledger::{Ledger, LedgerError, Measurement, CAPACITY};

struct Eeprom {
    blocks: [[u8; 256]; 2],
    addresses: Vec<u8>,
    fail: bool,
}

impl ErrorType for Eeprom {
    type Error = ErrorKind;
}

impl I2c for Eeprom {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        if self.fail {
            return Err(nack);
        }
        let block = match address {
            0x50 | 0x51 => (address - 0x50) as usize,
            _ => return Err(nack),
        };
        self.addresses.push(address);

        let mut pointer = 0usize;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let Some((word, data)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = *word as usize;
                    for byte in data {
                        self.blocks[block][pointer] = *byte;
                        pointer = (pointer & !0xf) | ((pointer + 1) & 0xf);
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.blocks[block][pointer];
                        pointer = (pointer + 1) % 256;
                    }
                }
            }
        }
        Ok(())
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn eeprom() -> Eeprom {
    Eeprom {
        blocks: [[0xff; 256]; 2],
        addresses: vec![],
        fail: false,
    }
}

fn measurement(i: usize) -> Measurement {
    Measurement {
        latitude: -12.5 + i as f64,
        longitude: 100.25 - i as f64,
        noise_level: 60 + i as u8,
    }
}

#[test]
fn layout() {
    let mut ledger = Ledger::new(At24c::new(eeprom(), NoDelay, 2));
    for i in 0..3 {
        assert_eq!(ledger.append(&measurement(i)), Ok(i));
    }
    for i in 0..3 {
        assert_eq!(ledger.read(i), Ok(measurement(i)));
    }

    let (eeprom, _) = ledger.release().release();
    assert_eq!(eeprom.addresses[..6], [0x50, 0x51, 0x50, 0x51, 0x50, 0x51]);
    assert_eq!(eeprom.blocks[0][32..40], measurement(2).latitude.to_le_bytes());
    assert_eq!(
        eeprom.blocks[0][40..48],
        measurement(2).longitude.to_le_bytes()
    );
    assert_eq!(eeprom.blocks[0][48], 0xff);
    assert_eq!(eeprom.blocks[1][..4], [60, 61, 62, 0xff]);
}

#[test]
fn fill() {
    let mut ledger = Ledger::new(At24c::new(eeprom(), NoDelay, 2));
    for i in 0..CAPACITY {
        ledger.append(&measurement(i)).unwrap();
    }
    assert_eq!(ledger.append(&measurement(0)), Err(LedgerError::Full));
    assert_eq!(ledger.read(CAPACITY - 1), Ok(measurement(CAPACITY - 1)));
    let cursors = ledger.cursors();
    assert_eq!((cursors.location, cursors.noise), (256, 16));
}

#[test]
fn bus_failure() {
    let mut failing = eeprom();
    failing.fail = true;
    let mut ledger = Ledger::new(At24c::new(failing, NoDelay, 2));
    assert_eq!(
        ledger.append(&measurement(0)),
        Err(LedgerError::Storage(at24c::Error::I2c(
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        )))
    );
    assert!(ledger.is_empty());
}
