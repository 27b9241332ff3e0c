//! Line assembly from byte oriented serial ports.
use embedded_io::{Read, ReadReady};

/// Collects bytes from a serial port into newline terminated lines.
///
/// `\r` and `\n` both terminate a line and empty lines are skipped. A line that overflows the
/// buffer is discarded up to its terminator. Non UTF-8 lines are discarded.
#[derive(Debug, Default)]
pub struct LineReader<const N: usize> {
    buffer: heapless::Vec<u8, N>,
    complete: bool,
    overflow: bool,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
            complete: false,
            overflow: false,
        }
    }

    /// Discard any partially assembled line.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.complete = false;
        self.overflow = false;
    }

    /// Consume available bytes without blocking.
    ///
    /// # Returns
    /// The next complete line, if one is available. The line is valid until the next call.
    pub fn poll<P>(&mut self, port: &mut P) -> Result<Option<&str>, P::Error>
    where
        P: Read + ReadReady,
    {
        if self.complete {
            self.buffer.clear();
            self.complete = false;
        }

        while port.read_ready()? {
            let mut byte = [0u8; 1];
            if port.read(&mut byte)? == 0 {
                break;
            }

            match byte[0] {
                b'\r' | b'\n' => {
                    if self.overflow {
                        self.overflow = false;
                        self.buffer.clear();
                    } else if !self.buffer.is_empty() {
                        self.complete = true;
                        break;
                    }
                }
                byte => {
                    if !self.overflow && self.buffer.push(byte).is_err() {
                        log::warn!("Discarding overlong line");
                        self.overflow = true;
                    }
                }
            }
        }

        if !self.complete {
            return Ok(None);
        }

        match core::str::from_utf8(&self.buffer) {
            Ok(line) => Ok(Some(line)),
            // Dropped on the next call like any consumed line.
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Port(VecDeque<u8>);

    impl embedded_io::ErrorType for Port {
        type Error = core::convert::Infallible;
    }

    impl Read for Port {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut len = 0;
            while len < buf.len() {
                match self.0.pop_front() {
                    Some(byte) => buf[len] = byte,
                    None => break,
                }
                len += 1;
            }
            Ok(len)
        }
    }

    impl ReadReady for Port {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0.is_empty())
        }
    }

    fn port(data: &[u8]) -> Port {
        Port(data.iter().copied().collect())
    }

    #[test]
    fn lines() {
        let mut port = port(b"\r\nfirst\r\n\nsecond\npart");
        let mut reader = LineReader::<16>::new();
        assert_eq!(reader.poll(&mut port).unwrap(), Some("first"));
        assert_eq!(reader.poll(&mut port).unwrap(), Some("second"));
        assert_eq!(reader.poll(&mut port).unwrap(), None);
        port.0.extend(b"ial\r");
        assert_eq!(reader.poll(&mut port).unwrap(), Some("partial"));
        assert_eq!(reader.poll(&mut port).unwrap(), None);
    }

    #[test]
    fn overflow() {
        let mut port = port(b"0123456789\nok\n");
        let mut reader = LineReader::<4>::new();
        assert_eq!(reader.poll(&mut port).unwrap(), Some("ok"));
    }

    #[test]
    fn invalid_utf8() {
        let mut port = port(b"\xff\xfe\nDUMP\n");
        let mut reader = LineReader::<8>::new();
        assert_eq!(reader.poll(&mut port).unwrap(), None);
        assert_eq!(reader.poll(&mut port).unwrap(), Some("DUMP"));
    }

    #[test]
    fn clear() {
        let mut port = port(b"stale");
        let mut reader = LineReader::<8>::new();
        assert_eq!(reader.poll(&mut port).unwrap(), None);
        reader.clear();
        port.0.extend(b"new\n");
        assert_eq!(reader.poll(&mut port).unwrap(), Some("new"));
    }
}
