//! Byte sources feeding the sensor reader
//!
//! The serial port is the real transport; [`MemorySource`] replays scripted
//! chunks for tests and recorded sessions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

/// Non-blocking source of raw sensor bytes
pub trait ByteSource {
    /// Append whatever bytes are available right now to `buf`
    ///
    /// Returns the number of bytes appended; `Ok(0)` when nothing is waiting.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Discard stale input buffered before the reader attached
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Serial port opened with `serialport`
pub struct SerialPortSource {
    port: Box<dyn SerialPort>,
}

impl SerialPortSource {
    /// Open `device` at `baud_rate`; `read_timeout` bounds a single read
    pub fn open(device: &str, baud_rate: u32, read_timeout: Duration) -> serialport::Result<Self> {
        let port = serialport::new(device, baud_rate)
            .timeout(read_timeout)
            .open()?;
        Ok(Self { port })
    }
}

impl ByteSource for SerialPortSource {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let waiting = self.port.bytes_to_read().map_err(io::Error::other)? as usize;
        if waiting == 0 {
            return Ok(0);
        }

        let start = buf.len();
        buf.resize(start + waiting, 0);
        match self.port.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                buf.truncate(start);
                if e.kind() == io::ErrorKind::TimedOut {
                    Ok(0)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}

/// One scripted poll result
#[derive(Debug, Clone)]
enum Chunk {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
}

/// In-memory source; clones share the same queue
///
/// Each `read_available` call delivers exactly one queued chunk, so a chunk
/// models everything that arrived between two polls.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: Rc<RefCell<VecDeque<Chunk>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the next poll
    pub fn push(&self, bytes: impl AsRef<[u8]>) {
        self.chunks
            .borrow_mut()
            .push_back(Chunk::Data(bytes.as_ref().to_vec()));
    }

    /// Queue a read failure for the next poll
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.chunks.borrow_mut().push_back(Chunk::Fail(kind));
    }

    /// Polls not yet consumed
    pub fn remaining(&self) -> usize {
        self.chunks.borrow().len()
    }
}

impl ByteSource for MemorySource {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self.chunks.borrow_mut().pop_front() {
            Some(Chunk::Data(bytes)) => {
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Chunk::Fail(kind)) => Err(io::Error::from(kind)),
            None => Ok(0),
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_one_chunk_per_poll() {
        let source = MemorySource::new();
        let mut reader_side = source.clone();
        source.push("1,2\n");
        source.push_error(io::ErrorKind::BrokenPipe);
        assert_eq!(source.remaining(), 2);

        let mut buf = Vec::new();
        assert_eq!(reader_side.read_available(&mut buf).unwrap(), 4);
        assert_eq!(buf, b"1,2\n");

        let err = reader_side.read_available(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        assert_eq!(reader_side.read_available(&mut buf).unwrap(), 0);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = SerialPortSource::open(
            "/dev/tilt-arcade-no-such-port",
            115_200,
            Duration::from_millis(10),
        );
        assert!(result.is_err());
    }
}
