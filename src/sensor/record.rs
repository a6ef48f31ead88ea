//! Line-delimited `pitch,roll` records
//!
//! The sensor streams ASCII records such as `-12.5,3.75\n` with no framing
//! or checksum. Only the newest valid record in a batch matters.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Partial lines longer than this are noise, not a record in progress
pub const MAX_PENDING_BYTES: usize = 256;

/// One orientation sample in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub pitch: f32,
    pub roll: f32,
}

impl SensorReading {
    pub fn new(pitch: f32, roll: f32) -> Self {
        Self { pitch, roll }
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.pitch, self.roll)
    }
}

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseReadingError {
    #[error("empty line")]
    Empty,
    #[error("expected 2 comma-separated fields, found {0}")]
    FieldCount(usize),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("non-finite value `{0}`")]
    NonFinite(String),
}

fn parse_angle(field: &str) -> Result<f32, ParseReadingError> {
    let field = field.trim();
    let value: f32 = field
        .parse()
        .map_err(|_| ParseReadingError::InvalidNumber(field.to_string()))?;
    if !value.is_finite() {
        return Err(ParseReadingError::NonFinite(field.to_string()));
    }
    Ok(value)
}

/// Parse a single record (line terminator optional)
pub fn parse_record(line: &str) -> Result<SensorReading, ParseReadingError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseReadingError::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 2 {
        return Err(ParseReadingError::FieldCount(fields.len()));
    }

    Ok(SensorReading {
        pitch: parse_angle(fields[0])?,
        roll: parse_angle(fields[1])?,
    })
}

impl FromStr for SensorReading {
    type Err = ParseReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_record(s)
    }
}

/// Byte accumulator that splits incoming chunks into lines
///
/// Completed lines are consumed on every [`LineAccumulator::take_latest`];
/// an unterminated tail is kept for the next chunk.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    pending: Vec<u8>,
    /// Skipping the rest of an over-long line up to its terminator
    discarding: bool,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(MAX_PENDING_BYTES),
            discarding: false,
        }
    }

    pub fn extend(&mut self, mut bytes: &[u8]) {
        if self.discarding {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.discarding = false;
                    bytes = &bytes[end + 1..];
                }
                None => return,
            }
        }
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes waiting for a line terminator (or not yet consumed)
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Consume all completed lines and return the newest valid record
    ///
    /// Older lines in the same batch are dropped even if they are valid.
    pub fn take_latest(&mut self) -> Option<SensorReading> {
        let latest = match self.pending.iter().rposition(|&b| b == b'\n') {
            Some(end) => {
                let complete: Vec<u8> = self.pending.drain(..=end).collect();
                let text = String::from_utf8_lossy(&complete);
                text.split('\n')
                    .rev()
                    .find_map(|line| parse_record(line).ok())
            }
            None => None,
        };

        if self.pending.len() > MAX_PENDING_BYTES {
            log::debug!(
                "Dropping {} bytes of unterminated sensor data",
                self.pending.len()
            );
            self.pending.clear();
            self.discarding = true;
        }

        latest
    }
}
