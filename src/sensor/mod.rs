//! Tilt sensor input over a serial link
//!
//! - `record`: `pitch,roll` line parsing and accumulation
//! - `source`: byte sources (serial port, in-memory replay)
//! - `reader`: connection state machine and per-frame polling

pub mod error;
pub mod reader;
pub mod record;
pub mod source;

pub use error::{SensorError, SensorResult};
pub use reader::{SensorLinkState, SensorStreamReader, SkipSignal};
pub use record::{LineAccumulator, ParseReadingError, SensorReading, parse_record};
pub use source::{ByteSource, MemorySource, SerialPortSource};
