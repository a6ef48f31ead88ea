//! Sensor link state machine
//!
//! Disconnected -> WaitingForFirstReading -> Ready, or
//! WaitingForFirstReading -> Failed (open error / timeout) and the game falls
//! back to keyboard control.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::error::{SensorError, SensorResult};
use super::record::{LineAccumulator, SensorReading};
use super::source::{ByteSource, SerialPortSource};
use crate::settings::SensorSettings;

/// Current link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLinkState {
    /// No device attached
    Disconnected,
    /// Port open, no valid record seen yet
    WaitingForFirstReading,
    /// Streaming; stays here for the rest of the session
    Ready,
    /// Open failed or the first record never arrived
    Failed,
}

impl SensorLinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorLinkState::Disconnected => "disconnected",
            SensorLinkState::WaitingForFirstReading => "waiting",
            SensorLinkState::Ready => "ready",
            SensorLinkState::Failed => "failed",
        }
    }
}

/// Caller-controlled "stop waiting" flag, checked between polls
#[derive(Debug, Clone, Default)]
pub struct SkipSignal(Arc<AtomicBool>);

impl SkipSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Reads `pitch,roll` records from the tilt sensor
pub struct SensorStreamReader {
    source: Option<Box<dyn ByteSource>>,
    state: SensorLinkState,
    lines: LineAccumulator,
    reading: Option<SensorReading>,
    /// Sleep between polls while waiting for the first record
    poll_interval: Duration,
    /// Serial read timeout for a single read
    read_timeout: Duration,
    scratch: Vec<u8>,
}

impl Default for SensorStreamReader {
    fn default() -> Self {
        Self::from_settings(&SensorSettings::default())
    }
}

impl SensorStreamReader {
    pub fn new(poll_interval: Duration, read_timeout: Duration) -> Self {
        Self {
            source: None,
            state: SensorLinkState::Disconnected,
            lines: LineAccumulator::new(),
            reading: None,
            poll_interval,
            read_timeout,
            scratch: Vec::new(),
        }
    }

    pub fn from_settings(settings: &SensorSettings) -> Self {
        Self::new(settings.poll_interval(), settings.read_timeout())
    }

    pub fn state(&self) -> SensorLinkState {
        self.state
    }

    /// Most recent valid reading, if any arrived this session
    pub fn reading(&self) -> Option<SensorReading> {
        self.reading
    }

    pub fn is_ready(&self) -> bool {
        self.state == SensorLinkState::Ready
    }

    /// Open the serial device and start waiting for data
    pub fn open(&mut self, device: &str, baud_rate: u32) -> SensorResult<()> {
        self.close();
        log::info!("Opening sensor port {} at {} baud", device, baud_rate);

        match SerialPortSource::open(device, baud_rate, self.read_timeout) {
            Ok(port) => {
                self.attach(Box::new(port));
                Ok(())
            }
            Err(source) => {
                log::warn!("Failed to open sensor port {}: {}", device, source);
                self.state = SensorLinkState::Failed;
                Err(SensorError::Open {
                    device: device.to_string(),
                    source,
                })
            }
        }
    }

    /// Use an already-open byte source
    pub fn attach(&mut self, mut source: Box<dyn ByteSource>) {
        self.close();
        if let Err(e) = source.clear_input() {
            log::debug!("Could not clear stale sensor input: {}", e);
        }
        self.source = Some(source);
        self.lines.clear();
        self.reading = None;
        self.state = SensorLinkState::WaitingForFirstReading;
    }

    /// Block until the first valid record, the timeout, or a skip request
    pub fn await_first_reading(
        &mut self,
        timeout: Duration,
        skip: &SkipSignal,
    ) -> SensorResult<SensorReading> {
        match (self.state, self.reading) {
            (SensorLinkState::Ready, Some(reading)) => return Ok(reading),
            (SensorLinkState::WaitingForFirstReading, _) => {}
            _ => return Err(SensorError::NotConnected),
        }

        let start = Instant::now();
        loop {
            if skip.is_set() {
                log::info!("Skipped waiting for sensor data");
                self.close();
                return Err(SensorError::Skipped);
            }

            if let Some(reading) = self.read_latest() {
                log::info!(
                    "Sensor ready after {:.2}s: pitch {:.1}, roll {:.1}",
                    start.elapsed().as_secs_f32(),
                    reading.pitch,
                    reading.roll
                );
                self.reading = Some(reading);
                self.state = SensorLinkState::Ready;
                return Ok(reading);
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            log::debug!(
                "Waiting for sensor... {:.1}s/{:.1}s",
                elapsed.as_secs_f32(),
                timeout.as_secs_f32()
            );
            std::thread::sleep(self.poll_interval.min(timeout - elapsed));
        }

        log::warn!("Timeout: no sensor data within {:?}", timeout);
        self.source = None;
        self.lines.clear();
        self.state = SensorLinkState::Failed;
        Err(SensorError::Timeout(timeout))
    }

    /// Non-blocking per-frame poll; `Some` only when a new record arrived
    pub fn poll_reading(&mut self) -> Option<SensorReading> {
        if self.state != SensorLinkState::Ready {
            return None;
        }
        let reading = self.read_latest()?;
        self.reading = Some(reading);
        Some(reading)
    }

    /// Release the device; safe to call repeatedly
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            log::debug!("Sensor port closed");
        }
        self.lines.clear();
        if self.state != SensorLinkState::Failed {
            self.state = SensorLinkState::Disconnected;
        }
    }

    /// Drain available bytes and pick the newest valid record
    fn read_latest(&mut self) -> Option<SensorReading> {
        let source = self.source.as_mut()?;
        self.scratch.clear();
        match source.read_available(&mut self.scratch) {
            Ok(0) => {}
            Ok(_) => self.lines.extend(&self.scratch),
            Err(e) => log::debug!("Sensor read error: {}", e),
        }
        self.lines.take_latest()
    }
}

impl Drop for SensorStreamReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::MemorySource;
    use std::io;

    fn waiting_reader() -> (SensorStreamReader, MemorySource) {
        let mut reader =
            SensorStreamReader::new(Duration::from_millis(2), Duration::from_millis(10));
        let source = MemorySource::new();
        reader.attach(Box::new(source.clone()));
        (reader, source)
    }

    fn ready_reader() -> (SensorStreamReader, MemorySource) {
        let (mut reader, source) = waiting_reader();
        source.push("0.0,0.0\n");
        reader
            .await_first_reading(Duration::from_millis(200), &SkipSignal::new())
            .unwrap();
        (reader, source)
    }

    #[test]
    fn test_new_reader_is_disconnected() {
        let reader = SensorStreamReader::default();
        assert_eq!(reader.state(), SensorLinkState::Disconnected);
        assert_eq!(reader.state().as_str(), "disconnected");
        assert_eq!(reader.reading(), None);
    }

    #[test]
    fn test_attach_waits_for_first_reading() {
        let (reader, _source) = waiting_reader();
        assert_eq!(reader.state(), SensorLinkState::WaitingForFirstReading);
    }

    #[test]
    fn test_first_reading_most_recent_wins() {
        let (mut reader, source) = waiting_reader();
        source.push("1.0,2.0\n3.0,4.0\n");

        let reading = reader
            .await_first_reading(Duration::from_secs(1), &SkipSignal::new())
            .unwrap();
        assert_eq!(reading, SensorReading::new(3.0, 4.0));
        assert_eq!(reader.state(), SensorLinkState::Ready);
        assert!(reader.is_ready());
        assert_eq!(reader.reading(), Some(reading));
    }

    #[test]
    fn test_first_reading_returns_early() {
        let (mut reader, source) = waiting_reader();
        source.push("");
        source.push("garbage\n");
        source.push("10.5,-4.0\n");

        let start = Instant::now();
        let reading = reader
            .await_first_reading(Duration::from_secs(5), &SkipSignal::new())
            .unwrap();
        assert_eq!(reading, SensorReading::new(10.5, -4.0));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_first_reading_survives_read_errors() {
        let (mut reader, source) = waiting_reader();
        source.push_error(io::ErrorKind::TimedOut);
        source.push("2.0,");
        source.push_error(io::ErrorKind::Other);
        source.push("1.0\n");

        let reading = reader
            .await_first_reading(Duration::from_secs(1), &SkipSignal::new())
            .unwrap();
        assert_eq!(reading, SensorReading::new(2.0, 1.0));
    }

    #[test]
    fn test_timeout_leaves_state_failed() {
        let (mut reader, _source) = waiting_reader();
        let result = reader.await_first_reading(Duration::from_millis(30), &SkipSignal::new());
        assert!(matches!(result, Err(SensorError::Timeout(_))));
        assert_eq!(reader.state(), SensorLinkState::Failed);
        assert_eq!(reader.reading(), None);
        // Nothing to poll after a failed link
        assert_eq!(reader.poll_reading(), None);
    }

    #[test]
    fn test_skip_returns_distinct_result() {
        let (mut reader, source) = waiting_reader();
        let skip = SkipSignal::new();
        skip.set();
        source.push("1.0,1.0\n");

        let result = reader.await_first_reading(Duration::from_secs(5), &skip);
        assert!(matches!(result, Err(SensorError::Skipped)));
        assert_eq!(reader.state(), SensorLinkState::Disconnected);
    }

    #[test]
    fn test_skip_set_while_waiting() {
        let (mut reader, _source) = waiting_reader();
        let skip = SkipSignal::new();
        let flag = skip.clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            flag.set();
        });

        let start = Instant::now();
        let result = reader.await_first_reading(Duration::from_secs(5), &skip);
        setter.join().unwrap();
        assert!(matches!(result, Err(SensorError::Skipped)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(reader.state(), SensorLinkState::Disconnected);
        assert!(!reader.is_ready());
    }

    #[test]
    fn test_skip_reset_allows_next_wait() {
        let (mut reader, _source) = waiting_reader();
        let skip = SkipSignal::new();
        skip.set();
        let result = reader.await_first_reading(Duration::from_secs(5), &skip);
        assert!(matches!(result, Err(SensorError::Skipped)));

        skip.reset();
        assert!(!skip.is_set());
        let source = MemorySource::new();
        source.push("4.0,-4.0
");
        reader.attach(Box::new(source));
        let reading = reader.await_first_reading(Duration::from_secs(1), &skip).unwrap();
        assert_eq!(reading, SensorReading::new(4.0, -4.0));
        assert!(reader.is_ready());
    }

    #[test]
    fn test_await_without_device() {
        let mut reader = SensorStreamReader::default();
        let result = reader.await_first_reading(Duration::from_millis(10), &SkipSignal::new());
        assert!(matches!(result, Err(SensorError::NotConnected)));
        assert_eq!(reader.state(), SensorLinkState::Disconnected);
    }

    #[test]
    fn test_open_failure_sets_failed() {
        let mut reader = SensorStreamReader::default();
        let result = reader.open("/dev/tilt-arcade-no-such-port", 115_200);
        assert!(matches!(result, Err(SensorError::Open { .. })));
        assert_eq!(reader.state(), SensorLinkState::Failed);
    }

    #[test]
    fn test_poll_updates_reading() {
        let (mut reader, source) = ready_reader();
        source.push("5.5,-3.2\n");
        assert_eq!(reader.poll_reading(), Some(SensorReading::new(5.5, -3.2)));
        assert_eq!(reader.reading(), Some(SensorReading::new(5.5, -3.2)));
    }

    #[test]
    fn test_poll_malformed_keeps_previous() {
        let (mut reader, source) = ready_reader();
        source.push("5.5,-3.2\n");
        reader.poll_reading();

        source.push("abc,def\n");
        assert_eq!(reader.poll_reading(), None);
        assert_eq!(reader.reading(), Some(SensorReading::new(5.5, -3.2)));
        assert_eq!(reader.state(), SensorLinkState::Ready);
    }

    #[test]
    fn test_poll_swallows_errors() {
        let (mut reader, source) = ready_reader();
        source.push_error(io::ErrorKind::BrokenPipe);
        assert_eq!(reader.poll_reading(), None);
        assert_eq!(reader.state(), SensorLinkState::Ready);

        // Idle poll
        assert_eq!(reader.poll_reading(), None);

        source.push("-1.0,1.0\n-2.0,2.0\n");
        assert_eq!(reader.poll_reading(), Some(SensorReading::new(-2.0, 2.0)));
    }

    #[test]
    fn test_poll_joins_split_records() {
        let (mut reader, source) = ready_reader();
        source.push("12.");
        assert_eq!(reader.poll_reading(), None);
        source.push("5,7\n");
        assert_eq!(reader.poll_reading(), Some(SensorReading::new(12.5, 7.0)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut reader, _source) = ready_reader();
        reader.close();
        reader.close();
        assert_eq!(reader.state(), SensorLinkState::Disconnected);
        assert_eq!(reader.poll_reading(), None);

        let mut never_opened = SensorStreamReader::default();
        never_opened.close();
        never_opened.close();
        assert_eq!(never_opened.state(), SensorLinkState::Disconnected);
    }
}
