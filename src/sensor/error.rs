//! Sensor link errors

use std::time::Duration;

use thiserror::Error;

pub type SensorResult<T> = Result<T, SensorError>;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to open sensor port {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    #[error("sensor link is not waiting for data")]
    NotConnected,

    #[error("no sensor data received within {0:?}")]
    Timeout(Duration),

    #[error("waiting for the sensor was skipped")]
    Skipped,
}

