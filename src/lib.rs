//! Tilt Arcade - tilt-sensor arcade game core
//!
//! Core modules:
//! - `synth`: Procedural waveform synthesis for every sound effect
//! - `audio`: Shared sound library and playback backends
//! - `sensor`: Serial tilt-sensor stream parsing and link state
//! - `input`: Tilt-to-movement mapping
//! - `settings`: JSON-backed configuration

pub mod audio;
pub mod input;
pub mod sensor;
pub mod settings;
pub mod synth;

pub use audio::{AudioOutput, NullOutput, SoundBoard, SoundLibrary};
pub use input::{ControlSource, TiltMapper};
pub use sensor::{SensorError, SensorLinkState, SensorReading, SensorStreamReader, SkipSignal};
pub use settings::Settings;
pub use synth::{SampleBuffer, SoundEffect};

/// Game configuration constants
pub mod consts {
    /// Audio sample rate (Hz), mono buffers duplicated to stereo on playback
    pub const SAMPLE_RATE: u32 = 44_100;
    /// Game loop rate
    pub const FRAME_RATE: u32 = 60;
    /// Frame duration at [`FRAME_RATE`]
    pub const FRAME_DT: f32 = 1.0 / FRAME_RATE as f32;
}
