//! Audio system
//!
//! Sound effects are synthesized once at startup into a shared, read-only
//! [`SoundLibrary`] and played through an [`AudioOutput`] backend.

use std::sync::OnceLock;

use rand::SeedableRng;
use rand_pcg::Pcg32;

#[cfg(feature = "playback")]
use crate::consts::SAMPLE_RATE;
use crate::synth::{self, SampleBuffer, SoundEffect, SynthResult};

/// Cached buffers for every effect that rendered successfully
#[derive(Debug, Clone, Default)]
pub struct SoundLibrary {
    buffers: [Option<SampleBuffer>; SoundEffect::ALL.len()],
}

static LIBRARY: OnceLock<SoundLibrary> = OnceLock::new();

/// Fixed noise seed so startup renders are reproducible
const NOISE_SEED: u64 = 0x7117_a4cade;

impl SoundLibrary {
    /// Render all effects
    pub fn generate() -> Self {
        let mut rng = Pcg32::seed_from_u64(NOISE_SEED);
        Self::build_with(|effect| synth::generate_with_rng(effect, &mut rng))
    }

    /// Render all effects with `render`; failures only drop that effect
    pub fn build_with<F>(mut render: F) -> Self
    where
        F: FnMut(SoundEffect) -> SynthResult<SampleBuffer>,
    {
        let buffers = std::array::from_fn(|i| {
            let effect = SoundEffect::ALL[i];
            match render(effect) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    log::warn!("Failed to generate sound '{}': {}", effect, e);
                    None
                }
            }
        });
        let library = Self { buffers };

        let loaded = library.loaded_count();
        if loaded == SoundEffect::ALL.len() {
            log::info!("All {} sounds generated", loaded);
        } else {
            log::warn!("Generated {}/{} sounds", loaded, SoundEffect::ALL.len());
        }
        library
    }

    /// Process-wide library, rendered on first access
    pub fn global() -> &'static SoundLibrary {
        LIBRARY.get_or_init(Self::generate)
    }

    pub fn get(&self, effect: SoundEffect) -> Option<&SampleBuffer> {
        self.buffers[effect.index()].as_ref()
    }

    pub fn contains(&self, effect: SoundEffect) -> bool {
        self.get(effect).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }
}

/// Host audio backend
pub trait AudioOutput {
    /// Start one-shot playback of `buffer` at `volume` (0.0 - 1.0)
    fn play_buffer(&mut self, effect: SoundEffect, buffer: &SampleBuffer, volume: f32);

    /// Halt every sound still playing
    fn stop_all(&mut self);

    /// Global output gain applied on top of per-sound volume
    fn set_output_volume(&mut self, volume: f32);
}

/// Discards all audio (headless runs, no device)
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play_buffer(&mut self, _effect: SoundEffect, _buffer: &SampleBuffer, _volume: f32) {}

    fn stop_all(&mut self) {}

    fn set_output_volume(&mut self, _volume: f32) {}
}

/// Plays buffers on the default device through rodio
#[cfg(feature = "playback")]
pub struct RodioOutput {
    _stream: rodio::OutputStream,
    handle: rodio::OutputStreamHandle,
    /// Live sinks with the volume they were started at
    sinks: Vec<(rodio::Sink, f32)>,
    output_volume: f32,
}

#[cfg(feature = "playback")]
impl RodioOutput {
    pub fn new() -> Result<Self, rodio::StreamError> {
        let (stream, handle) = rodio::OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            sinks: Vec::new(),
            output_volume: 1.0,
        })
    }
}

#[cfg(feature = "playback")]
impl AudioOutput for RodioOutput {
    fn play_buffer(&mut self, effect: SoundEffect, buffer: &SampleBuffer, volume: f32) {
        self.sinks.retain(|(sink, _)| !sink.empty());

        match rodio::Sink::try_new(&self.handle) {
            Ok(sink) => {
                sink.set_volume(volume * self.output_volume);
                sink.append(rodio::buffer::SamplesBuffer::new(
                    2,
                    SAMPLE_RATE,
                    buffer.to_stereo(),
                ));
                self.sinks.push((sink, volume));
            }
            Err(e) => log::warn!("Could not play sound '{}': {}", effect, e),
        }
    }

    fn stop_all(&mut self) {
        for (sink, _) in self.sinks.drain(..) {
            sink.stop();
        }
    }

    fn set_output_volume(&mut self, volume: f32) {
        self.output_volume = volume;
        for (sink, play_volume) in &self.sinks {
            sink.set_volume(play_volume * volume);
        }
    }
}

/// Open the best available backend, falling back to silence
pub fn default_output(enabled: bool) -> Box<dyn AudioOutput> {
    if !enabled {
        log::info!("Audio disabled in settings");
        return Box::new(NullOutput);
    }

    #[cfg(feature = "playback")]
    {
        match RodioOutput::new() {
            Ok(output) => return Box::new(output),
            Err(e) => log::warn!("Failed to open audio device - audio disabled: {}", e),
        }
    }

    #[cfg(not(feature = "playback"))]
    {
        log::warn!("Built without the `playback` feature - audio disabled");
    }

    Box::new(NullOutput)
}

/// Playback control surface for the game loop
pub struct SoundBoard<'lib> {
    library: &'lib SoundLibrary,
    output: Box<dyn AudioOutput>,
    master_volume: f32,
    muted: bool,
}

impl<'lib> SoundBoard<'lib> {
    pub fn new(library: &'lib SoundLibrary, output: Box<dyn AudioOutput>) -> Self {
        let mut board = Self {
            library,
            output,
            master_volume: 1.0,
            muted: false,
        };
        board.apply_output_volume();
        board
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
        self.apply_output_volume();
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_output_volume();
    }

    /// Flip mute; returns the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        if self.muted {
            log::info!("Sound muted");
        } else {
            log::info!("Sound unmuted");
        }
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Get effective output volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    fn apply_output_volume(&mut self) {
        let vol = self.effective_volume();
        self.output.set_output_volume(vol);
    }

    /// Play a sound effect; no-op if it failed to generate
    pub fn play(&mut self, effect: SoundEffect, volume: f32) {
        let Some(buffer) = self.library.get(effect) else {
            return;
        };
        self.output.play_buffer(effect, buffer, volume.clamp(0.0, 1.0));
    }

    /// Play by name (`"game_over"` etc.); unknown names are ignored
    pub fn play_named(&mut self, name: &str, volume: f32) {
        match name.parse::<SoundEffect>() {
            Ok(effect) => self.play(effect, volume),
            Err(e) => log::debug!("{}", e),
        }
    }

    /// Stop all currently playing sounds
    pub fn stop_all(&mut self) {
        self.output.stop_all();
    }
}
