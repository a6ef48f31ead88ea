//! Waveform synthesizer
//!
//! Every sound effect is rendered from closed-form time-domain formulas into a
//! mono 16-bit PCM buffer. No external files needed!

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

use crate::consts::SAMPLE_RATE;

/// Full-scale amplitude for a normalized sample of 1.0
const FULL_SCALE: f64 = 32767.0;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Player moved - descending whoosh
    Move,
    /// Player hit an enemy - rumble with noise
    Collision,
    /// Score milestone - wobbly beep
    Score,
    /// Sensor ready / skip - major triad chime
    Powerup,
    /// Game (re)started - rising sweep
    GameStart,
    /// Run ended - long falling sweep
    GameOver,
    /// Enemy appeared - short falling sweep
    EnemySpawn,
}

impl SoundEffect {
    /// All effects, in generation order
    pub const ALL: [SoundEffect; 7] = [
        SoundEffect::Move,
        SoundEffect::Collision,
        SoundEffect::Score,
        SoundEffect::Powerup,
        SoundEffect::GameStart,
        SoundEffect::GameOver,
        SoundEffect::EnemySpawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Move => "move",
            SoundEffect::Collision => "collision",
            SoundEffect::Score => "score",
            SoundEffect::Powerup => "powerup",
            SoundEffect::GameStart => "game_start",
            SoundEffect::GameOver => "game_over",
            SoundEffect::EnemySpawn => "enemy_spawn",
        }
    }

    /// Length of the effect in seconds
    pub fn duration(&self) -> f64 {
        match self {
            SoundEffect::Move => 0.3,
            SoundEffect::Collision => 0.5,
            SoundEffect::Score => 0.2,
            SoundEffect::Powerup => 0.4,
            SoundEffect::GameStart => 0.8,
            SoundEffect::GameOver => 1.0,
            SoundEffect::EnemySpawn => 0.3,
        }
    }

    /// Number of samples the rendered buffer holds
    pub fn sample_count(&self) -> usize {
        (self.duration() * SAMPLE_RATE as f64).round() as usize
    }

    /// Position in [`SoundEffect::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SoundEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown effect name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sound effect `{0}`")]
pub struct UnknownEffect(pub String);

impl FromStr for SoundEffect {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundEffect::ALL
            .into_iter()
            .find(|effect| effect.as_str() == s)
            .ok_or_else(|| UnknownEffect(s.to_string()))
    }
}

/// Synthesis failure for a single effect
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error("{effect}: non-finite sample value at index {index}")]
    NonFinite { effect: SoundEffect, index: usize },
}

pub type SynthResult<T> = Result<T, SynthError>;

/// Mono 16-bit PCM samples at [`SAMPLE_RATE`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleBuffer {
    samples: Vec<i16>,
}

impl SampleBuffer {
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    /// Interleaved stereo copy (left == right)
    pub fn to_stereo(&self) -> Vec<i16> {
        self.samples.iter().flat_map(|&s| [s, s]).collect()
    }

    /// Largest absolute sample in `range` (clamped to the buffer)
    pub fn peak(&self, range: std::ops::Range<usize>) -> u16 {
        let end = range.end.min(self.samples.len());
        let start = range.start.min(end);
        self.samples[start..end]
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

/// Amplitude envelope of `effect` at time `t` (seconds), in [0, 1]
pub fn envelope(effect: SoundEffect, t: f64) -> f64 {
    let d = effect.duration();
    let progress = t / d;
    match effect {
        SoundEffect::Move => 0.3 * (1.0 - progress),
        SoundEffect::Collision => {
            // Quick attack, slow decay
            if t < 0.1 {
                t / 0.1
            } else {
                (1.0 - (t - 0.1) / 0.4).max(0.0)
            }
        }
        SoundEffect::Score => 0.5 * (1.0 - progress),
        SoundEffect::Powerup => 0.4 * (-3.0 * t).exp(),
        SoundEffect::GameStart => 0.6 * progress,
        SoundEffect::GameOver => 0.7 * (1.0 - progress),
        SoundEffect::EnemySpawn => 0.4 * (1.0 - progress),
    }
}

/// Instantaneous frequency for the swept single-sine effects
fn sweep_frequency(effect: SoundEffect, t: f64) -> f64 {
    let progress = t / effect.duration();
    match effect {
        SoundEffect::Move => 400.0 - 200.0 * progress,
        SoundEffect::Score => 800.0 + 400.0 * (10.0 * t).sin(),
        SoundEffect::GameStart => 200.0 + 600.0 * progress,
        SoundEffect::GameOver => 400.0 - 350.0 * progress,
        SoundEffect::EnemySpawn => 300.0 - 250.0 * progress,
        SoundEffect::Collision | SoundEffect::Powerup => 0.0,
    }
}

/// C major triad (C5, E5, G5)
const POWERUP_TRIAD: [f64; 3] = [523.25, 659.25, 783.99];
/// Mains-hum style rumble under the collision noise
const RUMBLE_HZ: f64 = 60.0;

/// Normalized waveform value in roughly [-1, 1]
fn waveform<R: Rng + ?Sized>(effect: SoundEffect, t: f64, rng: &mut R) -> f64 {
    match effect {
        SoundEffect::Collision => {
            let rumble = (TAU * RUMBLE_HZ * t).sin();
            let noise: f64 = rng.random_range(-0.5..0.5);
            rumble * 0.7 + noise * 0.3
        }
        SoundEffect::Powerup => {
            POWERUP_TRIAD
                .iter()
                .map(|freq| (TAU * freq * t).sin())
                .sum::<f64>()
                / POWERUP_TRIAD.len() as f64
        }
        _ => (TAU * sweep_frequency(effect, t) * t).sin(),
    }
}

/// Convert a normalized value to a clamped 16-bit sample
fn quantize(value: f64) -> i16 {
    (FULL_SCALE * value)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Render `effect` using `rng` as the noise source
pub fn generate_with_rng<R: Rng + ?Sized>(
    effect: SoundEffect,
    rng: &mut R,
) -> SynthResult<SampleBuffer> {
    let count = effect.sample_count();
    let mut samples = Vec::with_capacity(count);

    for index in 0..count {
        let t = index as f64 / SAMPLE_RATE as f64;
        let value = envelope(effect, t) * waveform(effect, t, rng);
        if !value.is_finite() {
            return Err(SynthError::NonFinite { effect, index });
        }
        samples.push(quantize(value));
    }

    Ok(SampleBuffer::from_samples(samples))
}

/// Render `effect` with thread-local noise
pub fn generate(effect: SoundEffect) -> SynthResult<SampleBuffer> {
    generate_with_rng(effect, &mut rand::rng())
}
