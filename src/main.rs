//! Tilt Arcade entry point
//!
//! Headless driver: builds the sound library, brings up the sensor link and
//! runs the 60 Hz input loop for a fixed number of frames.

use std::time::{Duration, Instant};

use tilt_arcade::audio::{self, SoundBoard, SoundLibrary};
use tilt_arcade::consts::FRAME_DT;
use tilt_arcade::input::{ControlSource, TiltMapper};
use tilt_arcade::sensor::{SensorStreamReader, SkipSignal};
use tilt_arcade::settings::Settings;
use tilt_arcade::synth::SoundEffect;

const DEFAULT_SETTINGS_PATH: &str = "tilt-arcade.json";
/// Frames to run before exiting (10 seconds)
const DEMO_FRAMES: u32 = 600;
/// Minimum gap between movement whooshes
const MOVE_SOUND_COOLDOWN: Duration = Duration::from_millis(200);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tilt Arcade starting...");

    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Settings::load(&settings_path);

    let library = SoundLibrary::global();
    let mut sounds = SoundBoard::new(library, audio::default_output(settings.audio.enabled));
    sounds.set_master_volume(settings.audio.master_volume);
    sounds.set_muted(settings.audio.muted);
    log::info!(
        "Master volume {:.2}{}",
        sounds.master_volume(),
        if sounds.is_muted() { " (muted)" } else { "" }
    );
    sounds.play(SoundEffect::GameStart, 0.8);

    let mut sensor = SensorStreamReader::from_settings(&settings.sensor);
    let skip = SkipSignal::new();
    let connected = sensor
        .open(&settings.sensor.port, settings.sensor.baud_rate)
        .and_then(|()| sensor.await_first_reading(settings.sensor.first_reading_timeout(), &skip));

    match connected {
        Ok(reading) => {
            log::info!("Tilt control ready (pitch {:.1}, roll {:.1})", reading.pitch, reading.roll);
            sounds.play(SoundEffect::Powerup, 0.6);
        }
        Err(e) => log::warn!("Sensor unavailable, keyboard fallback: {}", e),
    }

    log::info!("Sensor link {}", sensor.state().as_str());
    let control = ControlSource::for_link(sensor.state());
    if control == ControlSource::Keyboard {
        log::info!("Keyboard input is handled by the game frontend; nothing to drive here");
        sounds.stop_all();
        sensor.close();
        return;
    }

    let mapper = TiltMapper::from_settings(&settings.controls);
    let frame = Duration::from_secs_f32(FRAME_DT);
    let mut last_move_sound: Option<Instant> = None;

    for frame_index in 0..DEMO_FRAMES {
        let frame_start = Instant::now();

        if let Some(reading) = sensor.poll_reading() {
            let movement = mapper.movement(reading);
            log::debug!(
                "frame {}: pitch {:5.1} roll {:5.1} -> ({:.2}, {:.2})",
                frame_index,
                reading.pitch,
                reading.roll,
                movement.x,
                movement.y
            );

            let cooled_down = last_move_sound.is_none_or(|t| t.elapsed() > MOVE_SOUND_COOLDOWN);
            if mapper.is_moving(movement) && cooled_down {
                sounds.play(SoundEffect::Move, 0.2);
                last_move_sound = Some(Instant::now());
            }
        }

        if let Some(rest) = frame.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    // Clean up
    sounds.play(SoundEffect::GameOver, 0.6);
    std::thread::sleep(Duration::from_secs_f64(SoundEffect::GameOver.duration()));
    sounds.stop_all();
    sensor.close();
    log::info!("Tilt Arcade finished");
}
