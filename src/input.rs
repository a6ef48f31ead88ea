//! Tilt-to-movement mapping
//!
//! Roll steers left/right, pitch steers up/down (screen coordinates, +y down).

use glam::Vec2;

use crate::sensor::{SensorLinkState, SensorReading};
use crate::settings::ControlSettings;

/// Where player movement comes from this session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    /// Tilt sensor streaming
    Tilt,
    /// Arrow keys / WASD fallback
    Keyboard,
}

impl ControlSource {
    pub fn for_link(state: SensorLinkState) -> Self {
        match state {
            SensorLinkState::Ready => ControlSource::Tilt,
            _ => ControlSource::Keyboard,
        }
    }
}

/// Converts orientation angles into a per-frame movement vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltMapper {
    /// Degrees of tilt for one unit of movement
    pub scale: f32,
    /// Per-axis magnitude below which movement is zeroed
    pub deadzone: f32,
}

impl Default for TiltMapper {
    fn default() -> Self {
        Self::from_settings(&ControlSettings::default())
    }
}

impl TiltMapper {
    pub fn from_settings(settings: &ControlSettings) -> Self {
        Self {
            scale: settings.tilt_scale,
            deadzone: settings.deadzone,
        }
    }

    #[inline]
    fn apply_deadzone(&self, v: f32) -> f32 {
        if v.abs() < self.deadzone { 0.0 } else { v }
    }

    /// Movement direction for a reading (unnormalized)
    pub fn movement(&self, reading: SensorReading) -> Vec2 {
        let dx = -reading.roll / self.scale;
        let dy = reading.pitch / self.scale;
        Vec2::new(self.apply_deadzone(dx), self.apply_deadzone(dy))
    }

    /// Whether a movement vector counts as the player actually moving
    pub fn is_moving(&self, movement: Vec2) -> bool {
        movement.x.abs() > self.deadzone || movement.y.abs() > self.deadzone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mapping_directions() {
        let mapper = TiltMapper::default();
        let m = mapper.movement(SensorReading::new(25.0, 50.0));
        assert!((m.x - -2.0).abs() < 1e-6);
        assert!((m.y - 1.0).abs() < 1e-6);
        assert!(mapper.is_moving(m));
    }

    #[test]
    fn test_deadzone_zeroes_small_tilt() {
        let mapper = TiltMapper::default();
        // 2 degrees / 25 = 0.08 < 0.1
        let m = mapper.movement(SensorReading::new(2.0, -2.0));
        assert_eq!(m, Vec2::ZERO);
        assert!(!mapper.is_moving(m));

        // Axes are independent
        let m = mapper.movement(SensorReading::new(10.0, 1.0));
        assert_eq!(m.x, 0.0);
        assert!((m.y - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_control_source_for_link() {
        assert_eq!(ControlSource::for_link(SensorLinkState::Ready), ControlSource::Tilt);
        assert_eq!(ControlSource::for_link(SensorLinkState::Failed), ControlSource::Keyboard);
        assert_eq!(
            ControlSource::for_link(SensorLinkState::WaitingForFirstReading),
            ControlSource::Keyboard
        );
    }

    proptest! {
        #[test]
        fn prop_movement_is_zero_or_outside_deadzone(
            pitch in -90.0f32..90.0,
            roll in -90.0f32..90.0
        ) {
            let mapper = TiltMapper::default();
            let m = mapper.movement(SensorReading::new(pitch, roll));
            prop_assert!(m.x == 0.0 || m.x.abs() >= mapper.deadzone);
            prop_assert!(m.y == 0.0 || m.y.abs() >= mapper.deadzone);
            // Sign follows tilt
            prop_assert!(m.y == 0.0 || m.y.signum() == pitch.signum());
            prop_assert!(m.x == 0.0 || m.x.signum() == -roll.signum());
        }
    }
}
