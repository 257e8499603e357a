//! Heart rate to speaking-speed mapping.

use crate::defaults;

/// Maps the wearer's heart rate to a speech speed multiplier.
pub trait VocalMapper: Send + Sync {
    fn speed_for(&self, bpm: i32) -> f32;
}

/// Linear mapping around a resting heart rate, clamped to a safe range.
///
/// A calm wearer speaks at base speed; an elevated pulse speaks faster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateMapper {
    pub resting_bpm: i32,
    pub sensitivity: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for HeartRateMapper {
    fn default() -> Self {
        Self {
            resting_bpm: defaults::RESTING_BPM,
            sensitivity: defaults::BPM_SENSITIVITY,
            min_speed: defaults::MIN_SPEED,
            max_speed: defaults::MAX_SPEED,
        }
    }
}

impl VocalMapper for HeartRateMapper {
    fn speed_for(&self, bpm: i32) -> f32 {
        // No pulse reading (sensor not seated).
        if bpm <= 0 {
            return 1.0;
        }
        let delta = (bpm - self.resting_bpm) as f32;
        (1.0 + delta * self.sensitivity).clamp(self.min_speed, self.max_speed)
    }
}
