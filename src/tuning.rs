//! Data-driven gameplay constants
//!
//! Level content lives in [`crate::course::LevelCatalog`]; everything here is
//! shared by every level.

use serde::{Deserialize, Serialize};

/// Global tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Vertical distance between consecutive rings
    pub layer_step: f32,
    /// A moving wall spawns with probability 1 / `moving_wall_chance` per ring
    pub moving_wall_chance: u32,
    /// Seconds after a scoring event during which the next one doubles the multiplier
    pub multiplier_timeout: f32,
    /// Upward speed of the course while the player is falling (units/s)
    pub falling_speed: f32,
    /// Moving wall spin speed (scaled by 10 into degrees/s)
    pub wall_rotation_speed: f32,
    /// World height at which rings and walls leave the play volume
    pub recycle_height: f32,
    /// Number of bounce clips played round-robin
    pub bounce_clips: usize,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            layer_step: 1.5,
            moving_wall_chance: 3,
            multiplier_timeout: 1.0,
            falling_speed: 3.5,
            wall_rotation_speed: 5.0,
            recycle_height: 3.0,
            bounce_clips: 3,
            master_volume: 0.8,
            sfx_volume: 1.0,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON, falling back to defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "layer_step": 2.0 }"#).unwrap();
        assert_eq!(tuning.layer_step, 2.0);
        assert_eq!(tuning.moving_wall_chance, 3);
        assert_eq!(tuning.multiplier_timeout, 1.0);
        assert_eq!(tuning.master_volume, 0.8);
    }
}
