use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while loading a simulation config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables for the scene simulation.
///
/// The defaults reproduce the constants the scene was tuned with; the ground
/// threshold and fall constants in particular are matched to the terrain
/// scale, so overriding them changes where projectile lights die.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World-space z below which a falling light is extinguished.
    pub ground_height: f32,
    /// Per-tick vertical drop applied to a falling light (not time-scaled).
    pub fall_step: f32,
    /// Acceleration constant for the age-proportional fall velocity.
    pub fall_accel: f32,
    /// Lifetime of a projectile light, in milliseconds.
    pub light_lifetime_ms: f32,
    /// Minimum spacing between accepted fire requests, in milliseconds.
    pub fire_cooldown_ms: f32,
    /// Degrees added per azimuth/elevation key press.
    pub orbit_step_deg: f32,
    /// Degrees added per field-of-view key press.
    pub fov_step_deg: f32,
    /// Inclusive field-of-view range, degrees.
    pub fov_min_deg: f32,
    pub fov_max_deg: f32,
    /// Distance from the camera to its orbit pivot.
    pub camera_pivot: f32,
    /// Near and far clip planes.
    pub clip_near: f32,
    pub clip_far: f32,
    /// Per-tick vehicle yaw delta while a turn key is held, degrees.
    pub yaw_step_deg: f32,
    /// Per-tick vertical translation while a climb key is held.
    pub lift_step: f32,
    /// Per-tick forward translation while a thrust key is held.
    pub thrust_step: f32,
    /// Rotor blade angular rate, degrees per 100 ms of wall-clock time.
    pub rotor_rate_deg: f32,
    /// Half-extent of the vehicle hull.
    pub vehicle_size: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ground_height: -0.75,
            fall_step: 0.008,
            fall_accel: 0.0008 * 0.0008,
            light_lifetime_ms: 3000.0,
            fire_cooldown_ms: 200.0,
            orbit_step_deg: 5.0,
            fov_step_deg: 5.0,
            fov_min_deg: 5.0,
            fov_max_deg: 120.0,
            camera_pivot: 6.0,
            clip_near: 1.0,
            clip_far: 100.0,
            yaw_step_deg: 5.0,
            lift_step: 0.05,
            thrust_step: 0.05,
            rotor_rate_deg: 60.0,
            vehicle_size: 0.1,
        }
    }
}

impl SimConfig {
    /// Loads a config from a TOML file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_tuned_constants() {
        let config = SimConfig::default();
        assert_eq!(config.ground_height, -0.75);
        assert_eq!(config.fall_step, 0.008);
        assert_eq!(config.fall_accel, 0.0008 * 0.0008);
        assert_eq!(config.light_lifetime_ms, 3000.0);
        assert_eq!(config.fire_cooldown_ms, 200.0);
        assert_eq!(config.camera_pivot, 6.0);
        assert_eq!(config.fov_min_deg, 5.0);
        assert_eq!(config.fov_max_deg, 120.0);
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let mut tmp = NamedTempFile::new().expect("tmp file");
        writeln!(tmp, "ground_height = -1.5\nfire_cooldown_ms = 500.0").expect("write config");
        let config = SimConfig::load(tmp.path()).expect("load config");
        assert_eq!(config.ground_height, -1.5);
        assert_eq!(config.fire_cooldown_ms, 500.0);
        assert_eq!(config.light_lifetime_ms, 3000.0);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let mut tmp = NamedTempFile::new().expect("tmp file");
        writeln!(tmp, "ground_height = 'not a number'").expect("write config");
        assert!(matches!(
            SimConfig::load(tmp.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SimConfig::load("/nonexistent/rotorfield.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
