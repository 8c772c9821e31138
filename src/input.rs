use serde::{Deserialize, Serialize};

use crate::scene::SceneState;

/// The keys the scene reacts to. Everything else is ignored at the adapter
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// `A`: climb.
    Ascend,
    /// `Z`: descend.
    Descend,
    /// Space: fire a projectile light.
    Fire,
    /// `=` / `+`: narrow the field of view.
    ZoomIn,
    /// `-` / `_`: widen the field of view.
    ZoomOut,
}

impl ControlKey {
    /// Maps a produced character to a control key. Shift-sensitive keys
    /// match both cases so bindings work with or without a held modifier.
    pub fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            'a' | 'A' => Self::Ascend,
            'z' | 'Z' => Self::Descend,
            ' ' => Self::Fire,
            '=' | '+' => Self::ZoomIn,
            '-' | '_' => Self::ZoomOut,
            _ => return None,
        })
    }
}

/// Applies a key-down edge to the scene.
///
/// Arrow keys move the vehicle, or orbit the camera while the shift-like
/// modifier is held. The mapping is load-bearing; changing it changes
/// observable behavior.
pub fn apply_key_down(scene: &mut SceneState, key: ControlKey, shift: bool) {
    let orbit = scene.config.orbit_step_deg;
    let fov = scene.config.fov_step_deg;
    let yaw = scene.config.yaw_step_deg;
    let lift = scene.config.lift_step;
    let thrust = scene.config.thrust_step;
    match key {
        ControlKey::ArrowUp => {
            if shift {
                scene.camera.orbit(0.0, orbit);
            } else {
                scene.vehicle.forward = -thrust;
            }
        }
        ControlKey::ArrowDown => {
            if shift {
                scene.camera.orbit(0.0, -orbit);
            } else {
                scene.vehicle.forward = thrust;
            }
        }
        ControlKey::ArrowLeft => {
            if shift {
                scene.camera.orbit(orbit, 0.0);
            } else {
                scene.vehicle.yaw_deg = -yaw;
            }
        }
        ControlKey::ArrowRight => {
            if shift {
                scene.camera.orbit(-orbit, 0.0);
            } else {
                scene.vehicle.yaw_deg = yaw;
            }
        }
        ControlKey::Ascend => scene.vehicle.vertical = lift,
        ControlKey::Descend => scene.vehicle.vertical = -lift,
        ControlKey::Fire => {
            scene.fire();
        }
        ControlKey::ZoomIn => scene.camera.zoom(-fov),
        ControlKey::ZoomOut => scene.camera.zoom(fov),
    }
}

/// Applies a key-up edge: motion deltas clear back to zero, everything else
/// is edge-triggered and has no release action.
pub fn apply_key_up(scene: &mut SceneState, key: ControlKey) {
    match key {
        ControlKey::ArrowUp | ControlKey::ArrowDown => scene.vehicle.forward = 0.0,
        ControlKey::ArrowLeft | ControlKey::ArrowRight => scene.vehicle.yaw_deg = 0.0,
        ControlKey::Ascend | ControlKey::Descend => scene.vehicle.vertical = 0.0,
        ControlKey::Fire | ControlKey::ZoomIn | ControlKey::ZoomOut => {}
    }
}

/// Human-readable label for the most recent keystroke.
pub fn keystroke_label(key: ControlKey, shift: bool) -> String {
    let name = match key {
        ControlKey::ArrowUp => "ArrowUp",
        ControlKey::ArrowDown => "ArrowDown",
        ControlKey::ArrowLeft => "ArrowLeft",
        ControlKey::ArrowRight => "ArrowRight",
        ControlKey::Ascend => "a",
        ControlKey::Descend => "z",
        ControlKey::Fire => "SpaceBar",
        ControlKey::ZoomIn => "=",
        ControlKey::ZoomOut => "-",
    };
    if shift {
        format!("Shift + {name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn scene() -> SceneState {
        SceneState::new(SimConfig::default())
    }

    #[test]
    fn arrows_without_shift_drive_the_vehicle() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::ArrowUp, false);
        assert_eq!(scene.vehicle.forward, -0.05);
        apply_key_down(&mut scene, ControlKey::ArrowDown, false);
        assert_eq!(scene.vehicle.forward, 0.05);
        apply_key_down(&mut scene, ControlKey::ArrowLeft, false);
        assert_eq!(scene.vehicle.yaw_deg, -5.0);
        apply_key_down(&mut scene, ControlKey::ArrowRight, false);
        assert_eq!(scene.vehicle.yaw_deg, 5.0);
    }

    #[test]
    fn arrows_with_shift_orbit_the_camera() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::ArrowUp, true);
        assert_eq!(scene.camera.elevation_deg, 35.0);
        apply_key_down(&mut scene, ControlKey::ArrowDown, true);
        assert_eq!(scene.camera.elevation_deg, 30.0);
        apply_key_down(&mut scene, ControlKey::ArrowLeft, true);
        assert_eq!(scene.camera.azimuth_deg, 50.0);
        apply_key_down(&mut scene, ControlKey::ArrowRight, true);
        assert_eq!(scene.camera.azimuth_deg, 45.0);
        // The vehicle deltas were never touched.
        assert_eq!(scene.vehicle.forward, 0.0);
        assert_eq!(scene.vehicle.yaw_deg, 0.0);
    }

    #[test]
    fn letters_set_vertical_and_release_clears_it() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::Ascend, false);
        assert_eq!(scene.vehicle.vertical, 0.05);
        apply_key_down(&mut scene, ControlKey::Descend, false);
        assert_eq!(scene.vehicle.vertical, -0.05);
        apply_key_up(&mut scene, ControlKey::Descend);
        assert_eq!(scene.vehicle.vertical, 0.0);
    }

    #[test]
    fn release_clears_only_the_matching_delta() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::ArrowUp, false);
        apply_key_down(&mut scene, ControlKey::ArrowLeft, false);
        apply_key_up(&mut scene, ControlKey::ArrowLeft);
        assert_eq!(scene.vehicle.yaw_deg, 0.0);
        assert_eq!(scene.vehicle.forward, -0.05);
    }

    #[test]
    fn zoom_keys_step_the_fov() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::ZoomIn, false);
        assert_eq!(scene.camera.fov_deg(), 45.0);
        apply_key_down(&mut scene, ControlKey::ZoomOut, false);
        apply_key_down(&mut scene, ControlKey::ZoomOut, false);
        assert_eq!(scene.camera.fov_deg(), 55.0);
    }

    #[test]
    fn fire_spawns_when_cooldown_allows() {
        let mut scene = scene();
        apply_key_down(&mut scene, ControlKey::Fire, false);
        assert!(scene.lights.lights()[1].enabled);
        // A second press inside the cooldown window does nothing.
        apply_key_down(&mut scene, ControlKey::Fire, false);
        assert!(!scene.lights.lights()[2].enabled);
    }

    #[test]
    fn character_mapping_covers_both_cases_and_symbols() {
        assert_eq!(ControlKey::from_char('a'), Some(ControlKey::Ascend));
        assert_eq!(ControlKey::from_char('A'), Some(ControlKey::Ascend));
        assert_eq!(ControlKey::from_char('Z'), Some(ControlKey::Descend));
        assert_eq!(ControlKey::from_char(' '), Some(ControlKey::Fire));
        assert_eq!(ControlKey::from_char('+'), Some(ControlKey::ZoomIn));
        assert_eq!(ControlKey::from_char('_'), Some(ControlKey::ZoomOut));
        assert_eq!(ControlKey::from_char('q'), None);
    }

    #[test]
    fn keystroke_labels_match_the_output_panel() {
        assert_eq!(keystroke_label(ControlKey::Fire, false), "SpaceBar");
        assert_eq!(
            keystroke_label(ControlKey::ArrowUp, true),
            "Shift + ArrowUp"
        );
        assert_eq!(keystroke_label(ControlKey::ZoomOut, false), "-");
    }
}
