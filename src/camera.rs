use glam::Mat4;

use crate::config::SimConfig;

/// Orbiting camera: azimuth/elevation around a fixed pivot plus a clamped
/// field of view.
///
/// Angles are unbounded degrees; they wrap through the rotation matrices and
/// are never normalized. The view and projection matrices are pure functions
/// of the current state and are recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
    fov_deg: f32,
    fov_min_deg: f32,
    fov_max_deg: f32,
    pivot: f32,
    near: f32,
    far: f32,
}

impl OrbitCamera {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            azimuth_deg: 45.0,
            elevation_deg: 30.0,
            fov_deg: 50.0,
            fov_min_deg: config.fov_min_deg,
            fov_max_deg: config.fov_max_deg,
            pivot: config.camera_pivot,
            near: config.clip_near,
            far: config.clip_far,
        }
    }

    /// Applies additive degree deltas to the orbit angles.
    pub fn orbit(&mut self, azimuth_delta: f32, elevation_delta: f32) {
        self.azimuth_deg += azimuth_delta;
        self.elevation_deg += elevation_delta;
    }

    /// Applies an additive field-of-view delta and clamps the result.
    pub fn zoom(&mut self, fov_delta: f32) {
        self.fov_deg = (self.fov_deg + fov_delta).clamp(self.fov_min_deg, self.fov_max_deg);
    }

    pub fn fov_deg(&self) -> f32 {
        self.fov_deg
    }

    /// View matrix: pull back along -z by the pivot distance, tilt by
    /// elevation, swing by azimuth, then two fixed 90-degree corrections to
    /// align the default camera basis with the scene's z-up.
    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -self.pivot))
            * Mat4::from_rotation_x(self.elevation_deg.to_radians())
            * Mat4::from_rotation_y(-self.azimuth_deg.to_radians())
            * Mat4::from_rotation_y(-90f32.to_radians())
            * Mat4::from_rotation_x(-90f32.to_radians())
    }

    /// Perspective projection for the current field of view.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_deg.to_radians(), aspect.max(0.01), self.near, self.far)
    }
}
