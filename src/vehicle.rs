use glam::{Mat4, Vec3};

/// Accumulated vehicle pose plus the per-tick motion deltas feeding it.
///
/// The deltas are per-tick magnitudes, not rates: holding a key produces the
/// same offset every tick regardless of tick duration, so vehicle speed is
/// tied to the display refresh rate. The rotor spin, by contrast, is scaled
/// by wall-clock time. That asymmetry is intentional and must be preserved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTransform {
    model: Mat4,
    pub yaw_deg: f32,
    pub vertical: f32,
    pub forward: f32,
    rotor_rate_deg: f32,
}

impl VehicleTransform {
    pub fn new(rotor_rate_deg: f32) -> Self {
        Self {
            // The vehicle starts one unit above the terrain plane.
            model: Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)),
            yaw_deg: 0.0,
            vertical: 0.0,
            forward: 0.0,
            rotor_rate_deg,
        }
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Overwrites the current per-tick deltas (called on key edges).
    pub fn set_deltas(&mut self, yaw_deg: f32, vertical: f32, forward: f32) {
        self.yaw_deg = yaw_deg;
        self.vertical = vertical;
        self.forward = forward;
    }

    /// Folds the held deltas into the accumulated model matrix.
    pub fn tick(&mut self) {
        self.model = compose_step(self.model, self.yaw_deg, self.vertical, self.forward);
    }

    /// Rotor pose for the given total elapsed time. Purely derived from the
    /// body pose; never written back into it.
    pub fn rotor_spin(&self, elapsed_ms: f64) -> Mat4 {
        let angle_deg = -((self.rotor_rate_deg as f64 * elapsed_ms / 100.0) % 360.0) as f32;
        self.model * Mat4::from_rotation_z(angle_deg.to_radians())
    }
}

/// One motion step composed in the vehicle's current local frame: climb,
/// then turn, then walk the body forward. Returns a fresh matrix so the
/// accumulation site stays explicit.
pub fn compose_step(model: Mat4, yaw_deg: f32, vertical: f32, forward: f32) -> Mat4 {
    model
        * Mat4::from_translation(Vec3::new(0.0, 0.0, vertical))
        * Mat4::from_rotation_z((-(yaw_deg % 360.0)).to_radians())
        * Mat4::from_translation(Vec3::new(0.0, forward, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn origin_of(m: Mat4) -> Vec4 {
        m * Vec4::new(0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn starts_one_unit_up() {
        let vehicle = VehicleTransform::new(60.0);
        let p = origin_of(vehicle.model());
        assert!((p.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn same_delta_same_offset_per_tick() {
        let mut vehicle = VehicleTransform::new(60.0);
        vehicle.set_deltas(0.0, 0.05, 0.0);
        vehicle.tick();
        let after_one = origin_of(vehicle.model()).z;
        vehicle.tick();
        let after_two = origin_of(vehicle.model()).z;
        assert!((after_one - 1.05).abs() < 1e-5);
        assert!((after_two - 1.10).abs() < 1e-5);
    }

    #[test]
    fn forward_motion_follows_accumulated_yaw() {
        let mut vehicle = VehicleTransform::new(60.0);
        // Turn 90 degrees over 18 ticks, then stop turning and move forward.
        vehicle.set_deltas(5.0, 0.0, 0.0);
        for _ in 0..18 {
            vehicle.tick();
        }
        vehicle.set_deltas(0.0, 0.0, 0.1);
        vehicle.tick();
        let p = origin_of(vehicle.model());
        // Local +y rotated by -90 degrees about z maps to world +x.
        assert!((p.x - 0.1).abs() < 1e-4, "x = {}", p.x);
        assert!(p.y.abs() < 1e-4, "y = {}", p.y);
    }

    #[test]
    fn cleared_deltas_stop_motion() {
        let mut vehicle = VehicleTransform::new(60.0);
        vehicle.set_deltas(5.0, 0.05, 0.05);
        vehicle.tick();
        let moved = vehicle.model();
        vehicle.set_deltas(0.0, 0.0, 0.0);
        vehicle.tick();
        assert_eq!(vehicle.model(), moved);
    }

    #[test]
    fn rotor_spin_is_derived_not_accumulated() {
        let vehicle = VehicleTransform::new(60.0);
        let body = vehicle.model();
        let spin_a = vehicle.rotor_spin(100.0);
        let spin_b = vehicle.rotor_spin(100.0);
        assert_eq!(spin_a, spin_b);
        assert_eq!(vehicle.model(), body);
        // 60 degrees per 100 ms, negative direction.
        let expected = body * Mat4::from_rotation_z((-60f32).to_radians());
        let diff: f32 = spin_a
            .to_cols_array()
            .iter()
            .zip(expected.to_cols_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(diff < 1e-5);
    }

    #[test]
    fn rotor_angle_wraps_at_full_turns() {
        let vehicle = VehicleTransform::new(60.0);
        // 600 ms is exactly one full turn at 60 deg / 100 ms.
        let spun = vehicle.rotor_spin(600.0);
        let diff: f32 = spun
            .to_cols_array()
            .iter()
            .zip(vehicle.model().to_cols_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(diff < 1e-4);
    }
}
