use glam::{Mat4, Vec3};

use crate::camera::OrbitCamera;
use crate::config::SimConfig;
use crate::lights::LightPool;
use crate::vehicle::VehicleTransform;

/// Phong material. The renderer multiplies `shininess` by a fixed exponent
/// scale of 128 before handing it to the shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Material {
    pub const fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            shininess,
        }
    }

    pub const fn terrain() -> Self {
        Self::new(
            Vec3::new(0.0215, 0.1745, 0.0215),
            Vec3::new(0.07568, 0.61424, 0.07568),
            Vec3::new(0.633, 0.727811, 0.633),
            0.6,
        )
    }

    pub const fn vehicle_body() -> Self {
        Self::new(
            Vec3::new(0.1745, 0.01175, 0.01175),
            Vec3::new(0.61424, 0.04136, 0.04136),
            Vec3::new(0.727811, 0.626959, 0.626959),
            0.6,
        )
    }

    pub const fn rotor() -> Self {
        Self::new(
            Vec3::new(0.25, 0.25, 0.25),
            Vec3::new(0.4, 0.4, 0.4),
            Vec3::new(0.774597, 0.774597, 0.774597),
            0.6,
        )
    }
}

/// Matrices produced by one tick, snapshotted before any draw call reads
/// them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub view: Mat4,
    pub projection: Mat4,
    pub vehicle_model: Mat4,
    pub rotor_model: Mat4,
    pub elapsed_ms: f64,
    pub total_elapsed_ms: f64,
}

/// The whole mutable scene: camera, vehicle, light pool and the clock
/// bookkeeping that ties them to one shared elapsed-time sample per tick.
///
/// Input bindings write the raw deltas and fire requests; `advance` is the
/// only writer of derived and physics state. Nothing else mutates the scene,
/// so no locking is needed as long as a [`FrameState`] snapshot is taken
/// before draw calls are dispatched.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: OrbitCamera,
    pub vehicle: VehicleTransform,
    pub lights: LightPool,
    pub config: SimConfig,
    started_at_ms: Option<f64>,
    last_tick_ms: Option<f64>,
}

impl SceneState {
    pub fn new(config: SimConfig) -> Self {
        Self {
            camera: OrbitCamera::new(&config),
            vehicle: VehicleTransform::new(config.rotor_rate_deg),
            lights: LightPool::new(&config),
            config,
            started_at_ms: None,
            last_tick_ms: None,
        }
    }

    /// Requests a projectile light attached to the vehicle's current pose.
    pub fn fire(&mut self) -> Option<usize> {
        self.lights.spawn(self.vehicle.model())
    }

    /// Advances every stepped component by the time since the previous call
    /// and returns the matrices for this tick. The first call observes zero
    /// elapsed time.
    pub fn advance(&mut self, now_ms: f64, aspect: f32) -> FrameState {
        let started = *self.started_at_ms.get_or_insert(now_ms);
        let elapsed = now_ms - self.last_tick_ms.unwrap_or(now_ms);
        self.last_tick_ms = Some(now_ms);
        let total = now_ms - started;

        self.lights.cooldown_tick(elapsed as f32);
        self.lights.tick(elapsed as f32);
        self.vehicle.tick();

        FrameState {
            view: self.camera.view(),
            projection: self.camera.projection(aspect),
            vehicle_model: self.vehicle.model(),
            rotor_model: self.vehicle.rotor_spin(total),
            elapsed_ms: elapsed,
            total_elapsed_ms: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn scene() -> SceneState {
        SceneState::new(SimConfig::default())
    }

    #[test]
    fn first_tick_sees_zero_elapsed() {
        let mut scene = scene();
        let frame = scene.advance(12_345.0, 1.0);
        assert_eq!(frame.elapsed_ms, 0.0);
        assert_eq!(frame.total_elapsed_ms, 0.0);
    }

    #[test]
    fn elapsed_is_shared_by_cooldown_and_lights() {
        let mut scene = scene();
        scene.advance(0.0, 1.0);
        scene.fire().expect("first fire accepted");
        assert_eq!(scene.lights.cooldown_remaining_ms(), 200.0);
        let before = scene.lights.lights()[1].remaining_ms;
        scene.advance(16.0, 1.0);
        assert_eq!(scene.lights.cooldown_remaining_ms(), 184.0);
        assert_eq!(scene.lights.lights()[1].remaining_ms, before - 16.0);
    }

    #[test]
    fn fire_attaches_to_current_vehicle_pose() {
        let mut scene = scene();
        scene.advance(0.0, 1.0);
        scene.vehicle.set_deltas(0.0, 0.05, 0.0);
        scene.advance(16.0, 1.0);
        let model = scene.vehicle.model();
        let slot = scene.fire().expect("accepted");
        assert_eq!(scene.lights.lights()[slot].frame, model);
    }

    #[test]
    fn rotor_uses_total_time_vehicle_uses_ticks() {
        let mut scene = scene();
        let a = scene.advance(0.0, 1.0);
        let b = scene.advance(300.0, 1.0);
        // No deltas held: the body never moved, but the rotor did.
        assert_eq!(a.vehicle_model, b.vehicle_model);
        assert_ne!(a.rotor_model, b.rotor_model);
    }

    #[test]
    fn snapshot_matrices_match_component_state() {
        let mut scene = scene();
        let frame = scene.advance(0.0, 1.0);
        assert_eq!(frame.view, scene.camera.view());
        assert_eq!(frame.projection, scene.camera.projection(1.0));
        assert_eq!(frame.vehicle_model, scene.vehicle.model());
    }

    #[test]
    fn material_presets_carry_tuned_reflectances() {
        let terrain = Material::terrain();
        assert_eq!(terrain.diffuse, Vec3::new(0.07568, 0.61424, 0.07568));
        assert_eq!(terrain.shininess, 0.6);
        let body = Material::vehicle_body();
        assert_eq!(body.ambient, Vec3::new(0.1745, 0.01175, 0.01175));
        let rotor = Material::rotor();
        assert_eq!(rotor.specular, Vec3::splat(0.774597));
    }

    #[test]
    fn advance_never_resets_the_vehicle() {
        let mut scene = scene();
        scene.advance(0.0, 1.0);
        scene.vehicle.set_deltas(0.0, 0.0, 0.05);
        for i in 1..=10 {
            scene.advance(i as f64 * 16.0, 1.0);
        }
        assert_ne!(
            scene.vehicle.model(),
            Mat4::from_translation(glam::Vec3::new(0.0, 0.0, 1.0))
        );
    }
}
