use glam::{Mat4, Vec3, Vec4};
use log::debug;

use crate::config::SimConfig;

/// Number of light slots the shading contract exposes.
pub const LIGHT_CAPACITY: usize = 20;

/// One light slot: shading parameters plus the attachment frame its local
/// position is expressed relative to.
///
/// A `position` with w == 1.0 is positional, w == 0.0 directional. Slot 0 of
/// the pool is the sun and never changes; the remaining slots are projectile
/// lights that are armed by [`LightPool::spawn`], fall under
/// [`LightPool::tick`], and extinguish on ground contact or when their
/// lifetime runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec4,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub enabled: bool,
    pub frame: Mat4,
    pub remaining_ms: f32,
}

impl Light {
    /// The permanent directional sun: always on, identity frame.
    fn sun() -> Self {
        Self {
            position: Vec4::new(1.0, 2.0, 3.0, 0.0),
            ambient: Vec3::splat(0.5),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::splat(0.5),
            enabled: true,
            frame: Mat4::IDENTITY,
            remaining_ms: 0.0,
        }
    }

    /// A projectile slot in its idle state.
    fn projectile() -> Self {
        Self {
            position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vec3::splat(0.3),
            diffuse: Vec3::splat(0.3),
            specular: Vec3::splat(0.8),
            enabled: false,
            frame: Mat4::IDENTITY,
            remaining_ms: 0.0,
        }
    }

    /// The light's position transformed through its attachment frame.
    pub fn world_position(&self) -> Vec4 {
        self.frame * self.position
    }
}

/// Fixed-capacity pool of lights: the sun in slot 0 plus a ring of
/// projectile slots allocated round-robin.
#[derive(Debug, Clone)]
pub struct LightPool {
    lights: [Light; LIGHT_CAPACITY],
    spawn_counter: u64,
    cooldown_ms: f32,
    lifetime_ms: f32,
    fire_cooldown_ms: f32,
    fall_step: f32,
    fall_accel: f32,
    ground_height: f32,
}

impl LightPool {
    pub fn new(config: &SimConfig) -> Self {
        let mut lights = [Light::projectile(); LIGHT_CAPACITY];
        lights[0] = Light::sun();
        Self {
            lights,
            spawn_counter: 0,
            cooldown_ms: 0.0,
            lifetime_ms: config.light_lifetime_ms,
            fire_cooldown_ms: config.fire_cooldown_ms,
            fall_step: config.fall_step,
            fall_accel: config.fall_accel,
            ground_height: config.ground_height,
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn cooldown_remaining_ms(&self) -> f32 {
        self.cooldown_ms
    }

    /// Enabled projectile slots (the sun excluded), with their indices.
    pub fn enabled_projectiles(&self) -> impl Iterator<Item = (usize, &Light)> {
        self.lights
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, light)| light.enabled)
    }

    /// Arms the next projectile slot, attaching it to `attach_frame`.
    ///
    /// Returns `None` without touching any state while the fire cooldown is
    /// still running. Allocation is round-robin over slots 1..N-1 and always
    /// overwrites the target slot; a still-falling occupant is discarded.
    pub fn spawn(&mut self, attach_frame: Mat4) -> Option<usize> {
        if self.cooldown_ms > 0.0 {
            return None;
        }
        let slot = (self.spawn_counter % (LIGHT_CAPACITY as u64 - 1)) as usize + 1;
        self.spawn_counter += 1;
        if self.lights[slot].enabled {
            debug!("projectile light in slot {slot} displaced while still falling");
        }
        let light = &mut self.lights[slot];
        *light = Light::projectile();
        light.enabled = true;
        light.remaining_ms = self.lifetime_ms;
        light.frame = attach_frame;
        self.cooldown_ms = self.fire_cooldown_ms;
        Some(slot)
    }

    /// Steps the fire cooldown, floored at zero.
    pub fn cooldown_tick(&mut self, elapsed_ms: f32) {
        self.cooldown_ms = (self.cooldown_ms - elapsed_ms).max(0.0);
    }

    /// Integrates one tick of fall for every enabled projectile and
    /// extinguishes the ones that hit the ground or ran out of lifetime.
    ///
    /// The vertical step is a fixed per-tick amount; the depth step is the
    /// age-proportional fall velocity integrated over this tick, so the
    /// cumulative drop grows quadratically with age.
    pub fn tick(&mut self, elapsed_ms: f32) {
        for light in self.lights.iter_mut().skip(1) {
            if !light.enabled {
                continue;
            }
            let age_ms = self.lifetime_ms - light.remaining_ms;
            light.remaining_ms -= elapsed_ms;
            let dz = self.fall_accel * age_ms * elapsed_ms;
            light.frame *= Mat4::from_translation(Vec3::new(0.0, -self.fall_step, -dz));
            if light.world_position().z < self.ground_height || light.remaining_ms <= 0.0 {
                light.enabled = false;
            }
        }
    }
}
