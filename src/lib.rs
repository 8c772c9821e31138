//! Scene animation and light-pool simulation engine for the rotorfield
//! runtime.
//!
//! The crate separates the simulation (camera, vehicle, light pool, tick
//! orchestration) from the wgpu renderer so that the moving parts stay
//! testable without a GPU.  The binary wires both to a winit event loop and
//! falls back to a headless summary mode when no display is available.

pub mod camera;
pub mod config;
pub mod geometry;
pub mod heightmap;
pub mod input;
pub mod lights;
pub mod render;
pub mod scene;
pub mod vehicle;

pub use camera::OrbitCamera;
pub use config::{ConfigError, SimConfig};
pub use heightmap::{terrain_mesh, Heightmap, TerrainMesh, TERRAIN_DIVISOR};
pub use input::{apply_key_down, apply_key_up, keystroke_label, ControlKey};
pub use lights::{Light, LightPool, LIGHT_CAPACITY};
pub use render::Renderer;
pub use scene::{FrameState, Material, SceneState};
pub use vehicle::VehicleTransform;
