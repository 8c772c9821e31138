use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec4;
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, ModifiersState, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use rotorfield::{
    apply_key_down, apply_key_up, keystroke_label, terrain_mesh, ControlKey, Heightmap, Renderer,
    SceneState, SimConfig, TERRAIN_DIVISOR,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => SimConfig::default(),
    };
    let scene = SceneState::new(config);

    if options.headless {
        return run_headless(scene, options.ticks);
    }

    match run_interactive(scene.clone(), &options, &config) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(scene, options.ticks)
            } else {
                Err(err)
            }
        }
    }
}

/// Runs the simulation with a synthetic 16 ms clock and prints the final
/// state. One projectile is fired on the first tick so the light-pool path
/// is exercised.
fn run_headless(mut scene: SceneState, ticks: u64) -> Result<()> {
    const STEP_MS: f64 = 16.0;

    scene.advance(0.0, 1.0);
    if let Some(slot) = scene.fire() {
        info!("fired projectile light into slot {slot}");
    }
    for tick in 1..=ticks {
        scene.advance(tick as f64 * STEP_MS, 1.0);
    }

    println!("Simulated {ticks} ticks ({:.0} ms)", ticks as f64 * STEP_MS);
    print_final_state(&scene);
    Ok(())
}

fn print_final_state(scene: &SceneState) {
    let position = scene.vehicle.model() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let in_flight = scene.lights.enabled_projectiles().count();
    println!("Final scene state:");
    println!(
        " - camera azimuth={:.1} elevation={:.1} fov={:.1}",
        scene.camera.azimuth_deg,
        scene.camera.elevation_deg,
        scene.camera.fov_deg()
    );
    println!(
        " - vehicle pos=({:.2}, {:.2}, {:.2})",
        position.x, position.y, position.z
    );
    println!(" - projectile lights in flight: {in_flight}");
}

fn run_interactive(scene: SceneState, options: &CliOptions, config: &SimConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Rotorfield")
            .with_inner_size(LogicalSize::new(900.0, 900.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let heightmap = Heightmap::load_or_flat(options.heightmap.as_deref());
    let terrain = terrain_mesh(&heightmap, TERRAIN_DIVISOR);
    let renderer = block_on(Renderer::new(Arc::clone(&window), &terrain, config))?;

    let mut app = AppState {
        renderer,
        scene,
        started: Instant::now(),
        modifiers: ModifiersState::default(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    if let Some(err) = app.last_error {
        return Err(err);
    }

    print_final_state(&app.scene);
    Ok(())
}

struct AppState {
    renderer: Renderer,
    scene: SceneState,
    started: Instant,
    modifiers: ModifiersState,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::ModifiersChanged(state) => {
                        self.modifiers = *state;
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                let frame = self.scene.advance(now_ms, self.renderer.aspect());
                if let Err(err) = self.renderer.render(&frame, &self.scene) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.window().inner_size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput) {
        let Some(key) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        let shift = self.modifiers.shift();
        match input.state {
            ElementState::Pressed => {
                apply_key_down(&mut self.scene, key, shift);
                info!("{}", keystroke_label(key, shift));
            }
            ElementState::Released => apply_key_up(&mut self.scene, key),
        }
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<ControlKey> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Up => ControlKey::ArrowUp,
        Key::Down => ControlKey::ArrowDown,
        Key::Left => ControlKey::ArrowLeft,
        Key::Right => ControlKey::ArrowRight,
        Key::A => ControlKey::Ascend,
        Key::Z => ControlKey::Descend,
        Key::Space => ControlKey::Fire,
        Key::Equals | Key::Plus | Key::NumpadAdd => ControlKey::ZoomIn,
        Key::Minus | Key::NumpadSubtract | Key::Underline => ControlKey::ZoomOut,
        _ => return None,
    })
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    heightmap: Option<String>,
    config: Option<String>,
    headless: bool,
    ticks: u64,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut heightmap = None;
        let mut config = None;
        let mut headless = false;
        let mut ticks = 600;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => headless = true,
                "--config" => {
                    config = Some(args.next().ok_or_else(|| {
                        anyhow!("--config requires a path argument")
                    })?);
                }
                "--ticks" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--ticks requires a count argument"))?;
                    ticks = value
                        .parse()
                        .map_err(|_| anyhow!("invalid tick count: {value}"))?;
                }
                other if other.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: rotorfield [heightmap] [--config <path>] [--headless] [--ticks <n>]"
                    ));
                }
                other => {
                    if heightmap.replace(other.to_string()).is_some() {
                        return Err(anyhow!("more than one heightmap path given"));
                    }
                }
            }
        }
        Ok(Self {
            heightmap,
            config,
            headless,
            ticks,
        })
    }
}
