use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::config::SimConfig;
use crate::geometry;
use crate::heightmap::TerrainMesh;
use crate::lights::{Light, LIGHT_CAPACITY};
use crate::scene::{FrameState, Material, SceneState};

/// GPU renderer backed by wgpu.
///
/// Two pipelines: a Phong pipeline driving the 20-light uniform array for
/// the terrain, hull and rotor, and a flat pipeline (line and point
/// variants) for the axis gizmo and the light markers. The simulation only
/// hands over matrices and light parameters; all shading happens here.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    phong_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    flat_layout: wgpu::BindGroupLayout,
    terrain: MeshBuffers,
    hull: MeshBuffers,
    rotor: MeshBuffers,
    gizmo: MeshBuffers,
    marker_buffer: wgpu::Buffer,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window and terrain.
    pub async fn new(
        window: Arc<Window>,
        terrain: &TerrainMesh,
        sim: &SimConfig,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor, None)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let phong_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("phong-shader"),
            source: wgpu::ShaderSource::Wgsl(PHONG_SHADER.into()),
        });
        let flat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flat-shader"),
            source: wgpu::ShaderSource::Wgsl(FLAT_SHADER.into()),
        });

        let light_layout = uniform_layout(
            &device,
            "light-bind-layout",
            std::mem::size_of::<LightArrayUniform>() as u64,
        );
        let object_layout = uniform_layout(
            &device,
            "object-bind-layout",
            std::mem::size_of::<ObjectConstants>() as u64,
        );
        let flat_layout = uniform_layout(
            &device,
            "flat-bind-layout",
            std::mem::size_of::<FlatConstants>() as u64,
        );

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-uniform"),
            size: std::mem::size_of::<LightArrayUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light-bind-group"),
            layout: &light_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });

        let phong_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("phong-pipeline-layout"),
            bind_group_layouts: &[&light_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let flat_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("flat-pipeline-layout"),
                bind_group_layouts: &[&flat_layout],
                push_constant_ranges: &[],
            });

        let phong_pipeline = build_pipeline(
            &device,
            "phong-pipeline",
            &phong_layout,
            &phong_shader,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = build_pipeline(
            &device,
            "gizmo-pipeline",
            &flat_pipeline_layout,
            &flat_shader,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
        );
        let point_pipeline = build_pipeline(
            &device,
            "marker-pipeline",
            &flat_pipeline_layout,
            &flat_shader,
            surface_format,
            wgpu::PrimitiveTopology::PointList,
        );

        let terrain_buffers =
            MeshBuffers::indexed(&device, "terrain", &terrain.vertices, &terrain.indices);
        let hull = MeshBuffers::vertices_only(
            &device,
            "vehicle-hull",
            &geometry::vehicle_hull(sim.vehicle_size),
        );
        let rotor = MeshBuffers::vertices_only(
            &device,
            "rotor-blades",
            &geometry::rotor_blades(sim.vehicle_size),
        );
        let gizmo = MeshBuffers::vertices_only(&device, "axis-gizmo", &geometry::axis_gizmo(2.0));

        let marker_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-markers"),
            size: (LIGHT_CAPACITY * 6 * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            phong_pipeline,
            line_pipeline,
            point_pipeline,
            light_buffer,
            light_bind_group,
            object_layout,
            flat_layout,
            terrain: terrain_buffers,
            hull,
            rotor,
            gizmo,
            marker_buffer,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Draws one tick's snapshot: gizmo, terrain, hull, light markers,
    /// rotor, in that order.
    pub fn render(
        &mut self,
        frame: &FrameState,
        scene: &SceneState,
    ) -> Result<(), wgpu::SurfaceError> {
        let lights = pack_lights(frame.view, scene.lights.lights());
        self.queue
            .write_buffer(&self.light_buffer, 0, bytes_of(&lights));

        let markers = marker_vertices(scene.lights.lights());
        let marker_count = (markers.len() / 6) as u32;
        self.queue
            .write_buffer(&self.marker_buffer, 0, bytemuck::cast_slice(&markers));

        let terrain_constants = object_constants(frame, Mat4::IDENTITY, &Material::terrain());
        let hull_constants =
            object_constants(frame, frame.vehicle_model, &Material::vehicle_body());
        let rotor_constants = object_constants(frame, frame.rotor_model, &Material::rotor());
        let flat_constants = FlatConstants {
            mvp: (frame.projection * frame.view).to_cols_array_2d(),
        };

        let terrain_group = self.object_group(&terrain_constants);
        let hull_group = self.object_group(&hull_constants);
        let rotor_group = self.object_group(&rotor_constants);
        let flat_group = self.flat_group(&flat_constants);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.1,
                        g: 0.1,
                        b: 0.1,
                        a: 1.0,
                    }),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        pass.set_pipeline(&self.line_pipeline);
        pass.set_bind_group(0, &flat_group, &[]);
        pass.set_vertex_buffer(0, self.gizmo.vertex.slice(..));
        pass.draw(0..self.gizmo.count, 0..1);

        pass.set_pipeline(&self.phong_pipeline);
        pass.set_bind_group(0, &self.light_bind_group, &[]);

        pass.set_bind_group(1, &terrain_group, &[]);
        pass.set_vertex_buffer(0, self.terrain.vertex.slice(..));
        let index = self.terrain.index.as_ref().expect("terrain is indexed");
        pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.terrain.count, 0, 0..1);

        pass.set_bind_group(1, &hull_group, &[]);
        pass.set_vertex_buffer(0, self.hull.vertex.slice(..));
        pass.draw(0..self.hull.count, 0..1);

        pass.set_pipeline(&self.point_pipeline);
        pass.set_bind_group(0, &flat_group, &[]);
        pass.set_vertex_buffer(0, self.marker_buffer.slice(..));
        pass.draw(0..marker_count, 0..1);

        pass.set_pipeline(&self.phong_pipeline);
        pass.set_bind_group(0, &self.light_bind_group, &[]);
        pass.set_bind_group(1, &rotor_group, &[]);
        pass.set_vertex_buffer(0, self.rotor.vertex.slice(..));
        pass.draw(0..self.rotor.count, 0..1);

        drop(pass); // explicit to satisfy lifetimes on some backends
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn object_group(&self, constants: &ObjectConstants) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object-uniform"),
                contents: bytes_of(constants),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn flat_group(&self, constants: &FlatConstants) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("flat-uniform"),
                contents: bytes_of(constants),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flat-bind-group"),
            layout: &self.flat_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, size: u64) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(std::num::NonZeroU64::new(size).unwrap()),
            },
            count: None,
        }],
    })
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (6 * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: (3 * std::mem::size_of::<f32>()) as u64,
                        shader_location: 1,
                    },
                ],
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

/// Packs the light pool into the shader's uniform array. Positions are
/// transformed into view space through each light's attachment frame; the
/// enabled flag travels in `ambient.w`; disabled slots are zeroed so they
/// contribute nothing.
fn pack_lights(view: Mat4, lights: &[Light]) -> LightArrayUniform {
    let mut uniform = LightArrayUniform::zeroed();
    for (slot, light) in lights.iter().enumerate().take(LIGHT_CAPACITY) {
        if !light.enabled {
            continue;
        }
        let position = view * light.frame * light.position;
        uniform.lights[slot] = LightUniform {
            position: position.into(),
            ambient: light.ambient.extend(1.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
        };
    }
    uniform
}

/// Point-marker vertices (position+color) for the sun and every enabled
/// projectile. Disabled slots are skipped entirely.
fn marker_vertices(lights: &[Light]) -> Vec<f32> {
    let mut out = Vec::new();
    for light in lights.iter().filter(|light| light.enabled) {
        let p = light.world_position();
        out.extend_from_slice(&[p.x, p.y, p.z, 1.0, 1.0, 1.0]);
    }
    out
}

/// Per-drawable matrices and material constants.
fn object_constants(frame: &FrameState, model: Mat4, material: &Material) -> ObjectConstants {
    let mv = frame.view * model;
    let mvp = frame.projection * mv;
    let normal = mv.inverse().transpose();
    ObjectConstants {
        mvp: mvp.to_cols_array_2d(),
        mv: mv.to_cols_array_2d(),
        normal: normal.to_cols_array_2d(),
        mat_ambient: material.ambient.extend(0.0).into(),
        mat_diffuse: material.diffuse.extend(0.0).into(),
        // The shader reads the shininess exponent from specular.w.
        mat_specular: material.specular.extend(material.shininess * 128.0).into(),
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: Option<wgpu::Buffer>,
    count: u32,
}

impl MeshBuffers {
    fn vertices_only(device: &wgpu::Device, label: &str, vertices: &[f32]) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex,
            index: None,
            count: (vertices.len() / 6) as u32,
        }
    }

    fn indexed(device: &wgpu::Device, label: &str, vertices: &[f32], indices: &[u32]) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index: Some(index),
            count: indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LightUniform {
    position: [f32; 4],
    /// w carries the enabled flag.
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LightArrayUniform {
    lights: [LightUniform; LIGHT_CAPACITY],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    mvp: [[f32; 4]; 4],
    mv: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    mat_ambient: [f32; 4],
    mat_diffuse: [f32; 4],
    /// w carries the pre-scaled shininess exponent.
    mat_specular: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FlatConstants {
    mvp: [[f32; 4]; 4],
}

const PHONG_SHADER: &str = r#"
struct LightUniform {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
}

struct LightArrayUniform {
    lights: array<LightUniform, 20>,
}

struct ObjectConstants {
    mvp: mat4x4<f32>,
    mv: mat4x4<f32>,
    normal: mat4x4<f32>,
    mat_ambient: vec4<f32>,
    mat_diffuse: vec4<f32>,
    mat_specular: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: LightArrayUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) pos_eye: vec4<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = object.mvp * vec4<f32>(input.position, 1.0);
    out.pos_eye = object.mv * vec4<f32>(input.position, 1.0);
    let eye_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.normal = normalize(eye_normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(input.normal);
    let v = normalize(-input.pos_eye.xyz);
    let shininess = object.mat_specular.w;
    var color = vec3<f32>(0.0);
    for (var i = 0; i < 20; i++) {
        let light = globals.lights[i];
        if (light.ambient.w < 0.5) {
            continue;
        }
        var l: vec3<f32>;
        if (light.position.w == 1.0) {
            // positional light
            l = normalize((light.position - input.pos_eye).xyz);
        } else {
            // directional light
            l = normalize(light.position.xyz);
        }
        let l_dot_n = max(dot(l, n), 0.0);
        let ambient = light.ambient.xyz * object.mat_ambient.xyz;
        let diffuse = light.diffuse.xyz * object.mat_diffuse.xyz * l_dot_n;
        var specular = vec3<f32>(0.0);
        if (l_dot_n > 0.0) {
            let h = normalize(l + v);
            specular = light.specular.xyz * object.mat_specular.xyz
                * pow(max(dot(h, n), 0.0), shininess);
        }
        color += ambient + diffuse + specular;
    }
    return vec4<f32>(color, 1.0);
}
"#;

const FLAT_SHADER: &str = r#"
struct FlatConstants {
    mvp: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> constants: FlatConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = constants.mvp * vec4<f32>(input.position, 1.0);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.color, 1.0);
}
"#;
