//! GPU abstraction layer over `wgpu` responsible for drawing the diagram and presentation.

use std::{borrow::Cow, mem::size_of};

use anyhow::{Context, Result};
use bytemuck::{bytes_of, cast_slice};
use cnnviz_core::{
    mesh::{self, MeshData},
    palette, CameraUniform, LineVertex, MeshInstance, MeshVertex, SceneInstances, SceneLayout,
};
use cnnviz_shaders::render;
use tracing::{debug, info};
use wgpu::{
    util::DeviceExt, Adapter, Backends, BindGroupDescriptor, BindGroupEntry,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, BufferAddress,
    BufferBindingType, BufferUsages, Color, ColorTargetState, ColorWrites, CompareFunction,
    DepthBiasState, DepthStencilState, Device, DeviceDescriptor, Extent3d, Face, Features,
    FragmentState, FrontFace, IndexFormat, Instance, InstanceDescriptor, Limits, LoadOp,
    MultisampleState, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode,
    PrimitiveState, PrimitiveTopology, Queue, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, ShaderStages, StencilState, StoreOp, Surface,
    SurfaceConfiguration, Texture, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor, VertexAttribute, VertexBufferLayout,
    VertexFormat, VertexState, VertexStepMode,
};
use winit::window::Window;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const SPHERE_SEGMENTS: u16 = 16;
const SPHERE_RINGS: u16 = 12;

pub struct GpuContext<'window> {
    pub instance: Instance,
    pub surface: Surface<'window>,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
    pub surface_config: SurfaceConfiguration,
}

impl GpuContext<'_> {
    /// Reconfigures the surface for a new window size. Zero-sized windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        true
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }
}

pub struct ShaderModules {
    pub mesh: wgpu::ShaderModule,
    pub lines: wgpu::ShaderModule,
}

/// Entry point for creating a GPU context and loading shader modules.
pub async fn init(window: &Window) -> Result<(GpuContext<'_>, ShaderModules)> {
    let instance_desc = InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    };
    let instance = Instance::new(&instance_desc);

    let surface = instance
        .create_surface(window)
        .context("failed to create wgpu surface")?;

    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible GPU adapter found")?;

    let info = adapter.get_info();
    info!(adapter = %info.name, backend = ?info.backend, "selected GPU adapter");

    let device_desc = DeviceDescriptor {
        label: Some("CnnViz Device"),
        required_features: Features::empty(),
        required_limits: Limits::default(),
        ..Default::default()
    };

    let (device, queue) = adapter
        .request_device(&device_desc, None)
        .await
        .context("failed to request wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = preferred_surface_format(&surface_caps.formats)
        .context("surface reports no supported formats")?;
    let size = window.inner_size();

    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let surface_config = SurfaceConfiguration {
        usage: TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: PresentMode::Fifo,
        alpha_mode,
        desired_maximum_frame_latency: 2,
        view_formats: vec![],
    };

    surface.configure(&device, &surface_config);

    let shaders = ShaderModules {
        mesh: create_module(&device, "mesh.wgsl", render::MESH),
        lines: create_module(&device, "lines.wgsl", render::LINES),
    };

    let context = GpuContext {
        instance,
        surface,
        adapter,
        device,
        queue,
        surface_config,
    };

    Ok((context, shaders))
}

fn preferred_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first().copied())
}

fn create_module(device: &Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    })
}

#[derive(Debug)]
pub struct Pipelines {
    pub mesh: RenderPipeline,
    pub lines: RenderPipeline,
}

/// Unit mesh uploaded once and drawn instanced.
#[derive(Debug)]
struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &Device, label: &str, data: &MeshData) -> Self {
        Self {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: cast_slice(&data.vertices),
                usage: BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: cast_slice(&data.indices),
                usage: BufferUsages::INDEX,
            }),
            index_count: data.index_count(),
        }
    }
}

/// Per-snapshot buffers, replaced wholesale whenever the layout is rebuilt.
#[derive(Debug)]
struct SceneBuffers {
    cubes: wgpu::Buffer,
    cube_count: u32,
    spheres: wgpu::Buffer,
    sphere_count: u32,
    lines: wgpu::Buffer,
    line_vertex_count: u32,
}

impl SceneBuffers {
    fn new(device: &Device, instances: &SceneInstances) -> Self {
        Self {
            cubes: create_vertex_buffer(device, "Cube Instances", &instances.cubes),
            cube_count: instances.cubes.len() as u32,
            spheres: create_vertex_buffer(device, "Sphere Instances", &instances.spheres),
            sphere_count: instances.spheres.len() as u32,
            lines: create_vertex_buffer(device, "Connection Lines", &instances.lines),
            line_vertex_count: instances.lines.len() as u32,
        }
    }
}

#[derive(Debug)]
pub struct SceneRenderer {
    pub device: Device,
    pub queue: Queue,
    pub pipelines: Pipelines,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    cube: GpuMesh,
    sphere: GpuMesh,
    scene: SceneBuffers,
    /// Owns the storage behind `depth_view`.
    _depth_texture: Texture,
    depth_view: TextureView,
    clear_color: Color,
}

impl SceneRenderer {
    pub fn new(
        context: &GpuContext<'_>,
        shaders: &ShaderModules,
        layout: &SceneLayout,
    ) -> Result<Self> {
        let device = context.device.clone();
        let queue = context.queue.clone();

        let camera_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform"),
            size: size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipelines = create_pipelines(
            &device,
            &camera_layout,
            shaders,
            context.surface_config.format,
        );

        let cube = GpuMesh::upload(&device, "Cube", &mesh::cube());
        let sphere = GpuMesh::upload(
            &device,
            "Sphere",
            &mesh::uv_sphere(SPHERE_SEGMENTS, SPHERE_RINGS),
        );
        let scene = SceneBuffers::new(&device, &SceneInstances::from_layout(layout));

        let (depth_texture, depth_view) = create_depth_target(
            &device,
            context.surface_config.width,
            context.surface_config.height,
        );

        let [r, g, b] = palette::BACKGROUND.linear();
        let clear_color = Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        info!(
            cubes = scene.cube_count,
            spheres = scene.sphere_count,
            lines = scene.line_vertex_count / 2,
            "scene renderer ready"
        );

        Ok(Self {
            device,
            queue,
            pipelines,
            camera_buffer,
            camera_bind_group,
            cube,
            sphere,
            scene,
            _depth_texture: depth_texture,
            depth_view,
            clear_color,
        })
    }

    /// Replaces every instance and line buffer with the contents of `layout`.
    pub fn upload_scene(&mut self, layout: &SceneLayout) {
        let instances = SceneInstances::from_layout(layout);
        self.scene = SceneBuffers::new(&self.device, &instances);
        debug!(
            cubes = self.scene.cube_count,
            spheres = self.scene.sphere_count,
            lines = self.scene.line_vertex_count / 2,
            "uploaded scene buffers"
        );
    }

    pub fn update_camera(&self, camera: &CameraUniform) {
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytes_of(camera));
    }

    /// Recreates the depth target to match the surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (texture, view) = create_depth_target(&self.device, width, height);
        self._depth_texture = texture;
        self.depth_view = view;
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn encode_scene_pass(&self, encoder: &mut wgpu::CommandEncoder, target_view: &TextureView) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(self.clear_color),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        pass.set_pipeline(&self.pipelines.mesh);
        for (mesh, instances, count) in [
            (&self.cube, &self.scene.cubes, self.scene.cube_count),
            (&self.sphere, &self.scene.spheres, self.scene.sphere_count),
        ] {
            if count == 0 {
                continue;
            }
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_vertex_buffer(1, instances.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), IndexFormat::Uint16);
            pass.draw_indexed(0..mesh.index_count, 0, 0..count);
        }

        if self.scene.line_vertex_count > 0 {
            pass.set_pipeline(&self.pipelines.lines);
            pass.set_vertex_buffer(0, self.scene.lines.slice(..));
            pass.draw(0..self.scene.line_vertex_count, 0..1);
        }
    }
}

const MESH_VERTEX_ATTRIBUTES: [VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

const INSTANCE_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 12,
        shader_location: 3,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 16,
        shader_location: 4,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 32,
        shader_location: 5,
    },
];

const LINE_ATTRIBUTES: [VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

fn create_pipelines(
    device: &Device,
    camera_layout: &wgpu::BindGroupLayout,
    shaders: &ShaderModules,
    surface_format: TextureFormat,
) -> Pipelines {
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[camera_layout],
        push_constant_ranges: &[],
    });

    let mesh_buffers = [
        VertexBufferLayout {
            array_stride: size_of::<MeshVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &MESH_VERTEX_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: size_of::<MeshInstance>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &INSTANCE_ATTRIBUTES,
        },
    ];

    let mesh = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shaders.mesh,
            entry_point: Some(render::MESH_VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &mesh_buffers,
        },
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(depth_state(true)),
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module: &shaders.mesh,
            entry_point: Some(render::MESH_FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    });

    let line_buffers = [VertexBufferLayout {
        array_stride: size_of::<LineVertex>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes: &LINE_ATTRIBUTES,
    }];

    // Lines are translucent: test against the meshes but never occlude them.
    let lines = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Line Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shaders.lines,
            entry_point: Some(render::LINE_VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &line_buffers,
        },
        primitive: PrimitiveState {
            topology: PrimitiveTopology::LineList,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(false)),
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module: &shaders.lines,
            entry_point: Some(render::LINE_FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    });

    Pipelines { mesh, lines }
}

fn depth_state(write: bool) -> DepthStencilState {
    DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: CompareFunction::Less,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    }
}

fn create_vertex_buffer<T: bytemuck::Pod>(device: &Device, label: &str, data: &[T]) -> wgpu::Buffer {
    if data.is_empty() {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_of::<T>().max(4) as u64,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        })
    } else {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: cast_slice(data),
            usage: BufferUsages::VERTEX,
        })
    }
}

fn create_depth_target(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("Depth Texture"),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&TextureViewDescriptor::default());
    (texture, view)
}
