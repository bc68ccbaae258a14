//! Winit + egui application shell for the CNN flow visualizer.

use std::{env, ops::RangeInclusive, rc::Rc, time::Instant};

use anyhow::{Context as _, Result};
use cnnviz_core::{
    camera::OrbitCamera,
    config::{Configuration, SLIDER_MAX_KERNELS},
    summary::PipelineSummary,
    CameraUniform, SceneLayout,
};
use cnnviz_gfx::{GpuContext, SceneRenderer};
use egui::{Context as EguiContext, ViewportId};
use egui_wgpu::{wgpu, ScreenDescriptor};
use egui_winit::State as EguiWinitState;
use glam::Vec2;
use pollster::block_on;
use tracer::init_tracing;
use tracing::{error, info, warn};
use wgpu::SurfaceError;
use winit::{
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
compile_error!("wasm32 builds are not supported by the CNN flow visualizer.");

/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_SCROLL_STEP: f32 = 50.0;

struct CliOptions {
    exit_after_ms: Option<u64>,
    config: Configuration,
}

fn parse_options() -> Result<CliOptions> {
    let mut options = CliOptions {
        exit_after_ms: None,
        config: Configuration::default(),
    };
    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--exit-after-ms=") {
            let millis: u64 = value
                .parse()
                .context("invalid value for --exit-after-ms (expected integer milliseconds)")?;
            options.exit_after_ms = Some(millis);
        } else if let Some(value) = arg.strip_prefix("--kernels=") {
            let kernels: u32 = value
                .parse()
                .context("invalid value for --kernels (expected a positive integer)")?;
            options.config = Configuration::new(kernels).context("invalid --kernels")?;
        } else {
            warn!(%arg, "ignoring unrecognised argument");
        }
    }
    Ok(options)
}

/// Mouse state used to drive the orbit camera.
#[derive(Debug, Default)]
struct PointerState {
    position: Option<Vec2>,
    rotating: bool,
    panning: bool,
}

/// Everything the UI reads or mutates between frames.
struct ViewerState {
    layout: SceneLayout,
    camera: OrbitCamera,
    summary: PipelineSummary,
    pointer: PointerState,
}

impl ViewerState {
    fn new(config: Configuration) -> Self {
        let layout = SceneLayout::build(config);
        let summary = layout.summary();
        Self {
            layout,
            camera: OrbitCamera::default(),
            summary,
            pointer: PointerState::default(),
        }
    }

    /// Rebuilds the layout for a new kernel count and refreshes derived text.
    fn set_kernels(&mut self, kernels: u32, renderer: &mut SceneRenderer) -> Result<()> {
        self.layout
            .set_kernels(kernels)
            .context("failed to rebuild layout")?;
        self.summary = self.layout.summary();
        renderer.upload_scene(&self.layout);
        info!(
            kernels,
            flattened = self.layout.flattened_size(),
            connections = self.layout.connections().len(),
            "rebuilt network layout"
        );
        Ok(())
    }

    /// Ends a drag whose button was released over the egui panel.
    fn end_drag_on_release(&mut self, event: &WindowEvent) {
        if let WindowEvent::MouseInput {
            state: ElementState::Released,
            button,
            ..
        } = event
        {
            match button {
                MouseButton::Left => self.pointer.rotating = false,
                MouseButton::Right | MouseButton::Middle => self.pointer.panning = false,
                _ => {}
            }
        }
    }

    fn handle_pointer_event(&mut self, event: &WindowEvent, viewport_height: f32) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.pointer.rotating = pressed,
                    MouseButton::Right | MouseButton::Middle => self.pointer.panning = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = Vec2::new(position.x as f32, position.y as f32);
                if let Some(previous) = self.pointer.position {
                    let delta = current - previous;
                    if self.pointer.rotating {
                        self.camera
                            .rotate_by_pixels(delta.x, delta.y, viewport_height);
                    } else if self.pointer.panning {
                        self.camera.pan_by_pixels(delta.x, delta.y, viewport_height);
                    }
                }
                self.pointer.position = Some(current);
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer = PointerState::default();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_STEP,
                };
                self.camera.zoom(steps);
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let options = parse_options()?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    #[allow(deprecated)]
    let window = event_loop
        .create_window(
            Window::default_attributes()
                .with_title("CNN Flow Visualizer")
                .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0)),
        )
        .context("failed to create window")?;

    let window = Rc::new(window);

    let (mut gpu_context, shaders) = block_on(cnnviz_gfx::init(window.as_ref()))?;

    let mut viewer = ViewerState::new(options.config);
    let mut renderer = SceneRenderer::new(&gpu_context, &shaders, &viewer.layout)
        .context("failed to create scene renderer")?;
    info!(
        kernels = viewer.layout.config().num_kernels(),
        cells = viewer.layout.cell_count(),
        "CNN flow visualizer started"
    );

    let egui_ctx = EguiContext::default();
    let mut egui_state = EguiWinitState::new(
        egui_ctx.clone(),
        ViewportId::ROOT,
        window.as_ref(),
        Some(window.scale_factor() as f32),
        window.theme(),
        Some(gpu_context.device.limits().max_texture_dimension_2d as usize),
    );
    let mut egui_renderer = egui_wgpu::Renderer::new(
        renderer.device(),
        gpu_context.surface_config.format,
        None,
        1,
        false,
    );

    let mut last_frame_time = Instant::now();
    let app_start_time = Instant::now();
    let exit_after_ms = options.exit_after_ms;

    let window_handle = Rc::clone(&window);

    #[allow(deprecated)]
    event_loop
        .run(move |event, target| {
            let window = window_handle.as_ref();
            match event {
                Event::WindowEvent {
                    window_id,
                    ref event,
                } if window_id == window.id() => {
                    let egui_response = egui_state.on_window_event(window, event);
                    if egui_response.repaint {
                        window.request_redraw();
                    }
                    if egui_response.consumed {
                        viewer.end_drag_on_release(event);
                        return;
                    }

                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(new_size) => {
                            resize(&mut gpu_context, &mut renderer, new_size.width, new_size.height);
                        }
                        WindowEvent::ScaleFactorChanged { .. } => {
                            let new_size = window.inner_size();
                            resize(&mut gpu_context, &mut renderer, new_size.width, new_size.height);
                        }
                        WindowEvent::RedrawRequested => {
                            if let Err(err) = render_frame(
                                window,
                                &egui_ctx,
                                &mut egui_state,
                                &mut egui_renderer,
                                &mut gpu_context,
                                &mut renderer,
                                &mut viewer,
                                last_frame_time,
                            ) {
                                error!("frame render error: {err:?}");
                            }
                            last_frame_time = Instant::now();
                        }
                        other => {
                            let height = gpu_context.surface_config.height as f32;
                            viewer.handle_pointer_event(other, height);
                        }
                    }
                }
                Event::AboutToWait => {
                    if let Some(limit_ms) = exit_after_ms {
                        if app_start_time.elapsed().as_millis() as u64 >= limit_ms {
                            target.exit();
                            return;
                        }
                    }
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .map_err(Into::into)
}

/// Slider bounds; a larger count from `--kernels=` widens the range instead of
/// being clamped down.
fn kernel_slider_range(current: u32) -> RangeInclusive<u32> {
    1..=SLIDER_MAX_KERNELS.max(current)
}

fn kernel_slider(ui: &mut egui::Ui, kernels: &mut u32) -> egui::Response {
    let range = kernel_slider_range(*kernels);
    ui.add(egui::Slider::new(kernels, range).text("Kernels"))
}

fn resize(gpu_context: &mut GpuContext<'_>, renderer: &mut SceneRenderer, width: u32, height: u32) {
    if gpu_context.resize(width, height) {
        renderer.resize(width, height);
    }
}

#[allow(clippy::too_many_arguments)]
fn render_frame(
    window: &Window,
    egui_ctx: &EguiContext,
    egui_state: &mut EguiWinitState,
    egui_renderer: &mut egui_wgpu::Renderer,
    gpu_context: &mut GpuContext<'_>,
    renderer: &mut SceneRenderer,
    viewer: &mut ViewerState,
    previous_frame_time: Instant,
) -> Result<()> {
    let raw_input = egui_state.take_egui_input(window);
    let frame_dt = previous_frame_time.elapsed().as_secs_f32();
    let previous_kernels = viewer.layout.config().num_kernels();
    let mut kernels = previous_kernels;
    let mut reset_view = false;
    let mut toggle_rotation = false;

    let full_output = egui_ctx.run(raw_input, |ctx| {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                kernel_slider(ui, &mut kernels);
                if ui.button("Reset View").clicked() {
                    reset_view = true;
                }
                let rotate_label = if viewer.camera.auto_rotate {
                    "Stop Rotation"
                } else {
                    "Auto Rotate"
                };
                if ui.button(rotate_label).clicked() {
                    toggle_rotation = true;
                }
                ui.label(format!("Frame time: {:>5.2} ms", frame_dt * 1000.0));
            });
            ui.label(&viewer.summary.kernel_info);
            ui.label(&viewer.summary.pipeline_shape);
        });
    });

    egui_state.handle_platform_output(window, full_output.platform_output);

    if kernels != previous_kernels {
        viewer.set_kernels(kernels, renderer)?;
    }
    if reset_view {
        viewer.camera.reset();
    }
    if toggle_rotation {
        let enabled = viewer.camera.toggle_auto_rotate();
        info!(enabled, "auto rotation toggled");
    }

    viewer.camera.update(frame_dt);
    renderer.update_camera(&CameraUniform::from_camera(
        &viewer.camera,
        gpu_context.aspect(),
    ));

    for (id, image_delta) in &full_output.textures_delta.set {
        egui_renderer.update_texture(renderer.device(), renderer.queue(), *id, image_delta);
    }
    for id in &full_output.textures_delta.free {
        egui_renderer.free_texture(id);
    }

    let surface_texture = match gpu_context.surface.get_current_texture() {
        Ok(surface_texture) => surface_texture,
        Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
            gpu_context.reconfigure();
            return Ok(());
        }
        Err(SurfaceError::Timeout) | Err(SurfaceError::Other) => return Ok(()),
        Err(SurfaceError::OutOfMemory) => {
            error!("wgpu surface out of memory, skipping frame");
            return Ok(());
        }
    };

    let surface_view = surface_texture
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu_context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("CnnViz Encoder"),
        });

    renderer.encode_scene_pass(&mut encoder, &surface_view);

    let pixels_per_point = window.scale_factor() as f32;
    let paint_jobs = egui_ctx.tessellate(full_output.shapes, pixels_per_point);
    let screen_descriptor = ScreenDescriptor {
        size_in_pixels: [
            gpu_context.surface_config.width,
            gpu_context.surface_config.height,
        ],
        pixels_per_point,
    };

    let egui_cmd_buffers = egui_renderer.update_buffers(
        renderer.device(),
        renderer.queue(),
        &mut encoder,
        &paint_jobs,
        &screen_descriptor,
    );

    {
        let mut egui_pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        egui_renderer.render(&mut egui_pass, &paint_jobs, &screen_descriptor);
    }

    let mut submissions = egui_cmd_buffers;
    submissions.push(encoder.finish());

    renderer.queue().submit(submissions);
    surface_texture.present();

    Ok(())
}

mod tracer {
    use tracing_subscriber::EnvFilter;

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
