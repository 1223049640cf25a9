//! WGPU-based backend
//!
//! Owns the surface, device and every GPU resource the engine asked for.
//! Draw calls between `begin_frame` and `end_frame` are collected, then
//! recorded into a single render pass at `end_frame`: all per-draw uniforms
//! are written in one upload and each draw binds its slot by dynamic offset.

use std::{collections::HashSet, sync::Arc};

use crate::gfx::resources::{
    global_bindings::{texture_bind_group_layout, DrawBindings, DrawUniform, GlobalBindings},
    texture_resource::TextureResource,
};

use super::{
    backend::{
        BackendError, BufferData, BufferHandle, BufferKind, DrawCall, DrawMode, FrameGlobals,
        GraphicsBackend, ProgramHandle, TextureHandle, TextureImage,
    },
    pipeline_manager::{PipelineKey, PipelineManager},
};

/// Scene shaders compiled by the engine at start-up
pub const SCENE_VERTEX_SHADER: &str = include_str!("scene_vertex.wgsl");
pub const SCENE_FRAGMENT_SHADER: &str = include_str!("scene_fragment.wgsl");

/// Surface and pipeline switches chosen at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Present with `Fifo` (vsync) instead of `Immediate`
    pub vsync: bool,
    /// Cull back faces of counter-clockwise triangles
    pub cull_back_faces: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            vsync: true,
            cull_back_faces: false,
        }
    }
}

struct BoundTexture {
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

struct PendingFrame {
    globals: FrameGlobals,
    draws: Vec<(PipelineKey, DrawCall)>,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    globals: GlobalBindings,
    draw_bindings: DrawBindings,
    texture_layout: wgpu::BindGroupLayout,
    blank_texture: BoundTexture,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<BoundTexture>,
    /// Bound in place of missing uv or normal attributes
    zero_buffer: wgpu::Buffer,
    next_program: u32,
    current_program: Option<ProgramHandle>,
    frame: Option<PendingFrame>,
    unsupported_modes: HashSet<DrawMode>,
}

impl WgpuBackend {
    /// Creates a backend rendering into the given window
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: SurfaceOptions,
    ) -> Result<WgpuBackend, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| BackendError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| BackendError::Adapter(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Vista Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| BackendError::Surface("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: if options.vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::Immediate
            },
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let globals = GlobalBindings::new(&device);
        let draw_bindings = DrawBindings::new(&device, 64);
        let texture_layout = texture_bind_group_layout(&device);

        let blank = TextureResource::create_blank(&device, &queue);
        let blank_texture = BoundTexture {
            bind_group: Self::texture_bind_group(&device, &texture_layout, &blank),
            _resource: blank,
        };
        let zero_buffer = Self::create_zero_buffer(&device, 1024);

        let device: Arc<wgpu::Device> = device.into();
        let queue: Arc<wgpu::Queue> = queue.into();
        let pipeline_manager = PipelineManager::new(
            device.clone(),
            &[globals.layout(), draw_bindings.layout(), &texture_layout],
            format,
            options.cull_back_faces.then_some(wgpu::Face::Back),
        );

        log::info!(
            "wgpu backend ready: {:?} on {}, {}x{}",
            format,
            adapter.get_info().name,
            config.width,
            config.height
        );

        Ok(WgpuBackend {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            globals,
            draw_bindings,
            texture_layout,
            blank_texture,
            buffers: Vec::new(),
            textures: Vec::new(),
            zero_buffer,
            next_program: 0,
            current_program: None,
            frame: None,
            unsupported_modes: HashSet::new(),
        })
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &TextureResource,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_zero_buffer(device: &wgpu::Device, vertices: u64) -> wgpu::Buffer {
        // zero-initialized by wgpu, sized for vec3 attributes
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Zero Attribute Buffer"),
            size: vertices.max(1) * 12,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        })
    }

    fn ensure_zero_buffer(&mut self, vertices: u64) {
        if self.zero_buffer.size() < vertices * 12 {
            self.zero_buffer = Self::create_zero_buffer(&self.device, vertices.next_power_of_two());
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Switches between vsync and immediate presentation
    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = if enable {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::Immediate
        };
        self.surface.configure(&self.device, &self.config);
    }

    fn render(&mut self, frame: PendingFrame) {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Failed to acquire surface texture: {}", e);
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.globals.update(&self.queue, &frame.globals);
        let uniforms: Vec<DrawUniform> = frame.draws.iter().map(|(_, call)| call.into()).collect();
        self.draw_bindings.write(&self.device, &self.queue, &uniforms);

        let max_vertices = frame
            .draws
            .iter()
            .map(|(_, call)| call.buffers.vertex_count as u64)
            .max()
            .unwrap_or(0);
        self.ensure_zero_buffer(max_vertices);

        let ready: Vec<bool> = frame
            .draws
            .iter()
            .map(|(key, _)| self.pipeline_manager.prepare(*key))
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.globals.clear_color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.globals.bind_group(), &[]);

            for (index, ((key, call), ready)) in frame.draws.iter().zip(ready).enumerate() {
                if !ready {
                    continue;
                }
                let Some(pipeline) = self.pipeline_manager.pipeline(key) else {
                    continue;
                };
                let Some(positions) = self.buffers.get(call.buffers.positions.0 as usize) else {
                    log::warn!("'{}' refers to an unknown position buffer", call.entity);
                    continue;
                };
                let tex_coords = call
                    .buffers
                    .tex_coords
                    .and_then(|h| self.buffers.get(h.0 as usize))
                    .unwrap_or(&self.zero_buffer);
                let normals = call
                    .buffers
                    .normals
                    .and_then(|h| self.buffers.get(h.0 as usize))
                    .unwrap_or(&self.zero_buffer);
                let texture = call
                    .texture
                    .and_then(|h| self.textures.get(h.0 as usize))
                    .unwrap_or(&self.blank_texture);

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(
                    1,
                    self.draw_bindings.bind_group(),
                    &[DrawBindings::offset(index)],
                );
                render_pass.set_bind_group(2, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, positions.slice(..));
                render_pass.set_vertex_buffer(1, tex_coords.slice(..));
                render_pass.set_vertex_buffer(2, normals.slice(..));

                match call.buffers.indices.and_then(|h| self.buffers.get(h.0 as usize)) {
                    Some(indices) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..call.buffers.index_count, 0, 0..1);
                    }
                    None => render_pass.draw(0..call.buffers.vertex_count, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramHandle {
        let handle = ProgramHandle(self.next_program);
        self.next_program += 1;
        self.pipeline_manager
            .load_program(handle, vertex_source, fragment_source);
        handle
    }

    fn program_log(&self, program: ProgramHandle) -> Option<String> {
        self.pipeline_manager.program_log(program)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> BufferHandle {
        let (contents, usage): (&[u8], wgpu::BufferUsages) = match data {
            BufferData::Vec3(v) => (bytemuck::cast_slice(v), wgpu::BufferUsages::VERTEX),
            BufferData::Vec2(v) => (bytemuck::cast_slice(v), wgpu::BufferUsages::VERTEX),
            BufferData::Indices(i) => (bytemuck::cast_slice(i), wgpu::BufferUsages::INDEX),
        };

        // wgpu rejects empty buffers; keep one element so the handle stays valid
        let padding = [0u8; 12];
        let contents = if contents.is_empty() { &padding[..] } else { contents };

        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            self.device.as_ref(),
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Buffer", kind)),
                contents,
                usage,
            },
        );
        self.buffers.push(buffer);
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    fn create_texture(&mut self, image: TextureImage<'_>) -> TextureHandle {
        let label = format!("Entity Texture {}", self.textures.len());
        let resource = TextureResource::create_from_image(&self.device, &self.queue, image, &label);
        let bind_group = Self::texture_bind_group(&self.device, &self.texture_layout, &resource);
        self.textures.push(BoundTexture {
            _resource: resource,
            bind_group,
        });
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn begin_frame(&mut self, globals: &FrameGlobals) {
        if self.frame.is_some() {
            log::warn!("begin_frame called twice, dropping the unfinished frame");
        }
        self.frame = Some(PendingFrame {
            globals: *globals,
            draws: Vec::new(),
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(program) = self.current_program else {
            log::warn!("Draw of '{}' with no program in use", call.entity);
            return;
        };
        let Some(topology) = call.mode.topology() else {
            if self.unsupported_modes.insert(call.mode) {
                log::warn!("{:?} can't be drawn with wgpu, skipping such draws", call.mode);
            }
            return;
        };
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("Draw of '{}' outside a frame ignored", call.entity);
            return;
        };

        let key = PipelineKey {
            program,
            topology,
            blend: call.blend,
            depth_write: call.depth_write,
        };
        frame.draws.push((key, call.clone()));
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.render(frame);
        }
    }
}
