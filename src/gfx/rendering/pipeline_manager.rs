//! Render pipeline management for the scene program
//!
//! Programs are a vertex and a fragment WGSL module compiled together. The
//! pipelines built from them differ only in primitive topology, blending and
//! depth writes, so they are created lazily the first time a draw needs a
//! given combination and cached under a [`PipelineKey`].

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use super::backend::{BlendMode, ProgramHandle};
use crate::gfx::resources::texture_resource::TextureResource;

/// Everything that distinguishes one scene pipeline from another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramHandle,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub depth_write: bool,
}

struct ShaderProgram {
    vertex: ShaderModule,
    fragment: ShaderModule,
    log: Option<String>,
}

const POSITION_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const UV_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const NORMAL_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];

/// One buffer per attribute: positions, uvs, normals
fn vertex_buffer_layouts() -> [VertexBufferLayout<'static>; 3] {
    [
        VertexBufferLayout {
            array_stride: 12,
            step_mode: VertexStepMode::Vertex,
            attributes: &POSITION_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: 8,
            step_mode: VertexStepMode::Vertex,
            attributes: &UV_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: 12,
            step_mode: VertexStepMode::Vertex,
            attributes: &NORMAL_ATTRIBUTES,
        },
    ]
}

/// Compiles programs and lazily creates the pipelines draws ask for
pub struct PipelineManager {
    device: Arc<Device>,
    layout: PipelineLayout,
    format: TextureFormat,
    cull_mode: Option<Face>,
    programs: HashMap<ProgramHandle, ShaderProgram>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    failed: HashMap<PipelineKey, String>,
}

impl PipelineManager {
    /// Creates a new pipeline manager
    ///
    /// # Arguments
    /// * `device` - Shared wgpu device for creating resources
    /// * `bind_group_layouts` - Globals, per-draw uniforms and texture, in group order
    /// * `format` - Color target format
    /// * `cull_mode` - Face culling applied to every pipeline
    pub fn new(
        device: Arc<Device>,
        bind_group_layouts: &[&BindGroupLayout],
        format: TextureFormat,
        cull_mode: Option<Face>,
    ) -> Self {
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        Self {
            device,
            layout,
            format,
            cull_mode,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    /// Compiles a program's modules, capturing validation errors as its log
    pub fn load_program(&mut self, handle: ProgramHandle, vertex_source: &str, fragment_source: &str) {
        self.device.push_error_scope(ErrorFilter::Validation);

        let vertex = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene Vertex Shader"),
            source: ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene Fragment Shader"),
            source: ShaderSource::Wgsl(fragment_source.into()),
        });

        let log = pollster::block_on(self.device.pop_error_scope()).map(|e| e.to_string());
        self.programs.insert(
            handle,
            ShaderProgram {
                vertex,
                fragment,
                log,
            },
        );
    }

    pub fn program_log(&self, handle: ProgramHandle) -> Option<String> {
        match self.programs.get(&handle) {
            Some(program) => program.log.clone(),
            None => Some(format!("program {:?} was never compiled", handle)),
        }
    }

    /// Makes sure the pipeline for `key` exists, creating it if needed
    ///
    /// Returns false when it can't be built; the failure is logged once.
    pub fn prepare(&mut self, key: PipelineKey) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }
        if self.failed.contains_key(&key) {
            return false;
        }

        match self.create_pipeline(&key) {
            Ok(pipeline) => {
                log::debug!("Created pipeline {:?}", key);
                self.pipelines.insert(key, pipeline);
                true
            }
            Err(e) => {
                log::error!("Failed to create pipeline {:?}: {}", key, e);
                self.failed.insert(key, e);
                false
            }
        }
    }

    /// A pipeline previously created by [`PipelineManager::prepare`]
    pub fn pipeline(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    fn create_pipeline(&self, key: &PipelineKey) -> Result<RenderPipeline, String> {
        let program = self
            .programs
            .get(&key.program)
            .ok_or_else(|| format!("program {:?} not found", key.program))?;
        if let Some(log) = &program.log {
            return Err(format!("program did not compile: {}", log));
        }

        let blend = match key.blend {
            BlendMode::Opaque => None,
            BlendMode::Alpha => Some(BlendState::ALPHA_BLENDING),
        };
        let strip_index_format = match key.topology {
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip => {
                Some(IndexFormat::Uint32)
            }
            _ => None,
        };
        let buffers = vertex_buffer_layouts();
        let targets = [Some(ColorTargetState {
            format: self.format,
            blend,
            write_mask: ColorWrites::ALL,
        })];

        self.device.push_error_scope(ErrorFilter::Validation);
        let pipeline = self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&self.layout),
            vertex: VertexState {
                module: &program.vertex,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &program.fragment,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: key.topology,
                strip_index_format,
                front_face: FrontFace::Ccw,
                cull_mode: self.cull_mode,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: TextureResource::DEPTH_FORMAT,
                depth_write_enabled: key.depth_write,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(pipeline),
        }
    }
}
