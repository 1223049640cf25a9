//! Graphics backend boundary
//!
//! The engine never calls wgpu directly. Everything it needs from the graphics
//! API goes through [`GraphicsBackend`]: compiling the shader program, uploading
//! static buffers and textures, and issuing one draw per visible entity between
//! `begin_frame` and `end_frame`.
//!
//! Draw modes, blend modes and buffer kinds are named enums here and are only
//! translated to the target API's constants inside a backend implementation.

use std::str::FromStr;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use thiserror::Error;

use crate::gfx::scene::color::Rgba;

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Handle to a GPU-resident vertex attribute or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a GPU-resident texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Errors raised while bringing a backend up
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to create rendering surface: {0}")]
    Surface(String),
    #[error("no compatible graphics adapter: {0}")]
    Adapter(String),
    #[error("failed to open graphics device: {0}")]
    Device(String),
}

/// Primitive assembly mode for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    /// Triangle modes receive directional shading, point and line modes don't
    pub fn is_shaded(self) -> bool {
        matches!(
            self,
            DrawMode::Triangles | DrawMode::TriangleStrip | DrawMode::TriangleFan
        )
    }

    /// wgpu topology for this mode, `None` for modes wgpu can't assemble
    pub fn topology(self) -> Option<wgpu::PrimitiveTopology> {
        match self {
            DrawMode::Points => Some(wgpu::PrimitiveTopology::PointList),
            DrawMode::Lines => Some(wgpu::PrimitiveTopology::LineList),
            DrawMode::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
            DrawMode::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
            DrawMode::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
            DrawMode::LineLoop | DrawMode::TriangleFan => None,
        }
    }
}

/// Error for unknown draw mode names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown draw mode '{0}'")]
pub struct UnknownDrawMode(pub String);

impl FromStr for DrawMode {
    type Err = UnknownDrawMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "").as_str() {
            "points" => Ok(DrawMode::Points),
            "lines" => Ok(DrawMode::Lines),
            "lineloop" => Ok(DrawMode::LineLoop),
            "linestrip" => Ok(DrawMode::LineStrip),
            "triangles" => Ok(DrawMode::Triangles),
            "trianglestrip" => Ok(DrawMode::TriangleStrip),
            "trianglefan" => Ok(DrawMode::TriangleFan),
            _ => Err(UnknownDrawMode(s.to_string())),
        }
    }
}

/// Color blending applied to a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Blending disabled
    #[default]
    Opaque,
    /// Source alpha / one minus source alpha
    Alpha,
}

/// Kind of static buffer being uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Positions,
    TexCoords,
    Normals,
    Indices,
}

/// Data handed to [`GraphicsBackend::create_buffer`]
#[derive(Debug, Clone, Copy)]
pub enum BufferData<'a> {
    Vec3(&'a [[f32; 3]]),
    Vec2(&'a [[f32; 2]]),
    Indices(&'a [u32]),
}

impl BufferData<'_> {
    pub fn len(&self) -> usize {
        match self {
            BufferData::Vec3(data) => data.len(),
            BufferData::Vec2(data) => data.len(),
            BufferData::Indices(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pixel data ready for upload: RGBA8, rows bottom-up, alpha premultiplied
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Per-frame values shared by every draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGlobals {
    pub clear_color: Rgba,
    /// Camera world matrix
    pub eye: Matrix4<f32>,
    /// Projection premultiplied onto the inverted eye matrix
    pub projection_view: Matrix4<f32>,
    pub light_direction: Vector3<f32>,
}

impl Default for FrameGlobals {
    fn default() -> Self {
        Self {
            clear_color: Rgba::WHITE,
            eye: Matrix4::identity(),
            projection_view: Matrix4::identity(),
            light_direction: Vector3::new(0.0, -1.0, 0.0),
        }
    }
}

/// Buffers bound for one model type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelBuffers {
    pub positions: BufferHandle,
    pub tex_coords: Option<BufferHandle>,
    pub normals: Option<BufferHandle>,
    pub indices: Option<BufferHandle>,
    pub vertex_count: u32,
    pub index_count: u32,
    /// The model ships its own normals, which are always used
    pub custom_normals: bool,
}

/// Shading switches sent alongside each draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingOptions {
    pub smooth: bool,
    pub shaded: bool,
    pub ambient: f32,
    /// 0 = fully textured, 1 = fully colored
    pub mix: f32,
}

impl ShadingOptions {
    pub fn to_array(self) -> [f32; 4] {
        [
            self.smooth as u32 as f32,
            self.shaded as u32 as f32,
            self.ambient,
            self.mix,
        ]
    }
}

/// Everything a backend needs to draw one entity
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub entity: String,
    pub buffers: ModelBuffers,
    pub model: Matrix4<f32>,
    /// Inverse transpose of `model`, for normals
    pub normal_matrix: Matrix4<f32>,
    pub color: Rgba,
    pub texture: Option<TextureHandle>,
    pub shading: ShadingOptions,
    pub mode: DrawMode,
    pub blend: BlendMode,
    pub depth_write: bool,
}

/// The graphics API as seen by the engine
///
/// Implementations must tolerate redundant calls and must not panic on bad
/// input: diagnostics go to the log and the frame carries on.
pub trait GraphicsBackend {
    /// Compiles and links a program from vertex and fragment sources
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramHandle;

    /// Compile/link diagnostics for a program, `None` when it built cleanly
    fn program_log(&self, program: ProgramHandle) -> Option<String>;

    /// Makes a program current for subsequent draws
    fn use_program(&mut self, program: ProgramHandle);

    /// Uploads a static buffer
    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> BufferHandle;

    /// Uploads a texture
    fn create_texture(&mut self, image: TextureImage<'_>) -> TextureHandle;

    /// Reconfigures the drawable surface
    fn resize(&mut self, width: u32, height: u32);

    /// Current drawable size in pixels
    fn surface_size(&self) -> (u32, u32);

    fn begin_frame(&mut self, globals: &FrameGlobals);

    fn draw(&mut self, call: &DrawCall);

    /// Submits and presents everything drawn since `begin_frame`
    fn end_frame(&mut self);
}
