// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! The [`GraphicsBackend`] trait is the only way the engine reaches the GPU.
//! [`WgpuBackend`] renders to a window; [`RecordingBackend`] records calls
//! without a GPU.

pub mod backend;
pub mod pipeline_manager;
pub mod recording;
pub mod wgpu_backend;

// Re-export main types
pub use backend::{BlendMode, DrawCall, DrawMode, FrameGlobals, GraphicsBackend};
pub use pipeline_manager::{PipelineKey, PipelineManager};
pub use recording::RecordingBackend;
pub use wgpu_backend::{SurfaceOptions, WgpuBackend};
