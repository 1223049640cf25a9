//! # Graphics Module
//!
//! Everything between the scene description and the GPU:
//!
//! - **Scene** ([`scene`]) - entity states, the store, interpolation and
//!   world matrix composition
//! - **Geometry** ([`geometry`]) - built-in and custom models, smooth normals,
//!   OBJ import
//! - **Resources** ([`resources`]) - bitmaps, the upload cache and wgpu
//!   textures and bindings
//! - **Rendering** ([`rendering`]) - the backend trait and its wgpu and
//!   recording implementations

pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use rendering::{GraphicsBackend, RecordingBackend, WgpuBackend};
pub use scene::{EntityKind, Props};
