//! # Vista Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use vista::prelude::*;
//!
//! let mut engine = Engine::new(RecordingBackend::default(), EngineConfig::default());
//! engine.sphere(Props::named("ball").with_color("f80")).unwrap();
//! engine.frame(16.0);
//! ```

// Re-export core application types
pub use crate::app::{AppConfig, VistaApp};
pub use crate::default;
pub use crate::engine::{Engine, EngineConfig, FrameStats};
pub use crate::error::EngineError;

// Re-export scene and rendering types
pub use crate::gfx::geometry::{primitives, Model};
pub use crate::gfx::rendering::{
    BlendMode, DrawCall, DrawMode, GraphicsBackend, RecordingBackend, WgpuBackend,
};
pub use crate::gfx::resources::{Bitmap, TextureKey};
pub use crate::gfx::scene::{EntityKind, Property, Props, Rgba, CAMERA, LIGHT};

// Re-export common external dependencies
pub use cgmath::{Matrix4, Vector3};
