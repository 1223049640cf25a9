// src/lib.rs
//! Vista
//!
//! A small retained-mode 3D scene manager built on wgpu and winit. Entities are
//! declared by name, changed with linear transitions, and the whole scene is
//! redrawn every frame.

pub mod app;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{AppConfig, VistaApp};
pub use engine::{Engine, EngineConfig, FrameStats};
pub use error::EngineError;

/// Creates a windowed application with default settings
pub fn default() -> anyhow::Result<VistaApp> {
    VistaApp::new(AppConfig::default())
}
