// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Caller bitmaps, the model/texture upload cache, and the wgpu textures and
//! bind groups behind them.

pub mod bitmap;
pub mod cache;
pub mod global_bindings;
pub mod texture_resource;

// Re-export main types
pub use bitmap::{Bitmap, BitmapError, TextureKey};
pub use cache::ResourceCache;
pub use texture_resource::TextureResource;
