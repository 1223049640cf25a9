// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Small wrappers for uniform buffers and bind group layout entries.

pub mod binding_types;
pub mod uniform_buffer;

pub use uniform_buffer::{DynamicUniformBuffer, UniformBuffer};
