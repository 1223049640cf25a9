//! Model and texture resource cache
//!
//! GPU buffers are built the first time an entity of a model type is declared
//! and textures the first time a [`TextureKey`] is seen. Every `ensure_*` call
//! after that returns the cached handles without touching the backend, so the
//! engine can call them on every update without bookkeeping of its own.

use std::collections::HashMap;

use crate::gfx::{
    geometry::{primitives, smooth_normals, Model, ModelError},
    rendering::backend::{
        BufferData, BufferHandle, BufferKind, GraphicsBackend, ModelBuffers, TextureHandle,
        TextureImage,
    },
    resources::bitmap::{Bitmap, TextureKey},
};

#[derive(Debug, Default)]
pub struct ResourceCache {
    models: HashMap<String, Model>,
    buffers: HashMap<String, ModelBuffers>,
    smooth_normals: HashMap<String, BufferHandle>,
    textures: HashMap<TextureKey, TextureHandle>,
}

impl ResourceCache {
    /// Cache with every built-in model registered and nothing uploaded
    pub fn with_builtins() -> Self {
        let mut cache = Self::default();
        for (name, model) in primitives::builtins() {
            cache.models.insert(name.to_string(), model);
        }
        cache
    }

    /// Registers or replaces a model type
    ///
    /// Replacing a model drops its uploaded buffers; they are rebuilt on next use.
    pub fn register_model(&mut self, name: &str, model: Model) -> Result<(), ModelError> {
        model.validate()?;
        if self.models.insert(name.to_string(), model).is_some() {
            log::debug!("Model '{}' replaced, buffers will be rebuilt", name);
            self.buffers.remove(name);
            self.smooth_normals.remove(name);
        }
        Ok(())
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Buffers of a model type, uploading them on first use
    ///
    /// Returns `None` for unregistered model names.
    pub fn ensure_buffers<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        name: &str,
    ) -> Option<ModelBuffers> {
        if let Some(buffers) = self.buffers.get(name) {
            return Some(*buffers);
        }

        let model = self.models.get(name)?;
        let positions = backend.create_buffer(BufferKind::Positions, BufferData::Vec3(&model.vertices));
        let tex_coords = model
            .uvs
            .as_ref()
            .map(|uvs| backend.create_buffer(BufferKind::TexCoords, BufferData::Vec2(uvs)));
        let normals = model
            .normals
            .as_ref()
            .map(|normals| backend.create_buffer(BufferKind::Normals, BufferData::Vec3(normals)));
        let indices = model
            .indices
            .as_ref()
            .map(|indices| backend.create_buffer(BufferKind::Indices, BufferData::Indices(indices)));

        let buffers = ModelBuffers {
            positions,
            tex_coords,
            normals,
            indices,
            vertex_count: model.vertex_count() as u32,
            index_count: model.indices.as_ref().map_or(0, |i| i.len() as u32),
            custom_normals: model.has_custom_normals(),
        };

        log::debug!(
            "Uploaded buffers for model '{}' ({} vertices)",
            name,
            buffers.vertex_count
        );
        self.buffers.insert(name.to_string(), buffers);
        Some(buffers)
    }

    /// Normal buffer for smooth shading of a model type
    ///
    /// Models with their own normals use those. Others get position-averaged
    /// normals computed and uploaded once.
    pub fn ensure_smooth_normals<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        name: &str,
    ) -> Option<BufferHandle> {
        let buffers = self.ensure_buffers(backend, name)?;
        if let Some(normals) = buffers.normals {
            return Some(normals);
        }
        if let Some(handle) = self.smooth_normals.get(name) {
            return Some(*handle);
        }

        let model = self.models.get(name)?;
        let normals = smooth_normals(model);
        let handle = backend.create_buffer(BufferKind::Normals, BufferData::Vec3(&normals));
        log::debug!("Computed smooth normals for model '{}'", name);
        self.smooth_normals.insert(name.to_string(), handle);
        Some(handle)
    }

    /// Already computed smooth normals, without uploading anything
    pub fn smooth_normals(&self, name: &str) -> Option<BufferHandle> {
        self.buffers
            .get(name)
            .and_then(|b| b.normals)
            .or_else(|| self.smooth_normals.get(name).copied())
    }

    /// Texture for a bitmap, flipping, premultiplying and uploading it on first use
    pub fn ensure_texture<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        bitmap: &Bitmap,
    ) -> TextureHandle {
        if let Some(handle) = self.textures.get(&bitmap.key) {
            return *handle;
        }

        let pixels = bitmap.to_upload_pixels();
        let handle = backend.create_texture(TextureImage {
            width: bitmap.width,
            height: bitmap.height,
            pixels: &pixels,
        });
        log::debug!(
            "Uploaded texture {:?} ({}x{})",
            bitmap.key,
            bitmap.width,
            bitmap.height
        );
        self.textures.insert(bitmap.key, handle);
        handle
    }

    pub fn texture(&self, key: TextureKey) -> Option<TextureHandle> {
        self.textures.get(&key).copied()
    }

    /// Forgets every uploaded resource, keeping registered models
    pub fn clear_uploads(&mut self) {
        self.buffers.clear();
        self.smooth_normals.clear();
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::recording::RecordingBackend;

    #[test]
    fn buffers_upload_once_per_model() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();

        let first = cache.ensure_buffers(&mut backend, "cube").unwrap();
        let uploads = backend.buffers.len();
        let second = cache.ensure_buffers(&mut backend, "cube").unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.buffers.len(), uploads);
        assert_eq!(backend.buffer_uploads(BufferKind::Positions), 1);
        assert_eq!(backend.buffer_uploads(BufferKind::TexCoords), 1);
        assert_eq!(first.vertex_count, 36);
        assert!(first.indices.is_none());
    }

    #[test]
    fn sphere_uploads_indices() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();
        let buffers = cache.ensure_buffers(&mut backend, "sphere").unwrap();
        assert!(buffers.indices.is_some());
        assert_eq!(buffers.index_count, 20 * 20 * 6);
    }

    #[test]
    fn unknown_model_has_no_buffers() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();
        assert!(cache.ensure_buffers(&mut backend, "teapot").is_none());
        assert!(backend.buffers.is_empty());
    }

    #[test]
    fn smooth_normals_computed_once() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();

        let a = cache.ensure_smooth_normals(&mut backend, "pyramid").unwrap();
        let b = cache.ensure_smooth_normals(&mut backend, "pyramid").unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.buffer_uploads(BufferKind::Normals), 1);
        assert_eq!(cache.smooth_normals("pyramid"), Some(a));
    }

    #[test]
    fn custom_normals_are_reused_for_smooth_shading() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();
        let model = Model::new(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .with_normals(vec![[0.0, 0.0, 1.0]; 3]);
        cache.register_model("tri", model).unwrap();

        let buffers = cache.ensure_buffers(&mut backend, "tri").unwrap();
        assert!(buffers.custom_normals);
        let smooth = cache.ensure_smooth_normals(&mut backend, "tri").unwrap();
        assert_eq!(Some(smooth), buffers.normals);
        assert_eq!(backend.buffer_uploads(BufferKind::Normals), 1);
    }

    #[test]
    fn textures_upload_once_per_key() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();
        let bitmap = Bitmap::from_rgba8(TextureKey(9), 1, 2, vec![255, 0, 0, 255, 0, 0, 255, 255])
            .unwrap();

        let a = cache.ensure_texture(&mut backend, &bitmap);
        let b = cache.ensure_texture(&mut backend, &bitmap);
        assert_eq!(a, b);
        assert_eq!(backend.textures.len(), 1);
        // rows arrive bottom-up
        assert_eq!(&backend.textures[0].pixels[0..4], &[0, 0, 255, 255]);
        assert_eq!(cache.texture(TextureKey(9)), Some(a));
    }

    #[test]
    fn replacing_a_model_rebuilds_its_buffers() {
        let mut backend = RecordingBackend::default();
        let mut cache = ResourceCache::with_builtins();
        cache.ensure_buffers(&mut backend, "plane").unwrap();
        cache
            .register_model("plane", primitives::sphere(4))
            .unwrap();
        let buffers = cache.ensure_buffers(&mut backend, "plane").unwrap();
        assert_eq!(buffers.vertex_count, 25);
        assert_eq!(backend.buffer_uploads(BufferKind::Positions), 2);
    }

    #[test]
    fn invalid_models_are_refused() {
        let mut cache = ResourceCache::with_builtins();
        assert!(cache.register_model("empty", Model::default()).is_err());
        assert!(!cache.has_model("empty"));
    }
}
