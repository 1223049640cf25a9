// src/wgpu_utils/uniform_buffer.rs
use std::{marker::PhantomData, num::NonZeroU64};

/// Offset alignment for dynamic uniform bindings, the default wgpu limit
pub const DYNAMIC_UNIFORM_STRIDE: u64 = 256;

fn short_type_name<T>() -> &'static str {
    let type_name = std::any::type_name::<T>();
    let pos = type_name.rfind(':').unwrap_or(0);
    if pos > 0 {
        &type_name[(pos + 1)..]
    } else {
        type_name
    }
}

/// Typed uniform buffer holding a single value
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    previous_content: Vec<u8>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", short_type_name::<Content>())),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            content_type: PhantomData,
            previous_content: Vec::new(),
        }
    }

    /// Update buffer content (skips the write when nothing changed)
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let new_content = bytemuck::bytes_of(&content);
        if self.previous_content == new_content {
            return;
        }
        queue.write_buffer(&self.buffer, 0, new_content);
        self.previous_content = new_content.to_vec();
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

/// Uniform buffer holding one value per draw, bound with a dynamic offset
///
/// Values are laid out every [`DYNAMIC_UNIFORM_STRIDE`] bytes. The buffer
/// grows when a frame needs more slots than it has; callers must rebuild any
/// bind group referencing it when [`DynamicUniformBuffer::write`] reports so.
pub struct DynamicUniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    capacity: usize,
    staging: Vec<u8>,
}

impl<Content: bytemuck::Pod> DynamicUniformBuffer<Content> {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        DynamicUniformBuffer {
            buffer: Self::create(device, capacity),
            content_type: PhantomData,
            capacity,
            staging: Vec::new(),
        }
    }

    fn create(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!(
                "DynamicUniformBuffer: {}",
                short_type_name::<Content>()
            )),
            size: capacity as u64 * DYNAMIC_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Writes every value at its slot; returns true when the buffer was reallocated
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, values: &[Content]) -> bool {
        let mut grown = false;
        if values.len() > self.capacity {
            self.capacity = values.len().next_power_of_two();
            self.buffer = Self::create(device, self.capacity);
            log::debug!("Grew per-draw uniform buffer to {} slots", self.capacity);
            grown = true;
        }
        if values.is_empty() {
            return grown;
        }

        let stride = DYNAMIC_UNIFORM_STRIDE as usize;
        self.staging.clear();
        self.staging.resize(values.len() * stride, 0);
        for (slot, value) in self.staging.chunks_exact_mut(stride).zip(values) {
            let bytes = bytemuck::bytes_of(value);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
        grown
    }

    /// Dynamic offset of slot `index`
    pub fn offset(index: usize) -> u32 {
        (index as u64 * DYNAMIC_UNIFORM_STRIDE) as u32
    }

    /// Binding covering a single slot
    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(std::mem::size_of::<Content>() as u64),
        })
    }

    pub fn min_binding_size() -> Option<NonZeroU64> {
        NonZeroU64::new(std::mem::size_of::<Content>() as u64)
    }
}
