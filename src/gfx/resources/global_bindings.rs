//! Uniform bindings shared by the scene pipelines
//!
//! Group 0 holds per-frame globals (projection-view, eye, light), group 1 the
//! per-draw uniforms at a dynamic offset, group 2 the entity texture. The
//! structs here MUST match the WGSL declarations in the scene shaders.

use cgmath::Matrix4;

use crate::{
    gfx::rendering::backend::{DrawCall, FrameGlobals},
    wgpu_utils::{binding_types, DynamicUniformBuffer, UniformBuffer},
};

/// Maps GL clip depth (-1..1) to wgpu clip depth (0..1)
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pv: [[f32; 4]; 4],
    eye: [[f32; 4]; 4],
    light: [f32; 4],
}
// 64 + 64 + 16 = 144 bytes

impl From<&FrameGlobals> for GlobalUniform {
    fn from(globals: &FrameGlobals) -> Self {
        let light = globals.light_direction;
        Self {
            pv: (OPENGL_TO_WGPU_MATRIX * globals.projection_view).into(),
            eye: globals.eye.into(),
            light: [light.x, light.y, light.z, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    options: [f32; 4],
}
// 64 + 64 + 16 + 16 = 160 bytes, one 256 byte slot per draw

impl From<&DrawCall> for DrawUniform {
    fn from(call: &DrawCall) -> Self {
        Self {
            model: call.model.into(),
            normal_matrix: call.normal_matrix.into(),
            color: call.color.to_array(),
            options: call.shading.to_array(),
        }
    }
}

/// Group 0: per-frame globals
pub struct GlobalBindings {
    ubo: UniformBuffer<GlobalUniform>,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let ubo = UniformBuffer::new(device);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[binding_types::rendering_entry(0, binding_types::uniform())],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        Self {
            ubo,
            layout,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, globals: &FrameGlobals) {
        self.ubo.update_content(queue, GlobalUniform::from(globals));
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Group 1: per-draw uniforms, one slot per draw of the frame
pub struct DrawBindings {
    buffer: DynamicUniformBuffer<DrawUniform>,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl DrawBindings {
    pub fn new(device: &wgpu::Device, initial_slots: usize) -> Self {
        let buffer = DynamicUniformBuffer::new(device, initial_slots);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[binding_types::rendering_entry(
                0,
                binding_types::uniform_dynamic(DynamicUniformBuffer::<DrawUniform>::min_binding_size()),
            )],
        });
        let bind_group = Self::create_bind_group(device, &layout, &buffer);

        Self {
            buffer,
            layout,
            bind_group,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &DynamicUniformBuffer<DrawUniform>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.binding_resource(),
            }],
        })
    }

    /// Uploads this frame's draw uniforms, in draw order
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, draws: &[DrawUniform]) {
        if self.buffer.write(device, queue, draws) {
            self.bind_group = Self::create_bind_group(device, &self.layout, &self.buffer);
        }
    }

    /// Dynamic offset of the `index`-th draw
    pub fn offset(index: usize) -> u32 {
        DynamicUniformBuffer::<DrawUniform>::offset(index)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Group 2 layout: texture and its sampler
pub fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Texture Bind Group Layout"),
        entries: &[
            binding_types::fragment_entry(0, binding_types::texture_2d()),
            binding_types::fragment_entry(
                1,
                binding_types::sampler(wgpu::SamplerBindingType::Filtering),
            ),
        ],
    })
}
