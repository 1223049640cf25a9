//! Small matrix helpers used by the frame loop

use cgmath::{Matrix4, Vector4};

/// Near clipping plane of the default projection
pub const DEFAULT_NEAR: f32 = 1.0;
/// Far clipping plane of the default projection
pub const DEFAULT_FAR: f32 = 1000.0;

/// World matrix of a quad that always faces the camera
///
/// Keeps the entity's translation and takes its orientation from the eye
/// matrix, scaled by the entity's width and height.
pub fn billboard_matrix(world: &Matrix4<f32>, eye: &Matrix4<f32>, w: f32, h: f32) -> Matrix4<f32> {
    Matrix4::from_cols(
        Vector4::new(eye.x.x, eye.x.y, eye.x.z, 0.0) * w,
        Vector4::new(eye.y.x, eye.y.y, eye.y.z, 0.0) * h,
        Vector4::new(eye.z.x, eye.z.y, eye.z.z, 0.0),
        world.w,
    )
}

/// Squared distance between the translation columns of two matrices
pub fn distance_sq(a: &Matrix4<f32>, b: &Matrix4<f32>) -> f32 {
    let dx = a.w.x - b.w.x;
    let dy = a.w.y - b.w.y;
    let dz = a.w.z - b.w.z;
    dx * dx + dy * dy + dz * dz
}

/// Right-handed perspective projection in GL clip space
///
/// `fov` is in degrees and is used as the half-angle: the focal length is
/// `1 / tan(fov)`. A non-positive aspect ratio is treated as square.
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let f = 1.0 / fov.to_radians().tan();
    let aspect = if aspect > 0.0 && aspect.is_finite() { aspect } else { 1.0 };
    let depth = near - far;

    Matrix4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, (far + near) / depth, -1.0,
        0.0, 0.0, 2.0 * far * near / depth, 0.0,
    )
}
