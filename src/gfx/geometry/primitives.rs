//! # Built-in models
//!
//! Unit-sized shapes centered on the origin. Plane, cube and pyramid are
//! unindexed triangle lists with one uv per vertex; the sphere is indexed.
//! None ship normals, so they are shaded with flat normals unless an entity
//! asks for smooth ones.

use std::f32::consts::PI;

use super::Model;

/// Latitude/longitude subdivisions of the built-in sphere
pub const SPHERE_PRECISION: u32 = 20;

/// Every built-in model with the name entities refer to it by
pub fn builtins() -> Vec<(&'static str, Model)> {
    vec![
        ("plane", plane()),
        ("billboard", billboard()),
        ("cube", cube()),
        ("pyramid", pyramid()),
        ("sphere", sphere(SPHERE_PRECISION)),
    ]
}

/// 1x1 square in the xy plane, facing +z
pub fn plane() -> Model {
    Model::new(vec![
        [0.5, 0.5, 0.0], [-0.5, 0.5, 0.0], [-0.5, -0.5, 0.0],
        [0.5, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0],
    ])
    .with_uvs(quad_uvs())
}

/// Same quad as [`plane`]; the vertex stage turns it to face the camera
pub fn billboard() -> Model {
    plane()
}

fn quad_uvs() -> Vec<[f32; 2]> {
    vec![
        [1.0, 1.0], [0.0, 1.0], [0.0, 0.0],
        [1.0, 1.0], [0.0, 0.0], [1.0, 0.0],
    ]
}

/// 1x1x1 cube, two triangles per face, every face textured with the full image
pub fn cube() -> Model {
    let vertices = vec![
        // front
        [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5], [-0.5, -0.5, 0.5], [0.5, -0.5, 0.5],
        // right
        [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5],
        [0.5, 0.5, -0.5], [0.5, -0.5, 0.5], [0.5, -0.5, -0.5],
        // up
        [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5],
        // left
        [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5],
        [-0.5, 0.5, 0.5], [-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5],
        // back
        [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5], [0.5, -0.5, -0.5],
        [-0.5, 0.5, -0.5], [0.5, -0.5, -0.5], [-0.5, -0.5, -0.5],
        // down
        [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5],
    ];
    let uvs = (0..6).flat_map(|_| quad_uvs()).collect();
    Model::new(vertices).with_uvs(uvs)
}

/// Square-based pyramid, apex at y = 0.5
pub fn pyramid() -> Model {
    let apex = [0.0, 0.5, 0.0];
    let vertices = vec![
        [-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], apex,
        [0.5, -0.5, 0.5], [0.5, -0.5, -0.5], apex,
        [0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], apex,
        [-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], apex,
        // base
        [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5],
    ];

    let side = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
    let mut uvs: Vec<[f32; 2]> = (0..4).flat_map(|_| side).collect();
    uvs.extend(quad_uvs());

    Model::new(vertices).with_uvs(uvs)
}

/// Indexed UV sphere of diameter 1 with `precision` rings and segments
pub fn sphere(precision: u32) -> Model {
    let p = precision.max(3);
    let count = ((p + 1) * (p + 1)) as usize;
    let mut vertices = Vec::with_capacity(count);
    let mut uvs = Vec::with_capacity(count);
    let mut indices = Vec::with_capacity((p * p * 6) as usize);

    for j in 0..=p {
        let aj = j as f32 * PI / p as f32;
        for i in 0..=p {
            let ai = i as f32 * 2.0 * PI / p as f32;
            vertices.push([
                ai.sin() * aj.sin() / 2.0,
                aj.cos() / 2.0,
                ai.cos() * aj.sin() / 2.0,
            ]);
            uvs.push([
                (i as f32 / p as f32).sin() * 3.5,
                -(j as f32 / p as f32).sin(),
            ]);

            if i < p && j < p {
                let p1 = j * (p + 1) + i;
                let p2 = p1 + p + 1;
                indices.extend_from_slice(&[p1, p2, p1 + 1, p1 + 1, p2, p2 + 1]);
            }
        }
    }

    Model::new(vertices).with_uvs(uvs).with_indices(indices)
}
