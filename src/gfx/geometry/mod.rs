//! # Model geometry
//!
//! A [`Model`] is the vertex data shared by every entity of one kind: positions,
//! optional texture coordinates, optional normals and optional indices. Built-in
//! models live in [`primitives`]; custom ones are registered with `Engine::add`,
//! either built by hand or imported from an OBJ file with [`Model::load_obj`].
//!
//! ```rust
//! use vista::gfx::geometry::primitives;
//!
//! let cube = primitives::cube();
//! assert_eq!(cube.vertex_count(), 36);
//! ```

pub mod primitives;

use std::{collections::HashMap, path::Path};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has no vertices")]
    Empty,
    #[error("model has {vertices} vertices but {actual} {attribute}")]
    AttributeLength {
        attribute: &'static str,
        vertices: usize,
        actual: usize,
    },
    #[error("index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("failed to load OBJ file: {0}")]
    Obj(#[from] tobj::LoadError),
}

/// Vertex data of one model type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub vertices: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Custom normals; when present they are always used for shading
    pub normals: Option<Vec<[f32; 3]>>,
    pub indices: Option<Vec<u32>>,
}

impl Model {
    pub fn new(vertices: Vec<[f32; 3]>) -> Self {
        Self {
            vertices,
            ..Default::default()
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of elements drawn: indices if indexed, vertices otherwise
    pub fn element_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.vertices.len(), |indices| indices.len())
    }

    pub fn has_custom_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Checks attribute lengths and index bounds
    pub fn validate(&self) -> Result<(), ModelError> {
        let vertices = self.vertices.len();
        if vertices == 0 {
            return Err(ModelError::Empty);
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertices {
                return Err(ModelError::AttributeLength {
                    attribute: "uvs",
                    vertices,
                    actual: uvs.len(),
                });
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != vertices {
                return Err(ModelError::AttributeLength {
                    attribute: "normals",
                    vertices,
                    actual: normals.len(),
                });
            }
        }
        if let Some(indices) = &self.indices {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices) {
                return Err(ModelError::IndexOutOfRange { index, vertices });
            }
        }
        Ok(())
    }

    /// Loads every object of an OBJ file as a named model
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<(String, Model)>, ModelError> {
        let (models, _materials) = tobj::load_obj(
            path.as_ref(),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut out = Vec::with_capacity(models.len());
        for (i, obj) in models.into_iter().enumerate() {
            let mesh = obj.mesh;
            let name = if obj.name.is_empty() {
                format!("model_{}", i)
            } else {
                obj.name
            };

            let vertices: Vec<[f32; 3]> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();

            let mut model = Model::new(vertices).with_indices(mesh.indices);
            if !mesh.texcoords.is_empty() && mesh.texcoords.len() / 2 == model.vertex_count() {
                model.uvs = Some(mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect());
            }
            if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
                model.normals = Some(mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect());
            }

            log::debug!(
                "Loaded OBJ model '{}': {} vertices, {} indices",
                name,
                model.vertex_count(),
                model.element_count()
            );
            out.push((name, model));
        }

        Ok(out)
    }
}

fn position_key(p: [f32; 3]) -> [u32; 3] {
    // -0.0 and 0.0 are the same corner
    [(p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits(), (p[2] + 0.0).to_bits()]
}

/// Per-vertex normals averaged over every triangle touching the same position
///
/// Vertices that share a position share a normal even when they are separate
/// entries, which is what makes duplicated-vertex meshes like the built-in
/// cube and sphere look smooth. Triangles are taken from the indices when
/// present, otherwise from consecutive vertex triples.
pub fn smooth_normals(model: &Model) -> Vec<[f32; 3]> {
    let vertices = &model.vertices;
    let triangles: Vec<[usize; 3]> = match &model.indices {
        Some(indices) => indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .filter(|t| t.iter().all(|&i| i < vertices.len()))
            .collect(),
        None => (0..vertices.len() / 3).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect(),
    };

    let mut sums: HashMap<[u32; 3], [f32; 3]> = HashMap::new();
    for [a, b, c] in triangles {
        let (pa, pb, pc) = (vertices[a], vertices[b], vertices[c]);
        let ab = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let bc = [pc[0] - pb[0], pc[1] - pb[1], pc[2] - pb[2]];
        let normal = [
            ab[1] * bc[2] - ab[2] * bc[1],
            ab[2] * bc[0] - ab[0] * bc[2],
            ab[0] * bc[1] - ab[1] * bc[0],
        ];
        for p in [pa, pb, pc] {
            let sum = sums.entry(position_key(p)).or_insert([0.0; 3]);
            sum[0] += normal[0];
            sum[1] += normal[1];
            sum[2] += normal[2];
        }
    }

    vertices
        .iter()
        .map(|&p| {
            let n = sums.get(&position_key(p)).copied().unwrap_or([0.0; 3]);
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > f32::EPSILON {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 0.0, 0.0]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn validation_catches_mismatched_attributes() {
        let model = Model::new(vec![[0.0; 3]; 3]).with_uvs(vec![[0.0; 2]; 2]);
        assert!(matches!(
            model.validate(),
            Err(ModelError::AttributeLength { attribute: "uvs", .. })
        ));

        let model = Model::new(vec![[0.0; 3]; 3]).with_indices(vec![0, 1, 3]);
        assert!(matches!(
            model.validate(),
            Err(ModelError::IndexOutOfRange { index: 3, .. })
        ));

        assert!(matches!(Model::default().validate(), Err(ModelError::Empty)));
    }

    #[test]
    fn flat_triangle_gets_its_face_normal() {
        let model = Model::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        for n in smooth_normals(&model) {
            assert_abs_diff_eq!(n[2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn shared_positions_average_their_faces() {
        // two triangles meeting at a right angle along the x axis
        let model = Model::new(vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let normals = smooth_normals(&model);

        let h = std::f32::consts::FRAC_1_SQRT_2;
        // the edge vertices are shared and average +z with +y
        assert_abs_diff_eq!(normals[0][1], h, epsilon = 1e-5);
        assert_abs_diff_eq!(normals[0][2], h, epsilon = 1e-5);
        assert_eq!(normals[0], normals[4]);
        assert_eq!(normals[1], normals[3]);
        // the far corners keep their own face
        assert_abs_diff_eq!(normals[2][2], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(normals[5][1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn built_in_cube_normals_point_out_of_corners() {
        let cube = primitives::cube();
        let normals = smooth_normals(&cube);
        for (p, n) in cube.vertices.iter().zip(&normals) {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert_abs_diff_eq!(len, 1.0, epsilon = 1e-5);
            for axis in 0..3 {
                assert!(n[axis] * p[axis] > 0.0, "{n:?} points into the cube at {p:?}");
            }
        }
    }
}
