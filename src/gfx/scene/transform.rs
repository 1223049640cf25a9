//! World matrix composition
//!
//! Local matrices are `T · Rz · Ry · Rx · S`, so a point is scaled, rotated
//! about x, then y, then z, then translated. Parents are composed before their
//! children regardless of declaration order, so group chains of any depth
//! resolve within a single frame. An entity carrying a matrix override uses it
//! as its world matrix as is, and its children compose onto it.

use std::collections::HashMap;

use cgmath::{Deg, Matrix4, SquareMatrix};

use super::{entity::Transform, interpolation::lerp_transform, store::SceneStore};

/// Local matrix of an interpolated transform
pub fn local_matrix(t: &Transform) -> Matrix4<f32> {
    Matrix4::from_translation(cgmath::Vector3::new(t.x, t.y, t.z))
        * Matrix4::from_angle_z(Deg(t.rz))
        * Matrix4::from_angle_y(Deg(t.ry))
        * Matrix4::from_angle_x(Deg(t.rx))
        * Matrix4::from_nonuniform_scale(t.w, t.h, t.d)
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done(Matrix4<f32>),
}

/// Composes and caches the world matrix of every entity in the store
pub fn compose_world_matrices(store: &mut SceneStore) {
    let mut visits: HashMap<String, Visit> = HashMap::with_capacity(store.len());
    let names: Vec<String> = store.names().to_vec();

    for name in &names {
        resolve(store, name, &mut visits);
    }

    for name in &names {
        if let (Some(Visit::Done(world)), Some(record)) = (visits.get(name), store.get_mut(name)) {
            record.world = Some(*world);
        }
    }
}

fn resolve(store: &SceneStore, name: &str, visits: &mut HashMap<String, Visit>) -> Matrix4<f32> {
    match visits.get(name) {
        Some(Visit::Done(world)) => return *world,
        Some(Visit::InProgress) => {
            log::warn!("Group cycle through '{}', using identity parent", name);
            return Matrix4::identity();
        }
        None => {}
    }

    let Some(record) = store.get(name) else {
        return Matrix4::identity();
    };
    if let Some(matrix) = record.next.matrix {
        visits.insert(name.to_string(), Visit::Done(matrix));
        return matrix;
    }

    visits.insert(name.to_string(), Visit::InProgress);

    let local = local_matrix(&lerp_transform(record));
    let world = match record.next.group.as_deref() {
        Some(parent) if store.contains(parent) => {
            if visits.get(parent) == Some(&Visit::InProgress) {
                log::warn!(
                    "'{}' and group '{}' form a cycle, using identity parent",
                    name,
                    parent
                );
                local
            } else {
                resolve(store, parent, visits) * local
            }
        }
        Some(parent) => {
            log::warn!("'{}' refers to missing group '{}'", name, parent);
            local
        }
        None => local,
    };

    visits.insert(name.to_string(), Visit::Done(world));
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::entity::{EntityKind, Props};
    use approx::assert_abs_diff_eq;

    fn translation(store: &SceneStore, name: &str) -> [f32; 3] {
        let m = store.get(name).unwrap().world.unwrap();
        [m.w.x, m.w.y, m.w.z]
    }

    #[test]
    fn group_translation_adds_up() {
        let mut store = SceneStore::new();
        store.set_state(&Props::named("g").x(10.0), Some(EntityKind::Group)).unwrap();
        store
            .set_state(&Props::named("c").x(1.0).with_group("g"), Some(EntityKind::Cube))
            .unwrap();

        compose_world_matrices(&mut store);
        assert_abs_diff_eq!(translation(&store, "c")[0], 11.0, epsilon = 1e-5);
    }

    #[test]
    fn child_declared_before_parent_resolves_same_frame() {
        let mut store = SceneStore::new();
        store
            .set_state(&Props::named("c").x(1.0).with_group("g"), Some(EntityKind::Cube))
            .unwrap();
        store
            .set_state(&Props::named("g").x(10.0).with_group("root"), Some(EntityKind::Group))
            .unwrap();
        store.set_state(&Props::named("root").y(3.0), Some(EntityKind::Group)).unwrap();

        compose_world_matrices(&mut store);
        let t = translation(&store, "c");
        assert_abs_diff_eq!(t[0], 11.0, epsilon = 1e-5);
        assert_abs_diff_eq!(t[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn matrix_override_replaces_composition_for_children() {
        let mut store = SceneStore::new();
        let fixed = Matrix4::from_translation(cgmath::Vector3::new(0.0, 7.0, 0.0));
        store.set_state(&Props::named("root").x(100.0), Some(EntityKind::Group)).unwrap();
        store
            .set_state(
                &Props::named("g").x(10.0).with_group("root").with_matrix(fixed),
                Some(EntityKind::Group),
            )
            .unwrap();
        store
            .set_state(&Props::named("c").x(1.0).with_group("g"), Some(EntityKind::Cube))
            .unwrap();

        compose_world_matrices(&mut store);
        assert_eq!(translation(&store, "g"), [0.0, 7.0, 0.0]);
        let t = translation(&store, "c");
        assert_abs_diff_eq!(t[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(t[1], 7.0, epsilon = 1e-6);

        store.set_state(&Props::named("g").without_matrix(), None).unwrap();
        compose_world_matrices(&mut store);
        assert_abs_diff_eq!(translation(&store, "c")[0], 111.0, epsilon = 1e-5);
    }

    #[test]
    fn missing_group_is_identity_parent() {
        let mut store = SceneStore::new();
        store
            .set_state(&Props::named("c").x(2.0).with_group("nope"), Some(EntityKind::Cube))
            .unwrap();
        compose_world_matrices(&mut store);
        assert_abs_diff_eq!(translation(&store, "c")[0], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn cycles_terminate() {
        let mut store = SceneStore::new();
        store
            .set_state(&Props::named("a").x(1.0).with_group("b"), Some(EntityKind::Group))
            .unwrap();
        store
            .set_state(&Props::named("b").x(2.0).with_group("a"), Some(EntityKind::Group))
            .unwrap();
        compose_world_matrices(&mut store);
        assert!(store.get("a").unwrap().world.is_some());
        assert!(store.get("b").unwrap().world.is_some());
    }

    #[test]
    fn rotation_applies_x_then_y_then_z() {
        let t = Transform {
            rx: 90.0,
            rz: 90.0,
            ..Transform::default()
        };
        // +y rotated 90 about x lands on +z, which z rotation leaves alone
        let p = local_matrix(&t) * cgmath::Vector4::new(0.0, 1.0, 0.0, 1.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn scale_applies_before_translation() {
        let t = Transform {
            x: 5.0,
            w: 2.0,
            ..Transform::default()
        };
        let p = local_matrix(&t) * cgmath::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(p.x, 7.0, epsilon = 1e-6);
    }
}
