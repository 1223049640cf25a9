//! # Scene state
//!
//! Named entities, their transitions and their world matrices.
//!
//! - [`SceneStore`] holds every entity's previous and next [`EntityState`]
//! - [`Props`] describes a partial update merged by the store
//! - [`interpolation`] blends previous toward next over the transition timer
//! - [`transform`] turns interpolated transforms into world matrices, parents first
//! - [`color`] and [`helpers`] hold the small conversions the frame loop needs

pub mod color;
pub mod entity;
pub mod helpers;
pub mod interpolation;
pub mod store;
pub mod transform;

pub use color::{parse_hex_color, Rgba};
pub use entity::{EntityKind, EntityState, Property, Props, Transform, CAMERA, LIGHT};
pub use store::{EntityRecord, SceneError, SceneStore};
