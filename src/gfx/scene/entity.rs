//! Entity state records
//!
//! An entity's full state is an [`EntityState`]. Callers never build one
//! directly; they describe a partial update with [`Props`] and the store merges
//! it over the entity's previous state, or over [`EntityState::defaults`] the
//! first time the name is seen.

use std::sync::Arc;

use cgmath::Matrix4;

use crate::gfx::{
    rendering::backend::DrawMode,
    resources::bitmap::{Bitmap, TextureKey},
    scene::color::{color_or_fallback, parse_hex_color, Rgba, FALLBACK_COLOR},
};

/// Reserved name of the active camera
pub const CAMERA: &str = "camera";
/// Reserved name of the active light
pub const LIGHT: &str = "light";

/// What an entity is
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Plane,
    Billboard,
    Cube,
    Pyramid,
    Sphere,
    Group,
    Camera,
    Light,
    /// A model registered with `Engine::add`
    Custom(String),
}

impl EntityKind {
    /// Name of the model drawn for this kind
    pub fn model_name(&self) -> &str {
        match self {
            EntityKind::Plane => "plane",
            EntityKind::Billboard => "billboard",
            EntityKind::Cube => "cube",
            EntityKind::Pyramid => "pyramid",
            EntityKind::Sphere => "sphere",
            EntityKind::Group => "group",
            EntityKind::Camera => "camera",
            EntityKind::Light => "light",
            EntityKind::Custom(name) => name,
        }
    }

    /// Maps a model name back to a kind; unknown names are custom models
    pub fn from_name(name: &str) -> Self {
        match name {
            "plane" => EntityKind::Plane,
            "billboard" => EntityKind::Billboard,
            "cube" => EntityKind::Cube,
            "pyramid" => EntityKind::Pyramid,
            "sphere" => EntityKind::Sphere,
            "group" => EntityKind::Group,
            "camera" => EntityKind::Camera,
            "light" => EntityKind::Light,
            other => EntityKind::Custom(other.to_string()),
        }
    }

    /// Groups, cameras and lights get a matrix every frame but are never drawn
    pub fn is_invisible(&self) -> bool {
        matches!(
            self,
            EntityKind::Group | EntityKind::Camera | EntityKind::Light
        )
    }

    /// Flat quads don't write depth when blended
    pub fn is_flat(&self) -> bool {
        matches!(self, EntityKind::Plane | EntityKind::Billboard)
    }
}

/// One animatable transform property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    X,
    Y,
    Z,
    RotX,
    RotY,
    RotZ,
    Width,
    Height,
    Depth,
}

impl Property {
    pub const ALL: [Property; 9] = [
        Property::X,
        Property::Y,
        Property::Z,
        Property::RotX,
        Property::RotY,
        Property::RotZ,
        Property::Width,
        Property::Height,
        Property::Depth,
    ];
}

/// Translation, rotation (degrees) and scale of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    pub w: f32,
    pub h: f32,
    pub d: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            w: 1.0,
            h: 1.0,
            d: 1.0,
        }
    }
}

impl Transform {
    pub fn get(&self, property: Property) -> f32 {
        match property {
            Property::X => self.x,
            Property::Y => self.y,
            Property::Z => self.z,
            Property::RotX => self.rx,
            Property::RotY => self.ry,
            Property::RotZ => self.rz,
            Property::Width => self.w,
            Property::Height => self.h,
            Property::Depth => self.d,
        }
    }

    pub fn set(&mut self, property: Property, value: f32) {
        let slot = match property {
            Property::X => &mut self.x,
            Property::Y => &mut self.y,
            Property::Z => &mut self.z,
            Property::RotX => &mut self.rx,
            Property::RotY => &mut self.ry,
            Property::RotZ => &mut self.rz,
            Property::Width => &mut self.w,
            Property::Height => &mut self.h,
            Property::Depth => &mut self.d,
        };
        *slot = value;
    }
}

/// Complete state of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub name: String,
    pub kind: EntityKind,
    pub transform: Transform,
    /// Parent whose world matrix is premultiplied onto this one
    pub group: Option<String>,
    pub color: String,
    pub texture: Option<TextureKey>,
    pub mix: f32,
    pub mode: DrawMode,
    pub smooth: bool,
    pub unlit: bool,
    /// Transition duration (`a`), in the same unit as frame timestamps
    pub duration: f32,
    /// Time spent in the current transition (`f`), always within `0..=duration`
    pub elapsed: f32,
    pub renderer: Option<String>,
    /// Field of view in degrees; only the camera's is used
    pub fov: Option<f32>,
    /// Replaces the composed world matrix, for this entity and its children
    pub matrix: Option<Matrix4<f32>>,
}

impl EntityState {
    /// The state an entity starts from before its first update is merged in
    ///
    /// Unit scale, no translation or rotation, color `888`, triangles, no
    /// texture, no transition, no parent.
    pub fn defaults(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::default(),
            group: None,
            color: "888".to_string(),
            texture: None,
            mix: 0.0,
            mode: DrawMode::Triangles,
            smooth: false,
            unlit: false,
            duration: 0.0,
            elapsed: 0.0,
            renderer: None,
            fov: None,
            matrix: None,
        }
    }

    /// Decoded color, grey when the stored string is malformed
    pub fn rgba(&self) -> Rgba {
        color_or_fallback(&self.color)
    }

    /// Textured or translucent entities are drawn in the blended pass
    pub fn is_transparent(&self) -> bool {
        self.texture.is_some() || !self.rgba().is_opaque()
    }

    /// Merges a partial update over this state
    ///
    /// Set fields override, unset fields keep their current value. `size`
    /// expands to `w`, `h` and `d` but explicit `w`/`h`/`d` win over it.
    pub(crate) fn apply(&mut self, props: &Props) {
        if let Some(size) = props.size {
            self.transform.w = size;
            self.transform.h = size;
            self.transform.d = size;
        }
        for (property, value) in &props.transform {
            self.transform.set(*property, *value);
        }
        if let Some(group) = &props.group {
            self.group = group.clone();
        }
        if let Some(color) = &props.color {
            self.color = match parse_hex_color(color) {
                Ok(_) => color.clone(),
                Err(err) => {
                    log::warn!(
                        "Color '{}' of '{}' is not usable ({}), using {}",
                        color,
                        self.name,
                        err,
                        FALLBACK_COLOR
                    );
                    FALLBACK_COLOR.to_string()
                }
            };
        }
        if let Some(texture) = &props.texture {
            self.texture = texture.as_ref().map(|bitmap| bitmap.key);
        }
        if let Some(mix) = props.mix {
            self.mix = mix.clamp(0.0, 1.0);
        }
        if let Some(mode) = props.mode {
            self.mode = mode;
        }
        if let Some(smooth) = props.smooth {
            self.smooth = smooth;
        }
        if let Some(unlit) = props.unlit {
            self.unlit = unlit;
        }
        if let Some(duration) = props.duration {
            self.duration = duration.max(0.0);
        }
        if let Some(renderer) = &props.renderer {
            self.renderer = renderer.clone();
        }
        if let Some(fov) = props.fov {
            self.fov = Some(fov);
        }
        if let Some(matrix) = props.matrix {
            self.matrix = matrix;
        }
    }
}

/// A partial entity update
///
/// Built with chained setters and handed to `Engine::cube`, `Engine::move_entity`
/// and friends:
///
/// ```
/// use vista::gfx::scene::Props;
///
/// let props = Props::named("box").with_position(5.0, 0.0, 0.0).with_duration(30.0);
/// assert_eq!(props.name.as_deref(), Some("box"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Props {
    pub name: Option<String>,
    pub(crate) transform: Vec<(Property, f32)>,
    pub size: Option<f32>,
    pub(crate) group: Option<Option<String>>,
    pub color: Option<String>,
    pub(crate) texture: Option<Option<Arc<Bitmap>>>,
    pub mix: Option<f32>,
    pub mode: Option<DrawMode>,
    pub smooth: Option<bool>,
    pub unlit: Option<bool>,
    pub duration: Option<f32>,
    pub(crate) renderer: Option<Option<String>>,
    pub fov: Option<f32>,
    pub(crate) matrix: Option<Option<Matrix4<f32>>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Props addressing the entity called `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with(mut self, property: Property, value: f32) -> Self {
        self.transform.retain(|(p, _)| *p != property);
        self.transform.push((property, value));
        self
    }

    pub fn x(self, value: f32) -> Self {
        self.with(Property::X, value)
    }

    pub fn y(self, value: f32) -> Self {
        self.with(Property::Y, value)
    }

    pub fn z(self, value: f32) -> Self {
        self.with(Property::Z, value)
    }

    pub fn rx(self, degrees: f32) -> Self {
        self.with(Property::RotX, degrees)
    }

    pub fn ry(self, degrees: f32) -> Self {
        self.with(Property::RotY, degrees)
    }

    pub fn rz(self, degrees: f32) -> Self {
        self.with(Property::RotZ, degrees)
    }

    pub fn w(self, value: f32) -> Self {
        self.with(Property::Width, value)
    }

    pub fn h(self, value: f32) -> Self {
        self.with(Property::Height, value)
    }

    pub fn d(self, value: f32) -> Self {
        self.with(Property::Depth, value)
    }

    pub fn with_position(self, x: f32, y: f32, z: f32) -> Self {
        self.x(x).y(y).z(z)
    }

    /// Rotation in degrees about x, y and z
    pub fn with_rotation(self, rx: f32, ry: f32, rz: f32) -> Self {
        self.rx(rx).ry(ry).rz(rz)
    }

    pub fn with_scale(self, w: f32, h: f32, d: f32) -> Self {
        self.w(w).h(h).d(d)
    }

    /// Uniform scale shorthand
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(Some(group.into()));
        self
    }

    /// Detaches the entity from its parent group
    pub fn without_group(mut self) -> Self {
        self.group = Some(None);
        self
    }

    /// Hex color string: `rgb`, `rgba`, `rrggbb` or `rrggbbaa`
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_texture(mut self, bitmap: Arc<Bitmap>) -> Self {
        self.texture = Some(Some(bitmap));
        self
    }

    pub fn without_texture(mut self) -> Self {
        self.texture = Some(None);
        self
    }

    /// Texture/color blend, 0 = texture only, 1 = color only
    pub fn with_mix(mut self, mix: f32) -> Self {
        self.mix = Some(mix);
        self
    }

    pub fn with_mode(mut self, mode: DrawMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = Some(smooth);
        self
    }

    pub fn with_unlit(mut self, unlit: bool) -> Self {
        self.unlit = Some(unlit);
        self
    }

    /// Length of the transition started by this update
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Draw with a routine registered through `Engine::register_renderer`
    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(Some(renderer.into()));
        self
    }

    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov = Some(degrees);
        self
    }

    /// The bitmap carried by this update, if any
    pub fn texture(&self) -> Option<&Arc<Bitmap>> {
        self.texture.as_ref().and_then(|t| t.as_ref())
    }

    /// Use `matrix` as the world matrix instead of composing one from the
    /// transform and the parent group
    pub fn with_matrix(mut self, matrix: Matrix4<f32>) -> Self {
        self.matrix = Some(Some(matrix));
        self
    }

    /// Go back to the composed world matrix
    pub fn without_matrix(mut self) -> Self {
        self.matrix = Some(None);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_model_names() {
        for kind in [
            EntityKind::Plane,
            EntityKind::Billboard,
            EntityKind::Cube,
            EntityKind::Pyramid,
            EntityKind::Sphere,
            EntityKind::Group,
        ] {
            assert_eq!(EntityKind::from_name(kind.model_name()), kind);
        }
        assert_eq!(
            EntityKind::from_name("teapot"),
            EntityKind::Custom("teapot".into())
        );
    }

    #[test]
    fn explicit_scale_overrides_size() {
        let mut state = EntityState::defaults("o0", EntityKind::Cube);
        state.apply(&Props::new().with_size(3.0).h(0.5));
        assert_eq!(state.transform.w, 3.0);
        assert_eq!(state.transform.h, 0.5);
        assert_eq!(state.transform.d, 3.0);
    }

    #[test]
    fn later_setter_for_same_property_wins() {
        let props = Props::new().x(1.0).x(4.0);
        let mut state = EntityState::defaults("o0", EntityKind::Cube);
        state.apply(&props);
        assert_eq!(state.transform.x, 4.0);
    }

    #[test]
    fn translucent_color_is_transparent() {
        let mut state = EntityState::defaults("o0", EntityKind::Cube);
        assert!(!state.is_transparent());
        state.color = "f008".into();
        assert!(state.is_transparent());
    }

    #[test]
    fn malformed_color_is_replaced_when_merged() {
        let mut state = EntityState::defaults("o0", EntityKind::Cube);
        state.apply(&Props::new().with_color("f80"));
        assert_eq!(state.color, "f80");

        state.apply(&Props::new().with_color("zz"));
        assert_eq!(state.color, FALLBACK_COLOR);
        assert_eq!(state.rgba(), Rgba::GREY);
        assert!(!state.is_transparent());
    }

    #[test]
    fn matrix_override_is_kept_until_cleared() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let mut state = EntityState::defaults("o0", EntityKind::Cube);
        state.apply(&Props::new().with_matrix(m));
        state.apply(&Props::new().x(4.0));
        assert_eq!(state.matrix, Some(m));

        state.apply(&Props::new().without_matrix());
        assert_eq!(state.matrix, None);
    }
}
