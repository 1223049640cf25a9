//! Engine configuration

use crate::gfx::scene::helpers::{DEFAULT_FAR, DEFAULT_NEAR};

/// Environment variable switching on shader diagnostics and per-frame tracing
pub const DEBUG_ENV_VAR: &str = "VISTA_DEBUG";

/// Start-up settings of an [`Engine`](super::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Hex color the surface is cleared to every frame
    pub clear_color: String,
    /// Ambient light level in `0.0..=1.0`
    pub ambient: f32,
    /// Field of view of the default camera, in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub cull_back_faces: bool,
    pub vsync: bool,
    /// Log shader program diagnostics even when the program built cleanly
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clear_color: "fff".to_string(),
            ambient: 0.2,
            fov: 30.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            cull_back_faces: false,
            vsync: true,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Defaults, with `debug` turned on when `VISTA_DEBUG` is set
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var(DEBUG_ENV_VAR).is_ok(),
            ..Self::default()
        }
    }

    pub fn with_clear_color(mut self, hex: impl Into<String>) -> Self {
        self.clear_color = hex.into();
        self
    }

    pub fn with_ambient(mut self, ambient: f32) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov = degrees;
        self
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_back_face_culling(mut self, cull: bool) -> Self {
        self.cull_back_faces = cull;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.clear_color, "fff");
        assert_eq!(config.ambient, 0.2);
        assert_eq!(config.fov, 30.0);
        assert_eq!((config.near, config.far), (1.0, 1000.0));
        assert!(!config.cull_back_faces);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = EngineConfig::default()
            .with_ambient(0.5)
            .with_clip_planes(0.1, 50.0)
            .with_vsync(false);
        assert_eq!(config.ambient, 0.5);
        assert_eq!(config.near, 0.1);
        assert!(!config.vsync);
    }
}
