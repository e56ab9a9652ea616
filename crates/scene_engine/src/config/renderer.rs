//! # Renderer Configuration
//!
//! Everything the [`RenderEngine`](crate::render::RenderEngine) reads at
//! startup: surface size, clear color, light slot counts and an optional
//! directory of GLSL overrides. All sections have defaults, so a config file
//! only needs the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::lighting::{LightCapacity, MAX_POINT_LIGHT, MAX_SPOT_LIGHT};

/// Window surface the renderer draws into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Window title
    pub title: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// MSAA sample count
    pub multisamples: u32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            title: "Scene Engine".to_string(),
            width: 1280,
            height: 720,
            multisamples: 4,
        }
    }
}

/// Light upload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// Point light slots uploaded per frame
    pub max_point_lights: usize,
    /// Spot light slots uploaded per frame
    pub max_spot_lights: usize,
    /// Log a warning when active lights do not fit
    pub warn_on_truncation: bool,
    /// Default specular exponent for new scenes
    pub specular_power: f32,
    /// Default ambient color for new scenes
    pub ambient: [f32; 3],
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            max_point_lights: MAX_POINT_LIGHT,
            max_spot_lights: MAX_SPOT_LIGHT,
            warn_on_truncation: true,
            specular_power: 10.0,
            ambient: [0.3, 0.3, 0.3],
        }
    }
}

impl LightingSettings {
    /// Slot counts as used by the light pipeline
    pub fn capacity(&self) -> LightCapacity {
        LightCapacity {
            point: self.max_point_lights,
            spot: self.max_spot_lights,
        }
    }

    /// Ambient color as a vector
    pub fn ambient_color(&self) -> Vec3 {
        Vec3::new(self.ambient[0], self.ambient[1], self.ambient[2])
    }
}

/// Shader source settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSettings {
    /// Directory with `<technique>.vert` / `<technique>.frag` files that
    /// replace the built-in sources
    pub directory: Option<PathBuf>,
}

/// Complete renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Surface settings
    pub surface: SurfaceSettings,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Lighting settings
    pub lighting: LightingSettings,
    /// Shader settings
    pub shaders: ShaderSettings,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceSettings::default(),
            clear_color: [0.05, 0.05, 0.08, 1.0],
            lighting: LightingSettings::default(),
            shaders: ShaderSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl RendererConfig {
    /// Builder-style surface size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.surface.width = width;
        self.surface.height = height;
        self
    }

    /// Builder-style light slot counts
    pub fn with_light_capacity(mut self, point: usize, spot: usize) -> Self {
        self.lighting.max_point_lights = point;
        self.lighting.max_spot_lights = spot;
        self
    }

    /// Builder-style shader override directory
    pub fn with_shader_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.shaders.directory = Some(directory.into());
        self
    }
}

impl Config for RendererConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "surface size {}x{} must be non-zero",
                self.surface.width, self.surface.height
            )));
        }
        if self.surface.multisamples == 0 || !self.surface.multisamples.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "multisamples must be a power of two, got {}",
                self.surface.multisamples
            )));
        }
        if self.lighting.max_point_lights > MAX_POINT_LIGHT {
            return Err(ConfigError::Invalid(format!(
                "max_point_lights {} exceeds shader capacity {}",
                self.lighting.max_point_lights, MAX_POINT_LIGHT
            )));
        }
        if self.lighting.max_spot_lights > MAX_SPOT_LIGHT {
            return Err(ConfigError::Invalid(format!(
                "max_spot_lights {} exceeds shader capacity {}",
                self.lighting.max_spot_lights, MAX_SPOT_LIGHT
            )));
        }
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("clear_color components must be in 0..=1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
        assert_eq!(RendererConfig::default().lighting.capacity(), LightCapacity::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RendererConfig::from_toml_str(
            "log_level = \"debug\"\n\
             [surface]\n\
             width = 640\n\
             height = 480\n\
             [lighting]\n\
             max_point_lights = 3\n",
        )
        .unwrap();

        assert_eq!(config.surface.width, 640);
        assert_eq!(config.surface.title, "Scene Engine");
        assert_eq!(config.lighting.max_point_lights, 3);
        assert_eq!(config.lighting.max_spot_lights, MAX_SPOT_LIGHT);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_capacity_above_shader_arrays_is_invalid() {
        let config = RendererConfig::default().with_light_capacity(MAX_POINT_LIGHT + 1, 1);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_size_is_invalid() {
        let config = RendererConfig::default().with_size(0, 720);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = RendererConfig::load_from_file("renderer.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("scene_engine_config_{}.ron", std::process::id()));
        let config = RendererConfig::default().with_size(320, 200);

        config.save_to_file(&path).unwrap();
        let loaded = RendererConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
