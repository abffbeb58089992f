use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::Camera;
use crate::math::Vector;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Viewport, camera and fog settings, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub background: Vector,
    pub fog_density: f32,
    pub fog_color: Vector,
    pub mipmaps: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov_degrees: 45.0,
            background: Vector::ONE,
            fog_density: 0.0,
            fog_color: Vector::ONE,
            mipmaps: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport {}x{} has zero area",
                self.width, self.height
            )));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_degrees must be between 0 and 180, got {}",
                self.fov_degrees
            )));
        }
        if self.fog_density < 0.0 {
            return Err(ConfigError::Invalid("fog_density must not be negative".into()));
        }
        Ok(())
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }

    /// A default-positioned camera using these viewport and fog settings.
    pub fn camera(&self) -> Camera {
        Camera {
            fov: self.fov_degrees.to_radians(),
            aspect: self.aspect(),
            fog_density: self.fog_density,
            fog_color: self.fog_color,
            background: self.background,
            ..Camera::default()
        }
    }
}
