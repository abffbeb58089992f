use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::backend::GraphicsBackend;
use super::shader::ShaderProgram;
use super::texture::Texture;
use crate::math::Vector;

/// Phong surface description, as read from an MTL `newmtl` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    /// Specular exponent.
    pub ns: f32,
    pub ka: Vector,
    pub kd: Vector,
    pub ks: Vector,
    pub ke: Vector,
    /// Optical density.
    pub ni: f32,
    /// Opacity.
    pub d: f32,
    pub illum: f32,
    #[serde(skip)]
    pub map_kd: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ns: 32.0,
            ka: Vector::ONE,
            kd: Vector::ONE,
            ks: Vector::ONE,
            ke: Vector::ZERO,
            ni: 1.0,
            d: 1.0,
            illum: 2.0,
            map_kd: None,
        }
    }
}

impl Material {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Uploads the scalar and colour coefficients.
    pub fn upload<B: GraphicsBackend>(&self, program: &ShaderProgram, backend: &mut B) {
        program.set_uniform(backend, "ka", self.ka);
        program.set_uniform(backend, "kd", self.kd);
        program.set_uniform(backend, "ks", self.ks);
        program.set_uniform(backend, "ke", self.ke);
        program.set_uniform(backend, "ns", self.ns);
        program.set_uniform(backend, "ni", self.ni);
        program.set_uniform(backend, "d", self.d);
        program.set_uniform(backend, "illum", self.illum);
    }
}
