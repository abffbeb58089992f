use std::sync::atomic::{AtomicUsize, Ordering};

use crate::math::Vector;
use crate::render::backend::{GraphicsBackend, UniformValue};
use crate::render::ShaderProgram;
use crate::scene::SceneError;

/// Size of the fixed light arrays in the built-in shader.
pub const MAX_LIGHTS: usize = 4;

static LIGHT_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// `vector` is a world-space position.
    Point,
    /// `vector` is the direction the light travels in.
    Directional,
}

impl LightKind {
    fn shader_code(self) -> i32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub vector: Vector,
    pub color: Vector,
    pub intensity: f32,
}

impl Light {
    pub fn point(position: Vector, color: Vector, intensity: f32) -> Self {
        Self::new(LightKind::Point, position, color, intensity)
    }

    pub fn directional(direction: Vector, color: Vector, intensity: f32) -> Self {
        Self::new(LightKind::Directional, direction, color, intensity)
    }

    fn new(kind: LightKind, vector: Vector, color: Vector, intensity: f32) -> Self {
        let n = LIGHT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("Light{n}"),
            kind,
            vector,
            color,
            intensity,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Lights flattened into the uniform arrays of the built-in shader.
///
/// The arrays always hold [`MAX_LIGHTS`] slots; slots past `count` are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LightArrays {
    pub count: i32,
    pub kinds: Vec<i32>,
    pub vectors: Vec<f32>,
    /// Colours pre-multiplied by intensity.
    pub colors: Vec<f32>,
}

impl LightArrays {
    pub fn pack(lights: &[Light]) -> Result<Self, SceneError> {
        if lights.len() > MAX_LIGHTS {
            return Err(SceneError::TooManyLights { max: MAX_LIGHTS });
        }
        let mut arrays = Self {
            count: lights.len() as i32,
            kinds: vec![0; MAX_LIGHTS],
            vectors: vec![0.0; MAX_LIGHTS * 3],
            colors: vec![0.0; MAX_LIGHTS * 3],
        };
        for (slot, light) in lights.iter().enumerate() {
            let range = slot * 3..slot * 3 + 3;
            arrays.kinds[slot] = light.kind.shader_code();
            arrays.vectors[range.clone()].copy_from_slice(&light.vector.to_array());
            arrays.colors[range].copy_from_slice(&(light.color * light.intensity).to_array());
        }
        Ok(arrays)
    }

    /// Replaces the whole light state of `program`.
    pub fn upload<B: GraphicsBackend>(&self, program: &ShaderProgram, backend: &mut B) {
        program.set_uniform(backend, "light_count", self.count);
        program.set_uniform(
            backend,
            "light_types",
            UniformValue::IntArray(self.kinds.clone()),
        );
        program.set_uniform(
            backend,
            "wc_light_positions",
            UniformValue::Vec3Array(self.vectors.clone()),
        );
        program.set_uniform(
            backend,
            "light_colors",
            UniformValue::Vec3Array(self.colors.clone()),
        );
    }
}
