use std::collections::HashMap;

use log::error;
use parking_lot::RwLock;

use super::backend::{
    AttributeLocation, BackendError, BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage,
    UniformLocation, UniformValue,
};
use super::Renderer;

/// A single compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shader {
    stage: ShaderStage,
    id: ShaderId,
}

impl Shader {
    pub fn compile<B: GraphicsBackend>(
        backend: &mut B,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self, BackendError> {
        let id = backend.compile_shader(stage, source).map_err(|err| {
            error!("{err}");
            err
        })?;
        Ok(Self { stage, id })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }
}

/// A linked vertex + fragment program.
///
/// Uniform and attribute locations never change once a program is linked,
/// so each name is resolved through the backend at most once per program.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    uniforms: RwLock<HashMap<String, Option<UniformLocation>>>,
    attributes: RwLock<HashMap<String, Option<AttributeLocation>>>,
}

impl ShaderProgram {
    pub fn link<B: GraphicsBackend>(
        backend: &mut B,
        vertex: &Shader,
        fragment: &Shader,
    ) -> Result<Self, BackendError> {
        let id = backend.link_program(vertex.id, fragment.id).map_err(|err| {
            error!("{err}");
            err
        })?;
        Ok(Self {
            id,
            uniforms: RwLock::new(HashMap::new()),
            attributes: RwLock::new(HashMap::new()),
        })
    }

    /// Compiles both stages and links them.
    pub fn from_sources<B: GraphicsBackend>(
        backend: &mut B,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, BackendError> {
        let vertex = Shader::compile(backend, ShaderStage::Vertex, vertex_source)?;
        let fragment = Shader::compile(backend, ShaderStage::Fragment, fragment_source)?;
        Self::link(backend, &vertex, &fragment)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Makes this program current.
    ///
    /// Returns `true` only when the call actually bound the program, i.e.
    /// some other program (or none) was current before. Callers gate
    /// per-program uploads such as the light array on this.
    pub fn use_program<B: GraphicsBackend>(&self, renderer: &mut Renderer<B>) -> bool {
        renderer.bind_program(self.id)
    }

    pub fn uniform_location<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        name: &str,
    ) -> Option<UniformLocation> {
        if let Some(location) = self.uniforms.read().get(name) {
            return *location;
        }
        let location = backend.uniform_location(self.id, name);
        self.uniforms.write().insert(name.to_string(), location);
        location
    }

    pub fn attribute_location<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        name: &str,
    ) -> Option<AttributeLocation> {
        if let Some(location) = self.attributes.read().get(name) {
            return *location;
        }
        let location = backend.attribute_location(self.id, name);
        self.attributes.write().insert(name.to_string(), location);
        location
    }

    /// Uploads a uniform. Names the program does not use are ignored.
    pub fn set_uniform<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        if let Some(location) = self.uniform_location(backend, name) {
            backend.set_uniform(location, value.into());
        }
    }

    /// Feeds `buffer` into the named vertex attribute.
    pub fn bind_attribute<B: GraphicsBackend>(
        &self,
        backend: &mut B,
        name: &str,
        buffer: BufferId,
        components: u32,
    ) -> Result<(), BackendError> {
        let location = self
            .attribute_location(backend, name)
            .ok_or_else(|| BackendError::MissingAttribute(name.to_string()))?;
        backend.bind_attribute(location, buffer, components);
        Ok(())
    }

    /// Points a sampler uniform at a texture unit.
    pub fn bind_sampler<B: GraphicsBackend>(&self, backend: &mut B, sampler: &str, unit: u32) {
        self.set_uniform(backend, sampler, UniformValue::Int(unit as i32));
    }
}
