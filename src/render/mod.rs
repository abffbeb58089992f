//! Rendering pipeline: shader programs, meshes, materials and textures,
//! driven through a [`GraphicsBackend`].

pub mod backend;
pub mod material;
pub mod mesh;
pub mod mesh_component;
pub mod shader;
pub(crate) mod shared;
pub mod texture;

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::math::{MathError, Vector};
use crate::scene::SceneError;

pub use backend::{
    BackendError, Command, GraphicsBackend, HeadlessBackend, ProgramId, TextureId, UniformValue,
    VertexArrayId,
};
pub use material::Material;
pub use mesh::{Cube, Mesh, MeshSource};
pub use mesh_component::MeshComponent;
pub use shader::{Shader, ShaderProgram};
pub use texture::{Texture, TextureState};

/// Failure while drawing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Render context shared by everything that issues backend calls.
///
/// Tracks which program and vertex array are currently bound, so binds can
/// be skipped and per-program uploads gated, plus the frame counter and the
/// lazily created defaults (blank texture, built-in shader).
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    bound_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    frame: u64,
    blank_texture: Option<TextureId>,
    default_program: Option<Arc<ShaderProgram>>,
    mipmaps: bool,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bound_program: None,
            bound_vertex_array: None,
            frame: 0,
            blank_texture: None,
            default_program: None,
            mipmaps: true,
        }
    }

    /// Whether uploaded textures should get a mipmap chain.
    pub fn with_mipmaps(mut self, mipmaps: bool) -> Self {
        self.mipmaps = mipmaps;
        self
    }

    pub fn mipmaps(&self) -> bool {
        self.mipmaps
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    /// Binds `program` unless it is already current. Returns whether a bind
    /// happened.
    pub fn bind_program(&mut self, program: ProgramId) -> bool {
        if self.bound_program == Some(program) {
            return false;
        }
        debug!("binding program {} on frame {}", program.0, self.frame);
        self.backend.use_program(Some(program));
        self.bound_program = Some(program);
        true
    }

    pub fn unbind_program(&mut self) {
        if self.bound_program.take().is_some() {
            self.backend.use_program(None);
        }
    }

    pub fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        if self.bound_vertex_array != vertex_array {
            self.backend.bind_vertex_array(vertex_array);
            self.bound_vertex_array = vertex_array;
        }
    }

    /// The shared 1x1 opaque white texture, created on first use.
    pub fn blank_texture(&mut self) -> TextureId {
        if let Some(id) = self.blank_texture {
            return id;
        }
        let id = self.backend.create_texture(backend::TextureImage {
            width: 1,
            height: 1,
            rgba: &[255, 255, 255, 255],
            mipmaps: false,
        });
        self.blank_texture = Some(id);
        id
    }

    /// The built-in Phong program, linked on first use.
    pub fn default_program(&mut self) -> Result<Arc<ShaderProgram>, BackendError> {
        if let Some(program) = &self.default_program {
            return Ok(Arc::clone(program));
        }
        let program = Arc::new(ShaderProgram::from_sources(
            &mut self.backend,
            shared::VERTEX_SHADER,
            shared::FRAGMENT_SHADER,
        )?);
        self.default_program = Some(Arc::clone(&program));
        Ok(program)
    }

    /// Sets the viewport and clears to `background`.
    pub fn begin_frame(&mut self, width: u32, height: u32, background: Vector) {
        self.backend.begin_frame(width, height, background);
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame += 1;
    }
}
