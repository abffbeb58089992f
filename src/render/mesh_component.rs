use std::sync::Arc;

use super::backend::GraphicsBackend;
use super::mesh::Mesh;
use super::shader::ShaderProgram;
use super::{RenderError, Renderer};
use crate::component::Component;
use crate::math::Matrix;
use crate::scene::Scene;

/// Makes an entity drawable.
///
/// Without an explicit shader the renderer's built-in program is used.
#[derive(Debug, Clone, Default)]
pub struct MeshComponent {
    pub meshes: Vec<Mesh>,
    pub shader: Option<Arc<ShaderProgram>>,
}

impl MeshComponent {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            shader: None,
        }
    }

    pub fn with_shader(mut self, shader: Arc<ShaderProgram>) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Draws every mesh with `world` as the model matrix. Camera position and
    /// lights are uploaded only when this call is the one binding the program.
    pub fn render<B: GraphicsBackend>(
        &self,
        renderer: &mut Renderer<B>,
        scene: &Scene,
        world: &Matrix,
    ) -> Result<(), RenderError> {
        let program = match &self.shader {
            Some(program) => Arc::clone(program),
            None => renderer.default_program()?,
        };
        if program.use_program(renderer) {
            scene.upload_to(&program, renderer.backend_mut())?;
        }
        for mesh in &self.meshes {
            mesh.render(renderer, &scene.camera, world, &program)?;
        }
        Ok(())
    }
}

impl Component for MeshComponent {}
