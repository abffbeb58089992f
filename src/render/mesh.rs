use super::backend::{BufferId, BufferTarget, GraphicsBackend, UniformValue, VertexArrayId};
use super::material::Material;
use super::shader::ShaderProgram;
use super::shared::{CUBE_FACE_NORMALS, CUBE_POSITIONS, CUBE_TEXCOORDS};
use super::{RenderError, Renderer};
use crate::camera::Camera;
use crate::math::Matrix;

/// Producer of the CPU-side geometry of a mesh.
pub trait MeshSource {
    /// Flat `x, y, z` triples.
    fn vertex_positions(&self) -> Vec<f32>;
    /// Triangle list into the vertex arrays.
    fn vertex_indices(&self) -> Vec<u32>;
    /// Flat `x, y, z` triples, one per vertex.
    fn vertex_normals(&self) -> Vec<f32>;
    /// Flat `u, v` pairs, one per vertex.
    fn texture_coordinates(&self) -> Vec<f32>;

    fn material(&self) -> Material {
        Material::default()
    }
}

/// Geometry uploaded to the backend plus the material it is drawn with.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertex_array: VertexArrayId,
    positions: BufferId,
    normals: BufferId,
    texcoords: BufferId,
    vertex_count: usize,
    index_count: u32,
    material: Material,
}

impl Mesh {
    /// Pulls the arrays from `source` and uploads them once.
    pub fn initialize<S, B>(source: &S, renderer: &mut Renderer<B>) -> Self
    where
        S: MeshSource + ?Sized,
        B: GraphicsBackend,
    {
        let positions = source.vertex_positions();
        let indices = source.vertex_indices();
        let normals = source.vertex_normals();
        let texcoords = source.texture_coordinates();

        let vertex_array = renderer.backend_mut().create_vertex_array();
        renderer.bind_vertex_array(Some(vertex_array));
        let backend = renderer.backend_mut();
        let position_buffer =
            backend.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&positions));
        let normal_buffer =
            backend.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&normals));
        let texcoord_buffer =
            backend.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&texcoords));
        backend.create_buffer(BufferTarget::Index, bytemuck::cast_slice(&indices));
        renderer.bind_vertex_array(None);

        Self {
            vertex_array,
            positions: position_buffer,
            normals: normal_buffer,
            texcoords: texcoord_buffer,
            vertex_count: positions.len() / 3,
            index_count: indices.len() as u32,
            material: source.material(),
        }
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    /// Draws the mesh with `model` as its object-to-world transform.
    pub fn render<B: GraphicsBackend>(
        &self,
        renderer: &mut Renderer<B>,
        camera: &Camera,
        model: &Matrix,
        program: &ShaderProgram,
    ) -> Result<(), RenderError> {
        renderer.bind_vertex_array(Some(self.vertex_array));
        program.use_program(renderer);

        let backend = renderer.backend_mut();
        program.bind_attribute(backend, "oc_position", self.positions, 3)?;
        program.bind_attribute(backend, "oc_normal", self.normals, 3)?;
        program.bind_attribute(backend, "texcoord", self.texcoords, 2)?;
        self.material.upload(program, backend);

        let view_projection = camera.projection_matrix().compose(&camera.view_matrix());
        let mvp = view_projection.mul(model)?;
        program.set_uniform(backend, "mvp_matrix", UniformValue::from_matrix(&mvp)?);
        program.set_uniform(backend, "m_matrix", UniformValue::from_matrix(model)?);
        program.set_uniform(
            backend,
            "normal_matrix",
            UniformValue::from_matrix(&model.normal_matrix()?)?,
        );

        let texture = match self.material.map_kd.as_ref().and_then(|texture| texture.id()) {
            Some(id) => id,
            None => renderer.blank_texture(),
        };
        let backend = renderer.backend_mut();
        backend.bind_texture(0, Some(texture));
        program.bind_sampler(backend, "tex", 0);

        program.set_uniform(backend, "fog_density", camera.fog_density);
        program.set_uniform(backend, "fog_color", camera.fog_color);

        backend.draw_indexed(self.index_count);

        renderer.bind_vertex_array(None);
        renderer.backend_mut().bind_texture(0, None);
        Ok(())
    }
}

/// 2x2x2 cube centred on the origin with one normal per face.
#[derive(Debug, Clone, Default)]
pub struct Cube {
    pub material: Material,
}

impl MeshSource for Cube {
    fn vertex_positions(&self) -> Vec<f32> {
        CUBE_POSITIONS.to_vec()
    }

    fn vertex_indices(&self) -> Vec<u32> {
        (0..(CUBE_POSITIONS.len() / 3) as u32).collect()
    }

    fn vertex_normals(&self) -> Vec<f32> {
        CUBE_FACE_NORMALS
            .iter()
            .flat_map(|normal| std::iter::repeat(normal).take(6))
            .flatten()
            .copied()
            .collect()
    }

    fn texture_coordinates(&self) -> Vec<f32> {
        CUBE_TEXCOORDS.to_vec()
    }

    fn material(&self) -> Material {
        self.material.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::math::Vector;
    use crate::render::backend::{Command, HeadlessBackend, TextureId};
    use crate::render::texture::Texture;

    fn setup() -> (Renderer<HeadlessBackend>, Arc<ShaderProgram>) {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let program = renderer.default_program().unwrap();
        renderer.backend_mut().clear_commands();
        (renderer, program)
    }

    #[test]
    fn cube_arrays_agree() {
        let cube = Cube::default();
        let vertices = cube.vertex_positions().len() / 3;
        assert_eq!(vertices, 36);
        assert_eq!(cube.vertex_normals().len(), vertices * 3);
        assert_eq!(cube.texture_coordinates().len(), vertices * 2);
        assert_eq!(cube.vertex_indices(), (0..36).collect::<Vec<u32>>());
        assert_eq!(&cube.vertex_normals()[..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&cube.vertex_normals()[105..], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn initialize_uploads_four_buffers() {
        let (mut renderer, _) = setup();
        let mesh = Mesh::initialize(&Cube::default(), &mut renderer);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertex_count(), 36);

        let buffers: Vec<_> = renderer
            .backend()
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::CreateBuffer { target, len, .. } => Some((*target, *len)),
                _ => None,
            })
            .collect();
        assert_eq!(
            buffers,
            vec![
                (BufferTarget::Vertex, 36 * 3 * 4),
                (BufferTarget::Vertex, 36 * 3 * 4),
                (BufferTarget::Vertex, 36 * 2 * 4),
                (BufferTarget::Index, 36 * 4),
            ]
        );
    }

    #[test]
    fn render_uploads_matrices_and_draws() {
        let (mut renderer, program) = setup();
        let mesh = Mesh::initialize(&Cube::default(), &mut renderer);
        let camera = Camera::default();
        let model = Matrix::translate(Vector::new(1.0, 2.0, 3.0));
        mesh.render(&mut renderer, &camera, &model, &program).unwrap();

        let backend = renderer.backend();
        assert_eq!(backend.draw_calls(), 1);
        assert!(backend.commands().contains(&Command::DrawIndexed(36)));
        assert_eq!(
            backend.uniform_uploads("m_matrix"),
            vec![&UniformValue::from_matrix(&model).unwrap()]
        );
        assert_eq!(backend.uniform_uploads("mvp_matrix").len(), 1);
        assert!(matches!(
            backend.uniform_uploads("normal_matrix")[..],
            [UniformValue::Mat3(_)]
        ));
        assert_eq!(backend.uniform_uploads("tex"), vec![&UniformValue::Int(0)]);
    }

    #[test]
    fn unloaded_texture_falls_back_to_blank() {
        let (mut renderer, program) = setup();
        let cube = Cube {
            material: Material {
                map_kd: Some(Arc::new(Texture::new("missing.png"))),
                ..Material::default()
            },
        };
        let mesh = Mesh::initialize(&cube, &mut renderer);
        let camera = Camera::default();
        for _ in 0..3 {
            mesh.render(&mut renderer, &camera, &Matrix::identity(), &program)
                .unwrap();
        }
        let blank = renderer.blank_texture();
        let backend = renderer.backend();
        let created = backend
            .commands()
            .iter()
            .filter(|command| matches!(command, Command::CreateTexture { .. }))
            .count();
        assert_eq!(created, 1);
        let binds = backend
            .commands()
            .iter()
            .filter(|command| {
                **command
                    == Command::BindTexture {
                        unit: 0,
                        texture: Some(blank),
                    }
            })
            .count();
        assert_eq!(binds, 3);
    }

    #[test]
    fn loaded_texture_is_bound() {
        let (mut renderer, program) = setup();
        let cube = Cube {
            material: Material {
                map_kd: Some(Arc::new(Texture::from_id(TextureId(99)))),
                ..Material::default()
            },
        };
        let mesh = Mesh::initialize(&cube, &mut renderer);
        mesh.render(&mut renderer, &Camera::default(), &Matrix::identity(), &program)
            .unwrap();
        assert!(renderer.backend().commands().contains(&Command::BindTexture {
            unit: 0,
            texture: Some(TextureId(99)),
        }));
    }

    #[test]
    fn singular_model_matrix_is_an_error() {
        let (mut renderer, program) = setup();
        let mesh = Mesh::initialize(&Cube::default(), &mut renderer);
        let flat = Matrix::scale(Vector::new(1.0, 0.0, 1.0));
        let err = mesh
            .render(&mut renderer, &Camera::default(), &flat, &program)
            .unwrap_err();
        assert!(matches!(err, RenderError::Math(_)));
    }
}
