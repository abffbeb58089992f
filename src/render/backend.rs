//! The graphics API boundary.
//!
//! Everything the scene graph needs from a GPU is expressed through
//! [`GraphicsBackend`]. A concrete binding (GL, wgpu, ...) lives outside the
//! crate; [`HeadlessBackend`] records calls instead of issuing them and is
//! what tests and the command line tool run against.

use std::collections::HashMap;

use thiserror::Error;

use crate::math::{MathError, Matrix, Vector};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// Compiled shader stage.
    ShaderId
);
handle!(
    /// Linked shader program.
    ProgramId
);
handle!(BufferId);
handle!(VertexArrayId);
handle!(TextureId);
handle!(
    /// Location of a uniform inside a linked program.
    UniformLocation
);
handle!(
    /// Location of a vertex attribute inside a linked program.
    AttributeLocation
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Vertex,
    /// Triangle indices.
    Index,
}

/// Value uploaded to a uniform. Matrices are row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3([f32; 3]),
    Vec3Array(Vec<f32>),
    IntArray(Vec<i32>),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Packs a 3x3 or 4x4 matrix; any other shape is rejected.
    pub fn from_matrix(matrix: &Matrix) -> Result<Self, MathError> {
        match (matrix.rows(), matrix.cols()) {
            (4, 4) => {
                let mut values = [0.0; 16];
                values.copy_from_slice(matrix.as_slice());
                Ok(Self::Mat4(values))
            }
            (3, 3) => {
                let mut values = [0.0; 9];
                values.copy_from_slice(matrix.as_slice());
                Ok(Self::Mat3(values))
            }
            (rows, cols) => Err(MathError::UnsupportedShape {
                expected: "3x3 or 4x4",
                rows,
                cols,
            }),
        }
    }
}

impl From<Vector> for UniformValue {
    fn from(value: Vector) -> Self {
        Self::Vec3(value.to_array())
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
    pub mipmaps: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("failed to compile {stage:?} shader: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program: {0}")]
    Link(String),
    #[error("attribute `{0}` is not used by the shader program")]
    MissingAttribute(String),
}

/// Capability surface the renderer drives.
///
/// Handles returned by one backend are only meaningful to that backend.
pub trait GraphicsBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str)
        -> Result<ShaderId, BackendError>;
    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<ProgramId, BackendError>;
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attribute_location(&mut self, program: ProgramId, name: &str)
        -> Option<AttributeLocation>;
    fn use_program(&mut self, program: Option<ProgramId>);

    fn create_vertex_array(&mut self) -> VertexArrayId;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    /// Creates a buffer and uploads `data`. Index buffers attach to the bound vertex array.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferId;
    fn bind_attribute(&mut self, location: AttributeLocation, buffer: BufferId, components: u32);

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn create_texture(&mut self, image: TextureImage<'_>) -> TextureId;
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    /// Sets the viewport and clears colour and depth.
    fn begin_frame(&mut self, width: u32, height: u32, clear_color: Vector);
    /// Draws `index_count` indices from the bound vertex array as triangles.
    fn draw_indexed(&mut self, index_count: u32);
}

/// A call received by [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CompileShader(ShaderStage, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    CreateBuffer {
        id: BufferId,
        target: BufferTarget,
        len: usize,
    },
    BindAttribute {
        location: AttributeLocation,
        buffer: BufferId,
        components: u32,
    },
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    BeginFrame {
        width: u32,
        height: u32,
    },
    DrawIndexed(u32),
}

/// Backend that performs no GPU work and records every call.
///
/// Every uniform and attribute name resolves to a location, so programs
/// behave as if all inputs were in use. Shader sources that are blank fail
/// to compile.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<Command>,
    next_handle: u32,
    uniforms: HashMap<(ProgramId, String), UniformLocation>,
    uniform_names: HashMap<UniformLocation, String>,
    attributes: HashMap<(ProgramId, String), AttributeLocation>,
    location_queries: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of uniform and attribute location lookups received.
    pub fn location_queries(&self) -> usize {
        self.location_queries
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::DrawIndexed(_)))
            .count()
    }

    /// Number of times a program (not the null program) was made current.
    pub fn program_binds(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::UseProgram(Some(_))))
            .count()
    }

    pub fn uniform_name(&self, location: UniformLocation) -> Option<&str> {
        self.uniform_names.get(&location).map(String::as_str)
    }

    /// Every value uploaded to a uniform with the given name, oldest first.
    pub fn uniform_uploads(&self, name: &str) -> Vec<&UniformValue> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::SetUniform { location, value }
                    if self.uniform_name(*location) == Some(name) =>
                {
                    Some(value)
                }
                _ => None,
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, BackendError> {
        if source.trim().is_empty() {
            return Err(BackendError::Compile {
                stage,
                log: "empty shader source".to_string(),
            });
        }
        let id = ShaderId(self.next());
        self.commands.push(Command::CompileShader(stage, id));
        Ok(id)
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<ProgramId, BackendError> {
        if vertex == fragment {
            return Err(BackendError::Link(
                "vertex and fragment stage are the same shader".to_string(),
            ));
        }
        let id = ProgramId(self.next());
        self.commands.push(Command::LinkProgram(id));
        Ok(id)
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.location_queries += 1;
        if let Some(location) = self.uniforms.get(&(program, name.to_string())) {
            return Some(*location);
        }
        let location = UniformLocation(self.next());
        self.uniforms.insert((program, name.to_string()), location);
        self.uniform_names.insert(location, name.to_string());
        Some(location)
    }

    fn attribute_location(
        &mut self,
        program: ProgramId,
        name: &str,
    ) -> Option<AttributeLocation> {
        self.location_queries += 1;
        let next = self.attributes.len() as u32;
        Some(
            *self
                .attributes
                .entry((program, name.to_string()))
                .or_insert(AttributeLocation(next)),
        )
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.commands.push(Command::UseProgram(program));
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.commands.push(Command::CreateVertexArray(id));
        id
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferId {
        let id = BufferId(self.next());
        self.commands.push(Command::CreateBuffer {
            id,
            target,
            len: data.len(),
        });
        id
    }

    fn bind_attribute(&mut self, location: AttributeLocation, buffer: BufferId, components: u32) {
        self.commands.push(Command::BindAttribute {
            location,
            buffer,
            components,
        });
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.commands.push(Command::SetUniform { location, value });
    }

    fn create_texture(&mut self, image: TextureImage<'_>) -> TextureId {
        let id = TextureId(self.next());
        self.commands.push(Command::CreateTexture {
            id,
            width: image.width,
            height: image.height,
        });
        id
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn begin_frame(&mut self, width: u32, height: u32, _clear_color: Vector) {
        self.commands.push(Command::BeginFrame { width, height });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(Command::DrawIndexed(index_count));
    }
}
