//! A small retained-mode 3D engine.
//!
//! Scenes are trees of [`Entity`] nodes carrying transforms and
//! [`Component`]s. Geometry comes from Wavefront OBJ/MTL files through
//! [`ObjDocument`] and is drawn by [`Renderer`] over any
//! [`GraphicsBackend`]. The bundled [`HeadlessBackend`] records every
//! command instead of talking to a GPU, which keeps the whole pipeline
//! testable.

pub mod assets;
pub mod camera;
pub mod component;
pub mod config;
pub mod engine;
pub mod entity;
pub mod light;
pub mod math;
pub mod obj;
pub mod render;
pub mod scene;

pub use assets::{AssetSource, FileSystemAssets, MemoryAssets};
pub use camera::Camera;
pub use component::{Component, ComponentContext, ComponentRegistry, Lifecycle, Spin};
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use entity::Entity;
pub use light::{Light, LightKind, MAX_LIGHTS};
pub use math::{MathError, Matrix, Vector};
pub use obj::{load_obj, ObjDocument, ObjError, ObjMesh};
pub use render::{
    BackendError, Cube, GraphicsBackend, HeadlessBackend, Material, Mesh, MeshComponent,
    MeshSource, RenderError, Renderer, ShaderProgram, Texture,
};
pub use scene::{Scene, SceneError};
