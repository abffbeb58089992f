use thiserror::Error;

use crate::camera::Camera;
use crate::light::{Light, LightArrays, MAX_LIGHTS};
use crate::render::backend::GraphicsBackend;
use crate::render::ShaderProgram;

/// Violated scene preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("a scene holds at most {max} lights")]
    TooManyLights { max: usize },
    #[error("entity `{entity}` has no {component} component")]
    MissingComponent {
        entity: String,
        component: &'static str,
    },
    #[error("entity `{entity}` has no child named `{child}`")]
    MissingChild { entity: String, child: String },
}

/// Engine-level state shared with every component call: the camera and the
/// lights.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            lights: Vec::new(),
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Adds a light. Fails without touching the collection when it is full.
    pub fn add_light(&mut self, light: Light) -> Result<(), SceneError> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(SceneError::TooManyLights { max: MAX_LIGHTS });
        }
        self.lights.push(light);
        Ok(())
    }

    /// Adds all of `lights` or none of them.
    pub fn add_lights(
        &mut self,
        lights: impl IntoIterator<Item = Light>,
    ) -> Result<(), SceneError> {
        let lights: Vec<Light> = lights.into_iter().collect();
        if self.lights.len() + lights.len() > MAX_LIGHTS {
            return Err(SceneError::TooManyLights { max: MAX_LIGHTS });
        }
        self.lights.extend(lights);
        Ok(())
    }

    pub fn get_light(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|light| light.name == name)
    }

    pub fn get_light_mut(&mut self, name: &str) -> Option<&mut Light> {
        self.lights.iter_mut().find(|light| light.name == name)
    }

    pub fn remove_light(&mut self, name: &str) -> Option<Light> {
        let index = self.lights.iter().position(|light| light.name == name)?;
        Some(self.lights.remove(index))
    }

    /// Uploads the camera position and the full light array to `program`.
    pub fn upload_to<B: GraphicsBackend>(
        &self,
        program: &ShaderProgram,
        backend: &mut B,
    ) -> Result<(), SceneError> {
        let arrays = LightArrays::pack(&self.lights)?;
        program.set_uniform(backend, "wc_camera_position", self.camera.position);
        arrays.upload(program, backend);
        Ok(())
    }
}
