use anyhow::{Context, Result};
use log::debug;

use crate::component::Lifecycle;
use crate::config::EngineConfig;
use crate::entity::Entity;
use crate::light::Light;
use crate::render::backend::GraphicsBackend;
use crate::render::{RenderError, Renderer};
use crate::scene::{Scene, SceneError};

/// Owns the scene graph and drives it one frame at a time.
///
/// The host calls [`start`](Self::start) once and then
/// [`frame`](Self::frame) from its frame callback.
pub struct Engine<B: GraphicsBackend> {
    pub root: Entity,
    pub scene: Scene,
    renderer: Renderer<B>,
    config: EngineConfig,
    last_timestamp: Option<f64>,
}

impl<B: GraphicsBackend> Engine<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self {
            root: Entity::named("root"),
            scene: Scene::new(config.camera()),
            renderer: Renderer::new(backend).with_mipmaps(config.mipmaps),
            config,
            last_timestamp: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    pub fn add_light(&mut self, light: Light) -> Result<(), SceneError> {
        self.scene.add_light(light)
    }

    pub fn add_lights(
        &mut self,
        lights: impl IntoIterator<Item = Light>,
    ) -> Result<(), SceneError> {
        self.scene.add_lights(lights)
    }

    pub fn get_light(&self, name: &str) -> Option<&Light> {
        self.scene.get_light(name)
    }

    /// Runs every component's `start` hook.
    pub fn start(&mut self) -> Result<()> {
        self.root
            .invoke(Lifecycle::Start, &mut self.scene, 0.0)
            .context("failed to start scene")
    }

    /// Updates and renders one frame. `timestamp` is in seconds; the first
    /// frame has a zero time step.
    pub fn frame(&mut self, timestamp: f64) -> Result<()> {
        let delta_time = match self.last_timestamp {
            Some(last) => (timestamp - last).max(0.0) as f32,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        self.root
            .invoke(Lifecycle::Update, &mut self.scene, delta_time)
            .with_context(|| format!("update failed on frame {}", self.current_frame()))?;
        self.render()
            .with_context(|| format!("render failed on frame {}", self.current_frame()))?;
        Ok(())
    }

    /// Clears the viewport and draws the scene graph.
    pub fn render(&mut self) -> Result<(), RenderError> {
        debug!("rendering frame {}", self.renderer.current_frame());
        self.renderer.begin_frame(
            self.config.width,
            self.config.height,
            self.scene.camera.background,
        );
        self.root.render(&self.scene, &mut self.renderer)?;
        self.renderer.advance_frame();
        Ok(())
    }

    pub fn current_frame(&self) -> u64 {
        self.renderer.current_frame()
    }

    pub fn into_backend(self) -> B {
        self.renderer.into_backend()
    }
}
