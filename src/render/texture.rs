use log::{info, warn};
use parking_lot::RwLock;

use super::backend::{GraphicsBackend, TextureId, TextureImage};
use super::Renderer;
use crate::assets::AssetSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    /// Not fetched yet.
    Pending,
    Loaded(TextureId),
    /// Fetch or decode failed; the texture stays blank.
    Failed,
}

/// A diffuse map referenced by a material.
///
/// Loading is attempted once. Until it succeeds the renderer falls back to
/// the shared blank texture.
#[derive(Debug)]
pub struct Texture {
    source: Option<String>,
    state: RwLock<TextureState>,
}

impl Texture {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            state: RwLock::new(TextureState::Pending),
        }
    }

    /// A texture that already lives on the backend.
    pub fn from_id(id: TextureId) -> Self {
        Self {
            source: None,
            state: RwLock::new(TextureState::Loaded(id)),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn state(&self) -> TextureState {
        *self.state.read()
    }

    /// The backend texture, if loaded.
    pub fn id(&self) -> Option<TextureId> {
        match self.state() {
            TextureState::Loaded(id) => Some(id),
            _ => None,
        }
    }

    /// Fetches, decodes and uploads the image. Failures are logged and leave
    /// the texture in [`TextureState::Failed`].
    pub async fn load<A, B>(&self, assets: &A, renderer: &mut Renderer<B>)
    where
        A: AssetSource,
        B: GraphicsBackend,
    {
        if self.state() != TextureState::Pending {
            return;
        }
        let Some(path) = self.source.as_deref() else {
            *self.state.write() = TextureState::Failed;
            return;
        };

        let bytes = match assets.read_bytes(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to fetch texture {path}: {err:#}");
                *self.state.write() = TextureState::Failed;
                return;
            }
        };
        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image.to_rgba8(),
            Err(err) => {
                warn!("failed to decode texture {path}: {err}");
                *self.state.write() = TextureState::Failed;
                return;
            }
        };

        let (width, height) = image.dimensions();
        let mipmaps = renderer.mipmaps();
        let id = renderer.backend_mut().create_texture(TextureImage {
            width,
            height,
            rgba: image.as_raw(),
            mipmaps,
        });
        *self.state.write() = TextureState::Loaded(id);
        info!("loaded texture {path} ({width}x{height})");
    }
}
