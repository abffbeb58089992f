//! Where model, material and texture bytes come from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Whole-file fetch of `/`-separated asset paths.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    async fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes).with_context(|| format!("{path} is not valid UTF-8"))
    }
}

/// Assets below a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSystemAssets {
    root: PathBuf,
}

impl FileSystemAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileSystemAssets {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        fs::read(&full).with_context(|| format!("failed to read {}", full.display()))
    }
}

/// Assets held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no asset named {path}"))
    }
}

/// Resolves `name` next to `source`: `models/a.obj` + `a.mtl` gives
/// `models/a.mtl`.
pub fn sibling_path(source: &str, name: &str) -> String {
    match source.rfind('/') {
        Some(index) => format!("{}/{}", &source[..index], name),
        None => name.to_string(),
    }
}
