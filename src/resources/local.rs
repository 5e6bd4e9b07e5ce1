use std::path::{Path, PathBuf};

use super::{Fetched, ResourceResolver, guess_mime};
use crate::error::{RenderError, RenderResult};

/// Reads files relative to a root directory. Absolute paths are read as given.
#[derive(Debug, Clone)]
pub struct LocalResolver {
    root: PathBuf,
}

impl LocalResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path.trim());
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

impl ResourceResolver for LocalResolver {
    fn fetch(&self, path: &str) -> RenderResult<Fetched> {
        let full = self.resolve(path);
        let bytes = std::fs::read(&full).map_err(|e| {
            RenderError::resource(format!("failed to read '{}'", full.display())).with_source(e)
        })?;
        let filename = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = guess_mime(&filename).to_owned();
        tracing::debug!(path = %full.display(), bytes = bytes.len(), "read local resource");
        Ok(Fetched {
            bytes,
            filename,
            mime,
        })
    }
}
