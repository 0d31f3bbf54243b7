use std::path::{Path, PathBuf};

use image::DynamicImage;
use tempfile::TempDir;

use crate::error::{CompositionError, Result};

/// Scoped scratch directory owned by a single invocation.
///
/// The directory is removed when the value is dropped, including when the
/// owning future is cancelled. Removal failures are logged and swallowed.
#[derive(Debug)]
pub struct WorkingArea {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkingArea {
    /// Create a fresh area under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("comic-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        tracing::debug!("Created working area at {}", path.display());
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `image` as PNG under `name` and return its path.
    pub fn save_png(&self, name: &str, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.file(name);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|source| CompositionError::Encode {
                width: image.width(),
                height: image.height(),
                source,
            })?;
        Ok(path)
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!("Released working area {}", self.path.display()),
                Err(e) => tracing::warn!(
                    "Failed to release working area {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}
