//! Named image files saved next to the exported document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cer_diagrams::{service_image_file_name, unix_millis};

/// Saves image bytes under `<name>_<millis>.png` in one directory.
#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory images are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` as a new PNG named after `name`.
    ///
    /// The directory is created on first use; an existing directory is
    /// fine. Returns the path of the written file.
    pub fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        self.save_at(name, bytes, unix_millis())
    }

    fn save_at(&self, name: &str, bytes: &[u8], millis: u128) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(service_image_file_name(name, millis));
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Saved image");
        Ok(path)
    }
}
