// JSON manifest describing an image build
// Lists host paths only; reading the files is left to the caller

use crate::{ImageOptions, ImageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub output: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub directories: Vec<DirectoryManifest>,
    pub options: ImageOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryManifest {
    pub name: String,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl Manifest {
    pub fn from_json(text: &str) -> ImageResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a manifest from disk. Relative file paths are resolved against the
    /// manifest's own directory.
    pub fn load(path: &Path) -> ImageResult<Self> {
        debug!("Loading manifest from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let mut manifest = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.output.iter_mut().for_each(fix);
        self.files.iter_mut().for_each(fix);
        for dir in &mut self.directories {
            dir.files.iter_mut().for_each(fix);
        }
    }
}
