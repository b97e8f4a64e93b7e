use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Outcome of resolving a relative report path against the base directory
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    /// Whether the input file exists on disk
    pub exists: bool,
    /// `base_dir` joined with the relative path
    pub absolute_path: PathBuf,
    /// Directory the current stage writes its output into
    pub transformed_dir: PathBuf,
}

impl ResolvedFile {
    /// Output path inside the transformed directory, basename preserved
    pub fn output_path(&self) -> PathBuf {
        match self.absolute_path.file_name() {
            Some(name) => self.transformed_dir.join(name),
            None => self.transformed_dir.clone(),
        }
    }
}

/// Maps relative report paths onto disk and owns the `transformed/` sibling convention
#[derive(Debug, Clone)]
pub struct FileResolver {
    base_dir: PathBuf,
    transformed_dir_name: String,
}

impl FileResolver {
    pub fn new(base_dir: impl Into<PathBuf>, transformed_dir_name: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            transformed_dir_name: transformed_dir_name.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `relative_path`, creating the transformed directory when missing.
    ///
    /// A parent that already is a transformed directory is reused, so repeated stages
    /// never nest `transformed/transformed`.
    pub fn resolve(&self, relative_path: &str) -> Result<ResolvedFile> {
        let absolute_path = self.base_dir.join(relative_path);
        let exists = absolute_path.is_file();

        let parent = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone());

        let already_transformed = parent
            .file_name()
            .map(|name| name.to_string_lossy() == self.transformed_dir_name.as_str())
            .unwrap_or(false);

        let transformed_dir = if already_transformed {
            parent
        } else {
            parent.join(&self.transformed_dir_name)
        };

        if exists {
            fs::create_dir_all(&transformed_dir)?;
        }

        Ok(ResolvedFile {
            exists,
            absolute_path,
            transformed_dir,
        })
    }

    /// Express an on-disk path relative to the base directory again
    pub fn relativize(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }
}
