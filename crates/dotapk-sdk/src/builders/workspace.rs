//! Output directory layout and asset staging.

use std::path::{Path, PathBuf};

use tracing::info;

use super::common::{NATIVE_EXTENSIONS, copy_dir_filtered, ensure_dir, has_extension};
use crate::types::ApkError;

/// The output tree every later stage writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    /// Final and intermediate APKs.
    pub bin: PathBuf,
    /// Compiled Java classes.
    pub obj: PathBuf,
    /// Staged non-native assets, packaged by aapt.
    pub assets: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            bin: root.join("bin"),
            obj: root.join("obj"),
            assets: root.join("assets"),
            root,
        }
    }

    /// Creates the directory tree and stages `source_dir` into `assets/`.
    ///
    /// Native binaries (`.so`, `.a`) are left out; they go to `lib/<abi>/`
    /// later. Safe to call on an existing tree.
    pub fn initialize(&self, source_dir: &Path) -> Result<(), ApkError> {
        for dir in [&self.root, &self.bin, &self.obj, &self.assets] {
            ensure_dir(dir)?;
        }

        info!(
            "staging assets from {} into {}",
            source_dir.display(),
            self.assets.display()
        );
        // The default output dir lives inside the source tree.
        let skip = [self.root.clone()];
        copy_dir_filtered(source_dir, &self.assets, &skip, &|path: &Path| {
            !has_extension(path, NATIVE_EXTENSIONS)
        })
    }
}
