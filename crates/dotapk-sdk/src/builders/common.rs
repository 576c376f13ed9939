//! Common utilities shared by the build stages.
//!
//! ## Features
//!
//! - **Input validation** - Request checks that run before anything is written
//! - **Filesystem helpers** - Directory creation and copies with path-carrying errors
//! - **Shared context** - [`BuildContext`] threaded through every stage
//!
//! All errors name the path or field they concern so a failed build can be
//! diagnosed from the message alone.

use std::fs;
use std::path::{Path, PathBuf};

use super::native::RUNTIME_ARCHIVE;
use crate::config::ResolvedConfig;
use crate::runner::{ToolInvocation, ToolOutput, ToolRunner};
use crate::toolchain::ToolchainPaths;
use crate::types::{ApkError, BuildRequest, Tool};

/// Extensions of native binaries, which are staged under `lib/<abi>/` instead
/// of `assets/`.
pub const NATIVE_EXTENSIONS: &[&str] = &["so", "a"];

/// Everything a stage needs besides the previous stage's artifact.
pub struct BuildContext<'a> {
    pub request: &'a BuildRequest,
    pub config: &'a ResolvedConfig,
    pub tools: &'a ToolchainPaths,
    pub runner: &'a dyn ToolRunner,
}

impl BuildContext<'_> {
    /// Output directory of the build.
    pub fn out_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Starts an invocation of `tool` running inside the output directory.
    pub fn invocation(&self, tool: Tool) -> ToolInvocation {
        ToolInvocation::new(tool, self.tools.program(tool), self.out_dir())
    }

    pub fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput, ApkError> {
        self.runner.run(&invocation)
    }
}

/// Validates a build request before any side effect.
///
/// Checks run cheapest first:
/// - The source directory exists and is a directory
/// - The ABI is non-empty
/// - The entry-point library name is non-empty
/// - The entry-point library exists inside the source directory
/// - The static runtime archive exists inside the source directory
///
/// The project name is checked separately by [`validate_project_name`] once
/// it has been resolved.
pub fn validate_request(request: &BuildRequest) -> Result<(), ApkError> {
    if !request.source_dir.is_dir() {
        return Err(ApkError::Precondition(format!(
            "sourceDir='{}' is empty or doesn't exist",
            request.source_dir.display()
        )));
    }

    if request.abi.is_empty() {
        return Err(ApkError::Precondition(
            "abi shouldn't be empty (e.g. x86, x86_64, armeabi-v7a or arm64-v8a)".to_string(),
        ));
    }

    if request.entry_point_lib.is_empty() {
        return Err(ApkError::Precondition(
            "entryPointLib shouldn't be empty".to_string(),
        ));
    }

    let entry_point = request.source_dir.join(&request.entry_point_lib);
    if !entry_point.is_file() {
        return Err(ApkError::Precondition(format!(
            "{} was not found in sourceDir='{}'",
            request.entry_point_lib,
            request.source_dir.display()
        )));
    }

    if !request.source_dir.join(RUNTIME_ARCHIVE).is_file() {
        return Err(ApkError::Precondition(format!(
            "{} was not found in sourceDir='{}'",
            RUNTIME_ARCHIVE,
            request.source_dir.display()
        )));
    }

    Ok(())
}

/// Rejects project names that cannot be part of a package identifier.
pub fn validate_project_name(project_name: &str) -> Result<(), ApkError> {
    if project_name.is_empty() {
        return Err(ApkError::Precondition(
            "ProjectName shouldn't be empty".to_string(),
        ));
    }
    if project_name.chars().any(char::is_whitespace) {
        return Err(ApkError::Precondition(format!(
            "ProjectName='{}' shouldn't contain spaces.",
            project_name
        )));
    }
    Ok(())
}

/// Creates `dir` and its parents; succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), ApkError> {
    fs::create_dir_all(dir).map_err(|e| {
        ApkError::Filesystem(format!("Failed to create directory {}: {}", dir.display(), e))
    })
}

/// Copies a single file, overwriting the destination.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), ApkError> {
    fs::copy(src, dest).map(|_| ()).map_err(|e| {
        ApkError::Filesystem(format!(
            "Failed to copy {} to {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })
}

/// Recursively copies `src` into `dest`, keeping only files accepted by `filter`.
///
/// Relative paths are preserved. Directories listed in `skip_dirs` are not
/// descended into.
pub fn copy_dir_filtered<F>(
    src: &Path,
    dest: &Path,
    skip_dirs: &[PathBuf],
    filter: &F,
) -> Result<(), ApkError>
where
    F: Fn(&Path) -> bool,
{
    ensure_dir(dest)?;

    for entry in fs::read_dir(src).map_err(|e| {
        ApkError::Filesystem(format!("Failed to read directory {}: {}", src.display(), e))
    })? {
        let entry = entry.map_err(|e| {
            ApkError::Filesystem(format!("Failed to read entry in {}: {}", src.display(), e))
        })?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if path.is_dir() {
            if skip_dirs.iter().any(|skip| same_path(skip, &path)) {
                continue;
            }
            copy_dir_filtered(&path, &dest_path, skip_dirs, filter)?;
        } else if filter(path.as_path()) {
            copy_file(&path, &dest_path)?;
        }
    }

    Ok(())
}

/// Files directly inside `dir` (non-recursive) whose extension is `extension`.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ApkError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ApkError::Filesystem(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| {
                ApkError::Filesystem(format!("Failed to read entry in {}: {}", dir.display(), e))
            })?
            .path();
        if path.is_file() && has_extension(&path, &[extension]) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Returns `true` when `path` has one of `extensions` (without the dot).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
