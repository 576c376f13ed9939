//! Build configuration and environment resolution.
//!
//! Configuration flows in two phases:
//!
//! 1. [`RequestedConfig`] - what the caller asked for; every field optional.
//! 2. [`ResolvedConfig`] - produced once by [`resolve`], with every field
//!    filled in and every referenced SDK/NDK path verified.
//!
//! Each field resolves independently, in this order:
//!
//! | Field | Explicit | Environment | Discovery | Default |
//! |-------|----------|-------------|-----------|---------|
//! | `project_name` | yes | - | entry-point file stem | - |
//! | `sdk_root` | yes | `ANDROID_SDK_ROOT` | - | - |
//! | `ndk_root` | yes | `ANDROID_NDK_ROOT` | - | - |
//! | `build_tools_version` | yes | - | latest in `build-tools/` | - |
//! | `build_api_level` | yes | - | latest `platforms/android-N` | - |
//! | `min_api_level` | yes | - | - | `21` |
//! | `output_dir` | yes | - | - | `<source>/bin-<abi>` |

use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::common::validate_project_name;
use crate::types::{ApkError, BuildRequest};

/// Environment variable consulted for the SDK root.
pub const SDK_ROOT_ENV: &str = "ANDROID_SDK_ROOT";
/// Environment variable consulted for the NDK root.
pub const NDK_ROOT_ENV: &str = "ANDROID_NDK_ROOT";
/// Minimum API level used when none is requested.
pub const DEFAULT_MIN_API_LEVEL: &str = "21";

/// Caller-supplied configuration. `None` (or an empty string) means "resolve it".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedConfig {
    pub project_name: Option<String>,
    pub sdk_root: Option<PathBuf>,
    pub ndk_root: Option<PathBuf>,
    pub min_api_level: Option<String>,
    pub build_api_level: Option<String>,
    pub build_tools_version: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved configuration.
///
/// API levels stay strings because preview platforms use letters (`"R"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub project_name: String,
    pub sdk_root: PathBuf,
    pub ndk_root: PathBuf,
    pub min_api_level: String,
    pub build_api_level: String,
    pub build_tools_version: String,
    pub output_dir: PathBuf,
}

/// Resolves `requested` against the process environment.
pub fn resolve(request: &BuildRequest, requested: &RequestedConfig) -> Result<ResolvedConfig, ApkError> {
    resolve_with_env(request, requested, |name| std::env::var(name).ok())
}

/// Resolves `requested`, reading environment variables through `env`.
///
/// This is a pure function of its arguments and the SDK directory layout, so
/// it can be tested without touching process state.
pub fn resolve_with_env<F>(
    request: &BuildRequest,
    requested: &RequestedConfig,
    env: F,
) -> Result<ResolvedConfig, ApkError>
where
    F: Fn(&str) -> Option<String>,
{
    let project_name = match non_empty(requested.project_name.as_deref()) {
        Some(name) => name.to_string(),
        None => Path::new(&request.entry_point_lib)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    validate_project_name(&project_name)?;

    let output_dir = absolute(
        &requested
            .output_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| request.source_dir.join(format!("bin-{}", request.abi))),
    )?;

    let sdk_root = resolve_root(requested.sdk_root.as_deref(), SDK_ROOT_ENV, "Android SDK", &env)?;
    let ndk_root = resolve_root(requested.ndk_root.as_deref(), NDK_ROOT_ENV, "Android NDK", &env)?;

    let build_tools_version = match non_empty(requested.build_tools_version.as_deref()) {
        Some(version) => version.to_string(),
        None => latest_build_tools(&sdk_root)?,
    };

    let build_api_level = match non_empty(requested.build_api_level.as_deref()) {
        Some(level) => level.to_string(),
        None => latest_api_level(&sdk_root)?.to_string(),
    };

    let min_api_level = non_empty(requested.min_api_level.as_deref())
        .unwrap_or(DEFAULT_MIN_API_LEVEL)
        .to_string();

    check_api_levels(&build_api_level, &min_api_level)?;

    let build_tools_dir = sdk_root.join("build-tools").join(&build_tools_version);
    if !build_tools_dir.is_dir() {
        return Err(ApkError::Environment(format!(
            "build-tools {} not found at {}.\n\n\
             Install it with: sdkmanager \"build-tools;{}\"",
            build_tools_version,
            build_tools_dir.display(),
            build_tools_version
        )));
    }

    Ok(ResolvedConfig {
        project_name,
        sdk_root,
        ndk_root,
        min_api_level,
        build_api_level,
        build_tools_version,
        output_dir,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// Tool paths and the returned APK path are absolute even for relative inputs.
fn absolute(path: &Path) -> Result<PathBuf, ApkError> {
    std::path::absolute(path).map_err(|e| {
        ApkError::Filesystem(format!("Failed to make {} absolute: {}", path.display(), e))
    })
}

fn resolve_root<F>(
    explicit: Option<&Path>,
    env_name: &str,
    label: &str,
    env: &F,
) -> Result<PathBuf, ApkError>
where
    F: Fn(&str) -> Option<String>,
{
    let root = explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| env(env_name).filter(|v| !v.is_empty()).map(PathBuf::from));

    match root {
        Some(root) if root.is_dir() => absolute(&root),
        Some(root) => Err(ApkError::Environment(format!(
            "{} '{}' was not found (can be set via {} envvar).",
            label,
            root.display(),
            env_name
        ))),
        None => Err(ApkError::Environment(format!(
            "{} location is not set. Pass it explicitly or set the {} envvar.",
            label, env_name
        ))),
    }
}

/// Rejects a numeric build API level lower than a numeric minimum.
///
/// Preview levels (non-numeric, e.g. `"R"`) skip the comparison.
pub fn check_api_levels(build_api_level: &str, min_api_level: &str) -> Result<(), ApkError> {
    if let (Ok(build), Ok(min)) = (build_api_level.parse::<i64>(), min_api_level.parse::<i64>()) {
        if build < min {
            return Err(ApkError::Environment(format!(
                "BuildApiLevel={} < MinApiLevel={}. \
                 Make sure you've downloaded some recent build-tools in Android SDK",
                build_api_level, min_api_level
            )));
        }
    }
    Ok(())
}

/// Dotted version with 2 to 4 numeric components, e.g. `30.0.2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsVersion(Vec<u32>);

impl ToolsVersion {
    pub fn parse(s: &str) -> Option<Self> {
        let parts = s
            .split('.')
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        if (2..=4).contains(&parts.len()) {
            Some(Self(parts))
        } else {
            None
        }
    }
}

impl Ord for ToolsVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // A missing component sorts below zero: 30.0 < 30.0.0
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for ToolsVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Picks the newest stable build-tools version installed in the SDK.
///
/// Directory names containing `-` (release candidates, channels) and names
/// that are not dotted versions are ignored. The directory name is returned
/// verbatim.
pub fn latest_build_tools(sdk_root: &Path) -> Result<String, ApkError> {
    let dir = sdk_root.join("build-tools");
    let names = subdirectory_names(&dir).unwrap_or_default();

    select_build_tools(names.iter().map(String::as_str)).ok_or_else(|| {
        ApkError::Environment(format!(
            "Android SDK ({}) doesn't contain build-tools.\n\n\
             Install them with: sdkmanager \"build-tools;<version>\"",
            sdk_root.display()
        ))
    })
}

/// Selects the highest stable version among build-tools directory names.
pub fn select_build_tools<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| !name.contains('-'))
        .filter_map(|name| ToolsVersion::parse(name).map(|version| (version, name)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, name)| name.to_string())
}

/// Picks the highest numeric API level installed under `platforms/`.
///
/// Fails when no `android-<N>` directory has a numeric `<N>`, rather than
/// letting a placeholder level flow into the build.
pub fn latest_api_level(sdk_root: &Path) -> Result<u32, ApkError> {
    let dir = sdk_root.join("platforms");
    let names = subdirectory_names(&dir).unwrap_or_default();

    select_api_level(names.iter().map(String::as_str)).ok_or_else(|| {
        ApkError::Environment(format!(
            "Android SDK ({}) doesn't contain a platform with a numeric API level \
             (found: {:?}).\n\n\
             Install one with: sdkmanager \"platforms;android-<N>\" or pass the build API level explicitly.",
            sdk_root.display(),
            names
        ))
    })
}

/// Selects the highest numeric level among `android-<N>` directory names.
pub fn select_api_level<'a, I>(names: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| name.replace("android-", "").parse::<u32>().ok())
        .max()
}

fn subdirectory_names(dir: &Path) -> Option<Vec<String>> {
    let entries = fs::read_dir(dir).ok()?;
    let mut names = Vec::new();
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Some(names)
}
