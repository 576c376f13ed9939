//! Configuration file support for dotapk.
//!
//! A `dotapk.toml` keeps SDK locations and project settings out of the
//! command line. CLI flags always win over the file, and the file wins over
//! `ANDROID_SDK_ROOT` / `ANDROID_NDK_ROOT` and SDK discovery.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. The path given with `--config`
//! 2. The current working directory (`./dotapk.toml`)
//! 3. Parent directories (up to the repository root or filesystem root)
//!
//! Relative paths in the file are taken relative to the file's directory.
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! name = "HelloAndroid"
//! output_dir = "out/android"
//!
//! [android]
//! sdk_root = "/opt/android-sdk"
//! ndk_root = "/opt/android-ndk"
//! min_api_level = "21"
//!
//! [build]
//! tool_timeout_secs = 600
//! ```

use anyhow::{Context, Result};
use dotapk_sdk::RequestedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "dotapk.toml";

/// Root configuration structure for `dotapk.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotapkConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,

    /// Android SDK/NDK configuration.
    pub android: AndroidConfig,

    /// Pipeline execution settings.
    pub build: BuildSettings,
}

/// Project-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used for the APK file name and `net.dot.<name>`.
    ///
    /// Defaults to the entry-point assembly's file stem.
    pub name: Option<String>,

    /// Output directory. Defaults to `<source_dir>/bin-<abi>`.
    pub output_dir: Option<PathBuf>,
}

/// Android SDK/NDK configuration.
///
/// Every field left unset is resolved from the environment or discovered
/// from the SDK layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    pub sdk_root: Option<PathBuf>,
    pub ndk_root: Option<PathBuf>,
    pub min_api_level: Option<String>,
    pub build_api_level: Option<String>,
    pub build_tools_version: Option<String>,
}

/// Pipeline execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Kill any single tool that runs longer than this. Unset waits forever.
    pub tool_timeout_secs: Option<u64>,
}

impl DotapkConfig {
    /// Loads configuration from the specified file path.
    ///
    /// Relative paths in the file are rebased onto the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: DotapkConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        Ok(config)
    }

    /// Attempts to find and load configuration from the current directory
    /// or any parent directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load configuration starting from `start_dir`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Loads `explicit` if given, otherwise discovers a config file.
    pub fn locate(explicit: Option<&Path>) -> Result<Option<(Self, PathBuf)>> {
        match explicit {
            Some(path) => Ok(Some((Self::load_from_file(path)?, path.to_path_buf()))),
            None => Self::discover(),
        }
    }

    /// Fills every field `cli` leaves unset from this file.
    pub fn fill(&self, cli: RequestedConfig) -> RequestedConfig {
        RequestedConfig {
            project_name: cli.project_name.or_else(|| self.project.name.clone()),
            sdk_root: cli.sdk_root.or_else(|| self.android.sdk_root.clone()),
            ndk_root: cli.ndk_root.or_else(|| self.android.ndk_root.clone()),
            min_api_level: cli
                .min_api_level
                .or_else(|| self.android.min_api_level.clone()),
            build_api_level: cli
                .build_api_level
                .or_else(|| self.android.build_api_level.clone()),
            build_tools_version: cli
                .build_tools_version
                .or_else(|| self.android.build_tools_version.clone()),
            output_dir: cli.output_dir.or_else(|| self.project.output_dir.clone()),
        }
    }

    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.project.output_dir,
            &mut self.android.sdk_root,
            &mut self.android.ndk_root,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Generates a starter configuration file as a formatted TOML string.
    pub fn generate_starter_toml() -> String {
        r#"# dotapk configuration file
# CLI flags override these settings when provided.

[project]
# Project name; the APK is bin/<name>.apk and the package id net.dot.<name>
# (default: the entry-point assembly's file stem)
# name = "HelloAndroid"

# Output directory (default: <source_dir>/bin-<abi>)
# output_dir = "out/android"

[android]
# Android SDK root (default: $ANDROID_SDK_ROOT)
# sdk_root = "/opt/android-sdk"

# Android NDK root (default: $ANDROID_NDK_ROOT)
# ndk_root = "/opt/android-ndk"

# Minimum API level written to the manifest (default: 21)
min_api_level = "21"

# Platform to compile against (default: highest installed android-<N>)
# build_api_level = "30"

# build-tools version (default: highest installed release)
# build_tools_version = "30.0.2"

[build]
# Kill any tool that runs longer than this many seconds (default: no limit)
# tool_timeout_secs = 600
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_empty() {
        let config = DotapkConfig::default();
        assert_eq!(config.fill(RequestedConfig::default()), RequestedConfig::default());
        assert_eq!(config.build.tool_timeout_secs, None);
    }

    #[test]
    fn test_starter_toml_parses() {
        let config: DotapkConfig = toml::from_str(&DotapkConfig::generate_starter_toml()).unwrap();
        assert_eq!(config.android.min_api_level.as_deref(), Some("21"));
        assert_eq!(config.android.sdk_root, None);
        assert_eq!(config.project.name, None);
    }

    #[test]
    fn test_load_rebases_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[project]
name = "HelloAndroid"
output_dir = "out"

[android]
sdk_root = "/opt/android-sdk"
ndk_root = "ndk"
build_api_level = "30"

[build]
tool_timeout_secs = 90
"#,
        )
        .unwrap();

        let config = DotapkConfig::load_from_file(&path).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("HelloAndroid"));
        assert_eq!(config.project.output_dir, Some(dir.path().join("out")));
        assert_eq!(config.android.sdk_root, Some(PathBuf::from("/opt/android-sdk")));
        assert_eq!(config.android.ndk_root, Some(dir.path().join("ndk")));
        assert_eq!(config.build.tool_timeout_secs, Some(90));
    }

    #[test]
    fn test_cli_values_win_over_file() {
        let config = DotapkConfig {
            project: ProjectConfig {
                name: Some("FromFile".to_string()),
                output_dir: None,
            },
            android: AndroidConfig {
                sdk_root: Some(PathBuf::from("/file/sdk")),
                min_api_level: Some("24".to_string()),
                ..Default::default()
            },
            build: BuildSettings::default(),
        };

        let requested = config.fill(RequestedConfig {
            project_name: Some("FromCli".to_string()),
            output_dir: Some(PathBuf::from("/cli/out")),
            ..Default::default()
        });

        assert_eq!(requested.project_name.as_deref(), Some("FromCli"));
        assert_eq!(requested.sdk_root, Some(PathBuf::from("/file/sdk")));
        assert_eq!(requested.min_api_level.as_deref(), Some("24"));
        assert_eq!(requested.output_dir, Some(PathBuf::from("/cli/out")));
        assert_eq!(requested.ndk_root, None);
    }

    #[test]
    fn test_discover_walks_up_to_repo_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("app/publish");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"Found\"\n",
        )
        .unwrap();

        let (config, path) = DotapkConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.project.name.as_deref(), Some("Found"));
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_stops_at_git_root() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();

        assert!(DotapkConfig::discover_from(&repo).unwrap().is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[android\nsdk_root = ").unwrap();

        let err = DotapkConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
