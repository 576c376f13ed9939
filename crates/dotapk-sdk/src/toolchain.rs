//! Paths to the external tools and SDK files a build uses.

use serde::Serialize;
use std::path::PathBuf;

use crate::config::ResolvedConfig;
use crate::types::{ApkError, Tool};

/// Absolute tool and resource paths derived from a [`ResolvedConfig`].
///
/// Tools that ship with the SDK are addressed by path; host tools (cmake,
/// make, javac, keytool) are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainPaths {
    pub build_tools_dir: PathBuf,
    pub dx: PathBuf,
    pub aapt: PathBuf,
    pub zipalign: PathBuf,
    pub apksigner: PathBuf,
    /// Boot classpath for the build API level.
    pub android_jar: PathBuf,
    /// NDK CMake toolchain file.
    pub cmake_toolchain: PathBuf,
    pub cmake: PathBuf,
    pub make: PathBuf,
    pub javac: PathBuf,
    pub keytool: PathBuf,
}

impl ToolchainPaths {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let build_tools_dir = config
            .sdk_root
            .join("build-tools")
            .join(&config.build_tools_version);

        Self {
            dx: build_tools_dir.join("dx"),
            aapt: build_tools_dir.join("aapt"),
            zipalign: build_tools_dir.join("zipalign"),
            apksigner: build_tools_dir.join("apksigner"),
            android_jar: config
                .sdk_root
                .join("platforms")
                .join(format!("android-{}", config.build_api_level))
                .join("android.jar"),
            cmake_toolchain: config
                .ndk_root
                .join("build")
                .join("cmake")
                .join("android.toolchain.cmake"),
            cmake: PathBuf::from("cmake"),
            make: PathBuf::from("make"),
            javac: PathBuf::from("javac"),
            keytool: PathBuf::from("keytool"),
            build_tools_dir,
        }
    }

    /// Program to launch for `tool`.
    pub fn program(&self, tool: Tool) -> &PathBuf {
        match tool {
            Tool::Cmake => &self.cmake,
            Tool::Make => &self.make,
            Tool::Javac => &self.javac,
            Tool::Dx => &self.dx,
            Tool::Aapt => &self.aapt,
            Tool::Zipalign => &self.zipalign,
            Tool::Keytool => &self.keytool,
            Tool::Apksigner => &self.apksigner,
        }
    }

    /// Fails unless the boot classpath for `build_api_level` is installed.
    ///
    /// Runs during resolution so a missing platform is reported before the
    /// output tree is created or any tool runs.
    pub fn require_platform(&self, build_api_level: &str) -> Result<(), ApkError> {
        if self.android_jar.is_file() {
            return Ok(());
        }
        Err(ApkError::Environment(format!(
            "API level={} is not downloaded in Android SDK ({} is missing).\n\n\
             Install it with: sdkmanager \"platforms;android-{}\"",
            build_api_level,
            self.android_jar.display(),
            build_api_level
        )))
    }

    /// SDK-provided files that are absent on disk.
    ///
    /// Host tools resolved through `PATH` are not checked.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [
            &self.dx,
            &self.aapt,
            &self.zipalign,
            &self.apksigner,
            &self.android_jar,
            &self.cmake_toolchain,
        ]
        .into_iter()
        .filter(|path| !path.exists())
        .cloned()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> ResolvedConfig {
        ResolvedConfig {
            project_name: "app".to_string(),
            sdk_root: PathBuf::from("/sdk"),
            ndk_root: PathBuf::from("/ndk"),
            min_api_level: "21".to_string(),
            build_api_level: "30".to_string(),
            build_tools_version: "30.0.2".to_string(),
            output_dir: PathBuf::from("/out"),
        }
    }

    #[test]
    fn derives_sdk_and_ndk_paths() {
        let paths = ToolchainPaths::from_config(&config());
        assert_eq!(paths.aapt, Path::new("/sdk/build-tools/30.0.2/aapt"));
        assert_eq!(paths.android_jar, Path::new("/sdk/platforms/android-30/android.jar"));
        assert_eq!(
            paths.cmake_toolchain,
            Path::new("/ndk/build/cmake/android.toolchain.cmake")
        );
        assert_eq!(paths.program(Tool::Javac), Path::new("javac"));
    }

    #[test]
    fn missing_platform_jar_names_api_level() {
        let paths = ToolchainPaths::from_config(&config());
        let err = paths.require_platform("30").unwrap_err();
        assert!(matches!(err, ApkError::Environment(_)));
        let msg = err.to_string();
        assert!(msg.contains("API level=30"));
        assert!(msg.contains("platforms;android-30"));
    }

    #[test]
    fn installed_platform_jar_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.sdk_root = dir.path().to_path_buf();
        let paths = ToolchainPaths::from_config(&config);
        std::fs::create_dir_all(paths.android_jar.parent().unwrap()).unwrap();
        std::fs::write(&paths.android_jar, b"PK").unwrap();
        assert!(paths.require_platform("30").is_ok());
    }

    #[test]
    fn reports_missing_sdk_files() {
        let paths = ToolchainPaths::from_config(&config());
        let missing = paths.missing_files();
        assert!(missing.contains(&PathBuf::from("/sdk/build-tools/30.0.2/zipalign")));
        assert_eq!(missing.len(), 6);
    }
}
