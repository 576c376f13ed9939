//! Core types for dotapk-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`ApkError`] - Error taxonomy for validation, resolution and tool failures
//! - [`BuildRequest`] - The immutable input bundle for one build
//! - [`BuildArtifact`] - The signed APK and its package identifier
//! - [`Stage`] / [`Tool`] - Names used to attribute failures

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Namespace every generated package identifier lives under.
pub const PACKAGE_NAMESPACE: &str = "net.dot";

/// Error types for dotapk-sdk operations.
///
/// Every error is fatal to the build that raised it. The variants follow the
/// order in which they can occur: preconditions are checked before any side
/// effect, environment errors before any tool runs, and tool errors abort the
/// pipeline right after the failing invocation.
///
/// # Example
///
/// ```ignore
/// use dotapk_sdk::{ApkBuilder, ApkError};
///
/// match builder.build(&request) {
///     Ok(artifact) => println!("Built {}", artifact.apk.display()),
///     Err(ApkError::Tool { tool, .. }) => eprintln!("{} failed", tool),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ApkError {
    /// A required input is missing or malformed.
    ///
    /// Raised before the output directory is touched. The message names the
    /// offending field or path.
    #[error("invalid build request: {0}")]
    Precondition(String),

    /// The Android SDK/NDK environment could not be resolved.
    ///
    /// Covers missing SDK/NDK roots, no usable build-tools or platform, and
    /// build-tools older than the requested minimum API level.
    #[error("environment error: {0}")]
    Environment(String),

    /// An external tool exited with a nonzero status.
    #[error(
        "{stage} failed: {tool} exited with {status}\n\n\
         Stdout:\n{stdout}\n\n\
         Stderr:\n{stderr}"
    )]
    Tool {
        stage: Stage,
        tool: Tool,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// An external tool could not be started at all.
    #[error(
        "{stage} failed: could not start {tool} ({program}): {source}\n\n\
         Ensure the tool is installed and available on PATH."
    )]
    ToolSpawn {
        stage: Stage,
        tool: Tool,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran past the configured timeout and was killed.
    ///
    /// Carries whatever the tool wrote before it was killed.
    #[error(
        "{stage} failed: {tool} did not finish within {seconds}s and was killed\n\n\
         Stdout:\n{stdout}\n\n\
         Stderr:\n{stderr}"
    )]
    Timeout {
        stage: Stage,
        tool: Tool,
        seconds: u64,
        stdout: String,
        stderr: String,
    },

    /// An embedded template is missing or was rendered incompletely.
    #[error("template error: {0}")]
    Template(String),

    /// Creating, copying or writing files in the output tree failed.
    #[error("filesystem error: {0}. Check file paths and permissions")]
    Filesystem(String),
}

/// Pipeline stage, used to attribute errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// cmake + make producing `libruntime-android.so`.
    NativeBuild,
    /// javac + dx producing `classes.dex`.
    ManagedGlue,
    /// aapt creating the container and adding entries.
    PackageAssembly,
    /// zipalign, keytool and apksigner.
    AlignAndSign,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NativeBuild => "native build",
            Stage::ManagedGlue => "managed glue compilation",
            Stage::PackageAssembly => "package assembly",
            Stage::AlignAndSign => "alignment and signing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External tools the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Native build-system generator.
    Cmake,
    /// Native build driver.
    Make,
    /// Java bytecode compiler.
    Javac,
    /// Class-to-dex packager.
    Dx,
    /// Resource packaging tool.
    Aapt,
    /// APK alignment tool.
    Zipalign,
    /// Signing key generator.
    Keytool,
    /// APK signing tool.
    Apksigner,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Cmake => "cmake",
            Tool::Make => "make",
            Tool::Javac => "javac",
            Tool::Dx => "dx",
            Tool::Aapt => "aapt",
            Tool::Zipalign => "zipalign",
            Tool::Keytool => "keytool",
            Tool::Apksigner => "apksigner",
        }
    }

    /// The stage a tool belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Tool::Cmake | Tool::Make => Stage::NativeBuild,
            Tool::Javac | Tool::Dx => Stage::ManagedGlue,
            Tool::Aapt => Stage::PackageAssembly,
            Tool::Zipalign | Tool::Keytool | Tool::Apksigner => Stage::AlignAndSign,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The immutable input bundle for one build.
///
/// # Example
///
/// ```
/// use dotapk_sdk::BuildRequest;
///
/// let request = BuildRequest::new("./publish", "arm64-v8a", "app.dll", "/opt/mono/include");
/// assert_eq!(request.abi, "arm64-v8a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Directory holding the compiled assemblies and native libraries.
    pub source_dir: PathBuf,
    /// Target ABI, e.g. `arm64-v8a`. Passed to the NDK toolchain untouched.
    pub abi: String,
    /// File name of the entry-point assembly inside `source_dir`.
    pub entry_point_lib: String,
    /// Mono runtime include directory, written into the native build descriptor.
    pub runtime_headers: PathBuf,
}

impl BuildRequest {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        abi: impl Into<String>,
        entry_point_lib: impl Into<String>,
        runtime_headers: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            abi: abi.into(),
            entry_point_lib: entry_point_lib.into(),
            runtime_headers: runtime_headers.into(),
        }
    }
}

/// Result of a successful build.
///
/// Only ever constructed once the APK has been aligned and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    /// Path to the signed, aligned APK.
    pub apk: PathBuf,
    /// Package identifier, `net.dot.<ProjectName>`.
    pub package_id: String,
}

/// Builds the package identifier for a project name.
pub fn package_id(project_name: &str) -> String {
    format!("{}.{}", PACKAGE_NAMESPACE, project_name)
}
