//! .NET Android APK builder
//!
//! `dotapk-sdk` turns a directory of published .NET assemblies into a signed
//! Android APK. It drives the Android SDK/NDK command-line tools (cmake,
//! make, javac, dx, aapt, zipalign, keytool, apksigner) and embeds the small
//! native and Java shims that boot the Mono runtime on the device.
//!
//! # Quick Start
//!
//! ```ignore
//! use dotapk_sdk::{ApkBuilder, BuildRequest, RequestedConfig};
//!
//! fn main() -> Result<(), dotapk_sdk::ApkError> {
//!     let request = BuildRequest::new(
//!         "bin/Release/publish",
//!         "arm64-v8a",
//!         "HelloAndroid.dll",
//!         "/opt/mono/include/mono-2.0",
//!     );
//!     let artifact = ApkBuilder::new(RequestedConfig::default()).build(&request)?;
//!     println!("Built {} ({})", artifact.apk.display(), artifact.package_id);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Config**: Resolves SDK/NDK roots, build-tools and API levels from
//!   explicit values, `ANDROID_SDK_ROOT` / `ANDROID_NDK_ROOT` and discovery
//! - **Builders**: The staged pipeline, from asset staging to the signed APK
//! - **Runner**: Launches external tools behind the [`ToolRunner`] trait
//! - **Templates**: Embedded CMake, C, Java and manifest sources
//!
//! Progress is reported through `tracing`; install a subscriber to see it.

pub mod builders;
pub mod config;
pub mod runner;
pub mod templates;
pub mod toolchain;
pub mod types;

pub use builders::ApkBuilder;
pub use config::{RequestedConfig, ResolvedConfig};
pub use runner::{SystemRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use toolchain::ToolchainPaths;
pub use types::{ApkError, BuildArtifact, BuildRequest, Stage, Tool, package_id};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_package_id_is_reexported() {
        assert_eq!(package_id("HelloAndroid"), "net.dot.HelloAndroid");
    }
}
