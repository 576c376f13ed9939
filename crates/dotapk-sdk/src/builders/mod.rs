//! APK build pipeline.
//!
//! ## Overview
//!
//! [`ApkBuilder`] drives the stages below in order. Each stage is a plain
//! function taking a [`common::BuildContext`] and the previous stage's
//! artifact, so they can be exercised one at a time:
//!
//! | Stage | Module | Tools | Output |
//! |-------|--------|-------|--------|
//! | Workspace | `workspace` | - | `bin/`, `obj/`, `assets/` |
//! | Native build | `native` | cmake, make | `libruntime-android.so` |
//! | Managed glue | `glue` | javac, dx | `classes.dex`, `AndroidManifest.xml` |
//! | Package assembly | `package` | aapt | `bin/<Project>.unaligned.apk` |
//! | Align and sign | `sign` | zipalign, keytool, apksigner | `bin/<Project>.apk` |
//!
//! ## Example
//!
//! ```ignore
//! use dotapk_sdk::{ApkBuilder, BuildRequest, RequestedConfig};
//!
//! let request = BuildRequest::new("publish", "arm64-v8a", "HelloAndroid.dll", "/opt/mono/include/mono-2.0");
//! let artifact = ApkBuilder::new(RequestedConfig::default()).build(&request)?;
//! println!("{} -> {}", artifact.package_id, artifact.apk.display());
//! # Ok::<(), dotapk_sdk::ApkError>(())
//! ```

pub mod android;
pub mod common;
pub mod glue;
pub mod native;
pub mod package;
pub mod sign;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use android::ApkBuilder;
pub use workspace::Workspace;
