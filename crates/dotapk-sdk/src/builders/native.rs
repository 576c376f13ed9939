//! Native build stage: renders the CMake project and JNI shim, then builds
//! `libruntime-android.so` with the NDK toolchain.

use std::path::{Path, PathBuf};

use tracing::info;

use super::common::BuildContext;
use crate::templates::{Template, TemplateVar};
use crate::types::{ApkError, Tool};

/// Static runtime archive that must ship in the source directory.
/// Linked into `libruntime-android.so`.
pub const RUNTIME_ARCHIVE: &str = "libmonosgen-2.0.a";
/// CMake build subdirectory inside the output directory.
pub const NATIVE_BUILD_DIR: &str = "runtime-android";
/// Shared library produced by the native build.
pub const RUNTIME_LIBRARY: &str = "libruntime-android.so";

/// Output of the native build stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArtifacts {
    /// `<out>/runtime-android/libruntime-android.so`
    pub runtime_library: PathBuf,
}

/// Runs the native build stage.
pub fn build_native(ctx: &BuildContext<'_>) -> Result<NativeArtifacts, ApkError> {
    // Presence is checked by `validate_request`.
    let runtime_archive = ctx.request.source_dir.join(RUNTIME_ARCHIVE);

    let out = ctx.out_dir();
    Template::CMakeLists.write_to(
        out,
        &[
            TemplateVar::new("RUNTIME_INCLUDE", path_arg(&ctx.request.runtime_headers)),
            TemplateVar::new("RUNTIME_ARCHIVE", path_arg(&runtime_archive)),
        ],
    )?;

    let entry_point_name = Path::new(&ctx.request.entry_point_lib)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ctx.request.entry_point_lib.clone());
    Template::RuntimeShim.write_to(out, &[TemplateVar::new("ENTRY_POINT_LIB", entry_point_name)])?;

    info!(abi = %ctx.request.abi, "configuring native runtime with cmake");
    ctx.run(
        ctx.invocation(Tool::Cmake)
            .arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", ctx.tools.cmake_toolchain.display()))
            .arg(format!("-DANDROID_ABI={}", ctx.request.abi))
            .arg("-DANDROID_STL=none")
            .arg(format!("-DANDROID_NATIVE_API_LEVEL={}", ctx.config.min_api_level))
            .args(["-B", NATIVE_BUILD_DIR]),
    )?;

    let build_dir = out.join(NATIVE_BUILD_DIR);
    info!("building {}", RUNTIME_LIBRARY);
    let mut make = ctx.invocation(Tool::Make);
    make.working_dir = build_dir.clone();
    ctx.run(make)?;

    let runtime_library = build_dir.join(RUNTIME_LIBRARY);
    if !runtime_library.is_file() {
        return Err(ApkError::Filesystem(format!(
            "make succeeded but {} was not produced",
            runtime_library.display()
        )));
    }

    Ok(NativeArtifacts { runtime_library })
}

// CMake wants forward slashes even on Windows.
fn path_arg(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
