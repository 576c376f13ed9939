//! Package assembly stage: creates the unsigned APK with aapt and adds the
//! native libraries and `classes.dex` to it.

use std::path::PathBuf;

use tracing::{debug, info};

use super::common::{BuildContext, copy_file, ensure_dir, files_with_extension};
use super::glue::GlueArtifacts;
use super::native::NativeArtifacts;
use crate::types::{ApkError, Tool};

/// Output of the package assembly stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedPackage {
    /// `<out>/bin/<Project>.unaligned.apk`
    pub apk: PathBuf,
    /// Library file names added under `lib/<abi>/`, in the order they were added.
    pub native_libraries: Vec<String>,
}

/// Runs the package assembly stage.
///
/// A failure part-way leaves the partially populated APK on disk.
pub fn assemble_package(
    ctx: &BuildContext<'_>,
    native: &NativeArtifacts,
    glue: &GlueArtifacts,
) -> Result<UnsignedPackage, ApkError> {
    let out = ctx.out_dir();
    let apk_name = format!("{}.unaligned.apk", ctx.config.project_name);
    let apk_arg = ["bin", apk_name.as_str()].iter().collect::<PathBuf>();
    let apk = out.join(&apk_arg);

    info!("creating {}", apk.display());
    ctx.run(
        ctx.invocation(Tool::Aapt)
            .args(["package", "-f", "-m", "-F"])
            .arg(&apk_arg)
            .args(["-A", "assets", "-M"])
            .arg(&glue.manifest)
            .arg("-I")
            .arg(&ctx.tools.android_jar),
    )?;

    let mut libraries = vec![native.runtime_library.clone()];
    libraries.extend(files_with_extension(&ctx.request.source_dir, "so")?);

    let lib_dir = out.join("lib").join(&ctx.request.abi);
    ensure_dir(&lib_dir)?;

    let mut native_libraries = Vec::with_capacity(libraries.len());
    for library in &libraries {
        let Some(file_name) = library.file_name() else {
            continue;
        };
        let name = file_name.to_string_lossy().into_owned();
        copy_file(library, &lib_dir.join(file_name))?;

        // aapt stores the entry under the path it is given, so it must be relative.
        let entry = ["lib", ctx.request.abi.as_str(), name.as_str()]
            .iter()
            .collect::<PathBuf>();
        debug!("adding {}", entry.display());
        ctx.run(ctx.invocation(Tool::Aapt).arg("add").arg(&apk_arg).arg(&entry))?;
        native_libraries.push(name);
    }

    let dex_entry = glue.dex.strip_prefix(out).unwrap_or(&glue.dex);
    debug!("adding {}", dex_entry.display());
    ctx.run(ctx.invocation(Tool::Aapt).arg("add").arg(&apk_arg).arg(dex_entry))?;

    Ok(UnsignedPackage {
        apk,
        native_libraries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::glue::build_glue;
    use crate::builders::native::build_native;
    use crate::builders::testing::{FakeRunner, Fixture};

    #[test]
    fn creates_container_then_adds_libraries_and_dex() {
        let fx = Fixture::new();
        let prepared = fx.prepare();
        let runner = FakeRunner::new();
        let ctx = prepared.ctx(&runner);
        let native = build_native(&ctx).unwrap();
        let glue = build_glue(&ctx).unwrap();
        let before = runner.calls().len();

        let unsigned = assemble_package(&ctx, &native, &glue).unwrap();

        let out = fx.out_dir();
        assert_eq!(unsigned.apk, out.join("bin/app.unaligned.apk"));
        assert!(unsigned.apk.is_file());
        assert_eq!(unsigned.native_libraries[0], "libruntime-android.so");
        assert!(unsigned.native_libraries.contains(&"libSystem.Native.so".to_string()));
        assert_eq!(unsigned.native_libraries.len(), 2);
        assert!(out.join("lib/arm64-v8a/libruntime-android.so").is_file());
        assert!(out.join("lib/arm64-v8a/libSystem.Native.so").is_file());

        let all = runner.calls();
        let calls = &all[before..];
        assert_eq!(calls.len(), 4);
        let package = calls[0].args_lossy();
        assert_eq!(&package[..4], ["package", "-f", "-m", "-F"]);
        assert!(package.contains(&"assets".to_string()));
        assert!(package.last().unwrap().ends_with("android.jar"));
        assert_eq!(calls[1].args_lossy()[0], "add");
        assert_eq!(
            calls[1].args_lossy()[2],
            PathBuf::from("lib/arm64-v8a/libruntime-android.so").display().to_string()
        );
        assert_eq!(calls[3].args_lossy()[2], "classes.dex");
    }

    #[test]
    fn dex_entry_is_relative_to_output_dir() {
        let fx = Fixture::new();
        let prepared = fx.prepare();
        let runner = FakeRunner::new();
        let ctx = prepared.ctx(&runner);
        let native = build_native(&ctx).unwrap();
        let mut glue = build_glue(&ctx).unwrap();
        glue.dex = fx.out_dir().join("obj").join("classes.dex");
        let before = runner.calls().len();

        assemble_package(&ctx, &native, &glue).unwrap();

        let all = runner.calls();
        let last = all[before..].last().unwrap().args_lossy();
        assert_eq!(
            last[2],
            PathBuf::from("obj/classes.dex").display().to_string()
        );
    }

    #[test]
    fn add_failure_leaves_partial_container() {
        let fx = Fixture::new();
        let prepared = fx.prepare();
        let runner = FakeRunner::new();
        let ctx = prepared.ctx(&runner);
        let native = build_native(&ctx).unwrap();
        let glue = build_glue(&ctx).unwrap();

        let failing = FakeRunner::failing(Tool::Aapt);
        let err = assemble_package(&prepared.ctx(&failing), &native, &glue).unwrap_err();
        assert!(err.to_string().starts_with("package assembly failed: aapt"));
    }
}
