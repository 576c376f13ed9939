//! Managed glue stage: writes the Java launcher and runtime bootstrap plus the
//! manifest, compiles them against the platform jar and converts the classes
//! to `classes.dex`.

use std::path::PathBuf;

use tracing::info;

use super::common::{BuildContext, ensure_dir};
use crate::templates::{Template, TemplateVar};
use crate::types::{ApkError, Tool, package_id};

/// Java package directory (`net/dot`) under `<out>/src`.
const JAVA_PACKAGE_DIR: [&str; 2] = ["net", "dot"];
/// Dex file produced by the stage, relative to the output directory.
pub const DEX_FILE: &str = "classes.dex";

/// Output of the managed glue stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueArtifacts {
    pub manifest: PathBuf,
    pub dex: PathBuf,
    pub package_id: String,
}

/// Runs the managed glue stage.
pub fn build_glue(ctx: &BuildContext<'_>) -> Result<GlueArtifacts, ApkError> {
    let out = ctx.out_dir();
    let java_dir = JAVA_PACKAGE_DIR
        .iter()
        .fold(out.join("src"), |dir, part| dir.join(part));
    ensure_dir(&java_dir)?;

    let package_id = package_id(&ctx.config.project_name);

    let sources = [
        Template::MainActivity.write_to(&java_dir, &[])?,
        Template::MonoRunner.write_to(&java_dir, &[])?,
    ];
    let manifest = Template::Manifest.write_to(
        out,
        &[
            TemplateVar::new("PACKAGE_NAME", package_id.clone()),
            TemplateVar::new("MIN_SDK_LEVEL", ctx.config.min_api_level.clone()),
        ],
    )?;

    let android_jar = &ctx.tools.android_jar;
    for source in &sources {
        info!(api_level = %ctx.config.build_api_level, "compiling {}", source.display());
        ctx.run(
            ctx.invocation(Tool::Javac)
                .args(["-d", "obj", "-classpath", "src", "-bootclasspath"])
                .arg(android_jar)
                .args(["-source", "1.8", "-target", "1.8"])
                .arg(source),
        )
        .map_err(|e| with_api_level(e, &ctx.config.build_api_level))?;
    }

    info!("converting classes to {}", DEX_FILE);
    ctx.run(
        ctx.invocation(Tool::Dx)
            .arg("--dex")
            .arg(format!("--output={}", DEX_FILE))
            .arg("obj"),
    )?;

    Ok(GlueArtifacts {
        manifest,
        dex: out.join(DEX_FILE),
        package_id,
    })
}

fn with_api_level(err: ApkError, api_level: &str) -> ApkError {
    match err {
        ApkError::Tool {
            stage,
            tool,
            status,
            stdout,
            stderr,
        } => ApkError::Tool {
            stage,
            tool,
            status: format!("{} (boot classpath: API level {})", status, api_level),
            stdout,
            stderr,
        },
        other => other,
    }
}
