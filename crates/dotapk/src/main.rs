//! # dotapk
//!
//! Command-line tool that packages a published .NET/Mono application tree
//! into a signed Android APK.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter dotapk.toml
//! dotapk init
//!
//! # Check the SDK/NDK environment
//! dotapk doctor
//!
//! # Build bin-arm64-v8a/bin/HelloAndroid.apk
//! dotapk build publish --abi arm64-v8a --entry-point HelloAndroid.dll \
//!     --runtime-headers /opt/mono/include/mono-2.0
//! ```
//!
//! Set `RUST_LOG` (or pass `--verbose`) to see each tool invocation.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dotapk_sdk::config::resolve;
use dotapk_sdk::{
    ApkBuilder, BuildArtifact, BuildRequest, RequestedConfig, ResolvedConfig, SystemRunner,
    ToolchainPaths,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::DotapkConfig;

mod config;

/// Packages .NET assemblies into signed Android APKs.
#[derive(Parser, Debug)]
#[command(name = "dotapk", author, version, about = "Package .NET assemblies into signed Android APKs", long_about = None)]
struct Cli {
    /// Log every tool invocation (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[arg(long, global = true, help = "Path to dotapk.toml (default: discovered upward from the current directory)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a signed APK from a directory of published assemblies.
    Build {
        #[arg(help = "Directory holding the published assemblies and native libraries")]
        source_dir: PathBuf,
        #[arg(long, help = "Target ABI (e.g. x86, x86_64, armeabi-v7a, arm64-v8a)")]
        abi: String,
        #[arg(long, help = "Entry-point assembly inside the source directory")]
        entry_point: String,
        #[arg(long, help = "Mono runtime include directory")]
        runtime_headers: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        #[arg(long, help = "Kill any tool that runs longer than this many seconds")]
        tool_timeout_secs: Option<u64>,
        #[arg(long, help = "Optional output path for a JSON build report")]
        output: Option<PathBuf>,
    },
    /// Resolve the SDK/NDK environment and report missing tools.
    Doctor {
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,
        #[arg(long, default_value = "arm64-v8a")]
        abi: String,
        #[arg(long, default_value = "App.dll", help = "Entry-point assembly; only its name is used")]
        entry_point: String,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Scaffold a starter dotapk.toml.
    Init {
        #[arg(long, default_value = config::CONFIG_FILE_NAME)]
        output: PathBuf,
    },
}

/// Explicit values that take precedence over dotapk.toml, the environment
/// and SDK discovery.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long)]
    project_name: Option<String>,
    #[arg(long, help = "Android SDK root (default: $ANDROID_SDK_ROOT)")]
    sdk_root: Option<PathBuf>,
    #[arg(long, help = "Android NDK root (default: $ANDROID_NDK_ROOT)")]
    ndk_root: Option<PathBuf>,
    #[arg(long, help = "Minimum API level (default: 21)")]
    min_api_level: Option<String>,
    #[arg(long, help = "Platform to compile against (default: highest installed)")]
    build_api_level: Option<String>,
    #[arg(long, help = "build-tools version (default: highest installed release)")]
    build_tools_version: Option<String>,
    #[arg(long, help = "Output directory (default: <source_dir>/bin-<abi>)")]
    output_dir: Option<PathBuf>,
}

impl From<Overrides> for RequestedConfig {
    fn from(o: Overrides) -> Self {
        RequestedConfig {
            project_name: o.project_name,
            sdk_root: o.sdk_root,
            ndk_root: o.ndk_root,
            min_api_level: o.min_api_level,
            build_api_level: o.build_api_level,
            build_tools_version: o.build_tools_version,
            output_dir: o.output_dir,
        }
    }
}

/// JSON report written by `build --output`.
#[derive(Debug, Serialize)]
struct BuildReport<'a> {
    #[serde(flatten)]
    artifact: &'a BuildArtifact,
    abi: &'a str,
    config: &'a ResolvedConfig,
    built_at: String,
}

fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = DotapkConfig::locate(cli.config.as_deref())?;
    if let Some((_, path)) = &file_config {
        debug!("using config file {}", path.display());
    }
    let file_config = file_config.map(|(config, _)| config).unwrap_or_default();

    match cli.command {
        Command::Build {
            source_dir,
            abi,
            entry_point,
            runtime_headers,
            overrides,
            tool_timeout_secs,
            output,
        } => {
            let request = BuildRequest::new(source_dir, abi, entry_point, runtime_headers);
            let requested = file_config.fill(overrides.into());
            let timeout = tool_timeout_secs
                .or(file_config.build.tool_timeout_secs)
                .map(Duration::from_secs);
            cmd_build(&request, requested, timeout, output.as_deref())?;
        }
        Command::Doctor {
            source_dir,
            abi,
            entry_point,
            overrides,
        } => {
            let request = BuildRequest::new(source_dir, abi, entry_point, PathBuf::new());
            cmd_doctor(&request, &file_config.fill(overrides.into()))?;
        }
        Command::Init { output } => {
            ensure_can_write(&output)?;
            fs::write(&output, DotapkConfig::generate_starter_toml())
                .with_context(|| format!("writing file {:?}", output))?;
            println!("Wrote starter config to {:?}", output);
        }
    }

    Ok(())
}

fn cmd_build(
    request: &BuildRequest,
    requested: RequestedConfig,
    timeout: Option<Duration>,
    output: Option<&Path>,
) -> Result<()> {
    let builder = ApkBuilder::new(requested).runner(SystemRunner::new().timeout(timeout));

    println!(
        "Building {} for {} from {}...",
        request.entry_point_lib,
        request.abi,
        request.source_dir.display()
    );
    let (config, tools) = builder.resolve(request)?;
    let artifact = builder.build_resolved(request, &config, &tools)?;

    println!("\n✓ Build completed successfully!");
    println!("  APK: {}", artifact.apk.display());
    println!("  Package: {}", artifact.package_id);

    if let Some(path) = output {
        let report = BuildReport {
            artifact: &artifact,
            abi: &request.abi,
            config: &config,
            built_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .context("formatting build timestamp")?,
        };
        write_json(path, &report)?;
        println!("  Report: {}", path.display());
    }

    Ok(())
}

fn cmd_doctor(request: &BuildRequest, requested: &RequestedConfig) -> Result<()> {
    let config = resolve(request, requested).context("resolving the Android environment")?;
    let tools = ToolchainPaths::from_config(&config);

    println!("Android SDK:     {}", config.sdk_root.display());
    println!("Android NDK:     {}", config.ndk_root.display());
    println!("Build-tools:     {}", config.build_tools_version);
    println!("Build API level: {}", config.build_api_level);
    println!("Min API level:   {}", config.min_api_level);
    println!("Project:         {}", config.project_name);
    println!("Output dir:      {}", config.output_dir.display());
    println!();
    for (label, path) in [
        ("dx", &tools.dx),
        ("aapt", &tools.aapt),
        ("zipalign", &tools.zipalign),
        ("apksigner", &tools.apksigner),
        ("android.jar", &tools.android_jar),
        ("cmake toolchain", &tools.cmake_toolchain),
    ] {
        println!("  {:<16} {}", label, path.display());
    }

    let missing = tools.missing_files();
    if !missing.is_empty() {
        for path in &missing {
            println!("  ✗ missing: {}", path.display());
        }
        bail!("{} required SDK/NDK file(s) are missing", missing.len());
    }

    println!("\n✓ Environment looks good");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::from_path(".env.local");
}

fn ensure_can_write(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}
