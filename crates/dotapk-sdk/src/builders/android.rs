//! Android APK build pipeline
//!
//! [`ApkBuilder`] runs every stage in order and returns a [`BuildArtifact`]
//! only when the APK has been aligned and signed:
//!
//! 1. Validate the request
//! 2. Resolve SDK/NDK, build-tools and API levels
//! 3. Create the output tree and stage assets
//! 4. Build `libruntime-android.so` (cmake + make)
//! 5. Compile the Java glue (javac + dx)
//! 6. Assemble the unsigned APK (aapt)
//! 7. Align (zipalign) and sign (keytool + apksigner)

use tracing::info;

use super::common::{BuildContext, validate_request};
use super::glue::build_glue;
use super::native::build_native;
use super::package::assemble_package;
use super::sign::align_and_sign;
use super::workspace::Workspace;
use crate::config::{RequestedConfig, ResolvedConfig, resolve_with_env};
use crate::runner::{SystemRunner, ToolRunner};
use crate::toolchain::ToolchainPaths;
use crate::types::{ApkError, BuildArtifact, BuildRequest};

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Android builder that handles the complete APK pipeline
pub struct ApkBuilder {
    /// Caller-supplied configuration, resolved once per build
    requested: RequestedConfig,
    /// Runs the external tools
    runner: Box<dyn ToolRunner>,
    /// Environment variable lookup
    env: EnvLookup,
}

impl ApkBuilder {
    /// Creates a builder that runs real tools and reads the process environment.
    pub fn new(requested: RequestedConfig) -> Self {
        Self {
            requested,
            runner: Box::new(SystemRunner::new()),
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replaces the tool runner.
    pub fn runner(mut self, runner: impl ToolRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Replaces the environment lookup used for `ANDROID_SDK_ROOT` / `ANDROID_NDK_ROOT`.
    pub fn env(mut self, env: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Validates `request` and resolves the configuration without running any tool.
    pub fn resolve(&self, request: &BuildRequest) -> Result<(ResolvedConfig, ToolchainPaths), ApkError> {
        validate_request(request)?;
        let config = resolve_with_env(request, &self.requested, &self.env)?;
        let tools = ToolchainPaths::from_config(&config);
        tools.require_platform(&config.build_api_level)?;
        Ok((config, tools))
    }

    /// Builds a signed APK for `request`.
    ///
    /// # Returns
    ///
    /// * `Ok(BuildArtifact)` with the signed APK path and the package id
    /// * `Err(ApkError)` naming the stage and condition that failed; the
    ///   output directory is left as-is for inspection
    pub fn build(&self, request: &BuildRequest) -> Result<BuildArtifact, ApkError> {
        let (config, tools) = self.resolve(request)?;
        self.build_resolved(request, &config, &tools)
    }

    /// Runs the pipeline against a configuration from [`ApkBuilder::resolve`].
    ///
    /// Lets a caller report exactly the configuration that was built.
    pub fn build_resolved(
        &self,
        request: &BuildRequest,
        config: &ResolvedConfig,
        tools: &ToolchainPaths,
    ) -> Result<BuildArtifact, ApkError> {
        info!(
            project = %config.project_name,
            abi = %request.abi,
            build_tools = %config.build_tools_version,
            api_level = %config.build_api_level,
            min_api_level = %config.min_api_level,
            "resolved build configuration"
        );

        let workspace = Workspace::new(&config.output_dir);
        workspace.initialize(&request.source_dir)?;

        let ctx = BuildContext {
            request,
            config,
            tools,
            runner: self.runner.as_ref(),
        };

        let native = build_native(&ctx)?;
        let glue = build_glue(&ctx)?;
        let unsigned = assemble_package(&ctx, &native, &glue)?;
        let apk = align_and_sign(&ctx, &unsigned)?;

        info!("built {} ({})", apk.display(), glue.package_id);
        Ok(BuildArtifact {
            apk,
            package_id: glue.package_id,
        })
    }
}
