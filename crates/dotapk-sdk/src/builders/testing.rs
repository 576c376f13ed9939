//! Test support: a recording tool runner and a throwaway SDK/source layout.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;

use super::android::ApkBuilder;
use super::common::BuildContext;
use super::workspace::Workspace;
use crate::config::{NDK_ROOT_ENV, RequestedConfig, ResolvedConfig, SDK_ROOT_ENV};
use crate::runner::{ToolInvocation, ToolOutput, ToolRunner};
use crate::toolchain::ToolchainPaths;
use crate::types::{ApkError, BuildRequest, Tool};

/// Records every invocation and fabricates the files each tool would write.
#[derive(Clone, Default)]
pub struct FakeRunner {
    calls: Rc<RefCell<Vec<ToolInvocation>>>,
    fail: Option<Tool>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner on which `tool` exits with status 1.
    pub fn failing(tool: Tool) -> Self {
        Self {
            fail: Some(tool),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.borrow().clone()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.calls.borrow().iter().map(|c| c.tool).collect()
    }

    fn fabricate(inv: &ToolInvocation) -> std::io::Result<()> {
        let cwd = &inv.working_dir;
        let args = inv.args_lossy();
        match inv.tool {
            Tool::Cmake => fs::create_dir_all(cwd.join("runtime-android")),
            Tool::Make => fs::write(cwd.join("libruntime-android.so"), b"\x7fELF"),
            Tool::Javac => {
                let source = PathBuf::from(args.last().cloned().unwrap_or_default());
                let class = source.with_extension("class");
                let obj = cwd.join("obj/net/dot");
                fs::create_dir_all(&obj)?;
                fs::write(obj.join(class.file_name().unwrap_or_default()), b"\xca\xfe\xba\xbe")
            }
            Tool::Dx => fs::write(cwd.join("classes.dex"), b"dex\n035"),
            Tool::Aapt if args[0] == "package" => {
                let apk = cwd.join(&args[args.iter().position(|a| a == "-F").unwrap() + 1]);
                fs::write(apk, b"PK\x03\x04")
            }
            Tool::Aapt => append(&cwd.join(&args[1]), args[2].as_bytes()),
            Tool::Zipalign => {
                let n = args.len();
                fs::copy(cwd.join(&args[n - 2]), cwd.join(&args[n - 1])).map(|_| ())
            }
            Tool::Keytool => fs::write(cwd.join("debug.keystore"), b"keystore"),
            Tool::Apksigner => append(&cwd.join(args.last().unwrap()), b"signed"),
        }
    }
}

fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::OpenOptions::new().append(true).open(path)?.write_all(bytes)
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ApkError> {
        self.calls.borrow_mut().push(invocation.clone());
        if self.fail == Some(invocation.tool) {
            return Err(ApkError::Tool {
                stage: invocation.tool.stage(),
                tool: invocation.tool,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: format!("{} failed", invocation.tool),
            });
        }
        Self::fabricate(invocation)
            .unwrap_or_else(|e| panic!("fake {} could not write output: {}", invocation.tool, e));
        Ok(ToolOutput::default())
    }
}

/// Source tree, SDK and NDK in a temporary directory.
///
/// The SDK holds one build-tools version (`30.0.2`) and one platform
/// (`android-30`).
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let source = root.join("publish");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("app.dll"), b"MZ").unwrap();
        fs::write(source.join("libmonosgen-2.0.a"), b"!<arch>").unwrap();
        fs::write(source.join("libSystem.Native.so"), b"\x7fELF").unwrap();
        fs::write(source.join("data.json"), b"{}").unwrap();

        fs::create_dir_all(root.join("sdk/build-tools/30.0.2")).unwrap();
        fs::create_dir_all(root.join("sdk/platforms/android-30")).unwrap();
        fs::write(root.join("sdk/platforms/android-30/android.jar"), b"PK").unwrap();
        fs::create_dir_all(root.join("ndk/build/cmake")).unwrap();

        Self { dir }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join("publish")
    }

    pub fn sdk_root(&self) -> PathBuf {
        self.dir.path().join("sdk")
    }

    pub fn ndk_root(&self) -> PathBuf {
        self.dir.path().join("ndk")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.source_dir().join("bin-arm64-v8a")
    }

    pub fn add_platform(&self, name: &str) {
        let dir = self.sdk_root().join("platforms").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("android.jar"), b"PK").unwrap();
    }

    pub fn request(&self) -> BuildRequest {
        BuildRequest::new(self.source_dir(), "arm64-v8a", "app.dll", "/opt/mono/include/mono-2.0")
    }

    /// A builder whose environment points at this fixture's SDK and NDK.
    pub fn builder(&self, requested: RequestedConfig) -> ApkBuilder {
        let sdk = self.sdk_root().display().to_string();
        let ndk = self.ndk_root().display().to_string();
        ApkBuilder::new(requested).env(move |name| match name {
            SDK_ROOT_ENV => Some(sdk.clone()),
            NDK_ROOT_ENV => Some(ndk.clone()),
            _ => None,
        })
    }

    /// Resolves the default configuration and initializes the workspace, so
    /// a single stage can be run in isolation.
    pub fn prepare(&self) -> Prepared {
        let request = self.request();
        let (config, tools) = self
            .builder(RequestedConfig::default())
            .resolve(&request)
            .unwrap();
        Workspace::new(&config.output_dir)
            .initialize(&request.source_dir)
            .unwrap();
        Prepared {
            request,
            config,
            tools,
        }
    }
}

/// Owned inputs for a [`BuildContext`].
pub struct Prepared {
    pub request: BuildRequest,
    pub config: ResolvedConfig,
    pub tools: ToolchainPaths,
}

impl Prepared {
    pub fn ctx<'a>(&'a self, runner: &'a dyn ToolRunner) -> BuildContext<'a> {
        BuildContext {
            request: &self.request,
            config: &self.config,
            tools: &self.tools,
            runner,
        }
    }
}
