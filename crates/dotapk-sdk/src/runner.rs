//! External process execution.
//!
//! Every tool the pipeline drives goes through a [`ToolRunner`]. The
//! production implementation, [`SystemRunner`], spawns the process, captures
//! stdout and stderr, and turns a nonzero exit into an [`ApkError::Tool`]
//! carrying the captured output. Tests substitute a fake runner that
//! records invocations and fabricates the files a tool would produce.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use wait_timeout::ChildExt;

use crate::types::{ApkError, Tool};

/// How long a timed-out tool's pipes may take to close after the kill.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl ToolInvocation {
    pub fn new(tool: Tool, program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Renders the invocation as a shell-like line for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Arguments as UTF-8 strings (lossy).
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);
        cmd
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools on behalf of the pipeline.
pub trait ToolRunner {
    /// Runs `invocation` to completion.
    ///
    /// Returns an error if the process cannot be started, exits with a
    /// nonzero status, or exceeds the runner's timeout.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ApkError>;
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills any tool that runs longer than `timeout`. `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ApkError> {
        debug!(
            tool = %invocation.tool,
            cwd = %invocation.working_dir.display(),
            "running {}",
            invocation.display_line()
        );

        let spawn_error = |source: std::io::Error| ApkError::ToolSpawn {
            stage: invocation.tool.stage(),
            tool: invocation.tool,
            program: invocation.program.display().to_string(),
            source,
        };

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Drain both pipes on their own threads so a chatty tool cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(spawn_error)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // A grandchild may still hold the pipes open.
                    return Err(ApkError::Timeout {
                        stage: invocation.tool.stage(),
                        tool: invocation.tool,
                        seconds: limit.as_secs(),
                        stdout: collect_within(stdout, DRAIN_GRACE),
                        stderr: collect_within(stderr, DRAIN_GRACE),
                    });
                }
            },
            None => child.wait().map_err(spawn_error)?,
        };

        let output = ToolOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if !status.success() {
            return Err(ApkError::Tool {
                stage: invocation.tool.stage(),
                tool: invocation.tool,
                status: status.to_string(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Like [`collect`], but gives up with an empty string after `grace`.
fn collect_within(handle: Option<thread::JoinHandle<Vec<u8>>>, grace: Duration) -> String {
    let deadline = Instant::now() + grace;
    match handle {
        Some(h) => {
            while !h.is_finished() {
                if Instant::now() >= deadline {
                    return String::new();
                }
                thread::sleep(Duration::from_millis(10));
            }
            collect(Some(h))
        }
        None => String::new(),
    }
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
