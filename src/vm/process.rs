//! External process seam.
//!
//! Every hypervisor call goes through [`ProcessRunner`], and every host query
//! (PATH lookup, free disk space) through [`HostProbe`]. Production uses
//! [`TokioRunner`] and [`SystemHost`]; tests substitute scripted fakes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Hard deadline; the child is killed when it expires.
    pub deadline: Option<Duration>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
            env: Vec::new(),
            deadline: None,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// `program arg1 arg2 ...`, for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external programs.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture stdout/stderr.
    ///
    /// A missed deadline is reported as `io::ErrorKind::TimedOut`.
    async fn output(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput>;

    /// Run to completion, handing each stdout line to `on_line` as it arrives.
    /// The returned output holds stderr only.
    async fn stream(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> std::io::Result<ProcessOutput>;
}

/// Host facts needed by preflight.
pub trait HostProbe: Send + Sync {
    /// Absolute path of `program` if it is on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Free bytes on the filesystem containing `path`.
    fn available_space(&self, path: &Path) -> std::io::Result<u64>;
}

// ---------------------------------------------------------------------------
// Production implementations
// ---------------------------------------------------------------------------

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl TokioRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &invocation.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn output(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput> {
        debug!(command = %invocation.display(), "running");
        let run = Self::command(invocation).output();

        let output = match invocation.deadline {
            // Dropping the timed-out future drops the child, which kills it.
            Some(deadline) => tokio::time::timeout(deadline, run).await.map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("`{}` timed out after {:?}", invocation.display(), deadline),
                )
            })??,
            None => run.await?,
        };

        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn stream(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> std::io::Result<ProcessOutput> {
        debug!(command = %invocation.display(), "streaming");
        let mut cmd = Self::command(invocation);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        let mut child = cmd.spawn()?;

        // Drain stderr concurrently so a chatty child cannot block on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!(error = %e, "reading child stderr failed");
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        // Raw bytes per line: progress bars and localized messages are not always UTF-8.
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while reader.read_until(b'\n', &mut buf).await? > 0 {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']));
                buf.clear();
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!(error = %e, "stderr reader task failed");
                String::new()
            }),
            None => String::new(),
        };

        Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::new(),
            stderr,
        })
    }
}

/// Queries the real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostProbe for SystemHost {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn available_space(&self, path: &Path) -> std::io::Result<u64> {
        let canonical = std::fs::canonicalize(path)?;
        let disks = sysinfo::Disks::new_with_refreshed_list();

        // The deepest mount point containing the path is its filesystem.
        let mut best: Option<(u64, usize)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if canonical.starts_with(mount) {
                let depth = mount.components().count();
                if best.is_none_or(|(_, best_depth)| depth > best_depth) {
                    best = Some((disk.available_space(), depth));
                }
            }
        }

        best.map(|(space, _)| space).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no mounted filesystem contains {}", canonical.display()),
            )
        })
    }
}
