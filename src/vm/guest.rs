//! Guest-side collaborators.
//!
//! [`GuestFileWriter`] puts bytes at a path inside the running VM;
//! [`SandboxContent`] writes guest-visible files into the shared project tree
//! before boot. Both are injected into the [`crate::vm::Manager`] at
//! construction so tests can observe them without a VM.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use crate::error::{VmError, VmResult};
use crate::vm::VagrantCli;
use crate::vm::process::ProcessRunner;

/// Writes a file inside the guest.
#[async_trait]
pub trait GuestFileWriter: Send + Sync {
    /// `remote_path` is interpreted by the guest shell (`~` expands).
    async fn write_file(&self, remote_path: &str, content: &[u8]) -> VmResult<()>;
}

/// Writes guest files by piping base64 through `vagrant ssh -c`.
pub struct SshGuestWriter {
    runner: Arc<dyn ProcessRunner>,
    cli: VagrantCli,
}

impl SshGuestWriter {
    pub fn new(runner: Arc<dyn ProcessRunner>, cli: VagrantCli) -> Self {
        Self { runner, cli }
    }
}

/// Remote shell command that recreates `content` at `remote_path`.
///
/// Base64 keeps JSON quotes and newlines out of the shell's way.
pub fn write_file_command(remote_path: &str, content: &[u8]) -> String {
    let encoded = STANDARD.encode(content);
    format!("mkdir -p $(dirname {remote_path}) && echo '{encoded}' | base64 -d > {remote_path}")
}

#[async_trait]
impl GuestFileWriter for SshGuestWriter {
    async fn write_file(&self, remote_path: &str, content: &[u8]) -> VmResult<()> {
        let inv = self.cli.invocation(["ssh".to_string(), "-c".to_string(), write_file_command(remote_path, content)]);
        let output = self.runner.output(&inv).await.map_err(|source| VmError::Spawn {
            program: inv.program.clone(),
            source,
        })?;
        if !output.success {
            return Err(VmError::Process {
                verb: "ssh".into(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        debug!(path = remote_path, bytes = content.len(), "guest file written");
        Ok(())
    }
}

/// Guest-visible files generated into the project before boot.
pub trait SandboxContent: Send + Sync {
    fn write_into(&self, project_root: &Path) -> std::io::Result<()>;
}

/// A fixed set of files, written relative to the project root.
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    files: Vec<(PathBuf, String)>,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, relative: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((relative.into(), content.into()));
        self
    }
}

impl SandboxContent for StaticContent {
    fn write_into(&self, project_root: &Path) -> std::io::Result<()> {
        for (relative, content) in &self.files {
            let path = project_root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }
        Ok(())
    }
}

/// Host files mirrored into the guest by [`sync_host_config`].
pub fn host_config_sources(home: &Path, agent_config_dir: &Path) -> [(PathBuf, &'static str); 2] {
    [
        (agent_config_dir.join(".claude.json"), "~/.claude/.claude.json"),
        (home.join(".claude.json"), "~/.claude.json"),
    ]
}

/// Copy the host's agent configuration into the guest.
///
/// Missing host files are skipped and write failures only logged. Returns the
/// guest paths that were written.
pub async fn sync_host_config(
    writer: &dyn GuestFileWriter,
    home: &Path,
    agent_config_dir: &Path,
) -> Vec<&'static str> {
    let mut synced = Vec::new();
    for (source, target) in host_config_sources(home, agent_config_dir) {
        let content = match tokio::fs::read(&source).await {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %source.display(), error = %e, "host config not present, skipping");
                continue;
            }
        };
        match writer.write_file(target, &content).await {
            Ok(()) => synced.push(target),
            Err(e) => warn!(from = %source.display(), to = target, error = %e, "config sync failed"),
        }
    }
    info!(files = synced.len(), "host config synced into VM");
    synced
}
