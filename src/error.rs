//! Error taxonomy for VM lifecycle operations.
//!
//! Errors are grouped by what the user has to do about them:
//! - [`PreflightError`]: a prerequisite is missing on the host (user installs or frees space)
//! - [`VmError::Spawn`] / [`VmError::Process`] / [`VmError::DriverApproval`]: the hypervisor failed
//! - [`VmError::Persistence`]: metadata under the project could not be written
//!
//! Soft conditions (missing drift hash, unreadable provision script, an
//! unresponsive guest) are not errors; they show up in returned data.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type VmResult<T> = Result<T, VmError>;

/// Errors returned by lifecycle, health, drift and session operations.
#[derive(Debug, Error)]
pub enum VmError {
    /// A host prerequisite is missing. Never retried automatically.
    #[error("preflight: {0}")]
    Preflight(#[from] PreflightError),

    /// The external program could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The hypervisor ran but exited non-zero.
    #[error("vagrant {verb} failed (exit {}): {}", exit_label(.code), .stderr.trim())]
    Process {
        verb: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Boot failed on Apple Silicon with a known kernel-driver signature.
    #[error(
        "VirtualBox requires approval in System Settings → Privacy & Security. \
         Approve the VirtualBox kernel extension, then retry. Original error: {source}"
    )]
    DriverApproval {
        #[source]
        source: Box<VmError>,
    },

    /// Project metadata (hash, lock record, descriptor, guest content) could not be written or read.
    #[error("failed to {action} {}: {source}", .path.display())]
    Persistence {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `vagrant status --machine-readable` produced no `state` record.
    #[error("could not parse vagrant state from output: {output}")]
    StatusParse { output: String },

    /// The session lock record could not be serialised.
    #[error("encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl VmError {
    /// `true` when the failure is a missing prerequisite rather than a VM failure.
    pub fn is_preflight(&self) -> bool {
        matches!(self, VmError::Preflight(_))
    }

    /// `true` when the hypervisor process itself failed.
    pub fn is_process(&self) -> bool {
        matches!(
            self,
            VmError::Spawn { .. } | VmError::Process { .. } | VmError::DriverApproval { .. }
        )
    }

    pub(crate) fn persistence(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        VmError::Persistence {
            action,
            path: path.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Missing or unsupported host prerequisites, each with a remediation hint.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Vagrant not found. Install from https://www.vagrantup.com/downloads")]
    HypervisorMissing,

    #[error("VirtualBox not found. Install from https://www.virtualbox.org/wiki/Downloads")]
    BackendMissing,

    #[error("failed to get VirtualBox version: {0}")]
    BackendVersion(String),

    #[error(
        "VirtualBox {version} is too old. Version 7.0+ required (7.2+ recommended for Apple Silicon)"
    )]
    BackendTooOld { version: String },

    #[error("failed to check disk space: {0}")]
    DiskQuery(#[source] io::Error),

    #[error(
        "insufficient disk space: {available_mb}MB available, {required_mb}MB required. \
         Free up space or reduce vagrant.memory_mb"
    )]
    InsufficientDisk { available_mb: u64, required_mb: u64 },
}
