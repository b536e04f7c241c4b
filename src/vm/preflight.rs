//! Host prerequisites checked before any VM-creating operation.
//!
//! [`Preflight::run`] short-circuits on the first failure:
//!
//! 1. `vagrant` on `PATH`
//! 2. `VBoxManage` on `PATH`, version ≥ 7.0
//! 3. Apple Silicon with VirtualBox 7.0/7.1: warning only
//! 4. Free space on the project filesystem ≥ 5 GB (+2 GB if the box still
//!    has to be downloaded)
//!
//! Nothing here is retried; the user has to fix the host.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{PreflightError, VmResult};
use crate::vm::process::{HostProbe, Invocation, ProcessRunner};
use crate::vm::{Platform, VAGRANT};

/// Block VM creation below this much free space.
pub const DISK_MINIMUM_MB: u64 = 5120;
/// Extra space needed when the base box is not cached yet.
pub const BOX_DOWNLOAD_SURCHARGE_MB: u64 = 2048;
pub const MIN_BACKEND_MAJOR: u32 = 7;
/// Minimum minor version of 7.x considered stable on Apple Silicon.
pub const APPLE_SILICON_STABLE_MINOR: u32 = 2;

const VBOX_MANAGE: &str = "VBoxManage";

/// What a successful preflight found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub backend_version: String,
    pub available_mb: u64,
    pub required_mb: u64,
    pub box_cached: bool,
}

/// One preflight run against a host.
pub struct Preflight<'a> {
    pub host: &'a dyn HostProbe,
    pub runner: &'a dyn ProcessRunner,
    pub platform: Platform,
    pub project_root: &'a Path,
    pub box_name: &'a str,
}

impl Preflight<'_> {
    pub async fn run(&self) -> VmResult<PreflightReport> {
        if self.host.locate(VAGRANT).is_none() {
            return Err(PreflightError::HypervisorMissing.into());
        }

        let version = self.backend_version().await?;
        let (major, minor) = parse_version(&version);
        if major < MIN_BACKEND_MAJOR {
            return Err(PreflightError::BackendTooOld { version }.into());
        }

        if self.platform.is_apple_silicon() && major == MIN_BACKEND_MAJOR && minor < APPLE_SILICON_STABLE_MINOR {
            warn!(
                version = %version,
                "VirtualBox on Apple Silicon may have stability issues before 7.2; upgrade recommended"
            );
        }

        let available_mb = self.available_mb()?;
        let box_cached = self.is_box_cached().await;
        let required_mb = required_space_mb(box_cached);
        if available_mb < required_mb {
            return Err(PreflightError::InsufficientDisk {
                available_mb,
                required_mb,
            }
            .into());
        }

        info!(
            backend = %version,
            available_mb,
            required_mb,
            box_cached,
            "preflight passed"
        );
        Ok(PreflightReport {
            backend_version: version,
            available_mb,
            required_mb,
            box_cached,
        })
    }

    /// Clean VirtualBox version, e.g. `7.2.4` from `7.2.4r163906`.
    pub async fn backend_version(&self) -> Result<String, PreflightError> {
        let path = self
            .host
            .locate(VBOX_MANAGE)
            .ok_or(PreflightError::BackendMissing)?;

        let invocation = Invocation::new(path.to_string_lossy(), ["--version"]);
        let output = self
            .runner
            .output(&invocation)
            .await
            .map_err(|e| PreflightError::BackendVersion(e.to_string()))?;
        if !output.success {
            return Err(PreflightError::BackendVersion(output.stderr.trim().to_string()));
        }

        Ok(extract_version(output.stdout.trim()).to_string())
    }

    /// Free space on the project filesystem in MB.
    pub fn available_mb(&self) -> Result<u64, PreflightError> {
        self.host
            .available_space(self.project_root)
            .map(|bytes| bytes / (1024 * 1024))
            .map_err(PreflightError::DiskQuery)
    }

    /// Whether the configured box is already downloaded. A failing listing counts as "not cached".
    pub async fn is_box_cached(&self) -> bool {
        let invocation = Invocation::new(VAGRANT, ["box", "list", "--machine-readable"]);
        match self.runner.output(&invocation).await {
            Ok(output) if output.success => output.stdout.contains(self.box_name),
            Ok(output) => {
                debug!(code = ?output.code, "vagrant box list failed, assuming box not cached");
                false
            }
            Err(e) => {
                debug!(error = %e, "vagrant box list failed, assuming box not cached");
                false
            }
        }
    }
}

/// Free space needed for a VM operation.
pub fn required_space_mb(box_cached: bool) -> u64 {
    if box_cached {
        DISK_MINIMUM_MB
    } else {
        DISK_MINIMUM_MB + BOX_DOWNLOAD_SURCHARGE_MB
    }
}

/// Leading run of digits and dots of a raw version string.
pub fn extract_version(raw: &str) -> &str {
    let end = raw
        .find(|c: char| c != '.' && !c.is_ascii_digit())
        .unwrap_or(raw.len());
    &raw[..end]
}

/// `(major, minor)` of a dotted version; `(0, 0)` when the major part is unparseable.
pub fn parse_version(version: &str) -> (u32, u32) {
    let mut parts = version.split('.');
    let Some(major) = parts.next().and_then(|p| p.parse::<u32>().ok()) else {
        return (0, 0);
    };
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    (major, minor)
}
