//! Boot progress from `vagrant up --machine-readable` output.
//!
//! [`parse_boot_phase`] is a stateless line classifier; the caller feeds it
//! every stdout line and forwards matches to its progress callback.

use std::fmt;

use crate::error::VmError;
use crate::vm::Platform;

/// Package whose global install marks the tool-install phase.
pub const AGENT_NPM_PACKAGE: &str = "@anthropic-ai/claude-code";

/// Phase of a VM boot, in the order they normally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootPhase {
    Downloading,
    Importing,
    Booting,
    Network,
    Mounting,
    Provisioning,
    InstallingTools,
    Ready,
}

impl BootPhase {
    /// User-facing progress label.
    pub fn label(self) -> &'static str {
        match self {
            BootPhase::Downloading => "Downloading base box...",
            BootPhase::Importing => "Importing base box...",
            BootPhase::Booting => "Booting VM...",
            BootPhase::Network => "Configuring network...",
            BootPhase::Mounting => "Mounting shared folders...",
            BootPhase::Provisioning => "Provisioning (installing packages)...",
            BootPhase::InstallingTools => "Installing Claude Code & MCP tools...",
            BootPhase::Ready => "VM ready, starting Claude...",
        }
    }
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify one line of hypervisor output. Unmatched lines return `None`.
///
/// The tool-install marker is checked before the generic booting markers:
/// provisioner output echoes the whole inline script, which can contain them.
pub fn parse_boot_phase(line: &str) -> Option<BootPhase> {
    if line.contains("Downloading") {
        return Some(BootPhase::Downloading);
    }
    if line.contains("Importing") {
        return Some(BootPhase::Importing);
    }
    if line.contains(&format!("npm install -g {AGENT_NPM_PACKAGE}")) {
        return Some(BootPhase::InstallingTools);
    }
    if line.contains("Booting") || line.contains("action,up,start") {
        return Some(BootPhase::Booting);
    }
    if line.contains("action,up,configure_networks") {
        return Some(BootPhase::Network);
    }
    if line.contains("action,up,share_folders") || line.contains("action,up,sync_folders") {
        return Some(BootPhase::Mounting);
    }
    if line.contains("action,up,provision") {
        return Some(BootPhase::Provisioning);
    }
    if line.contains("action,up,complete") {
        return Some(BootPhase::Ready);
    }
    None
}

const DRIVER_APPROVAL_MARKERS: &[&str] = &["kernel driver", "vboxdrv", "NS_ERROR_FAILURE"];

/// Give a boot failure a friendlier diagnosis where one is known.
///
/// Only Apple Silicon hosts are re-diagnosed; everything else is returned unchanged.
pub fn diagnose_up_failure(platform: Platform, err: VmError, stderr: &str) -> VmError {
    if !platform.is_apple_silicon() {
        return err;
    }
    if DRIVER_APPROVAL_MARKERS.iter().any(|m| stderr.contains(m)) {
        return VmError::DriverApproval {
            source: Box::new(err),
        };
    }
    err
}
