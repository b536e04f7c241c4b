//! Vagrant VM management for the coding-agent sandbox.
//!
//! Boots, suspends, resumes, reloads, provisions, health-checks and destroys
//! the per-project VM; detects configuration drift; reference-counts the
//! sessions sharing the VM; and wraps commands so they run inside it.
//!
//! ```text
//! Manager
//!     ├─► preflight      (tool presence, VirtualBox version, disk space)
//!     ├─► descriptor     (Vagrantfile, first boot only)
//!     ├─► process        (vagrant CLI via ProcessRunner)
//!     │       └─► boot_phase  (streamed `up` output → BootPhase callback)
//!     ├─► health         (status + SSH liveness probe, 30 s cache)
//!     ├─► drift          (sha256 of provisioning inputs)
//!     ├─► sessions       (JSON lock record of sharing sessions)
//!     └─► wrap           (`vagrant ssh --` command lines)
//! ```

pub mod boot_phase;
pub mod descriptor;
pub mod drift;
pub mod guest;
pub mod health;
pub mod manager;
pub mod preflight;
pub mod process;
pub mod sessions;
pub mod wrap;

use std::path::PathBuf;

use process::Invocation;

// ---------------------------------------------------------------------------
// Shared types used across submodules
// ---------------------------------------------------------------------------

/// Name of the hypervisor CLI.
pub const VAGRANT: &str = "vagrant";

/// Host operating system and CPU architecture.
///
/// Carried as a value so platform-specific rules can be tested anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub const fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// The platform this binary was compiled for.
    pub const fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn is_apple_silicon(&self) -> bool {
        self.os == "macos" && self.arch == "aarch64"
    }

    pub fn is_arm64(&self) -> bool {
        self.arch == "aarch64"
    }
}

/// Environment variable that relocates vagrant's per-machine metadata.
pub const DOTFILE_ENV: &str = "VAGRANT_DOTFILE_PATH";

/// How to invoke vagrant for one project (and optionally one session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VagrantCli {
    pub project_root: PathBuf,
    /// Session-specific metadata directory, if any.
    pub dotfile: Option<PathBuf>,
}

impl VagrantCli {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            dotfile: None,
        }
    }

    /// `vagrant ARGS` in the project directory.
    pub fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inv = Invocation::new(VAGRANT, args).current_dir(&self.project_root);
        match &self.dotfile {
            Some(dotfile) => inv.env(DOTFILE_ENV, dotfile.to_string_lossy()),
            None => inv,
        }
    }
}

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use boot_phase::{BootPhase, parse_boot_phase};
pub use health::{VmHealth, VmState};
pub use manager::{Manager, ManagerBuilder, VmProvider};
pub use sessions::Departure;
