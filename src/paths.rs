//! Filesystem layout for sandbox-vm.
//!
//! Per project (everything VM-related lives beside the project):
//!
//! - Descriptor:     `<project>/Vagrantfile`
//! - VM metadata:    `<project>/.vagrant/`
//! - Drift hash:     `<project>/.vagrant/sandbox-vm-config.sha256`
//! - Session record: `<project>/.vagrant/sandbox-vm.lock`
//! - Session dotfiles: `<project>/.vagrant-<session-id>/`
//!
//! Per user (XDG-style, also on macOS so the TOML file is easy to find):
//!
//! - Config: `~/.config/sandbox-vm/config.toml`
//! - Logs:   `~/Library/Logs/sandbox-vm/` on macOS, `~/.local/share/sandbox-vm/logs/` elsewhere

use std::path::{Path, PathBuf};

const APP_NAME: &str = "sandbox-vm";

pub const DESCRIPTOR_FILE: &str = "Vagrantfile";
pub const METADATA_DIR: &str = ".vagrant";
pub const CONFIG_HASH_FILE: &str = "sandbox-vm-config.sha256";
pub const SESSION_LOCK_FILE: &str = "sandbox-vm.lock";

/// Resolved locations of a project's VM files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub descriptor: PathBuf,
    pub metadata: PathBuf,
    pub config_hash: PathBuf,
    pub session_lock: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let metadata = root.join(METADATA_DIR);
        Self {
            descriptor: root.join(DESCRIPTOR_FILE),
            config_hash: metadata.join(CONFIG_HASH_FILE),
            session_lock: metadata.join(SESSION_LOCK_FILE),
            metadata,
            root,
        }
    }

    /// Per-session hypervisor metadata directory (`VAGRANT_DOTFILE_PATH`).
    ///
    /// Anything outside `[A-Za-z0-9_-]` in the id becomes `_`, so the
    /// directory always sits directly under the project root.
    pub fn dotfile_for(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{METADATA_DIR}-{safe}"))
    }

    /// Base name of the project directory, used for the guest hostname.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// User directories
// ---------------------------------------------------------------------------

/// `~/.config/sandbox-vm/`, honouring `$XDG_CONFIG_HOME`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    home_dir().join(".config").join(APP_NAME)
}

/// Default settings file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(target_os = "macos")]
pub fn log_dir() -> PathBuf {
    home_dir().join("Library").join("Logs").join(APP_NAME)
}

#[cfg(not(target_os = "macos"))]
pub fn log_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join(APP_NAME).join("logs")
    } else {
        home_dir().join(".local").join("share").join(APP_NAME).join("logs")
    }
}

/// The user's home directory, falling back to `/tmp` if `$HOME` is unset.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Directory holding the coding agent's global config (`$CLAUDE_CONFIG_DIR` or `~/.claude`).
pub fn agent_config_dir(home: &Path) -> PathBuf {
    std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home.join(".claude"))
}
