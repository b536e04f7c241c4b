//! VM settings for the sandbox.
//!
//! `VmSettings` is the immutable configuration handed to a [`crate::vm::Manager`].
//! It deserialises from the `[vagrant]` table of a TOML file; every field has a
//! default so a missing file or a partial table is valid.
//!
//! ```toml
//! [vagrant]
//! memory_mb = 8192
//! cpus = 4
//! provision_packages = ["vim", "htop"]
//! port_forwards = [{ guest = 3000, host = 3000 }]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BOX: &str = "bento/ubuntu-24.04";
pub const DEFAULT_MEMORY_MB: u32 = 4096;
pub const DEFAULT_CPUS: u32 = 2;
pub const DEFAULT_SYNCED_FOLDER: &str = "virtualbox";

/// Transport protocol for a forwarded port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guest → host port forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortForward {
    pub guest: u16,
    pub host: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

impl PortForward {
    pub fn tcp(guest: u16, host: u16) -> Self {
        Self {
            guest,
            host,
            protocol: Protocol::Tcp,
        }
    }
}

impl fmt::Display for PortForward {
    /// Renders as `guest:host:protocol`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.guest, self.host, self.protocol)
    }
}

/// Configuration of the sandbox VM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSettings {
    pub memory_mb: u32,
    pub cpus: u32,
    #[serde(rename = "box")]
    pub box_name: String,
    /// Shared-folder transport (`virtualbox`, `nfs`, `rsync`, ...).
    pub synced_folder_type: String,
    /// Packages added on top of the base set.
    pub provision_packages: Vec<String>,
    /// Base packages to leave out.
    #[serde(rename = "provision_packages_exclude")]
    pub provision_pkg_exclude: Vec<String>,
    /// Extra global npm packages (tools) installed after the coding agent.
    pub npm_packages: Vec<String>,
    /// Host path to an extra shell provisioner.
    pub provision_script: Option<PathBuf>,
    /// Host path to a complete Vagrantfile that replaces the generated one.
    pub vagrantfile: Option<PathBuf>,
    pub port_forwards: Vec<PortForward>,
    /// Variables exported into sessions; only their names are forwarded over SSH.
    pub env: BTreeMap<String, String>,
    pub forward_proxy_env: bool,
    /// Seconds between background health checks run by the UI.
    pub health_check_interval: u64,
    pub auto_suspend: bool,
    pub auto_destroy: bool,
}

impl Default for VmSettings {
    fn default() -> Self {
        Self {
            memory_mb: DEFAULT_MEMORY_MB,
            cpus: DEFAULT_CPUS,
            box_name: DEFAULT_BOX.to_string(),
            synced_folder_type: DEFAULT_SYNCED_FOLDER.to_string(),
            provision_packages: Vec::new(),
            provision_pkg_exclude: Vec::new(),
            npm_packages: Vec::new(),
            provision_script: None,
            vagrantfile: None,
            port_forwards: Vec::new(),
            env: BTreeMap::new(),
            forward_proxy_env: true,
            health_check_interval: 30,
            auto_suspend: true,
            auto_destroy: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    vagrant: VmSettings,
}

impl VmSettings {
    /// Parse settings from the `[vagrant]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("parse [vagrant] settings")?;
        Ok(file.vagrant)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("read config file {}", path.display())),
        }
    }

    /// Whether the shared-folder transport breaks inotify in the guest.
    pub fn needs_polling_watchers(&self) -> bool {
        self.synced_folder_type == "virtualbox"
    }
}
