//! Command lines that run a host command inside the VM.
//!
//! Layout, in this order:
//!
//! ```text
//! vagrant ssh -- [-R P:localhost:P ...] [-o SendEnv=NAME ...] -t 'cd /vagrant && CMD'
//! ```
//!
//! Ports and names are deduplicated and sorted ascending so identical
//! inputs always produce identical command lines.

use std::collections::BTreeSet;

use crate::config::VmSettings;
use crate::vm::VAGRANT;

/// Guest mount point of the project directory.
pub const GUEST_PROJECT_DIR: &str = "/vagrant";

/// File watchers that need polling on VirtualBox shared folders.
pub const POLLING_ENV_VARS: &[&str] = &["CHOKIDAR_USEPOLLING", "WATCHPACK_POLLING", "TSC_WATCHFILE"];

pub const PROXY_ENV_VARS: &[&str] = &[
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
];

/// Names injected next to the caller's own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapOptions {
    /// Forward [`POLLING_ENV_VARS`].
    pub polling_watchers: bool,
    /// Proxy variable names set on the host.
    pub proxy_env: Vec<String>,
}

impl WrapOptions {
    /// Options implied by `settings`, reading the host environment through `lookup`.
    pub fn from_settings(settings: &VmSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            polling_watchers: settings.needs_polling_watchers(),
            proxy_env: if settings.forward_proxy_env {
                detect_proxy_env(lookup)
            } else {
                Vec::new()
            },
        }
    }
}

/// Proxy variables that are set and non-empty.
pub fn detect_proxy_env(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    PROXY_ENV_VARS
        .iter()
        .copied()
        .filter(|&name| lookup(name).is_some_and(|v| !v.is_empty()))
        .map(str::to_string)
        .collect()
}

/// Build the `vagrant ssh` command line for `command`.
pub fn wrap_command(command: &str, env_names: &[String], ports: &[u16], options: &WrapOptions) -> String {
    let mut parts = vec![format!("{VAGRANT} ssh --")];

    let ports: BTreeSet<u16> = ports.iter().copied().collect();
    for port in ports {
        parts.push(format!("-R {port}:localhost:{port}"));
    }

    let mut names: BTreeSet<&str> = env_names.iter().map(String::as_str).collect();
    if options.polling_watchers {
        names.extend(POLLING_ENV_VARS.iter().copied());
    }
    names.extend(options.proxy_env.iter().map(String::as_str));
    for name in names {
        parts.push(format!("-o SendEnv={name}"));
    }

    parts.push("-t".to_string());
    parts.push(shell_escape(&format!("cd {GUEST_PROJECT_DIR} && {command}")));
    parts.join(" ")
}

/// Single-quote `s` for a POSIX shell.
pub(crate) fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
