//! Vagrantfile generation.
//!
//! [`ensure_descriptor`] never touches an existing Vagrantfile. Otherwise it
//! copies the user's own file when one is configured and only falls back to
//! rendering the built-in template.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::config::{DEFAULT_BOX, DEFAULT_CPUS, DEFAULT_MEMORY_MB, DEFAULT_SYNCED_FOLDER, VmSettings};
use crate::error::{VmError, VmResult};
use crate::paths::ProjectPaths;
use crate::vm::Platform;
use crate::vm::boot_phase::AGENT_NPM_PACKAGE;

/// Packages every sandbox gets unless explicitly excluded.
pub const BASE_PACKAGES: &[&str] = &["docker.io", "nodejs", "npm", "git", "unzip", "curl", "build-essential"];

pub const HOSTNAME_PREFIX: &str = "agentdeck-";
/// RFC 1123 label limit.
pub const MAX_HOSTNAME_LEN: usize = 63;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// What [`ensure_descriptor`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorOutcome {
    /// A Vagrantfile was already present.
    Existing,
    /// The configured Vagrantfile was copied in.
    Copied,
    /// The built-in template was rendered.
    Generated,
}

/// Base packages minus exclusions plus additions, deduplicated and sorted.
pub fn resolved_packages(settings: &VmSettings) -> Vec<String> {
    let excluded: BTreeSet<&str> = settings.provision_pkg_exclude.iter().map(String::as_str).collect();
    BASE_PACKAGES
        .iter()
        .copied()
        .filter(|pkg| !excluded.contains(pkg))
        .chain(settings.provision_packages.iter().map(String::as_str))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Guest hostname derived from the project directory name.
pub fn sanitize_hostname(project_name: &str) -> String {
    let lower = project_name.to_lowercase();
    let collapsed = NON_ALNUM.replace_all(&lower, "-");
    let mut hostname = format!("{HOSTNAME_PREFIX}{}", collapsed.trim_matches('-'));
    hostname.truncate(MAX_HOSTNAME_LEN);
    hostname.trim_end_matches('-').to_string()
}

/// Render the Vagrantfile for `settings`.
pub fn render_vagrantfile(settings: &VmSettings, hostname: &str, platform: Platform) -> String {
    let box_name = non_empty(&settings.box_name, DEFAULT_BOX);
    let synced = non_empty(&settings.synced_folder_type, DEFAULT_SYNCED_FOLDER);
    let memory = if settings.memory_mb == 0 { DEFAULT_MEMORY_MB } else { settings.memory_mb };
    let cpus = if settings.cpus == 0 { DEFAULT_CPUS } else { settings.cpus };

    let mut out = String::new();
    let _ = writeln!(out, "Vagrant.configure(\"2\") do |config|");
    let _ = writeln!(out, "  config.vm.box = {}", quote(box_name));
    let _ = writeln!(out, "  config.vm.hostname = {}", quote(hostname));
    let _ = writeln!(out, "  config.vm.synced_folder \".\", \"/vagrant\", type: {}", quote(synced));
    let _ = writeln!(out, "  config.ssh.forward_agent = true");
    out.push('\n');

    for pf in &settings.port_forwards {
        let _ = writeln!(
            out,
            "  config.vm.network \"forwarded_port\", guest: {}, host: {}, protocol: {}, auto_correct: true",
            pf.guest,
            pf.host,
            quote(pf.protocol.as_str())
        );
    }
    if !settings.port_forwards.is_empty() {
        out.push('\n');
    }

    let _ = writeln!(out, "  config.vm.provider \"virtualbox\" do |vb|");
    let _ = writeln!(out, "    vb.memory = \"{memory}\"");
    let _ = writeln!(out, "    vb.cpus = {cpus}");
    let _ = writeln!(out, "    vb.gui = false");
    let _ = writeln!(out, "    vb.customize [\"modifyvm\", :id, \"--audio\", \"none\"]");
    let _ = writeln!(out, "    vb.customize [\"modifyvm\", :id, \"--usb\", \"off\"]");
    // VirtualBox on arm64 has no nested virtualisation.
    if !platform.is_arm64() {
        let _ = writeln!(out, "    vb.customize [\"modifyvm\", :id, \"--nested-hw-virt\", \"on\"]");
    }
    let _ = writeln!(out, "  end");
    out.push('\n');

    let _ = writeln!(out, "  config.vm.provision \"shell\", inline: <<-SHELL");
    let _ = writeln!(out, "    export DEBIAN_FRONTEND=noninteractive");
    let _ = writeln!(out, "    apt-get update");
    let _ = writeln!(out, "    apt-get install -y {}", resolved_packages(settings).join(" "));
    let _ = writeln!(out, "    npm install -g {AGENT_NPM_PACKAGE} --no-audit");
    if !settings.npm_packages.is_empty() {
        let _ = writeln!(out, "    npm install -g {} --no-audit", settings.npm_packages.join(" "));
    }
    let _ = writeln!(out, "    usermod -aG docker vagrant");
    let _ = writeln!(out, "    chown -R vagrant:vagrant /vagrant");
    let _ = writeln!(out, "    echo \"AcceptEnv *\" >> /etc/ssh/sshd_config");
    let _ = writeln!(out, "    systemctl restart sshd");
    let _ = writeln!(out, "  SHELL");

    if let Some(script) = &settings.provision_script {
        out.push('\n');
        let _ = writeln!(
            out,
            "  config.vm.provision \"shell\", path: {}",
            quote(&script.to_string_lossy())
        );
    }

    let _ = writeln!(out, "end");
    out
}

/// Make sure the project has a Vagrantfile.
pub fn ensure_descriptor(paths: &ProjectPaths, settings: &VmSettings, platform: Platform) -> VmResult<DescriptorOutcome> {
    if paths.descriptor.exists() {
        return Ok(DescriptorOutcome::Existing);
    }

    if let Some(custom) = &settings.vagrantfile {
        let content =
            std::fs::read(custom).map_err(|e| VmError::persistence("read custom Vagrantfile", custom, e))?;
        std::fs::write(&paths.descriptor, content)
            .map_err(|e| VmError::persistence("write Vagrantfile", &paths.descriptor, e))?;
        info!(from = %custom.display(), to = %paths.descriptor.display(), "custom Vagrantfile copied");
        return Ok(DescriptorOutcome::Copied);
    }

    let hostname = sanitize_hostname(&paths.project_name());
    let content = render_vagrantfile(settings, &hostname, platform);
    std::fs::write(&paths.descriptor, content)
        .map_err(|e| VmError::persistence("write Vagrantfile", &paths.descriptor, e))?;
    info!(path = %paths.descriptor.display(), hostname = %hostname, "Vagrantfile generated");
    Ok(DescriptorOutcome::Generated)
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Double-quoted Ruby string literal.
fn quote(s: &str) -> String {
    format!("{s:?}")
}
