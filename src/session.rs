//! One coding-agent session running in the shared sandbox VM.
//!
//! The session receives its [`VmProvider`] at construction; it never looks
//! one up. Several sessions may hold the same provider: the provider's
//! session registry decides which of them is the last one out.

use std::sync::Arc;

use tracing::info;

use crate::config::VmSettings;
use crate::error::VmResult;
use crate::vm::{BootPhase, Departure, VmHealth, VmProvider};

/// What [`SandboxSession::start`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// Provisioning inputs had changed, so the VM was re-provisioned.
    pub drifted: bool,
    pub health: VmHealth,
}

/// What [`SandboxSession::stop`] did to the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Other sessions still use the VM; it was left alone.
    Shared { remaining: usize },
    Suspended,
    Destroyed,
    /// Last session out, but neither auto-policy is enabled.
    LeftRunning,
}

pub struct SandboxSession {
    id: String,
    vm: Arc<dyn VmProvider>,
    env_names: Vec<String>,
    auto_suspend: bool,
    auto_destroy: bool,
}

impl SandboxSession {
    pub fn new(id: impl Into<String>, vm: Arc<dyn VmProvider>, settings: &VmSettings) -> Self {
        Self {
            id: id.into(),
            vm,
            env_names: settings.env.keys().cloned().collect(),
            auto_suspend: settings.auto_suspend,
            auto_destroy: settings.auto_destroy,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vm(&self) -> &Arc<dyn VmProvider> {
        &self.vm
    }

    /// Bring the VM up for this session and join it.
    ///
    /// Preflight, descriptor and sandbox content come first; drift triggers a
    /// re-provision after boot, and the hash is rewritten either way.
    pub async fn start(&self, on_phase: &mut (dyn FnMut(BootPhase) + Send)) -> VmResult<StartReport> {
        self.vm.preflight().await?;
        self.vm.ensure_descriptor()?;
        self.vm.ensure_sandbox_content()?;

        let drifted = self.vm.has_drift();
        self.vm.boot(on_phase).await?;
        if drifted {
            info!(session = %self.id, "configuration drifted, re-provisioning");
            self.vm.provision().await?;
        }
        self.vm.write_config_hash()?;

        self.vm.register_session(&self.id)?;
        let health = self.vm.health_check().await?;
        info!(
            session = %self.id,
            sessions = self.vm.session_count(),
            healthy = health.healthy,
            "session started"
        );
        Ok(StartReport { drifted, health })
    }

    /// Leave the VM, applying the auto-policy if this is the last session.
    ///
    /// A failed suspend/destroy leaves the session registered so it can be retried.
    pub async fn stop(&self) -> VmResult<StopOutcome> {
        if let Departure::Left { remaining } = self.vm.leave_session(&self.id)? {
            info!(session = %self.id, remaining, "session left shared VM");
            return Ok(StopOutcome::Shared { remaining });
        }

        let outcome = if self.auto_destroy {
            self.vm.destroy().await?;
            StopOutcome::Destroyed
        } else if self.auto_suspend {
            self.vm.suspend().await?;
            StopOutcome::Suspended
        } else {
            StopOutcome::LeftRunning
        };
        self.vm.unregister_session(&self.id)?;
        info!(session = %self.id, outcome = ?outcome, "last session stopped");
        Ok(outcome)
    }

    /// Command line running `command` in the VM, forwarding the configured env names too.
    pub fn wrap(&self, command: &str, env_names: &[String], ports: &[u16]) -> String {
        let mut names = self.env_names.clone();
        names.extend_from_slice(env_names);
        self.vm.wrap_command(command, &names, ports)
    }
}
