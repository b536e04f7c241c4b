//! Integration tests against a real Vagrant + VirtualBox installation.
//!
//! These boot an actual VM from the configured box in a temporary project
//! directory, so they need vagrant and VirtualBox 7+ on `PATH`, several GB of
//! free disk space, and a few minutes. They are gated with the
//! `vm-integration-tests` feature flag.
//!
//! # Running
//!
//! ```bash
//! cargo test --features vm-integration-tests --test vm_integration -- --test-threads=1
//! ```
//!
//! `SANDBOX_VM_TEST_BOX` overrides the base box (default `bento/ubuntu-24.04`).
//! Every test destroys its VM on the way out, also when it panics.

#![cfg(feature = "vm-integration-tests")]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;

use sandbox_vm::config::VmSettings;
use sandbox_vm::session::{SandboxSession, StopOutcome};
use sandbox_vm::vm::{BootPhase, Manager, VmProvider, VmState};

fn test_settings() -> VmSettings {
    VmSettings {
        box_name: std::env::var("SANDBOX_VM_TEST_BOX").unwrap_or_else(|_| "bento/ubuntu-24.04".to_string()),
        memory_mb: 2048,
        cpus: 2,
        auto_suspend: false,
        auto_destroy: true,
        ..VmSettings::default()
    }
}

/// Destroys the VM when dropped.
struct TestVm {
    dir: tempfile::TempDir,
    manager: Arc<Manager>,
}

impl TestVm {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp project");
        let manager = Arc::new(Manager::new(dir.path(), test_settings()));
        Self { dir, manager }
    }

    fn provider(&self) -> Arc<dyn VmProvider> {
        self.manager.clone()
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Run `command` in the guest through the wrapped command line.
    async fn exec(&self, command: &str) -> Result<String> {
        let line = self.manager.wrap_command(command, &[], &[]);
        let out = tokio::time::timeout(
            Duration::from_secs(60),
            Command::new("sh").arg("-c").arg(&line).current_dir(self.root()).output(),
        )
        .await
        .context("guest command timed out")??;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl Drop for TestVm {
    fn drop(&mut self) {
        let _ = std::process::Command::new("vagrant")
            .args(["destroy", "-f"])
            .current_dir(self.dir.path())
            .status();
    }
}

#[tokio::test]
async fn boot_health_and_destroy() -> Result<()> {
    let vm = TestVm::new();
    let provider = vm.provider();
    let session = SandboxSession::new("it-1", Arc::clone(&provider), &test_settings());

    let mut phases = Vec::new();
    let report = session.start(&mut |p| phases.push(p)).await?;
    assert!(report.health.healthy, "{}", report.health.message);
    assert_eq!(phases.last(), Some(&BootPhase::Ready));
    assert!(vm.root().join("Vagrantfile").exists());

    assert_eq!(provider.status().await?, VmState::Running);
    assert!(vm.exec("pwd").await?.contains("/vagrant"));

    assert_eq!(session.stop().await?, StopOutcome::Destroyed);
    assert_eq!(provider.status().await?, VmState::NotCreated);
    Ok(())
}

#[tokio::test]
async fn suspend_resume_cycle() -> Result<()> {
    let vm = TestVm::new();
    let provider = vm.provider();
    let session = SandboxSession::new("it-2", Arc::clone(&provider), &test_settings());
    session.start(&mut |_| {}).await?;

    provider.suspend().await?;
    let health = provider.health_check().await?;
    assert_eq!(health.state, VmState::Saved);
    assert!(!health.healthy);

    provider.resume().await?;
    assert!(provider.health_check().await?.healthy);

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn project_files_are_shared() -> Result<()> {
    let vm = TestVm::new();
    let provider = vm.provider();
    let session = SandboxSession::new("it-3", Arc::clone(&provider), &test_settings());
    session.start(&mut |_| {}).await?;

    std::fs::write(vm.root().join("marker.txt"), "from-host")?;
    assert!(vm.exec("cat marker.txt").await?.contains("from-host"));

    session.stop().await?;
    Ok(())
}
