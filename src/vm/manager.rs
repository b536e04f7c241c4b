//! The VM façade.
//!
//! [`Manager`] owns everything needed to drive one project's VM: the settings,
//! the injected process/host/guest seams, the health cache and the session
//! registry. It is immutable after [`ManagerBuilder::build`]; interior state
//! (cache, registry) is guarded by its own locks, so one `Manager` can be
//! shared across sessions behind an `Arc`.
//!
//! [`VmProvider`] is the capability surface the session layer and the CLI use,
//! so either can run against a fake.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::VmSettings;
use crate::error::{VmError, VmResult};
use crate::paths::{self, ProjectPaths};
use crate::vm::boot_phase::{BootPhase, diagnose_up_failure, parse_boot_phase};
use crate::vm::descriptor::{self, DescriptorOutcome};
use crate::vm::drift;
use crate::vm::guest::{self, GuestFileWriter, SandboxContent, SshGuestWriter};
use crate::vm::health::{HEALTH_CACHE_TTL, HealthCache, PROBE_TIMEOUT, PROBE_TOKEN, VmHealth, VmState, parse_state};
use crate::vm::preflight::{Preflight, PreflightReport};
use crate::vm::process::{HostProbe, ProcessOutput, ProcessRunner, SystemHost, TokioRunner};
use crate::vm::sessions::{Departure, SessionRegistry};
use crate::vm::wrap::{self, WrapOptions};
use crate::vm::{Platform, VAGRANT, VagrantCli};

/// Lifecycle, health, drift, session and wrapping operations on one VM.
#[async_trait]
pub trait VmProvider: Send + Sync {
    /// Whether the hypervisor CLI is on `PATH`.
    fn is_installed(&self) -> bool;

    async fn preflight(&self) -> VmResult<PreflightReport>;

    fn ensure_descriptor(&self) -> VmResult<DescriptorOutcome>;

    /// Write guest-visible sandbox files into the project (no-op without content).
    fn ensure_sandbox_content(&self) -> VmResult<()>;

    /// `vagrant up`, reporting phases as they appear. Safe on a running VM.
    async fn boot(&self, on_phase: &mut (dyn FnMut(BootPhase) + Send)) -> VmResult<()>;

    async fn suspend(&self) -> VmResult<()>;
    async fn resume(&self) -> VmResult<()>;
    async fn destroy(&self) -> VmResult<()>;

    /// Destroy, then boot from scratch.
    async fn force_restart(&self) -> VmResult<()>;

    async fn reload(&self) -> VmResult<()>;
    async fn provision(&self) -> VmResult<()>;
    async fn status(&self) -> VmResult<VmState>;
    async fn health_check(&self) -> VmResult<VmHealth>;

    fn has_drift(&self) -> bool;
    fn write_config_hash(&self) -> VmResult<()>;

    fn register_session(&self, id: &str) -> VmResult<()>;
    fn unregister_session(&self, id: &str) -> VmResult<()>;
    fn session_count(&self) -> usize;
    fn is_last_session(&self, id: &str) -> bool;
    /// Atomically either remove `id` or report it as the last session.
    fn leave_session(&self, id: &str) -> VmResult<Departure>;

    fn wrap_command(&self, command: &str, env_names: &[String], ports: &[u16]) -> String;

    /// Mirror the host agent config into the guest; never fails.
    async fn sync_host_config(&self) -> Vec<&'static str>;
}

/// Builder for [`Manager`]. Every seam defaults to the real host.
pub struct ManagerBuilder {
    root: PathBuf,
    settings: VmSettings,
    runner: Option<Arc<dyn ProcessRunner>>,
    host: Option<Arc<dyn HostProbe>>,
    writer: Option<Arc<dyn GuestFileWriter>>,
    content: Option<Arc<dyn SandboxContent>>,
    platform: Platform,
    session: Option<String>,
    wrap_options: Option<WrapOptions>,
    health_ttl: Duration,
    home: Option<PathBuf>,
}

impl ManagerBuilder {
    pub fn new(project_root: impl Into<PathBuf>, settings: VmSettings) -> Self {
        Self {
            root: project_root.into(),
            settings,
            runner: None,
            host: None,
            writer: None,
            content: None,
            platform: Platform::current(),
            session: None,
            wrap_options: None,
            health_ttl: HEALTH_CACHE_TTL,
            home: None,
        }
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn host(mut self, host: Arc<dyn HostProbe>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn guest_writer(mut self, writer: Arc<dyn GuestFileWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn sandbox_content(mut self, content: Arc<dyn SandboxContent>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Isolate this manager's vagrant metadata in `<project>/.vagrant-<id>`.
    pub fn session_dotfile(mut self, session_id: impl Into<String>) -> Self {
        self.session = Some(session_id.into());
        self
    }

    /// Override the env forwarding derived from settings and the host environment.
    pub fn wrap_options(mut self, options: WrapOptions) -> Self {
        self.wrap_options = Some(options);
        self
    }

    pub fn health_ttl(mut self, ttl: Duration) -> Self {
        self.health_ttl = ttl;
        self
    }

    /// Home directory the host config sync reads from.
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn build(self) -> Manager {
        let paths = ProjectPaths::new(&self.root);
        let cli = VagrantCli {
            project_root: paths.root.clone(),
            dotfile: self.session.as_deref().map(|id| paths.dotfile_for(id)),
        };
        let runner = self.runner.unwrap_or_else(|| Arc::new(TokioRunner));
        let writer = self
            .writer
            .unwrap_or_else(|| Arc::new(SshGuestWriter::new(Arc::clone(&runner), cli.clone())));
        let wrap_options = self
            .wrap_options
            .unwrap_or_else(|| WrapOptions::from_settings(&self.settings, |name| std::env::var(name).ok()));
        let home = self.home.unwrap_or_else(paths::home_dir);
        let sessions = SessionRegistry::load(&paths.session_lock);

        debug!(
            project = %paths.root.display(),
            dotfile = ?cli.dotfile,
            sessions = sessions.count(),
            "manager built"
        );

        Manager {
            paths,
            settings: self.settings,
            cli,
            runner,
            host: self.host.unwrap_or_else(|| Arc::new(SystemHost)),
            writer,
            content: self.content,
            platform: self.platform,
            wrap_options,
            health_ttl: self.health_ttl,
            health: OnceLock::new(),
            sessions,
            home,
        }
    }
}

/// Drives the Vagrant VM of one project.
pub struct Manager {
    paths: ProjectPaths,
    settings: VmSettings,
    cli: VagrantCli,
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn HostProbe>,
    writer: Arc<dyn GuestFileWriter>,
    content: Option<Arc<dyn SandboxContent>>,
    platform: Platform,
    wrap_options: WrapOptions,
    health_ttl: Duration,
    health: OnceLock<HealthCache>,
    sessions: SessionRegistry,
    home: PathBuf,
}

impl Manager {
    /// Manager with production seams.
    pub fn new(project_root: impl Into<PathBuf>, settings: VmSettings) -> Self {
        ManagerBuilder::new(project_root, settings).build()
    }

    pub fn builder(project_root: impl Into<PathBuf>, settings: VmSettings) -> ManagerBuilder {
        ManagerBuilder::new(project_root, settings)
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn settings(&self) -> &VmSettings {
        &self.settings
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sessions.list()
    }

    pub fn config_hash(&self) -> String {
        drift::config_hash(&self.settings)
    }

    /// Free MB on the project filesystem.
    pub fn check_disk_space(&self) -> VmResult<u64> {
        Ok(self.preflight_check().available_mb()?)
    }

    pub async fn is_box_cached(&self) -> bool {
        self.preflight_check().is_box_cached().await
    }

    fn preflight_check(&self) -> Preflight<'_> {
        Preflight {
            host: self.host.as_ref(),
            runner: self.runner.as_ref(),
            platform: self.platform,
            project_root: &self.paths.root,
            box_name: &self.settings.box_name,
        }
    }

    fn health_cache(&self) -> &HealthCache {
        self.health.get_or_init(|| HealthCache::new(self.health_ttl))
    }

    /// Run one vagrant verb to completion; non-zero exit is an error.
    async fn run(&self, verb: &str, args: &[&str]) -> VmResult<ProcessOutput> {
        let inv = self.cli.invocation(args.iter().copied());
        info!(verb, project = %self.paths.root.display(), "vagrant");
        let output = self.runner.output(&inv).await.map_err(|source| VmError::Spawn {
            program: VAGRANT.to_string(),
            source,
        })?;
        if !output.success {
            warn!(verb, code = ?output.code, stderr = %output.stderr.trim(), "vagrant failed");
            return Err(VmError::Process {
                verb: verb.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    /// Run a state-changing verb and drop the cached health.
    async fn transition(&self, verb: &str, args: &[&str]) -> VmResult<()> {
        let result = self.run(verb, args).await;
        self.health_cache().invalidate();
        result.map(drop)
    }

    /// `true` iff the guest echoes the probe token within [`PROBE_TIMEOUT`].
    async fn probe(&self) -> bool {
        let echo = format!("echo {PROBE_TOKEN}");
        let inv = self
            .cli
            .invocation(["ssh", "-c", echo.as_str()])
            .deadline(PROBE_TIMEOUT);
        match self.runner.output(&inv).await {
            Ok(out) if out.success && out.stdout.contains(PROBE_TOKEN) => true,
            Ok(out) => {
                debug!(code = ?out.code, "liveness probe got no answer");
                false
            }
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl VmProvider for Manager {
    fn is_installed(&self) -> bool {
        self.host.locate(VAGRANT).is_some()
    }

    async fn preflight(&self) -> VmResult<PreflightReport> {
        self.preflight_check().run().await
    }

    fn ensure_descriptor(&self) -> VmResult<DescriptorOutcome> {
        descriptor::ensure_descriptor(&self.paths, &self.settings, self.platform)
    }

    fn ensure_sandbox_content(&self) -> VmResult<()> {
        let Some(content) = &self.content else {
            return Ok(());
        };
        content
            .write_into(&self.paths.root)
            .map_err(|e| VmError::persistence("write sandbox content into", &self.paths.root, e))
    }

    async fn boot(&self, on_phase: &mut (dyn FnMut(BootPhase) + Send)) -> VmResult<()> {
        let inv = self.cli.invocation(["up", "--machine-readable"]);
        info!(project = %self.paths.root.display(), "booting VM");

        let mut on_line = |line: &str| {
            if let Some(phase) = parse_boot_phase(line) {
                debug!(phase = %phase, "boot phase");
                on_phase(phase);
            }
        };
        let result = self.runner.stream(&inv, &mut on_line).await;
        self.health_cache().invalidate();

        let output = match result {
            Ok(output) => output,
            Err(source) => {
                let err = VmError::Spawn {
                    program: VAGRANT.to_string(),
                    source,
                };
                return Err(diagnose_up_failure(self.platform, err, ""));
            }
        };
        if !output.success {
            warn!(code = ?output.code, stderr = %output.stderr.trim(), "vagrant up failed");
            let err = VmError::Process {
                verb: "up".to_string(),
                code: output.code,
                stderr: output.stderr.clone(),
            };
            return Err(diagnose_up_failure(self.platform, err, &output.stderr));
        }
        info!("VM up");
        Ok(())
    }

    async fn suspend(&self) -> VmResult<()> {
        self.transition("suspend", &["suspend"]).await
    }

    async fn resume(&self) -> VmResult<()> {
        self.transition("resume", &["resume"]).await
    }

    async fn destroy(&self) -> VmResult<()> {
        self.transition("destroy", &["destroy", "-f"]).await
    }

    async fn force_restart(&self) -> VmResult<()> {
        self.destroy().await?;
        self.boot(&mut |_| {}).await
    }

    async fn reload(&self) -> VmResult<()> {
        self.transition("reload", &["reload"]).await
    }

    async fn provision(&self) -> VmResult<()> {
        self.run("provision", &["provision"]).await.map(drop)
    }

    async fn status(&self) -> VmResult<VmState> {
        let output = self.run("status", &["status", "--machine-readable"]).await?;
        parse_state(&output.stdout).ok_or(VmError::StatusParse { output: output.stdout })
    }

    async fn health_check(&self) -> VmResult<VmHealth> {
        let cache = self.health_cache();
        if let Some(cached) = cache.authoritative() {
            debug!(state = %cached.state, "health from cache");
            return Ok(cached);
        }

        let state = self.status().await?;
        let probe_ok = state.is_running() && self.probe().await;
        let health = VmHealth::from_probe(state, probe_ok);
        info!(state = %health.state, healthy = health.healthy, "health checked");

        cache.set(health.clone());
        Ok(health)
    }

    fn has_drift(&self) -> bool {
        drift::has_drift(&self.paths, &self.settings)
    }

    fn write_config_hash(&self) -> VmResult<()> {
        drift::write_hash(&self.paths, &self.settings)
    }

    fn register_session(&self, id: &str) -> VmResult<()> {
        self.sessions.register(id)
    }

    fn unregister_session(&self, id: &str) -> VmResult<()> {
        self.sessions.unregister(id)
    }

    fn session_count(&self) -> usize {
        self.sessions.count()
    }

    fn is_last_session(&self, id: &str) -> bool {
        self.sessions.is_last(id)
    }

    fn leave_session(&self, id: &str) -> VmResult<Departure> {
        self.sessions.leave(id)
    }

    fn wrap_command(&self, command: &str, env_names: &[String], ports: &[u16]) -> String {
        wrap::wrap_command(command, env_names, ports, &self.wrap_options)
    }

    async fn sync_host_config(&self) -> Vec<&'static str> {
        let agent_dir = paths::agent_config_dir(&self.home);
        guest::sync_host_config(self.writer.as_ref(), &self.home, &agent_dir).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;

    use parking_lot::Mutex;

    use super::*;
    use crate::vm::process::Invocation;

    #[derive(Clone)]
    enum Reply {
        Out(ProcessOutput),
        TimedOut,
    }

    /// Replies keyed by the space-joined argument list.
    #[derive(Default)]
    struct FakeRunner {
        replies: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeRunner {
        fn reply(self, args: &str, reply: Reply) -> Self {
            self.replies.lock().insert(args.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().iter().map(|i| i.args.join(" ")).collect()
        }

        fn next(&self, inv: &Invocation) -> io::Result<ProcessOutput> {
            self.calls.lock().push(inv.clone());
            match self.replies.lock().get(&inv.args.join(" ")).cloned() {
                Some(Reply::Out(out)) => Ok(out),
                Some(Reply::TimedOut) => Err(io::Error::new(io::ErrorKind::TimedOut, "deadline")),
                None => Ok(ProcessOutput::ok("")),
            }
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn output(&self, inv: &Invocation) -> io::Result<ProcessOutput> {
            self.next(inv)
        }

        async fn stream(
            &self,
            inv: &Invocation,
            on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> io::Result<ProcessOutput> {
            let out = self.next(inv)?;
            for line in out.stdout.lines() {
                on_line(line);
            }
            Ok(ProcessOutput {
                stdout: String::new(),
                ..out
            })
        }
    }

    struct FakeHost;

    impl HostProbe for FakeHost {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            Some(PathBuf::from("/usr/bin").join(program))
        }

        fn available_space(&self, _path: &Path) -> io::Result<u64> {
            Ok(100 * 1024 * 1024 * 1024)
        }
    }

    fn manager(dir: &Path, runner: Arc<FakeRunner>) -> Manager {
        Manager::builder(dir, VmSettings::default())
            .runner(runner)
            .host(Arc::new(FakeHost))
            .platform(Platform::new("linux", "x86_64"))
            .wrap_options(WrapOptions::default())
            .build()
    }

    const STATUS: &str = "status --machine-readable";
    const PROBE: &str = "ssh -c echo pong";

    fn status(state: &str) -> Reply {
        Reply::Out(ProcessOutput::ok(format!(
            "1700000000,default,metadata,provider,virtualbox\n1700000000,default,state,{state}\n"
        )))
    }

    #[tokio::test]
    async fn saved_vm_skips_probe() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default().reply(STATUS, status("saved")));
        let mgr = manager(dir.path(), Arc::clone(&runner));

        let h = mgr.health_check().await.unwrap();
        assert_eq!(h.state, VmState::Saved);
        assert!(!h.healthy && !h.responsive);
        assert_eq!(runner.calls(), vec![STATUS]);

        // Cached and authoritative: no further process calls.
        let again = mgr.health_check().await.unwrap();
        assert_eq!(again.state, VmState::Saved);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn running_vm_with_pong_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .reply(STATUS, status("running"))
                .reply(PROBE, Reply::Out(ProcessOutput::ok("pong\n"))),
        );
        let mgr = manager(dir.path(), Arc::clone(&runner));

        let h = mgr.health_check().await.unwrap();
        assert!(h.healthy && h.responsive);
        assert_eq!(runner.calls(), vec![STATUS, PROBE]);

        let probe = runner.calls.lock()[1].clone();
        assert_eq!(probe.deadline, Some(PROBE_TIMEOUT));

        // Running results are re-checked every time.
        mgr.health_check().await.unwrap();
        assert_eq!(runner.calls().len(), 4);
    }

    #[tokio::test]
    async fn probe_timeout_is_unresponsive() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .reply(STATUS, status("running"))
                .reply(PROBE, Reply::TimedOut),
        );
        let h = manager(dir.path(), runner).health_check().await.unwrap();
        assert_eq!(h.state, VmState::Running);
        assert!(!h.healthy && !h.responsive);
        assert!(h.message.contains("unresponsive"));
        assert!(!h.message.contains("suspended"));
    }

    #[tokio::test]
    async fn status_without_state_record_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default().reply(STATUS, Reply::Out(ProcessOutput::ok("garbage"))));
        let err = manager(dir.path(), runner).status().await.unwrap_err();
        assert!(matches!(err, VmError::StatusParse { .. }));
    }

    #[tokio::test]
    async fn suspend_invalidates_cached_health() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default().reply(STATUS, status("poweroff")));
        let mgr = manager(dir.path(), Arc::clone(&runner));

        mgr.health_check().await.unwrap();
        mgr.suspend().await.unwrap();
        mgr.health_check().await.unwrap();
        assert_eq!(runner.calls(), vec![STATUS, "suspend", STATUS]);
    }

    #[tokio::test]
    async fn boot_streams_phases_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let up = "1,default,action,up,start\n1,default,ui,info,x\n1,default,action,up,provision\n1,default,action,up,complete\n";
        let runner = Arc::new(FakeRunner::default().reply("up --machine-readable", Reply::Out(ProcessOutput::ok(up))));
        let mgr = manager(dir.path(), runner);

        let mut phases = Vec::new();
        mgr.boot(&mut |p| phases.push(p)).await.unwrap();
        assert_eq!(phases, vec![BootPhase::Booting, BootPhase::Provisioning, BootPhase::Ready]);
    }

    #[tokio::test]
    async fn boot_failure_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default().reply("up --machine-readable", Reply::Out(ProcessOutput::failed(1, "vboxdrv missing"))),
        );
        let err = manager(dir.path(), runner).boot(&mut |_| {}).await.unwrap_err();
        assert!(err.is_process());
        assert!(matches!(err, VmError::Process { ref verb, .. } if verb == "up"));
    }

    #[tokio::test]
    async fn boot_failure_on_apple_silicon_asks_for_driver_approval() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default().reply("up --machine-readable", Reply::Out(ProcessOutput::failed(1, "vboxdrv missing"))),
        );
        let mgr = Manager::builder(dir.path(), VmSettings::default())
            .runner(runner)
            .host(Arc::new(FakeHost))
            .platform(Platform::new("macos", "aarch64"))
            .build();
        let err = mgr.boot(&mut |_| {}).await.unwrap_err();
        assert!(matches!(err, VmError::DriverApproval { .. }));
    }

    #[tokio::test]
    async fn verbs_map_to_vagrant_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mgr = manager(dir.path(), Arc::clone(&runner));

        mgr.suspend().await.unwrap();
        mgr.resume().await.unwrap();
        mgr.reload().await.unwrap();
        mgr.provision().await.unwrap();
        mgr.force_restart().await.unwrap();

        assert_eq!(
            runner.calls(),
            vec!["suspend", "resume", "reload", "provision", "destroy -f", "up --machine-readable"]
        );
        assert!(runner.calls.lock().iter().all(|i| i.current_dir.as_deref() == Some(dir.path())));
    }

    #[tokio::test]
    async fn verb_failure_carries_exit_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default().reply("destroy -f", Reply::Out(ProcessOutput::failed(2, "locked\n"))));
        let err = manager(dir.path(), runner).destroy().await.unwrap_err();
        assert_eq!(err.to_string(), "vagrant destroy failed (exit 2): locked");
    }

    #[tokio::test]
    async fn session_dotfile_reaches_every_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mgr = Manager::builder(dir.path(), VmSettings::default())
            .runner(Arc::clone(&runner) as Arc<dyn ProcessRunner>)
            .host(Arc::new(FakeHost))
            .session_dotfile("abc")
            .build();
        mgr.suspend().await.unwrap();

        let inv = runner.calls.lock()[0].clone();
        let want = dir.path().join(".vagrant-abc").to_string_lossy().into_owned();
        assert_eq!(inv.env, vec![("VAGRANT_DOTFILE_PATH".to_string(), want)]);
    }

    #[test]
    fn registry_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mgr = manager(dir.path(), Arc::clone(&runner));
        mgr.register_session("a").unwrap();
        mgr.register_session("b").unwrap();
        drop(mgr);

        let mgr = manager(dir.path(), runner);
        assert_eq!(mgr.session_count(), 2);
        assert!(!mgr.is_last_session("a"));
        mgr.unregister_session("a").unwrap();
        assert!(mgr.is_last_session("b"));
    }

    #[test]
    fn wrap_uses_configured_options() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path(), Arc::new(FakeRunner::default()));
        assert_eq!(
            mgr.wrap_command("npm test", &[], &[]),
            "vagrant ssh -- -t 'cd /vagrant && npm test'"
        );
    }
}
