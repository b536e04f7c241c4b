//! sandbox-vm: drive the sandbox VM of a project from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sandbox_vm::config::VmSettings;
use sandbox_vm::session::SandboxSession;
use sandbox_vm::vm::{Manager, VmProvider};
use sandbox_vm::{logging, paths};

/// Session id used when `--session` is not given.
const CLI_SESSION: &str = "cli";

/// Sandbox VM lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "sandbox-vm", version, about = "Run a coding agent inside a Vagrant sandbox VM")]
struct Args {
    /// Project directory shared into the VM
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Settings file (defaults to ~/.config/sandbox-vm/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session id for up/stop and session bookkeeping
    #[arg(short, long, default_value = CLI_SESSION)]
    session: String,

    /// Keep vagrant metadata in a per-session .vagrant-<session> directory
    #[arg(long)]
    isolate: bool,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check host prerequisites
    Preflight,
    /// Start the VM for this session (preflight, Vagrantfile, boot, re-provision on drift)
    Up,
    /// Leave the VM; the last session suspends or destroys it per settings
    Stop,
    Suspend,
    Resume,
    /// Destroy the VM and all its data
    Destroy,
    /// Destroy and boot from scratch
    Restart,
    Reload,
    Provision,
    /// Print the vagrant state
    Status,
    /// Status plus SSH liveness probe
    Health {
        #[arg(long)]
        json: bool,
    },
    /// Compare provisioning inputs with the last provisioned ones
    Drift {
        /// Record the current inputs as provisioned
        #[arg(long)]
        write: bool,
    },
    /// Print the command line that runs CMD inside the VM
    Wrap {
        /// Environment variable name to forward (repeatable)
        #[arg(long = "env")]
        env: Vec<String>,
        /// Host port to reverse-tunnel into the guest (repeatable)
        #[arg(long = "port")]
        ports: Vec<u16>,
        #[arg(trailing_var_arg = true, required = true)]
        cmd: Vec<String>,
    },
    /// Inspect or edit the shared-session record
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Write the Vagrantfile if the project has none
    Descriptor,
    /// Copy the host agent config into the VM
    SyncConfig,
}

#[derive(Subcommand, Debug)]
enum SessionsAction {
    List,
    Register { id: String },
    Unregister { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(paths::config_file);
    let settings = VmSettings::load(&config_path)?;
    let project = std::fs::canonicalize(&args.project)
        .with_context(|| format!("project directory {}", args.project.display()))?;

    let mut builder = Manager::builder(&project, settings.clone());
    if args.isolate {
        builder = builder.session_dotfile(&args.session);
    }
    let manager = Arc::new(builder.build());
    let vm: Arc<dyn VmProvider> = manager.clone();

    match args.command {
        Command::Preflight => {
            let report = vm.preflight().await.context("preflight failed")?;
            println!("VirtualBox {}", report.backend_version);
            println!(
                "disk: {}MB free, {}MB required (box {})",
                report.available_mb,
                report.required_mb,
                if report.box_cached { "cached" } else { "not cached" }
            );
        }
        Command::Up => {
            let session = SandboxSession::new(&args.session, Arc::clone(&vm), &settings);
            let report = session
                .start(&mut |phase| eprintln!("{phase}"))
                .await
                .context("failed to start VM")?;
            if report.drifted {
                println!("configuration changed; VM re-provisioned");
            }
            println!("{}", report.health.message);
        }
        Command::Stop => {
            let session = SandboxSession::new(&args.session, Arc::clone(&vm), &settings);
            let outcome = session.stop().await.context("failed to stop session")?;
            println!("{outcome:?}");
        }
        Command::Suspend => vm.suspend().await?,
        Command::Resume => vm.resume().await?,
        Command::Destroy => vm.destroy().await?,
        Command::Restart => vm.force_restart().await?,
        Command::Reload => vm.reload().await?,
        Command::Provision => {
            vm.provision().await?;
            vm.write_config_hash()?;
        }
        Command::Status => println!("{}", vm.status().await?),
        Command::Health { json } => {
            let health = vm.health_check().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!("{}: {}", health.state, health.message);
            }
        }
        Command::Drift { write } => {
            let drifted = vm.has_drift();
            println!("hash:  {}", manager.config_hash());
            println!("drift: {}", if drifted { "yes" } else { "no" });
            if write {
                vm.write_config_hash()?;
            }
        }
        Command::Wrap { env, ports, cmd } => {
            let session = SandboxSession::new(&args.session, Arc::clone(&vm), &settings);
            println!("{}", session.wrap(&cmd.join(" "), &env, &ports));
        }
        Command::Sessions { action } => match action {
            SessionsAction::List => {
                for id in manager.sessions() {
                    println!("{id}");
                }
            }
            SessionsAction::Register { id } => vm.register_session(&id)?,
            SessionsAction::Unregister { id } => vm.unregister_session(&id)?,
        },
        Command::Descriptor => {
            let outcome = vm.ensure_descriptor()?;
            println!("{outcome:?}: {}", manager.paths().descriptor.display());
        }
        Command::SyncConfig => {
            for path in vm.sync_host_config().await {
                println!("synced {path}");
            }
        }
    }

    Ok(())
}
