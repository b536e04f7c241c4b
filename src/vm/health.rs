//! VM health: state parsing, liveness verdicts and the 30-second cache.
//!
//! A full check has two phases:
//!
//! 1. `vagrant status --machine-readable` → [`VmState`]. A cached non-running
//!    result younger than the TTL is authoritative and ends the check.
//! 2. Only when running: `vagrant ssh -c "echo pong"` with a 5 s deadline.
//!    No `pong` means running-but-unresponsive, which is not a crash.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// How long a health result stays authoritative.
pub const HEALTH_CACHE_TTL: Duration = Duration::from_secs(30);
/// Deadline for the SSH liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Token echoed by the liveness probe.
pub const PROBE_TOKEN: &str = "pong";

/// State reported by `vagrant status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VmState {
    Running,
    /// Suspended to disk.
    Saved,
    NotCreated,
    Aborted,
    PowerOff,
    Unknown(String),
}

impl VmState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "running" => VmState::Running,
            "saved" => VmState::Saved,
            "not_created" => VmState::NotCreated,
            "aborted" => VmState::Aborted,
            "poweroff" => VmState::PowerOff,
            other => VmState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VmState::Running => "running",
            VmState::Saved => "saved",
            VmState::NotCreated => "not_created",
            VmState::Aborted => "aborted",
            VmState::PowerOff => "poweroff",
            VmState::Unknown(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, VmState::Running)
    }

    fn message(&self) -> String {
        match self {
            VmState::Running => "VM running and responsive".to_string(),
            VmState::Saved => "VM is suspended".to_string(),
            VmState::NotCreated => "VM not created".to_string(),
            VmState::Aborted => "VM crashed or was force-stopped".to_string(),
            VmState::PowerOff => "VM is powered off".to_string(),
            VmState::Unknown(s) => format!("VM in unexpected state: {s}"),
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for VmState {
    fn from(s: String) -> Self {
        VmState::parse(&s)
    }
}

impl From<VmState> for String {
    fn from(s: VmState) -> Self {
        s.as_str().to_string()
    }
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmHealth {
    pub state: VmState,
    /// Running and the liveness probe answered.
    pub healthy: bool,
    /// The liveness probe answered.
    pub responsive: bool,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl VmHealth {
    /// Build a verdict from the status and, for running VMs, the probe outcome.
    pub fn from_probe(state: VmState, probe_ok: bool) -> Self {
        let (healthy, message) = match &state {
            VmState::Running if probe_ok => (true, state.message()),
            VmState::Running => (false, "VM running but unresponsive (SSH probe failed)".to_string()),
            other => (false, other.message()),
        };
        Self {
            state,
            healthy,
            responsive: healthy,
            message,
            checked_at: Utc::now(),
        }
    }

    /// Running according to the hypervisor but the guest did not answer.
    pub fn is_unresponsive(&self) -> bool {
        self.state.is_running() && !self.responsive
    }
}

/// Value of the first `state` record in machine-readable status output
/// (`timestamp,target,state,VALUE`).
pub fn parse_state(output: &str) -> Option<VmState> {
    output.lines().map(str::trim).find_map(|line| {
        let fields: Vec<&str> = line.split(',').collect();
        (fields.len() >= 4 && fields[2] == "state").then(|| VmState::parse(fields[3]))
    })
}

struct CacheEntry {
    health: VmHealth,
    stored_at: Instant,
}

/// Most recent health result with a fixed TTL.
///
/// Reads take the shared lock, writes the exclusive one; a reader sees either
/// the previous or the next full result.
pub struct HealthCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// The cached result if it is younger than the TTL.
    pub fn get(&self) -> Option<VmHealth> {
        let guard = self.entry.read();
        guard
            .as_ref()
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.health.clone())
    }

    /// Cached result that makes a fresh check unnecessary: anything but running.
    pub fn authoritative(&self) -> Option<VmHealth> {
        self.get().filter(|h| !h.state.is_running())
    }

    pub fn set(&self, health: VmHealth) {
        *self.entry.write() = Some(CacheEntry {
            health,
            stored_at: Instant::now(),
        });
    }

    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self::new(HEALTH_CACHE_TTL)
    }
}
