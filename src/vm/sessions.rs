//! Reference count of the sessions sharing one VM.
//!
//! The list lives in memory behind one mutex and is rewritten in full to
//! `.vagrant/sandbox-vm.lock` on every mutation, while the lock is held. A
//! mutation whose record cannot be written is rolled back and reported, so
//! memory and disk never disagree: losing a registration on disk would let
//! another process destroy a VM that is still in use.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VmError, VmResult};

/// Result of [`SessionRegistry::leave`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The id was removed; `remaining` sessions still hold the VM.
    Left { remaining: usize },
    /// The id is the only one registered and stays registered until the
    /// caller has applied its shutdown policy and calls `unregister`.
    Last,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default)]
    sessions: Vec<String>,
}

/// Ordered, duplicate-free list of session ids backed by a JSON lock record.
#[derive(Debug)]
pub struct SessionRegistry {
    path: PathBuf,
    sessions: Mutex<Vec<String>>,
}

impl SessionRegistry {
    /// Load the record at `path`. A missing or unreadable record starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<SessionRecord>(&content) {
                Ok(record) => dedup(record.sessions),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt session record, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable session record, starting empty");
                Vec::new()
            }
        };
        debug!(path = %path.display(), count = sessions.len(), "session registry loaded");
        Self {
            path,
            sessions: Mutex::new(sessions),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add `id` and persist. Registering a present id changes nothing.
    pub fn register(&self, id: &str) -> VmResult<()> {
        let mut sessions = self.sessions.lock();
        if sessions.iter().any(|s| s == id) {
            return Ok(());
        }

        sessions.push(id.to_string());
        if let Err(e) = persist(&self.path, &sessions) {
            sessions.pop();
            return Err(e);
        }
        debug!(session = id, count = sessions.len(), "session registered");
        Ok(())
    }

    /// Remove `id` and persist. Removing an absent id still succeeds.
    pub fn unregister(&self, id: &str) -> VmResult<()> {
        let mut sessions = self.sessions.lock();
        let remaining: Vec<String> = sessions.iter().filter(|s| *s != id).cloned().collect();

        persist(&self.path, &remaining)?;
        *sessions = remaining;
        debug!(session = id, count = sessions.len(), "session unregistered");
        Ok(())
    }

    /// Decide and act under one lock: either `id` is the last session, or it
    /// is removed. Two sessions leaving at once never both see the other.
    pub fn leave(&self, id: &str) -> VmResult<Departure> {
        let mut sessions = self.sessions.lock();
        if sessions.len() == 1 && sessions[0] == id {
            return Ok(Departure::Last);
        }

        let remaining: Vec<String> = sessions.iter().filter(|s| *s != id).cloned().collect();
        persist(&self.path, &remaining)?;
        *sessions = remaining;
        debug!(session = id, count = sessions.len(), "session left");
        Ok(Departure::Left {
            remaining: sessions.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// `true` iff `id` is the only registered session.
    pub fn is_last(&self, id: &str) -> bool {
        let sessions = self.sessions.lock();
        sessions.len() == 1 && sessions[0] == id
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.lock().clone()
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Write the full record via a temp file and rename.
fn persist(path: &Path, sessions: &[String]) -> VmResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| VmError::persistence("create metadata directory", dir, e))?;
    }

    let record = SessionRecord {
        sessions: sessions.to_vec(),
    };
    let json = serde_json::to_vec(&record)?;

    let tmp = path.with_extension("lock.tmp");
    std::fs::write(&tmp, json).map_err(|e| VmError::persistence("write session record", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| VmError::persistence("replace session record", path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn registry(dir: &tempfile::TempDir) -> SessionRegistry {
        SessionRegistry::load(dir.path().join(".vagrant").join("sandbox-vm.lock"))
    }

    fn on_disk(reg: &SessionRegistry) -> Vec<String> {
        let content = std::fs::read_to_string(reg.path()).unwrap();
        serde_json::from_str::<SessionRecord>(&content).unwrap().sessions
    }

    #[test]
    fn register_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register("a").unwrap();
        reg.register("a").unwrap();
        assert_eq!(reg.count(), 1);
        assert_eq!(on_disk(&reg), vec!["a"]);
    }

    #[test]
    fn unregister_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register("a").unwrap();
        reg.unregister("zzz").unwrap();
        assert_eq!(reg.list(), vec!["a"]);
    }

    #[test]
    fn is_last_requires_single_matching_entry() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        assert!(!reg.is_last("a"));

        reg.register("a").unwrap();
        assert!(reg.is_last("a"));
        assert!(!reg.is_last("b"));

        reg.register("b").unwrap();
        assert!(!reg.is_last("a"));

        reg.unregister("a").unwrap();
        assert!(reg.is_last("b"));
    }

    #[test]
    fn record_format_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register("s1").unwrap();
        reg.register("s2").unwrap();

        let raw = std::fs::read_to_string(reg.path()).unwrap();
        assert_eq!(raw, r#"{"sessions":["s1","s2"]}"#);

        let reloaded = registry(&dir);
        assert_eq!(reloaded.list(), vec!["s1", "s2"]);
    }

    #[test]
    fn corrupt_record_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox-vm.lock");
        std::fs::write(&path, "{not json").unwrap();
        let reg = SessionRegistry::load(&path);
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // The metadata "directory" is a regular file, so nothing can be written under it.
        let blocker = dir.path().join(".vagrant");
        std::fs::write(&blocker, "").unwrap();
        let reg = SessionRegistry::load(blocker.join("sandbox-vm.lock"));

        let err = reg.register("a").unwrap_err();
        assert!(matches!(err, VmError::Persistence { .. }));
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn leave_keeps_last_session_registered() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.register("a").unwrap();
        reg.register("b").unwrap();

        assert_eq!(reg.leave("a").unwrap(), Departure::Left { remaining: 1 });
        assert_eq!(reg.leave("b").unwrap(), Departure::Last);
        assert_eq!(on_disk(&reg), vec!["b"]);

        reg.unregister("b").unwrap();
        assert_eq!(reg.leave("b").unwrap(), Departure::Left { remaining: 0 });
    }

    #[test]
    fn concurrent_leave_has_exactly_one_last() {
        for _ in 0..200 {
            let dir = tempfile::tempdir().unwrap();
            let reg = registry(&dir);
            reg.register("a").unwrap();
            reg.register("b").unwrap();

            let barrier = std::sync::Barrier::new(2);
            let (x, y) = std::thread::scope(|scope| {
                let x = scope.spawn(|| {
                    barrier.wait();
                    reg.leave("a").unwrap()
                });
                let y = scope.spawn(|| {
                    barrier.wait();
                    reg.leave("b").unwrap()
                });
                (x.join().unwrap(), y.join().unwrap())
            });

            let lasts = [x, y].iter().filter(|d| **d == Departure::Last).count();
            assert_eq!(lasts, 1, "{x:?} {y:?}");
            assert_eq!(reg.count(), 1);
        }
    }

    #[test]
    fn concurrent_register_then_unregister() {
        const N: usize = 32;
        let dir = tempfile::tempdir().unwrap();
        let reg = Arc::new(registry(&dir));

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register(&format!("s{i}")).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.count(), N);

        let handles: Vec<_> = (0..N / 2)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.unregister(&format!("s{i}")).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(reg.count(), N / 2);
        let mut mem = reg.list();
        let mut disk = on_disk(&reg);
        mem.sort();
        disk.sort();
        assert_eq!(mem, disk);
        assert!(mem.iter().all(|id| id[1..].parse::<usize>().unwrap() >= N / 2));
    }
}
