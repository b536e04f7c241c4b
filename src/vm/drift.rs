//! Configuration drift between the provisioned VM and the current settings.
//!
//! The digest covers only inputs that change what provisioning produces. It
//! is stored as bare hex at `.vagrant/sandbox-vm-config.sha256` after each
//! successful provision and compared on the next start. Drift is advisory:
//! nothing here blocks an operation.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::VmSettings;
use crate::error::{VmError, VmResult};
use crate::paths::ProjectPaths;
use crate::vm::descriptor::resolved_packages;

/// Hex SHA-256 over the provisioning inputs of `settings`.
///
/// Order-insensitive lists are sorted first. An unreadable provision script
/// contributes nothing. The project location never enters the digest.
pub fn config_hash(settings: &VmSettings) -> String {
    let mut hasher = Sha256::new();

    hasher.update(b"box\0");
    hasher.update(settings.box_name.as_bytes());

    hasher.update(b"\0packages\0");
    for pkg in resolved_packages(settings) {
        hasher.update(pkg.as_bytes());
        hasher.update(b"\n");
    }

    hasher.update(b"\0npm\0");
    let mut npm = settings.npm_packages.clone();
    npm.sort();
    for pkg in &npm {
        hasher.update(pkg.as_bytes());
        hasher.update(b"\n");
    }

    hasher.update(b"\0script\0");
    if let Some(script) = &settings.provision_script {
        match std::fs::read(script) {
            Ok(content) => hasher.update(&content),
            Err(e) => debug!(path = %script.display(), error = %e, "provision script unreadable, not hashed"),
        }
    }

    hasher.update(b"\0ports\0");
    let mut ports = settings.port_forwards.clone();
    ports.sort();
    for pf in &ports {
        hasher.update(pf.to_string().as_bytes());
        hasher.update(b"\n");
    }

    hex::encode(hasher.finalize())
}

/// Whether the stored digest differs from the current one.
///
/// No stored digest (first run) or an unreadable one counts as no drift.
pub fn has_drift(paths: &ProjectPaths, settings: &VmSettings) -> bool {
    let stored = match std::fs::read_to_string(&paths.config_hash) {
        Ok(s) => s,
        Err(e) => {
            debug!(path = %paths.config_hash.display(), error = %e, "no stored config hash");
            return false;
        }
    };

    let drifted = stored.trim() != config_hash(settings);
    if drifted {
        info!(project = %paths.root.display(), "VM configuration drift detected");
    }
    drifted
}

/// Persist the current digest, creating the metadata directory if needed.
pub fn write_hash(paths: &ProjectPaths, settings: &VmSettings) -> VmResult<()> {
    std::fs::create_dir_all(&paths.metadata)
        .map_err(|e| VmError::persistence("create metadata directory", &paths.metadata, e))?;

    let digest = config_hash(settings);
    std::fs::write(&paths.config_hash, &digest)
        .map_err(|e| VmError::persistence("write config hash", &paths.config_hash, e))?;
    debug!(path = %paths.config_hash.display(), hash = %digest, "config hash written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PortForward, Protocol};

    #[test]
    fn hash_is_hex_sha256() {
        let h = config_hash(&VmSettings::default());
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, config_hash(&VmSettings::default()));
    }

    #[test]
    fn every_field_changes_the_hash() {
        let base = VmSettings::default();
        let original = config_hash(&base);

        let mut s = base.clone();
        s.box_name = "ubuntu/jammy64".into();
        assert_ne!(config_hash(&s), original, "box");

        let mut s = base.clone();
        s.provision_packages = vec!["vim".into()];
        assert_ne!(config_hash(&s), original, "packages");

        let mut s = base.clone();
        s.provision_pkg_exclude = vec!["docker.io".into()];
        assert_ne!(config_hash(&s), original, "exclusions");

        let mut s = base.clone();
        s.npm_packages = vec!["typescript".into()];
        assert_ne!(config_hash(&s), original, "npm");

        let mut s = base.clone();
        s.port_forwards = vec![PortForward::tcp(3000, 3000)];
        let with_port = config_hash(&s);
        assert_ne!(with_port, original, "port");

        s.port_forwards[0].host = 3001;
        assert_ne!(config_hash(&s), with_port, "port host");
        s.port_forwards[0].host = 3000;
        s.port_forwards[0].protocol = Protocol::Udp;
        assert_ne!(config_hash(&s), with_port, "port protocol");
    }

    #[test]
    fn script_content_is_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.sh");
        std::fs::write(&script, "echo one").unwrap();

        let mut s = VmSettings::default();
        s.provision_script = Some(script.clone());
        let first = config_hash(&s);

        std::fs::write(&script, "echo two").unwrap();
        assert_ne!(config_hash(&s), first);
    }

    #[test]
    fn missing_script_is_not_an_error() {
        let mut s = VmSettings::default();
        s.provision_script = Some("/nonexistent/setup.sh".into());
        assert_eq!(config_hash(&s).len(), 64);
    }

    #[test]
    fn list_order_does_not_matter() {
        let mut a = VmSettings::default();
        a.npm_packages = vec!["b".into(), "a".into()];
        a.port_forwards = vec![PortForward::tcp(8080, 8080), PortForward::tcp(3000, 3000)];
        let mut b = a.clone();
        b.npm_packages.reverse();
        b.port_forwards.reverse();
        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn project_location_is_irrelevant() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        let settings = VmSettings::default();

        write_hash(&ProjectPaths::new(one.path()), &settings).unwrap();
        write_hash(&ProjectPaths::new(two.path()), &settings).unwrap();

        let a = std::fs::read_to_string(ProjectPaths::new(one.path()).config_hash).unwrap();
        let b = std::fs::read_to_string(ProjectPaths::new(two.path()).config_hash).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn drift_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let mut settings = VmSettings::default();

        assert!(!has_drift(&paths, &settings), "first run is never drift");

        write_hash(&paths, &settings).unwrap();
        assert!(paths.config_hash.exists());
        assert!(!has_drift(&paths, &settings));

        settings.provision_packages.push("vim".into());
        assert!(has_drift(&paths, &settings));

        write_hash(&paths, &settings).unwrap();
        assert!(!has_drift(&paths, &settings));
    }

    #[test]
    fn write_hash_reports_unwritable_metadata_dir() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the metadata directory should be.
        std::fs::write(dir.path().join(".vagrant"), "").unwrap();
        let err = write_hash(&ProjectPaths::new(dir.path()), &VmSettings::default()).unwrap_err();
        assert!(matches!(err, VmError::Persistence { .. }));
    }
}
