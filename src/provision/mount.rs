//! Mounting and fstab Persistence
//!
//! Attaches the formatted device at the configured mount path and records a
//! UUID-keyed fstab entry. Both halves are guarded: an occupied mount path or
//! an already-mounted device is a no-op, and the fstab entry is written at
//! most once.

use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::system::blkid;
use crate::system::command::{require_success, CommandRunner};
use crate::system::mounts::{append_fstab_entry, fstab_contains_uuid, read_mounts};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MOUNT_FSTYPE: &str = "xfs";
const MOUNT_OPTIONS: &str = "noatime";
const FSTAB_OPTIONS: &str = "defaults,noatime,nofail";

/// Mounts the provisioned device and persists the binding
pub struct MountManager {
    config: ProvisionConfig,
    runner: Arc<dyn CommandRunner>,
}

impl MountManager {
    pub fn new(config: ProvisionConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Mount `device` at the configured path unless either side is already
    /// in use, then record the fstab binding.
    pub async fn mount(&self, device: &Path) -> Result<()> {
        fs::create_dir_all(&self.config.mount_path)?;

        let table = read_mounts(&self.config.mounts_path)?;

        if table
            .iter()
            .any(|entry| entry.target == self.config.mount_path)
        {
            info!(
                "{} is already mounted, nothing to do",
                self.config.mount_path.display()
            );
            return Ok(());
        }

        let canonical = device
            .canonicalize()
            .unwrap_or_else(|_| device.to_path_buf());
        if let Some(entry) = table.iter().find(|entry| {
            Path::new(&entry.source) == device || Path::new(&entry.source) == canonical
        }) {
            warn!(
                "{} is already mounted at {}, refusing to mount it again",
                device.display(),
                entry.target.display()
            );
            return Ok(());
        }

        info!(
            "Mounting {} at {}",
            device.display(),
            self.config.mount_path.display()
        );
        let device_arg = device.display().to_string();
        let mount_path = self.config.mount_path.display().to_string();
        let output = self
            .runner
            .run("mount", &["-o", MOUNT_OPTIONS, &device_arg, &mount_path])
            .await?;
        require_success("mount", &output)?;

        self.persist_binding(device).await
    }

    /// Record a UUID-keyed fstab entry so the mount survives reboot. A device
    /// without a UUID is logged and skipped; it cannot be keyed durably.
    async fn persist_binding(&self, device: &Path) -> Result<()> {
        let uuid = match blkid::probe_uuid(self.runner.as_ref(), device).await? {
            Some(uuid) => uuid,
            None => {
                warn!(
                    "{} reports no filesystem UUID, skipping fstab entry",
                    device.display()
                );
                return Ok(());
            }
        };

        if fstab_contains_uuid(&self.config.fstab_path, &uuid)? {
            debug!("fstab already carries UUID={}", uuid);
            return Ok(());
        }

        append_fstab_entry(
            &self.config.fstab_path,
            &uuid,
            &self.config.mount_path,
            MOUNT_FSTYPE,
            FSTAB_OPTIONS,
        )?;
        info!(
            "Recorded {} in {}",
            self.config.mount_path.display(),
            self.config.fstab_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::command::testing::ScriptedRunner;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    const ARRAY_UUID: &str = "0b3f170e-23f2-4c31-8c2a-0b671b3f1a5c";

    fn test_config(tmp: &TempDir) -> ProvisionConfig {
        ProvisionConfig {
            mount_path: tmp.path().join("data"),
            mounts_path: tmp.path().join("mounts"),
            fstab_path: tmp.path().join("fstab"),
            ..ProvisionConfig::default()
        }
    }

    fn write_mounts(config: &ProvisionConfig, content: &str) {
        fs::write(&config.mounts_path, content).unwrap();
    }

    #[tokio::test]
    async fn test_mounts_and_persists_fstab() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        write_mounts(&config, "proc /proc proc rw 0 0\n");

        let runner = Arc::new(
            ScriptedRunner::new()
                .on("mount", &[], ScriptedRunner::ok(""))
                .on(
                    "blkid",
                    &["UUID"],
                    ScriptedRunner::ok(&format!("{}\n", ARRAY_UUID)),
                ),
        );
        let manager = MountManager::new(config.clone(), runner.clone());

        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();

        let mounts = runner.invocations("mount");
        assert_eq!(mounts.len(), 1);
        assert_eq!(
            mounts[0],
            vec![
                "-o".to_string(),
                "noatime".to_string(),
                "/dev/md/data0".to_string(),
                config.mount_path.display().to_string(),
            ]
        );
        let fstab = fs::read_to_string(&config.fstab_path).unwrap();
        assert!(fstab.contains(&format!("UUID={}", ARRAY_UUID)));
        assert!(fstab.contains("defaults,noatime,nofail"));
    }

    #[tokio::test]
    async fn test_occupied_mount_path_is_a_noop() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        write_mounts(
            &config,
            &format!(
                "/dev/md127 {} xfs rw,noatime 0 0\n",
                config.mount_path.display()
            ),
        );

        let runner = Arc::new(ScriptedRunner::new());
        let manager = MountManager::new(config.clone(), runner.clone());

        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();

        assert!(runner.invocations("mount").is_empty());
        assert!(runner.invocations("blkid").is_empty());
        assert!(!config.fstab_path.exists());
    }

    #[tokio::test]
    async fn test_device_mounted_elsewhere_is_left_alone() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        write_mounts(&config, "/dev/md/data0 /somewhere/else xfs rw 0 0\n");

        let runner = Arc::new(ScriptedRunner::new());
        let manager = MountManager::new(config.clone(), runner.clone());

        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();

        assert!(runner.invocations("mount").is_empty());
        assert!(!config.fstab_path.exists());
    }

    #[tokio::test]
    async fn test_fstab_entry_written_once_across_runs() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        write_mounts(&config, "proc /proc proc rw 0 0\n");

        let runner = Arc::new(
            ScriptedRunner::new()
                .on("mount", &[], ScriptedRunner::ok(""))
                .on(
                    "blkid",
                    &["UUID"],
                    ScriptedRunner::ok(&format!("{}\n", ARRAY_UUID)),
                ),
        );
        let manager = MountManager::new(config.clone(), runner.clone());

        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();
        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();

        let fstab = fs::read_to_string(&config.fstab_path).unwrap();
        assert_eq!(
            fstab.matches(&format!("UUID={}", ARRAY_UUID)).count(),
            1,
            "repeated runs must not duplicate the entry"
        );
    }

    #[tokio::test]
    async fn test_missing_uuid_skips_fstab() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        write_mounts(&config, "proc /proc proc rw 0 0\n");

        let runner = Arc::new(
            ScriptedRunner::new()
                .on("mount", &[], ScriptedRunner::ok(""))
                .on("blkid", &["UUID"], ScriptedRunner::fail(2, "")),
        );
        let manager = MountManager::new(config.clone(), runner);

        manager.mount(&PathBuf::from("/dev/md/data0")).await.unwrap();

        assert!(!config.fstab_path.exists());
    }
}
