//! RAID-0 Array Assembly
//!
//! Builds one striped md array from the discovered device set, or recognizes
//! an array that already exists and reuses it. After creation the assembler
//! waits (bounded) for the initial resync to settle and records the array
//! descriptor in mdadm.conf so the name survives reboot.

use crate::config::ProvisionConfig;
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollOutcome};
use crate::provision::discovery::DeviceSet;
use crate::system::command::{require_success, CommandRunner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Assembles the striped md array over the instance-store devices
pub struct ArrayAssembler {
    config: ProvisionConfig,
    runner: Arc<dyn CommandRunner>,
}

impl ArrayAssembler {
    pub fn new(config: ProvisionConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Ensure the array exists, returning its device path.
    ///
    /// Reuses the exact configured path when present, then any suffixed
    /// sibling the kernel may have renamed it to, and only creates a new
    /// array when neither is found.
    pub async fn assemble(&self, devices: &DeviceSet) -> Result<PathBuf> {
        let array_path = self.config.md_dir.join(&self.config.array_name);

        if array_path.exists() {
            info!("Array {} already exists, reusing it", array_path.display());
            return Ok(array_path);
        }

        if let Some(existing) = self.find_suffixed_array(&array_path)? {
            warn!(
                "Array exists under renamed path {}, reusing it",
                existing.display()
            );
            return Ok(existing);
        }

        self.create_array(&array_path, devices).await?;
        self.wait_for_initial_sync(&array_path).await?;

        if let Err(e) = self.persist_descriptor().await {
            warn!("Could not persist array descriptor: {}", e);
        }

        Ok(array_path)
    }

    /// Look for the array under a suffixed name (`data0_0` style), as mdadm
    /// renames arrays whose preferred minor is taken. The newest match wins.
    fn find_suffixed_array(&self, array_path: &Path) -> Result<Option<PathBuf>> {
        let pattern = format!("{}*", array_path.display());
        let matches = glob::glob(&pattern)
            .map_err(|e| Error::Configuration(format!("Bad array glob {}: {}", pattern, e)))?;

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in matches {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    debug!("Skipping unreadable glob match: {}", e);
                    continue;
                }
            };
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            match &newest {
                Some((best, _)) if *best >= modified => {}
                _ => newest = Some((modified, path)),
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    async fn create_array(&self, array_path: &Path, devices: &DeviceSet) -> Result<()> {
        info!(
            "Creating RAID-0 array {} from {} device(s)",
            array_path.display(),
            devices.len()
        );

        let array = array_path.display().to_string();
        let name_arg = format!("--name={}", self.config.array_name);
        let raid_devices = format!("--raid-devices={}", devices.len());
        let members: Vec<String> = devices
            .paths()
            .iter()
            .map(|path| path.display().to_string())
            .collect();

        let mut args: Vec<&str> = vec![
            "--create",
            &array,
            "--level=0",
            &name_arg,
            &raid_devices,
        ];
        args.extend(members.iter().map(String::as_str));

        let output = self.runner.run("mdadm", &args).await?;
        require_success("mdadm --create", &output)
    }

    /// Block until `mdadm --detail` stops reporting a resync, or the poll
    /// budget runs out. A timeout is logged and tolerated; RAID-0 has no
    /// redundancy to rebuild, so the initial sync is brief when present at all.
    async fn wait_for_initial_sync(&self, array_path: &Path) -> Result<()> {
        let runner = Arc::clone(&self.runner);
        let array = array_path.to_path_buf();

        let outcome = poll_until(
            self.config.resync_poll_interval,
            self.config.resync_poll_ticks,
            move || {
                let runner = Arc::clone(&runner);
                let array = array.clone();
                async move { Ok(!resync_in_progress(runner.as_ref(), &array).await) }
            },
        )
        .await?;

        match outcome {
            PollOutcome::Settled { ticks } => {
                debug!("Array state settled after {} check(s)", ticks);
            }
            PollOutcome::TimedOut => {
                warn!(
                    "Array {} still resyncing after poll budget, proceeding anyway",
                    array_path.display()
                );
            }
        }
        Ok(())
    }

    /// Record the array in mdadm.conf so the kernel reassembles it under its
    /// configured name at boot. Lines already present are not duplicated.
    async fn persist_descriptor(&self) -> Result<()> {
        let output = self.runner.run("mdadm", &["--detail", "--scan"]).await?;
        require_success("mdadm --detail --scan", &output)?;

        let descriptors: Vec<&str> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.contains(&self.config.array_name))
            .collect();
        if descriptors.is_empty() {
            warn!("mdadm --detail --scan reported no matching array descriptor");
            return Ok(());
        }

        let conf_path = &self.config.mdadm_conf_path;
        if let Some(parent) = conf_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = if conf_path.exists() {
            fs::read_to_string(conf_path)?
        } else {
            String::new()
        };

        let mut appended = 0;
        for descriptor in descriptors {
            if content.lines().any(|line| line.trim() == descriptor) {
                continue;
            }
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(descriptor);
            content.push('\n');
            appended += 1;
        }

        if appended > 0 {
            fs::write(conf_path, content)?;
            info!(
                "Recorded {} array descriptor(s) in {}",
                appended,
                conf_path.display()
            );
        } else {
            debug!("Array descriptor already present in {}", conf_path.display());
        }
        Ok(())
    }
}

/// True while `mdadm --detail` reports a resync in flight. A detail failure
/// reads as "not resyncing" so a vanished array cannot wedge the poll.
async fn resync_in_progress(runner: &dyn CommandRunner, array: &Path) -> bool {
    let array = array.display().to_string();
    let output = match runner.run("mdadm", &["--detail", &array]).await {
        Ok(output) if output.success() => output,
        _ => return false,
    };
    output.stdout.lines().any(|line| {
        let line = line.trim();
        line.starts_with("State :") && line.to_lowercase().contains("resync")
    })
}
