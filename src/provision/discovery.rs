//! Instance-Store Device Discovery
//!
//! Enumerates the raw NVMe instance-store devices eligible for provisioning.
//! Primary strategy is the udev by-id symlink namespace; when that yields
//! nothing and nvme-cli is installed, its JSON device listing is used as a
//! fallback. Discovery never fails a run: every I/O problem degrades to
//! "found nothing" with a log line.

use crate::config::ProvisionConfig;
use crate::system::command::CommandRunner;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Device Set
// =============================================================================

/// Ordered, deduplicated set of canonical device paths.
///
/// Construction canonicalizes, deduplicates, and sorts lexicographically, so
/// assembly order is a stable invariant of the underlying device population,
/// not an accident of directory iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSet {
    paths: Vec<PathBuf>,
}

impl DeviceSet {
    /// Build a set from raw candidates. Candidates that no longer resolve to
    /// a real path are dropped.
    pub fn from_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let resolved: BTreeSet<PathBuf> = candidates
            .into_iter()
            .filter_map(|path| match path.canonicalize() {
                Ok(real) => Some(real),
                Err(e) => {
                    debug!("Dropping candidate {}: {}", path.display(), e);
                    None
                }
            })
            .collect();
        Self {
            paths: resolved.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Member paths in assembly order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Discovers instance-store NVMe devices on the local node
pub struct DeviceDiscovery {
    config: ProvisionConfig,
    runner: Arc<dyn CommandRunner>,
}

impl DeviceDiscovery {
    pub fn new(config: ProvisionConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Enumerate eligible devices. An empty set means no instance-store
    /// storage is present; it is a valid outcome, never an error.
    pub async fn discover(&self) -> DeviceSet {
        let mut candidates = self.scan_by_id_links();

        if candidates.is_empty() {
            if self.nvme_cli_available().await {
                debug!("No by-id matches, falling back to nvme-cli listing");
                candidates = self.query_nvme_inventory().await;
            } else {
                debug!("No by-id matches and nvme-cli is unavailable");
            }
        }

        let devices = DeviceSet::from_candidates(candidates);
        info!("Discovered {} instance-store device(s)", devices.len());
        devices
    }

    /// Scan the by-id symlink namespace for entries carrying the configured
    /// vendor/model label prefix. Partition links are skipped.
    fn scan_by_id_links(&self) -> Vec<PathBuf> {
        let dir = &self.config.by_id_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&self.config.device_link_prefix) {
                continue;
            }
            if name.contains("-part") {
                continue;
            }
            found.push(entry.path());
        }
        found
    }

    /// Check if nvme-cli is available
    async fn nvme_cli_available(&self) -> bool {
        self.runner
            .run("nvme", &["version"])
            .await
            .map(|output| output.success())
            .unwrap_or(false)
    }

    /// Fallback listing via `nvme list -o json`, filtered by the configured
    /// model-name substring. Any failure yields nothing, with a warning.
    async fn query_nvme_inventory(&self) -> Vec<PathBuf> {
        let output = match self.runner.run("nvme", &["list", "-o", "json"]).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                warn!("nvme list failed: {}", output.stderr.trim());
                return Vec::new();
            }
            Err(e) => {
                warn!("nvme list failed: {}", e);
                return Vec::new();
            }
        };

        let listing: NvmeListing = match serde_json::from_str(&output.stdout) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("nvme list output was not valid JSON: {}", e);
                return Vec::new();
            }
        };

        listing
            .devices
            .into_iter()
            .filter(|device| {
                device
                    .model_number
                    .contains(&self.config.fallback_model_match)
            })
            .map(|device| PathBuf::from(device.device_path))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct NvmeListing {
    #[serde(rename = "Devices", default)]
    devices: Vec<NvmeListedDevice>,
}

#[derive(Debug, Deserialize)]
struct NvmeListedDevice {
    #[serde(rename = "DevicePath")]
    device_path: String,
    #[serde(rename = "ModelNumber", default)]
    model_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::command::testing::ScriptedRunner;
    use std::os::unix::fs::symlink;
    use tempfile::{tempdir, TempDir};

    fn test_config(tmp: &TempDir) -> ProvisionConfig {
        ProvisionConfig {
            by_id_dir: tmp.path().join("by-id"),
            ..ProvisionConfig::default()
        }
    }

    /// Creates a fake device node plus its by-id link, returning the
    /// canonical device path.
    fn add_device(tmp: &TempDir, link_name: &str, device_name: &str) -> PathBuf {
        let dev_dir = tmp.path().join("dev");
        fs::create_dir_all(&dev_dir).unwrap();
        fs::create_dir_all(tmp.path().join("by-id")).unwrap();

        let device = dev_dir.join(device_name);
        if !device.exists() {
            fs::write(&device, b"").unwrap();
        }
        symlink(&device, tmp.path().join("by-id").join(link_name)).unwrap();
        device.canonicalize().unwrap()
    }

    #[tokio::test]
    async fn test_discovers_matching_links_sorted() {
        let tmp = tempdir().unwrap();
        let dev2 = add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS2222_1",
            "nvme2n1",
        );
        let dev1 = add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1",
            "nvme1n1",
        );
        add_device(&tmp, "nvme-Samsung_SSD_980_PRO_S111", "nvme0n1");

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(ScriptedRunner::new()));
        let devices = discovery.discover().await;

        assert_eq!(devices.paths(), &[dev1, dev2]);
    }

    #[tokio::test]
    async fn test_discovery_is_deterministic() {
        let tmp = tempdir().unwrap();
        add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS2222_1",
            "nvme2n1",
        );
        add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1",
            "nvme1n1",
        );

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(ScriptedRunner::new()));
        let first = discovery.discover().await;
        let second = discovery.discover().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_skips_partition_links() {
        let tmp = tempdir().unwrap();
        let dev = add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1",
            "nvme1n1",
        );
        add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1-part1",
            "nvme1n1p1",
        );

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(ScriptedRunner::new()));
        let devices = discovery.discover().await;

        assert_eq!(devices.paths(), &[dev]);
    }

    #[tokio::test]
    async fn test_deduplicates_links_to_same_device() {
        let tmp = tempdir().unwrap();
        let dev = add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1",
            "nvme1n1",
        );
        add_device(
            &tmp,
            "nvme-Amazon_EC2_NVMe_Instance_Storage_AWS1111_1_ns-1",
            "nvme1n1",
        );

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(ScriptedRunner::new()));
        let devices = discovery.discover().await;

        assert_eq!(devices.paths(), &[dev]);
    }

    #[tokio::test]
    async fn test_missing_by_id_dir_falls_back_to_nvme_cli() {
        let tmp = tempdir().unwrap();
        let dev_dir = tmp.path().join("dev");
        fs::create_dir_all(&dev_dir).unwrap();
        let dev = dev_dir.join("nvme1n1");
        fs::write(&dev, b"").unwrap();

        let listing = format!(
            r#"{{"Devices":[
                {{"DevicePath":"{}","ModelNumber":"Amazon EC2 NVMe Instance Storage"}},
                {{"DevicePath":"{}","ModelNumber":"Amazon Elastic Block Store"}}
            ]}}"#,
            dev.display(),
            dev_dir.join("nvme0n1").display(),
        );
        let runner = ScriptedRunner::new()
            .on("nvme", &["version"], ScriptedRunner::ok("nvme version 2.4"))
            .on("nvme", &["list"], ScriptedRunner::ok(&listing));

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(runner));
        let devices = discovery.discover().await;

        assert_eq!(devices.paths(), &[dev.canonicalize().unwrap()]);
    }

    #[tokio::test]
    async fn test_no_devices_anywhere_is_empty_not_error() {
        let tmp = tempdir().unwrap();
        let runner = ScriptedRunner::new()
            .on("nvme", &["version"], ScriptedRunner::fail(127, "not found"));

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(runner));
        let devices = discovery.discover().await;

        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn test_bad_fallback_json_yields_nothing() {
        let tmp = tempdir().unwrap();
        let runner = ScriptedRunner::new()
            .on("nvme", &["version"], ScriptedRunner::ok("nvme version 2.4"))
            .on("nvme", &["list"], ScriptedRunner::ok("not json at all"));

        let discovery = DeviceDiscovery::new(test_config(&tmp), Arc::new(runner));
        let devices = discovery.discover().await;

        assert!(devices.is_empty());
    }
}
