//! Provisioner configuration
//!
//! One immutable value constructed at startup and passed into each component;
//! no component reads ambient global state. Host file locations are fields so
//! tests can redirect them to scratch directories.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Where the provisioned volume is mounted
    pub mount_path: PathBuf,
    /// Name for the striped array (multi-device case)
    pub array_name: String,
    /// Stable symlink directory maintained by udev
    pub by_id_dir: PathBuf,
    /// Symlink-name prefix identifying instance-store devices
    pub device_link_prefix: String,
    /// Model-name substring for the nvme-cli fallback listing
    pub fallback_model_match: String,
    /// Directory of named md array nodes
    pub md_dir: PathBuf,
    /// mdadm config file receiving array descriptors
    pub mdadm_conf_path: PathBuf,
    /// Kernel mount table
    pub mounts_path: PathBuf,
    /// Persistent mount table
    pub fstab_path: PathBuf,
    /// Interval between array resync checks
    pub resync_poll_interval: Duration,
    /// Maximum number of resync checks before proceeding anyway
    pub resync_poll_ticks: u32,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            mount_path: PathBuf::from("/data"),
            array_name: "data0".to_string(),
            by_id_dir: PathBuf::from("/dev/disk/by-id"),
            device_link_prefix: "nvme-Amazon_EC2_NVMe_Instance_Storage".to_string(),
            fallback_model_match: "Instance Storage".to_string(),
            md_dir: PathBuf::from("/dev/md"),
            mdadm_conf_path: PathBuf::from("/etc/mdadm.conf"),
            mounts_path: PathBuf::from("/proc/self/mounts"),
            fstab_path: PathBuf::from("/etc/fstab"),
            resync_poll_interval: Duration::from_secs(1),
            resync_poll_ticks: 60,
        }
    }
}
