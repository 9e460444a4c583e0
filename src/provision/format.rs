//! Filesystem Formatting
//!
//! Lays down XFS on the provisioned block device. A device that already
//! carries any filesystem signature is left untouched, so re-runs after a
//! warm reboot never destroy data.

use crate::error::Result;
use crate::system::blkid;
use crate::system::command::{require_success, CommandRunner};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Log stripe unit passed to mkfs.xfs. Matches the 32 KiB sweet spot for
/// striped md devices while staying under the XFS 256 KiB log-stripe ceiling.
const XFS_LOG_STRIPE: &str = "su=32k";

/// Formats the target device with XFS, once
pub struct VolumeFormatter {
    runner: Arc<dyn CommandRunner>,
}

impl VolumeFormatter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Format `device` unless it already carries a filesystem
    pub async fn format(&self, device: &Path) -> Result<()> {
        if let Some(fstype) = blkid::probe_type(self.runner.as_ref(), device).await? {
            info!(
                "{} already carries a {} filesystem, leaving it alone",
                device.display(),
                fstype
            );
            return Ok(());
        }

        info!("Formatting {} as xfs", device.display());
        let device = device.display().to_string();
        let output = self
            .runner
            .run("mkfs.xfs", &["-l", XFS_LOG_STRIPE, &device])
            .await?;
        require_success("mkfs.xfs", &output)
    }
}
