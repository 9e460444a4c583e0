//! Filesystem signature probing via blkid
//!
//! blkid exits non-zero for a device carrying no recognizable signature; that
//! is "nothing there", not an error, and callers get `None`.

use crate::error::Result;
use crate::system::command::CommandRunner;
use std::path::Path;

/// Existing filesystem type of `device`, if any
pub async fn probe_type(runner: &dyn CommandRunner, device: &Path) -> Result<Option<String>> {
    probe_value(runner, device, "TYPE").await
}

/// Persistent filesystem UUID of `device`, if any
pub async fn probe_uuid(runner: &dyn CommandRunner, device: &Path) -> Result<Option<String>> {
    probe_value(runner, device, "UUID").await
}

async fn probe_value(
    runner: &dyn CommandRunner,
    device: &Path,
    tag: &str,
) -> Result<Option<String>> {
    let device = device.display().to_string();
    let output = runner
        .run("blkid", &["-o", "value", "-s", tag, &device])
        .await?;
    if !output.success() {
        return Ok(None);
    }
    let value = output.stdout_trimmed();
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value.to_string()))
    }
}
