//! Mount-table and fstab access
//!
//! The kernel mount table is parsed into typed records here; nothing above
//! this module touches its text format. fstab writes are read-check-append so
//! repeated runs never duplicate an entry.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Mount Table
// =============================================================================

/// One line of the kernel mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mounted device or pseudo-filesystem source
    pub source: String,
    /// Mount point
    pub target: PathBuf,
    /// Filesystem type
    pub fstype: String,
    /// Mount options, comma-separated
    pub options: String,
}

/// Parse `/proc/self/mounts` content. Malformed lines are skipped; octal
/// escapes in path fields (`\040` for space) are decoded.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            Some(MountEntry {
                source: decode_octal_escapes(fields[0]),
                target: PathBuf::from(decode_octal_escapes(fields[1])),
                fstype: fields[2].to_string(),
                options: fields[3].to_string(),
            })
        })
        .collect()
}

/// Read and parse the mount table at `path`
pub fn read_mounts(path: &Path) -> Result<Vec<MountEntry>> {
    Ok(parse_mounts(&fs::read_to_string(path)?))
}

fn decode_octal_escapes(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &field[i + 1..i + 4];
            if let Ok(code) = u8::from_str_radix(digits, 8) {
                out.push(code as char);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

// =============================================================================
// fstab
// =============================================================================

/// True when a non-comment fstab line is keyed by this filesystem UUID
pub fn fstab_contains_uuid(path: &Path, uuid: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let needle = format!("UUID={}", uuid);
    let content = fs::read_to_string(path)?;
    Ok(content.lines().any(|line| {
        let line = line.trim();
        !line.starts_with('#') && line.split_whitespace().next() == Some(needle.as_str())
    }))
}

/// Append a UUID-keyed entry. Callers guard with [`fstab_contains_uuid`];
/// this only normalizes the trailing newline of the existing content.
pub fn append_fstab_entry(
    path: &Path,
    uuid: &str,
    mount_path: &Path,
    fstype: &str,
    options: &str,
) -> Result<()> {
    let mut content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format!(
        "UUID={} {} {} {} 0 2\n",
        uuid,
        mount_path.display(),
        fstype,
        options
    ));
    fs::write(path, content)?;
    Ok(())
}
