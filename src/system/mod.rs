//! Host System Boundary
//!
//! Everything that touches external tools or OS-maintained tables lives here:
//! command invocation, blkid probing, and mount-table/fstab access. Text and
//! JSON scraping of tool output stays inside this module so the provisioning
//! logic above it only sees typed values.

pub mod blkid;
pub mod command;
pub mod mounts;

pub use command::*;
pub use mounts::*;
