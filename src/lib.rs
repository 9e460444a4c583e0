//! Instance-Store Provisioner
//!
//! Idempotent provisioning of AWS EC2 NVMe instance-store storage: discover
//! the raw devices, stripe them into one RAID-0 md array when there are two
//! or more, format the result as XFS, and mount it with a persistent fstab
//! binding.
//!
//! # Pipeline
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Discovery  │──▶│  Assembly   │──▶│  Formatting │──▶│  Mounting   │
//! │ (by-id/nvme)│   │   (mdadm)   │   │ (mkfs.xfs)  │   │(mount/fstab)│
//! └─────────────┘   └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! Every stage checks the existing state of the node before acting, so the
//! binary can run on every boot: a freshly provisioned node gets the full
//! pipeline, an already provisioned node gets a read-only pass.
//!
//! # Modules
//!
//! - [`provision`]: Discovery, assembly, formatting, mounting, orchestration
//! - [`system`]: Command execution boundary, blkid probing, mount tables
//! - [`config`]: Provisioning configuration
//! - [`poll`]: Bounded async polling
//! - [`error`]: Error types and handling

pub mod config;
pub mod error;
pub mod poll;
pub mod provision;
pub mod system;

// Re-export commonly used types
pub use config::ProvisionConfig;
pub use error::{Error, Result};
pub use poll::{poll_until, PollOutcome};
pub use provision::{
    ArrayAssembler, DeviceDiscovery, DeviceSet, MountManager, ProvisionOutcome, Provisioner,
    Stage, VolumeFormatter,
};
pub use system::{CommandOutput, CommandRunner, SystemRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
