//! Provisioning Orchestrator
//!
//! Sequences discovery, assembly, formatting, and mounting into one
//! idempotent run. Each stage is guarded by its own reuse checks, so running
//! the whole pipeline again converges on the same end state without
//! destroying anything.

use crate::config::ProvisionConfig;
use crate::error::{Error, Result};
use crate::provision::array::ArrayAssembler;
use crate::provision::discovery::DeviceDiscovery;
use crate::provision::format::VolumeFormatter;
use crate::provision::mount::MountManager;
use crate::system::command::CommandRunner;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

// =============================================================================
// Stages and Outcome
// =============================================================================

/// Pipeline stage, for logging and error attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovering,
    Assembling,
    Formatting,
    Mounting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovering => "discovery",
            Stage::Assembling => "array assembly",
            Stage::Formatting => "formatting",
            Stage::Mounting => "mounting",
        };
        f.write_str(name)
    }
}

/// Result of one provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// No instance-store devices are present on this node
    NoEligibleDevices,
    /// Storage is provisioned and mounted
    Provisioned {
        /// Block device carrying the filesystem
        target: PathBuf,
        /// Where it is mounted
        mount_path: PathBuf,
        /// How many instance-store devices back it
        device_count: usize,
    },
}

// =============================================================================
// Provisioner
// =============================================================================

/// Runs the full provisioning pipeline
pub struct Provisioner {
    config: ProvisionConfig,
    discovery: DeviceDiscovery,
    assembler: ArrayAssembler,
    formatter: VolumeFormatter,
    mounter: MountManager,
}

impl Provisioner {
    pub fn new(config: ProvisionConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            discovery: DeviceDiscovery::new(config.clone(), Arc::clone(&runner)),
            assembler: ArrayAssembler::new(config.clone(), Arc::clone(&runner)),
            formatter: VolumeFormatter::new(Arc::clone(&runner)),
            mounter: MountManager::new(config.clone(), runner),
            config,
        }
    }

    /// Execute one provisioning run to completion
    pub async fn run(&self) -> Result<ProvisionOutcome> {
        info!("Starting instance-store provisioning run");

        let devices = self.discovery.discover().await;
        if devices.is_empty() {
            info!("No instance-store devices present, nothing to provision");
            return Ok(ProvisionOutcome::NoEligibleDevices);
        }

        let target = if devices.len() > 1 {
            self.assembler
                .assemble(&devices)
                .await
                .map_err(|e| fail(Stage::Assembling, e))?
        } else {
            let single = devices.paths()[0].clone();
            info!(
                "Single device {}, skipping array assembly",
                single.display()
            );
            single
        };

        self.formatter
            .format(&target)
            .await
            .map_err(|e| fail(Stage::Formatting, e))?;

        self.mounter
            .mount(&target)
            .await
            .map_err(|e| fail(Stage::Mounting, e))?;

        info!(
            "Provisioning complete: {} mounted at {}",
            target.display(),
            self.config.mount_path.display()
        );
        Ok(ProvisionOutcome::Provisioned {
            target,
            mount_path: self.config.mount_path.clone(),
            device_count: devices.len(),
        })
    }
}

fn fail(stage: Stage, err: Error) -> Error {
    error!("Provisioning failed during {}: {}", stage, err);
    err
}

// =============================================================================
// Scenario Tests
// =============================================================================
