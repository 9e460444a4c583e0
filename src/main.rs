//! Instance-Store Provisioner
//!
//! One-shot binary that provisions EC2 NVMe instance-store storage on the
//! local node. Intended to run at boot (systemd oneshot or cloud-init); safe
//! to run repeatedly.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use instance_store_provisioner::{
    ProvisionConfig, ProvisionOutcome, Provisioner, SystemRunner,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Instance-Store Provisioner - RAID-0, XFS, and mount for EC2 NVMe instance storage
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where the provisioned filesystem is mounted
    #[arg(long, env = "MOUNT_PATH", default_value = "/data")]
    mount_path: PathBuf,

    /// md array name (becomes /dev/md/<name>)
    #[arg(long, env = "ARRAY_NAME", default_value = "data0")]
    array_name: String,

    /// by-id link prefix identifying instance-store devices
    #[arg(
        long,
        env = "DEVICE_LINK_PREFIX",
        default_value = "nvme-Amazon_EC2_NVMe_Instance_Storage"
    )]
    device_link_prefix: String,

    /// Model-name substring for the nvme-cli fallback listing
    #[arg(long, env = "MODEL_MATCH", default_value = "Instance Storage")]
    model_match: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting instance-store provisioner");
    info!("  Version: {}", instance_store_provisioner::VERSION);
    info!("  Mount path: {}", args.mount_path.display());
    info!("  Array name: {}", args.array_name);

    let config = ProvisionConfig {
        mount_path: args.mount_path,
        array_name: args.array_name,
        device_link_prefix: args.device_link_prefix,
        fallback_model_match: args.model_match,
        ..ProvisionConfig::default()
    };

    let provisioner = Provisioner::new(config, Arc::new(SystemRunner));

    match provisioner.run().await {
        Ok(ProvisionOutcome::NoEligibleDevices) => {
            info!("Nothing to do on this node");
        }
        Ok(ProvisionOutcome::Provisioned {
            target,
            mount_path,
            device_count,
        }) => {
            info!(
                "{} device(s) provisioned: {} mounted at {}",
                device_count,
                target.display(),
                mount_path.display()
            );
        }
        Err(e) => {
            error!("Provisioning failed: {}", e);
            std::process::exit(1);
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
