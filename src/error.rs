//! Error types for the instance-store provisioner
//!
//! External-tool failures carry the tool's own stderr verbatim so the
//! operator sees the original diagnostic, not a translation of it.

use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // External Command Errors
    // =========================================================================
    #[error("Command failed: {command} - {reason}")]
    Command { command: String, reason: String },

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;
