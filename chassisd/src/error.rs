//! Crate-wide error type.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Firmware image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// The upgrade utility ran but exited nonzero (or was killed, in which
    /// case `status` is `None`).
    #[error("Firmware install failed (status {status:?}): {output}")]
    FirmwareInstall { status: Option<i32>, output: String },

    #[error("{0}")]
    Other(String),
}
