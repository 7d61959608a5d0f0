// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Errors of the low-level system layer.
#[derive(Debug, Error)]
pub enum SysError {
    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    OperationFailed { command: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mount error: {0}")]
    Mount(String),

    #[error("password hashing is not available: {0}")]
    Crypt(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SysError>;
