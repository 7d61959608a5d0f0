// SPDX-License-Identifier: GPL-3.0-only

//! Error and report shapes crossing the bus.

use installer_dbus::structure_fields;
use installer_dbus::task::TaskFailure;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zbus::fdo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallerErrorKind {
    InvalidInput,
    NotFound,
    /// The device tree is not loaded yet.
    StorageUnavailable,
    UnknownDevice,
    UnknownRepository,
    SourceSetup,
    IncompatibleSource,
    Unsupported,
    Bootloader,
    Os,
    Internal,
}

impl InstallerErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::NotFound => "not-found",
            Self::StorageUnavailable => "storage-unavailable",
            Self::UnknownDevice => "unknown-device",
            Self::UnknownRepository => "unknown-repository",
            Self::SourceSetup => "source-setup",
            Self::IncompatibleSource => "incompatible-source",
            Self::Unsupported => "unsupported",
            Self::Bootloader => "bootloader",
            Self::Os => "os",
            Self::Internal => "internal",
        }
    }
}

/// The error type carried across the bus boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct InstallerError {
    pub kind: InstallerErrorKind,
    pub message: String,
}

impl InstallerError {
    pub fn new(kind: InstallerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(InstallerErrorKind::InvalidInput, message)
    }

    pub fn unknown_device(name: impl AsRef<str>) -> Self {
        Self::new(
            InstallerErrorKind::UnknownDevice,
            format!("unknown device: {}", name.as_ref()),
        )
    }

    pub fn unknown_repository(name: impl AsRef<str>) -> Self {
        Self::new(
            InstallerErrorKind::UnknownRepository,
            format!("unknown repository: {}", name.as_ref()),
        )
    }

    pub fn storage_unavailable() -> Self {
        Self::new(
            InstallerErrorKind::StorageUnavailable,
            "the device tree is not available yet",
        )
    }

    pub fn bootloader(message: impl Into<String>) -> Self {
        Self::new(InstallerErrorKind::Bootloader, message)
    }

    pub fn os(message: impl Into<String>) -> Self {
        Self::new(InstallerErrorKind::Os, message)
    }
}

impl From<InstallerError> for fdo::Error {
    fn from(error: InstallerError) -> Self {
        match error.kind {
            InstallerErrorKind::InvalidInput => fdo::Error::InvalidArgs(error.message),
            InstallerErrorKind::NotFound
            | InstallerErrorKind::UnknownDevice
            | InstallerErrorKind::UnknownRepository => {
                fdo::Error::Failed(error.to_string())
            }
            InstallerErrorKind::Unsupported => fdo::Error::NotSupported(error.message),
            _ => fdo::Error::Failed(error.to_string()),
        }
    }
}

impl From<InstallerError> for TaskFailure {
    fn from(error: InstallerError) -> Self {
        TaskFailure::new(error.kind.as_str(), error.message)
    }
}

/// One kickstart diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickstartMessage {
    pub message: String,
    pub line_number: u32,
    pub file_name: String,
    pub module_name: String,
}

structure_fields! {
    impl KickstartMessage {
        "message" => message: String,
        "line-number" => line_number: u32,
        "file-name" => file_name: String,
        "module-name" => module_name: String,
    }
}

/// The structured result of reading a kickstart. Parse problems are data,
/// not bus errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickstartReport {
    pub errors: Vec<KickstartMessage>,
    pub warnings: Vec<KickstartMessage>,
}

impl KickstartReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: KickstartReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn installer_error_roundtrips() {
        let error = InstallerError::new(InstallerErrorKind::SourceSetup, "repository has no URL");
        let json = serde_json::to_string(&error).expect("serialize error");
        let parsed: InstallerError = serde_json::from_str(&json).expect("deserialize error");
        assert_eq!(parsed, error);
    }

    #[test]
    fn errors_map_to_bus_errors() {
        let error = InstallerError::invalid_input("bad name");
        assert!(matches!(fdo::Error::from(error), fdo::Error::InvalidArgs(_)));
    }

    #[test]
    fn kickstart_message_structure_round_trip() {
        let message = KickstartMessage {
            message: "unknown command".into(),
            line_number: 7,
            file_name: "ks.cfg".into(),
            module_name: "users".into(),
        };
        let decoded = KickstartMessage::from_structure(message.to_structure()).expect("decode");
        assert_eq!(decoded, message);
    }

    #[test]
    fn report_merge_accumulates() {
        let mut report = KickstartReport::default();
        assert!(report.is_success());
        report.merge(KickstartReport {
            errors: vec![KickstartMessage::default()],
            warnings: vec![],
        });
        assert!(!report.is_success());
    }
}
