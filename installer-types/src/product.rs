// SPDX-License-Identifier: GPL-3.0-only

//! Product identity and runtime front-end configuration.

use std::fmt;

use installer_dbus::structure_fields;
use installer_dbus::structure::WireConvert;
use installer_dbus::wire::{TypeHint, WireData, WireError};
use serde::{Deserialize, Serialize};

/// Which front-end drives the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Gui,
    Tui,
    Cmdline,
}

impl DisplayMode {
    pub fn from_kickstart(value: &str) -> Option<Self> {
        match value {
            "graphical" => Some(Self::Gui),
            "text" => Some(Self::Tui),
            "cmdline" => Some(Self::Cmdline),
            _ => None,
        }
    }

    pub fn kickstart_name(self) -> &'static str {
        match self {
            Self::Gui => "graphical",
            Self::Tui => "text",
            Self::Cmdline => "cmdline",
        }
    }
}

impl WireConvert for DisplayMode {
    fn hint() -> TypeHint {
        TypeHint::Str
    }

    fn to_wire(&self) -> WireData {
        WireData::Str(self.kickstart_name().to_string())
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Str(value) => Self::from_kickstart(&value).ok_or(WireError::TypeMismatch {
                expected: "s (display mode)".into(),
            }),
            _ => Err(WireError::TypeMismatch {
                expected: "s (display mode)".into(),
            }),
        }
    }
}

/// Remote VNC display configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VncConfiguration {
    pub enabled: bool,
    pub host: String,
    pub port: String,
    pub password: String,
}

structure_fields! {
    impl VncConfiguration {
        "enabled" => enabled: bool,
        "host" => host: String,
        "port" => port: String,
        "password" => password: String,
    }
}

impl fmt::Debug for VncConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VncConfiguration")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password_set", &!self.password.is_empty())
            .finish()
    }
}

/// Identity of the product being installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductData {
    pub is_final_release: bool,
    pub name: String,
    pub version: String,
    pub short_name: String,
}

structure_fields! {
    impl ProductData {
        "is-final-release" => is_final_release: bool,
        "name" => name: String,
        "version" => version: String,
        "short-name" => short_name: String,
    }
}

impl Default for ProductData {
    fn default() -> Self {
        let name = "Linux".to_string();
        Self {
            is_final_release: false,
            short_name: Self::short_name_from(&name),
            name,
            version: "rawhide".into(),
        }
    }
}

impl ProductData {
    /// Lowercased name, or the initials of its parts when the name contains
    /// spaces.
    pub fn short_name_from(name: &str) -> String {
        if name.contains(' ') {
            name.split_whitespace()
                .filter_map(|part| part.chars().next())
                .collect::<String>()
                .to_lowercase()
        } else {
            name.to_lowercase()
        }
    }

    /// Version trimmed to two dotted components; "development" becomes
    /// "rawhide".
    pub fn display_version(version: &str) -> String {
        if version == "development" {
            return "rawhide".to_string();
        }
        let mut parts = version.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("{major}.{minor}"),
            _ => version.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn short_names() {
        assert_eq!(ProductData::short_name_from("Fedora"), "fedora");
        assert_eq!(
            ProductData::short_name_from("Red Hat Enterprise Linux"),
            "rhel"
        );
    }

    #[test]
    fn display_versions() {
        assert_eq!(ProductData::display_version("41.0.12"), "41.0");
        assert_eq!(ProductData::display_version("41"), "41");
        assert_eq!(ProductData::display_version("development"), "rawhide");
    }

    #[test]
    fn display_mode_names_round_trip() {
        for mode in [DisplayMode::Gui, DisplayMode::Tui, DisplayMode::Cmdline] {
            assert_eq!(
                DisplayMode::from_kickstart(mode.kickstart_name()),
                Some(mode)
            );
        }
        assert_eq!(DisplayMode::from_kickstart("curses"), None);
    }

    #[test]
    fn vnc_structure_round_trip_and_redaction() {
        let vnc = VncConfiguration {
            enabled: true,
            host: "10.0.0.5".into(),
            port: "5901".into(),
            password: "hunter2".into(),
        };
        let decoded = VncConfiguration::from_structure(vnc.to_structure()).expect("decode");
        assert_eq!(decoded, vnc);
        let rendered = format!("{vnc:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
