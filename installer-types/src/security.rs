// SPDX-License-Identifier: GPL-3.0-only

//! Security domain state.

use installer_dbus::structure_fields;
use installer_dbus::structure::WireConvert;
use installer_dbus::wire::{TypeHint, WireData, WireError};
use serde::{Deserialize, Serialize};

/// SELinux enforcement requested for the installed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SELinuxMode {
    /// Leave the system default alone.
    #[default]
    Default,
    Disabled,
    Permissive,
    Enforcing,
}

impl SELinuxMode {
    pub fn to_int(self) -> i32 {
        match self {
            Self::Default => -1,
            Self::Disabled => 0,
            Self::Permissive => 1,
            Self::Enforcing => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Default),
            0 => Some(Self::Disabled),
            1 => Some(Self::Permissive),
            2 => Some(Self::Enforcing),
            _ => None,
        }
    }
}

impl WireConvert for SELinuxMode {
    fn hint() -> TypeHint {
        TypeHint::Int32
    }

    fn to_wire(&self) -> WireData {
        WireData::Int32(self.to_int())
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Int32(value) => Self::from_int(value).ok_or(WireError::TypeMismatch {
                expected: "i (selinux mode)".into(),
            }),
            _ => Err(WireError::TypeMismatch {
                expected: "i (selinux mode)".into(),
            }),
        }
    }
}

/// Realm enrollment descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmData {
    pub name: String,
    pub discover_options: Vec<String>,
    pub join_options: Vec<String>,
    pub discovered: bool,
    pub required_packages: Vec<String>,
}

structure_fields! {
    impl RealmData {
        "name" => name: String,
        "discover-options" => discover_options: Vec<String>,
        "join-options" => join_options: Vec<String>,
        "discovered" => discovered: bool,
        "required-packages" => required_packages: Vec<String>,
    }
}

/// Security module state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityState {
    pub selinux: SELinuxMode,
    pub authselect: Vec<String>,
    pub authconfig: Vec<String>,
    pub realm: RealmData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn selinux_mode_int_round_trip() {
        for mode in [
            SELinuxMode::Default,
            SELinuxMode::Disabled,
            SELinuxMode::Permissive,
            SELinuxMode::Enforcing,
        ] {
            assert_eq!(SELinuxMode::from_int(mode.to_int()), Some(mode));
        }
        assert_eq!(SELinuxMode::from_int(7), None);
    }

    #[test]
    fn realm_structure_round_trip() {
        let realm = RealmData {
            name: "EXAMPLE.COM".into(),
            join_options: vec!["--computer-ou=OU=Linux".into()],
            discovered: true,
            required_packages: vec!["realmd".into(), "sssd".into()],
            ..Default::default()
        };
        let decoded = RealmData::from_structure(realm.to_structure()).expect("decode");
        assert_eq!(decoded, realm);
    }
}
