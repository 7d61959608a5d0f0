// SPDX-License-Identifier: GPL-3.0-only

//! Network domain state.

use installer_dbus::structure_fields;
use serde::{Deserialize, Serialize};

/// Configuration of one network device, as requested by kickstart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeviceConfiguration {
    pub device: String,
    pub connection_uuid: String,
    /// Activation requested during installation.
    pub activate: bool,
    pub on_boot: bool,
    pub ip_method: String,
    pub ip_address: String,
    pub netmask: String,
    pub gateway: String,
    pub nameservers: Vec<String>,
}

structure_fields! {
    impl NetworkDeviceConfiguration {
        "device" => device: String,
        "connection-uuid" => connection_uuid: String,
        "activate" => activate: bool,
        "on-boot" => on_boot: bool,
        "ip-method" => ip_method: String,
        "ip-address" => ip_address: String,
        "netmask" => netmask: String,
        "gateway" => gateway: String,
        "nameservers" => nameservers: Vec<String>,
    }
}

/// Network module state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Hostname requested for the installed system.
    pub hostname: String,
    /// Hostname currently configured on the installer environment.
    pub current_hostname: String,
    pub device_configurations: Vec<NetworkDeviceConfiguration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn device_configuration_round_trip() {
        let config = NetworkDeviceConfiguration {
            device: "ens3".into(),
            activate: true,
            on_boot: true,
            ip_method: "dhcp".into(),
            nameservers: vec!["192.0.2.1".into()],
            ..Default::default()
        };
        let decoded =
            NetworkDeviceConfiguration::from_structure(config.to_structure()).expect("decode");
        assert_eq!(decoded, config);
    }
}
