// SPDX-License-Identifier: GPL-3.0-only

//! The Network module.

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::commands::network::NetworkCommand;
use installer_kickstart::document::KickstartData;
use installer_types::NetworkState;

pub const NETWORK_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Network";
pub const NETWORK_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Network";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkModuleState {
    pub state: NetworkState,
    commands: Vec<NetworkCommand>,
}

impl NetworkModuleState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        self.commands = data.network.clone();
        for command in &data.network {
            if let Some(hostname) = &command.hostname {
                self.state.hostname = hostname.clone();
            }
            if !command.is_hostname_only() {
                self.state
                    .device_configurations
                    .push(command.to_device_configuration());
            }
        }
    }

    pub fn setup_kickstart(&self, data: &mut KickstartData) {
        data.network = self.commands.clone();
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "Hostname" => Ok(tagged(&self.state.hostname)),
            "CurrentHostname" => Ok(tagged(&self.state.current_hostname)),
            "DeviceConfigurations" => Ok(tagged(
                &serde_json::to_string(&self.state.device_configurations).unwrap_or_default(),
            )),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    ObjectDecl {
        interface: InterfaceDecl::new(
            NETWORK_INTERFACE,
            vec![
                Member::Property {
                    name: "Hostname".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "CurrentHostname".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Property {
                    name: "DeviceConfigurations".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Method {
                    name: "ReadKickstart".into(),
                    args: vec![Arg::new("kickstart", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
            ],
        ),
        inherited: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_kickstart::parse_kickstart;

    #[test]
    fn hostname_and_devices_split_correctly() {
        let (data, _) = parse_kickstart(
            "network --hostname=box.example.com\nnetwork --device=ens3 --bootproto=dhcp --activate\n",
            "ks.cfg",
        );
        let mut module = NetworkModuleState::default();
        module.process_kickstart(&data);

        assert_eq!(module.state.hostname, "box.example.com");
        assert_eq!(module.state.device_configurations.len(), 1);
        assert_eq!(module.state.device_configurations[0].device, "ens3");
    }
}
