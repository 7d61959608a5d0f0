// SPDX-License-Identifier: GPL-3.0-only

//! The Security module.

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_types::{SELinuxMode, SecurityState};

pub const SECURITY_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Security";
pub const SECURITY_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Security";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityModuleState {
    pub state: SecurityState,
}

impl SecurityModuleState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(selinux) = &data.selinux {
            self.state.selinux = selinux.mode();
        }
        if let Some(authselect) = &data.authselect {
            self.state.authselect = authselect.args.clone();
        }
        if let Some(authconfig) = &data.authconfig {
            self.state.authconfig = authconfig.args.clone();
        }
        if let Some(realm) = &data.realm {
            self.state.realm = realm.to_realm_data();
        }
    }

    pub fn selinux_disabled(&self) -> bool {
        self.state.selinux == SELinuxMode::Disabled
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "SELinux" => Ok(tagged(&self.state.selinux.to_int())),
            "Authselect" => Ok(tagged(&self.state.authselect)),
            "Authconfig" => Ok(tagged(&self.state.authconfig)),
            "Realm" => Ok(tagged(
                &serde_json::to_string(&self.state.realm).unwrap_or_default(),
            )),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    ObjectDecl {
        interface: InterfaceDecl::new(
            SECURITY_INTERFACE,
            vec![
                Member::Property {
                    name: "SELinux".into(),
                    hint: TypeHint::Int32,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "Authselect".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "Authconfig".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "Realm".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
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
