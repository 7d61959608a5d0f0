// SPDX-License-Identifier: GPL-3.0-only

//! The Services module.

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_types::ServicesState;

pub const SERVICES_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Services";
pub const SERVICES_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Services";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicesModuleState {
    pub state: ServicesState,
}

impl ServicesModuleState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(services) = &data.services {
            self.state.enabled_services = services.enabled_list();
            self.state.disabled_services = services.disabled_list();
        }
        if let Some(firstboot) = &data.firstboot {
            self.state.setup_on_boot = firstboot.setup_on_boot();
        }
        if let Some(desktop) = &data.desktop {
            self.state.default_desktop = desktop.name.clone();
        }
        if let Some(xconfig) = &data.xconfig {
            if let Some(desktop) = &xconfig.defaultdesktop {
                self.state.default_desktop = desktop.clone();
            }
            if xconfig.startxonboot {
                self.state.default_target = "graphical.target".into();
            }
        }
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "EnabledServices" => Ok(tagged(&self.state.enabled_services)),
            "DisabledServices" => Ok(tagged(&self.state.disabled_services)),
            "DefaultTarget" => Ok(tagged(&self.state.default_target)),
            "DefaultDesktop" => Ok(tagged(&self.state.default_desktop)),
            "SetupOnBoot" => Ok(tagged(&self.state.setup_on_boot.to_int())),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    let list_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Array(Box::new(TypeHint::Str)),
        access: Access::ReadWrite,
    };
    ObjectDecl {
        interface: InterfaceDecl::new(
            SERVICES_INTERFACE,
            vec![
                list_property("EnabledServices"),
                list_property("DisabledServices"),
                Member::Property {
                    name: "DefaultTarget".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "DefaultDesktop".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "SetupOnBoot".into(),
                    hint: TypeHint::Int32,
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

#[cfg(test)]
mod tests {
    use super::*;
    use installer_kickstart::parse_kickstart;
    use installer_types::SetupOnBoot;

    #[test]
    fn services_and_firstboot_feed_the_state() {
        let (data, _) = parse_kickstart(
            "services --disabled=kdump --enabled=sshd,chronyd\nfirstboot --disable\nxconfig --startxonboot --defaultdesktop=GNOME\n",
            "ks.cfg",
        );
        let mut module = ServicesModuleState::default();
        module.process_kickstart(&data);

        assert_eq!(module.state.enabled_services, vec!["sshd", "chronyd"]);
        assert_eq!(module.state.disabled_services, vec!["kdump"]);
        assert_eq!(module.state.setup_on_boot, SetupOnBoot::Disabled);
        assert_eq!(module.state.default_desktop, "GNOME");
        assert_eq!(module.state.default_target, "graphical.target");
    }
}
