// SPDX-License-Identifier: GPL-3.0-only

//! The Localization module.

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_types::LocalizationState;

pub const LOCALIZATION_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Localization";
pub const LOCALIZATION_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Localization";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizationModuleState {
    pub state: LocalizationState,
}

impl LocalizationModuleState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(lang) = &data.lang {
            self.state.language = lang.language.clone();
            self.state.language_support = lang.support_list();
            self.state.language_seen = true;
        }
        if let Some(keyboard) = &data.keyboard {
            self.state.vc_keymap = keyboard
                .console_keymap()
                .unwrap_or_default()
                .to_string();
            self.state.x_layouts = keyboard.x_layouts();
            self.state.layout_switch_options = keyboard.switch_list();
            self.state.keyboard_seen = true;
        }
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "Language" => Ok(tagged(&self.state.language)),
            "LanguageSupport" => Ok(tagged(&self.state.language_support)),
            "VirtualConsoleKeymap" => Ok(tagged(&self.state.vc_keymap)),
            "XLayouts" => Ok(tagged(&self.state.x_layouts)),
            "LayoutSwitchOptions" => Ok(tagged(&self.state.layout_switch_options)),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    let string_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Str,
        access: Access::ReadWrite,
    };
    let list_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Array(Box::new(TypeHint::Str)),
        access: Access::ReadWrite,
    };
    ObjectDecl {
        interface: InterfaceDecl::new(
            LOCALIZATION_INTERFACE,
            vec![
                string_property("Language"),
                list_property("LanguageSupport"),
                string_property("VirtualConsoleKeymap"),
                list_property("XLayouts"),
                list_property("LayoutSwitchOptions"),
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
    fn lang_and_keyboard_feed_the_state() {
        let (data, _) = parse_kickstart(
            "lang cs_CZ.UTF-8 --addsupport=sk_SK\nkeyboard --vckeymap=cz --xlayouts=cz,us --switch=grp:alt_shift_toggle\n",
            "ks.cfg",
        );
        let mut module = LocalizationModuleState::default();
        module.process_kickstart(&data);

        assert_eq!(module.state.language, "cs_CZ.UTF-8");
        assert_eq!(module.state.language_support, vec!["sk_SK"]);
        assert_eq!(module.state.vc_keymap, "cz");
        assert_eq!(module.state.x_layouts, vec!["cz", "us"]);
        assert_eq!(module.state.effective_keyboard(), Some("cz"));
    }
}
