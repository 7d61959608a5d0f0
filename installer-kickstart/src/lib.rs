// SPDX-License-Identifier: GPL-3.0-only

//! Kickstart ingest and emit pipeline.
//!
//! A kickstart is a declarative installation script. Every command is owned
//! by exactly one service module; parsing delegates each line to its
//! owner's grammar and collects problems into a structured report instead
//! of failing. Emission regenerates a canonical script from the parsed
//! state.

pub mod commands;
pub mod document;
pub mod tokenize;

pub use document::{KickstartData, parse_kickstart};

/// The service modules owning kickstart commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleName {
    Users,
    Storage,
    Payload,
    Network,
    Localization,
    Security,
    Services,
    Runtime,
}

impl ModuleName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Storage => "Storage",
            Self::Payload => "Payload",
            Self::Network => "Network",
            Self::Localization => "Localization",
            Self::Security => "Security",
            Self::Services => "Services",
            Self::Runtime => "Runtime",
        }
    }

    pub const ALL: [Self; 8] = [
        Self::Users,
        Self::Storage,
        Self::Payload,
        Self::Network,
        Self::Localization,
        Self::Security,
        Self::Services,
        Self::Runtime,
    ];
}

/// The module owning a kickstart command, or None for unknown commands.
pub fn command_owner(command: &str) -> Option<ModuleName> {
    Some(match command {
        "rootpw" | "user" | "group" | "sshkey" | "sshpw" => ModuleName::Users,
        "autopart" | "part" | "partition" | "ignoredisk" | "iscsi" | "iscsiname" | "zfcp"
        | "nvdimm" => ModuleName::Storage,
        "driverdisk" | "packages" => ModuleName::Payload,
        "network" => ModuleName::Network,
        "lang" | "keyboard" | "xconfig" => ModuleName::Localization,
        "selinux" | "auth" | "authselect" | "authconfig" | "realm" => ModuleName::Security,
        "services" | "firstboot" | "desktop" => ModuleName::Services,
        "graphical" | "text" | "cmdline" | "vnc" | "mediacheck" | "updates" | "pwpolicy" => {
            ModuleName::Runtime
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_exactly_one_owner() {
        // The vocabulary each module advertises; duplicates across modules
        // are a programming error.
        let commands = [
            "rootpw", "user", "group", "sshkey", "sshpw", "autopart", "part", "partition",
            "ignoredisk", "iscsi", "iscsiname", "zfcp", "nvdimm", "driverdisk", "packages",
            "network", "lang", "keyboard", "xconfig", "selinux", "auth", "authselect",
            "authconfig", "realm", "services", "firstboot", "desktop", "graphical", "text",
            "cmdline", "vnc", "mediacheck", "updates", "pwpolicy",
        ];
        for command in commands {
            assert!(command_owner(command).is_some(), "{command} has no owner");
        }
        assert_eq!(command_owner("timezone"), None);
    }
}
