// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Security module: selinux, authselect, authconfig,
//! realm.

use clap::Parser;

use installer_types::{RealmData, SELinuxMode};

use super::quote;

/// `selinux [--enforcing|--permissive|--disabled]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "selinux", no_binary_name = true, disable_help_flag = true)]
pub struct SelinuxCommand {
    #[arg(long)]
    pub enforcing: bool,

    #[arg(long)]
    pub permissive: bool,

    #[arg(long)]
    pub disabled: bool,
}

impl SelinuxCommand {
    pub fn mode(&self) -> SELinuxMode {
        if self.enforcing {
            SELinuxMode::Enforcing
        } else if self.permissive {
            SELinuxMode::Permissive
        } else if self.disabled {
            SELinuxMode::Disabled
        } else {
            SELinuxMode::Default
        }
    }

    pub fn emit(&self) -> String {
        let flag = match self.mode() {
            SELinuxMode::Enforcing => " --enforcing",
            SELinuxMode::Permissive => " --permissive",
            SELinuxMode::Disabled => " --disabled",
            SELinuxMode::Default => "",
        };
        format!("selinux{flag}")
    }
}

/// `authselect <raw arguments...>` (also covers the legacy `auth` and
/// `authconfig` spellings, which share the shape).
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "authselect", no_binary_name = true, disable_help_flag = true)]
pub struct AuthselectCommand {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl AuthselectCommand {
    pub fn emit_as(&self, command_name: &str) -> String {
        if self.args.is_empty() {
            command_name.to_string()
        } else {
            format!("{command_name} {}", self.args.join(" "))
        }
    }
}

/// `realm join [--flags...] <domain>`
///
/// Only the join action is recognized; discovery happens at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmCommand {
    pub name: String,
    pub join_options: Vec<String>,
}

impl RealmCommand {
    pub fn parse_tokens(tokens: &[String]) -> Result<Self, String> {
        let mut iter = tokens.iter();
        match iter.next().map(String::as_str) {
            Some("join") => {}
            Some(other) => return Err(format!("unsupported realm action: {other}")),
            None => return Err("realm requires an action".to_string()),
        }

        let mut name = None;
        let mut join_options = Vec::new();
        for token in iter {
            if token.starts_with("--") {
                join_options.push(token.clone());
            } else if name.is_none() {
                name = Some(token.clone());
            } else {
                return Err(format!("unexpected realm argument: {token}"));
            }
        }
        let name = name.ok_or_else(|| "realm join requires a domain".to_string())?;
        Ok(Self { name, join_options })
    }

    pub fn to_realm_data(&self) -> RealmData {
        RealmData {
            name: self.name.clone(),
            discover_options: vec!["--verbose".to_string()],
            join_options: self.join_options.clone(),
            discovered: false,
            required_packages: vec!["realmd".to_string()],
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("realm join");
        for option in &self.join_options {
            out.push_str(&format!(" {option}"));
        }
        out.push_str(&format!(" {}", quote(&self.name)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selinux_modes() {
        let command = SelinuxCommand::try_parse_from(["--disabled"]).expect("parse");
        assert_eq!(command.mode(), SELinuxMode::Disabled);
        assert_eq!(command.emit(), "selinux --disabled");

        let command = SelinuxCommand::try_parse_from([] as [&str; 0]).expect("parse");
        assert_eq!(command.mode(), SELinuxMode::Default);
    }

    #[test]
    fn authselect_keeps_raw_arguments() {
        let command =
            AuthselectCommand::try_parse_from(["select", "sssd", "with-mkhomedir"])
                .expect("parse");
        assert_eq!(
            command.emit_as("authselect"),
            "authselect select sssd with-mkhomedir"
        );
    }

    #[test]
    fn realm_join_parses_options_and_domain() {
        let tokens: Vec<String> = ["join", "--one-time-password=pw", "EXAMPLE.COM"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let command = RealmCommand::parse_tokens(&tokens).expect("parse");
        assert_eq!(command.name, "EXAMPLE.COM");
        assert_eq!(command.join_options, vec!["--one-time-password=pw"]);
        assert_eq!(
            command.emit(),
            "realm join --one-time-password=pw EXAMPLE.COM"
        );
    }

    #[test]
    fn realm_rejects_other_actions() {
        let tokens: Vec<String> = ["discover", "EXAMPLE.COM"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(RealmCommand::parse_tokens(&tokens).is_err());
    }
}
