// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Services module: services, firstboot, desktop.

use clap::Parser;

use installer_types::SetupOnBoot;

use super::{push_opt, quote, split_csv};

/// `services [--disabled=...] [--enabled=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "services", no_binary_name = true, disable_help_flag = true)]
pub struct ServicesCommand {
    #[arg(long)]
    pub disabled: Option<String>,

    #[arg(long)]
    pub enabled: Option<String>,
}

impl ServicesCommand {
    pub fn disabled_list(&self) -> Vec<String> {
        self.disabled.as_deref().map(split_csv).unwrap_or_default()
    }

    pub fn enabled_list(&self) -> Vec<String> {
        self.enabled.as_deref().map(split_csv).unwrap_or_default()
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("services");
        push_opt(&mut out, "disabled", &self.disabled);
        push_opt(&mut out, "enabled", &self.enabled);
        out
    }
}

/// `firstboot [--enable|--disable|--reconfig]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "firstboot", no_binary_name = true, disable_help_flag = true)]
pub struct FirstbootCommand {
    #[arg(long, alias = "enabled")]
    pub enable: bool,

    #[arg(long, alias = "disabled")]
    pub disable: bool,

    #[arg(long)]
    pub reconfig: bool,
}

impl FirstbootCommand {
    pub fn setup_on_boot(&self) -> SetupOnBoot {
        if self.reconfig {
            SetupOnBoot::Reconfig
        } else if self.disable {
            SetupOnBoot::Disabled
        } else if self.enable {
            SetupOnBoot::Enabled
        } else {
            SetupOnBoot::Default
        }
    }

    pub fn emit(&self) -> String {
        let flag = match self.setup_on_boot() {
            SetupOnBoot::Reconfig => " --reconfig",
            SetupOnBoot::Disabled => " --disable",
            SetupOnBoot::Enabled => " --enable",
            SetupOnBoot::Default => "",
        };
        format!("firstboot{flag}")
    }
}

/// `desktop <name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "desktop", no_binary_name = true, disable_help_flag = true)]
pub struct DesktopCommand {
    pub name: String,
}

impl DesktopCommand {
    pub fn emit(&self) -> String {
        format!("desktop {}", quote(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_round_trip() {
        let command =
            ServicesCommand::try_parse_from(["--disabled=kdump", "--enabled=sshd,chronyd"])
                .expect("parse");
        assert_eq!(
            command.emit(),
            "services --disabled=kdump --enabled=sshd,chronyd"
        );
        assert_eq!(command.enabled_list(), vec!["sshd", "chronyd"]);
    }

    #[test]
    fn firstboot_policies() {
        let command = FirstbootCommand::try_parse_from(["--reconfig"]).expect("parse");
        assert_eq!(command.setup_on_boot(), SetupOnBoot::Reconfig);
        assert_eq!(command.emit(), "firstboot --reconfig");

        let command = FirstbootCommand::try_parse_from(["--enabled"]).expect("parse");
        assert_eq!(command.setup_on_boot(), SetupOnBoot::Enabled);
    }
}
