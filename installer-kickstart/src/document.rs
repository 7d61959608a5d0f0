// SPDX-License-Identifier: GPL-3.0-only

//! The parsed kickstart document: per-module state, structured reports and
//! canonical emission.

use std::collections::BTreeMap;

use clap::Parser;
use installer_contracts::{KickstartMessage, KickstartReport};
use installer_types::{DisplayMode, PasswordPolicy};

use crate::commands::localization::{KeyboardCommand, LangCommand, XConfigCommand};
use crate::commands::network::NetworkCommand;
use crate::commands::payload::{DriverdiskCommand, PackagesSection};
use crate::commands::runtime::{
    DisplayModeCommand, MediacheckCommand, PwPolicyCommand, UpdatesCommand, VncCommand,
};
use crate::commands::security::{AuthselectCommand, RealmCommand, SelinuxCommand};
use crate::commands::services::{DesktopCommand, FirstbootCommand, ServicesCommand};
use crate::commands::storage::{
    AutopartCommand, IgnorediskCommand, IscsiCommand, IscsinameCommand, NvdimmCommand,
    PartCommand, ZfcpCommand,
};
use crate::commands::users::{
    GroupCommand, RootpwCommand, SshKeyCommand, SshPwCommand, UserCommand,
};
use crate::tokenize::{CommandLine, tokenize};
use crate::{ModuleName, command_owner};

/// The whole parsed state of one kickstart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KickstartData {
    pub rootpw: Option<RootpwCommand>,
    pub users: Vec<UserCommand>,
    pub groups: Vec<GroupCommand>,
    pub ssh_keys: Vec<SshKeyCommand>,
    pub ssh_passwords: Vec<SshPwCommand>,

    pub autopart: Option<AutopartCommand>,
    pub partitions: Vec<PartCommand>,
    pub ignoredisk: Option<IgnorediskCommand>,
    pub iscsi: Vec<IscsiCommand>,
    pub iscsi_name: Option<IscsinameCommand>,
    pub zfcp: Vec<ZfcpCommand>,
    pub nvdimm: Vec<NvdimmCommand>,

    pub network: Vec<NetworkCommand>,

    pub lang: Option<LangCommand>,
    pub keyboard: Option<KeyboardCommand>,
    pub xconfig: Option<XConfigCommand>,

    pub selinux: Option<SelinuxCommand>,
    pub authselect: Option<AuthselectCommand>,
    pub authconfig: Option<AuthselectCommand>,
    pub realm: Option<RealmCommand>,

    pub services: Option<ServicesCommand>,
    pub firstboot: Option<FirstbootCommand>,
    pub desktop: Option<DesktopCommand>,

    pub display_mode: Option<DisplayModeCommand>,
    pub vnc: Option<VncCommand>,
    pub mediacheck: Option<MediacheckCommand>,
    pub updates: Option<UpdatesCommand>,
    /// Deprecated input, kept for the policy map but never emitted.
    pub pwpolicies: Vec<PwPolicyCommand>,

    pub driverdisks: Vec<DriverdiskCommand>,
    pub packages: Option<PackagesSection>,

    /// Command groups in first-appearance order, for canonical emission.
    order: Vec<&'static str>,
}

impl KickstartData {
    fn record(&mut self, group: &'static str) {
        if !self.order.contains(&group) {
            self.order.push(group);
        }
    }

    /// Policies keyed by their well-known name, with defaults applied.
    pub fn password_policies(&self) -> BTreeMap<String, PasswordPolicy> {
        let mut policies = BTreeMap::new();
        for name in ["root", "user", "luks"] {
            policies.insert(name.to_string(), PasswordPolicy::named(name));
        }
        for command in &self.pwpolicies {
            policies.insert(command.name.clone(), command.to_policy());
        }
        policies
    }

    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.display_mode.as_ref().map(|command| command.mode)
    }

    /// Regenerate a canonical script.
    ///
    /// Command groups keep their first-appearance order; groups populated
    /// without parsing follow in canonical order. The root password line is
    /// always present: when the input never spoke of it, a lone
    /// `rootpw --lock` line leads the output.
    pub fn emit(&self) -> String {
        const CANONICAL_ORDER: [&str; 29] = [
            "rootpw",
            "user",
            "group",
            "sshkey",
            "sshpw",
            "autopart",
            "part",
            "ignoredisk",
            "iscsiname",
            "iscsi",
            "zfcp",
            "nvdimm",
            "network",
            "lang",
            "keyboard",
            "xconfig",
            "selinux",
            "authselect",
            "authconfig",
            "realm",
            "services",
            "firstboot",
            "desktop",
            "displaymode",
            "vnc",
            "mediacheck",
            "updates",
            "driverdisk",
            "packages",
        ];

        let mut order = self.order.clone();
        for group in CANONICAL_ORDER {
            if !order.contains(&group) {
                order.push(group);
            }
        }
        if let Some(position) = order.iter().position(|group| *group == "rootpw") {
            // The root password line leads when the input never placed it.
            if !self.order.contains(&"rootpw") {
                order.remove(position);
                order.insert(0, "rootpw");
            }
        }

        let mut lines: Vec<String> = Vec::new();
        for group in order {
            match group {
                "rootpw" => {
                    let default = RootpwCommand::default();
                    lines.push(self.rootpw.as_ref().unwrap_or(&default).emit());
                }
                "user" => lines.extend(self.users.iter().map(UserCommand::emit)),
                "group" => lines.extend(self.groups.iter().map(GroupCommand::emit)),
                "sshkey" => lines.extend(self.ssh_keys.iter().map(SshKeyCommand::emit)),
                "sshpw" => lines.extend(self.ssh_passwords.iter().map(SshPwCommand::emit)),
                "autopart" => lines.extend(self.autopart.iter().map(AutopartCommand::emit)),
                "part" => lines.extend(self.partitions.iter().map(PartCommand::emit)),
                "ignoredisk" => lines.extend(self.ignoredisk.iter().map(IgnorediskCommand::emit)),
                "iscsi" => lines.extend(self.iscsi.iter().map(IscsiCommand::emit)),
                "iscsiname" => lines.extend(self.iscsi_name.iter().map(IscsinameCommand::emit)),
                "zfcp" => lines.extend(self.zfcp.iter().map(ZfcpCommand::emit)),
                "nvdimm" => lines.extend(self.nvdimm.iter().map(NvdimmCommand::emit)),
                "network" => lines.extend(self.network.iter().map(NetworkCommand::emit)),
                "lang" => lines.extend(self.lang.iter().map(LangCommand::emit)),
                "keyboard" => lines.extend(self.keyboard.iter().map(KeyboardCommand::emit)),
                "xconfig" => lines.extend(self.xconfig.iter().map(XConfigCommand::emit)),
                "selinux" => lines.extend(self.selinux.iter().map(SelinuxCommand::emit)),
                "authselect" => lines.extend(
                    self.authselect
                        .iter()
                        .map(|command| command.emit_as("authselect")),
                ),
                "authconfig" => lines.extend(
                    self.authconfig
                        .iter()
                        .map(|command| command.emit_as("authconfig")),
                ),
                "realm" => lines.extend(self.realm.iter().map(RealmCommand::emit)),
                "services" => lines.extend(self.services.iter().map(ServicesCommand::emit)),
                "firstboot" => lines.extend(self.firstboot.iter().map(FirstbootCommand::emit)),
                "desktop" => lines.extend(self.desktop.iter().map(DesktopCommand::emit)),
                "displaymode" => {
                    lines.extend(self.display_mode.iter().map(DisplayModeCommand::emit))
                }
                "vnc" => lines.extend(self.vnc.iter().map(VncCommand::emit)),
                "mediacheck" => lines.extend(self.mediacheck.iter().map(MediacheckCommand::emit)),
                "updates" => lines.extend(self.updates.iter().map(UpdatesCommand::emit)),
                "driverdisk" => {
                    lines.extend(self.driverdisks.iter().map(DriverdiskCommand::emit))
                }
                "packages" => lines.extend(self.packages.iter().map(PackagesSection::emit)),
                _ => {}
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn message(
    text: impl Into<String>,
    line: &CommandLine,
    file_name: &str,
    module: Option<ModuleName>,
) -> KickstartMessage {
    KickstartMessage {
        message: text.into(),
        line_number: line.line_number,
        file_name: file_name.to_string(),
        module_name: module.map(|module| module.as_str().to_string()).unwrap_or_default(),
    }
}

fn clap_message(error: &clap::Error, command: &str) -> String {
    let rendered = error.to_string();
    let first = rendered.lines().next().unwrap_or("invalid arguments");
    format!("{command}: {first}")
}

/// Parse a kickstart source into its document and a structured report.
///
/// Problems never abort the parse; each bad line contributes a report entry
/// and the rest of the script is still consumed.
pub fn parse_kickstart(source: &str, file_name: &str) -> (KickstartData, KickstartReport) {
    let mut data = KickstartData::default();
    let mut report = KickstartReport::default();

    let script = match tokenize(source) {
        Ok(script) => script,
        Err((error, line_number)) => {
            report.errors.push(KickstartMessage {
                message: error.to_string(),
                line_number,
                file_name: file_name.to_string(),
                module_name: String::new(),
            });
            return (data, report);
        }
    };

    for line in &script.commands {
        let name = line.tokens[0].as_str();
        let rest = &line.tokens[1..];
        let owner = command_owner(name);

        macro_rules! parse_into {
            ($ty:ty) => {
                match <$ty>::try_parse_from(rest) {
                    Ok(command) => Some(command),
                    Err(error) => {
                        report
                            .errors
                            .push(message(clap_message(&error, name), line, file_name, owner));
                        None
                    }
                }
            };
        }

        match name {
            "rootpw" => {
                if let Some(command) = parse_into!(RootpwCommand) {
                    data.rootpw = Some(command);
                    data.record("rootpw");
                }
            }
            "user" => {
                if let Some(command) = parse_into!(UserCommand) {
                    // Name-based identity: a repeated name replaces the
                    // earlier definition.
                    data.users.retain(|existing| existing.name != command.name);
                    data.users.push(command);
                    data.record("user");
                }
            }
            "group" => {
                if let Some(command) = parse_into!(GroupCommand) {
                    data.groups.push(command);
                    data.record("group");
                }
            }
            "sshkey" => {
                if let Some(command) = parse_into!(SshKeyCommand) {
                    data.ssh_keys.push(command);
                    data.record("sshkey");
                }
            }
            "sshpw" => {
                if let Some(command) = parse_into!(SshPwCommand) {
                    data.ssh_passwords.push(command);
                    data.record("sshpw");
                }
            }
            "autopart" => {
                if let Some(command) = parse_into!(AutopartCommand) {
                    data.autopart = Some(command);
                    data.record("autopart");
                }
            }
            "part" | "partition" => {
                if let Some(command) = parse_into!(PartCommand) {
                    data.partitions.push(command);
                    data.record("part");
                }
            }
            "ignoredisk" => {
                if let Some(command) = parse_into!(IgnorediskCommand) {
                    data.ignoredisk = Some(command);
                    data.record("ignoredisk");
                }
            }
            "iscsi" => {
                if let Some(command) = parse_into!(IscsiCommand) {
                    data.iscsi.push(command);
                    data.record("iscsi");
                }
            }
            "iscsiname" => {
                if let Some(command) = parse_into!(IscsinameCommand) {
                    data.iscsi_name = Some(command);
                    data.record("iscsiname");
                }
            }
            "zfcp" => {
                if let Some(command) = parse_into!(ZfcpCommand) {
                    data.zfcp.push(command);
                    data.record("zfcp");
                }
            }
            "nvdimm" => {
                if let Some(command) = parse_into!(NvdimmCommand) {
                    data.nvdimm.push(command);
                    data.record("nvdimm");
                }
            }
            "network" => {
                if let Some(command) = parse_into!(NetworkCommand) {
                    data.network.push(command);
                    data.record("network");
                }
            }
            "lang" => {
                if let Some(command) = parse_into!(LangCommand) {
                    data.lang = Some(command);
                    data.record("lang");
                }
            }
            "keyboard" => {
                if let Some(command) = parse_into!(KeyboardCommand) {
                    data.keyboard = Some(command);
                    data.record("keyboard");
                }
            }
            "xconfig" => {
                if let Some(command) = parse_into!(XConfigCommand) {
                    data.xconfig = Some(command);
                    data.record("xconfig");
                }
            }
            "selinux" => {
                if let Some(command) = parse_into!(SelinuxCommand) {
                    data.selinux = Some(command);
                    data.record("selinux");
                }
            }
            "authselect" => {
                if let Some(command) = parse_into!(AuthselectCommand) {
                    data.authselect = Some(command);
                    data.record("authselect");
                }
            }
            "auth" | "authconfig" => {
                if let Some(command) = parse_into!(AuthselectCommand) {
                    data.authconfig = Some(command);
                    data.record("authconfig");
                }
            }
            "realm" => match RealmCommand::parse_tokens(rest) {
                Ok(command) => {
                    data.realm = Some(command);
                    data.record("realm");
                }
                Err(error) => {
                    report.errors.push(message(error, line, file_name, owner));
                }
            },
            "services" => {
                if let Some(command) = parse_into!(ServicesCommand) {
                    data.services = Some(command);
                    data.record("services");
                }
            }
            "firstboot" => {
                if let Some(command) = parse_into!(FirstbootCommand) {
                    data.firstboot = Some(command);
                    data.record("firstboot");
                }
            }
            "desktop" => {
                if let Some(command) = parse_into!(DesktopCommand) {
                    data.desktop = Some(command);
                    data.record("desktop");
                }
            }
            "graphical" | "text" | "cmdline" => {
                let mode = DisplayMode::from_kickstart(name).expect("display mode command");
                match DisplayModeCommand::parse_tokens(mode, rest) {
                    Ok(command) => {
                        data.display_mode = Some(command);
                        data.record("displaymode");
                    }
                    Err(error) => {
                        report
                            .errors
                            .push(message(clap_message(&error, name), line, file_name, owner));
                    }
                }
            }
            "vnc" => {
                if let Some(command) = parse_into!(VncCommand) {
                    data.vnc = Some(command);
                    data.record("vnc");
                }
            }
            "mediacheck" => {
                if let Some(command) = parse_into!(MediacheckCommand) {
                    data.mediacheck = Some(command);
                    data.record("mediacheck");
                }
            }
            "updates" => {
                if let Some(command) = parse_into!(UpdatesCommand) {
                    data.updates = Some(command);
                    data.record("updates");
                }
            }
            "pwpolicy" => {
                if let Some(command) = parse_into!(PwPolicyCommand) {
                    report.warnings.push(message(
                        "pwpolicy has been deprecated; configure policies through the runtime service instead",
                        line,
                        file_name,
                        owner,
                    ));
                    data.pwpolicies.push(command);
                }
            }
            "driverdisk" => {
                if let Some(command) = parse_into!(DriverdiskCommand) {
                    data.driverdisks.push(command);
                    data.record("driverdisk");
                }
            }
            unknown => {
                report.errors.push(message(
                    format!("unknown kickstart command: {unknown}"),
                    line,
                    file_name,
                    None,
                ));
            }
        }
    }

    for section in &script.sections {
        match section.name.as_str() {
            "packages" => match PackagesSection::parse(section) {
                Ok(parsed) => {
                    data.packages = Some(parsed);
                    data.record("packages");
                }
                Err(error) => {
                    report.errors.push(KickstartMessage {
                        message: clap_message(&error, "%packages"),
                        line_number: section.line_number,
                        file_name: file_name.to_string(),
                        module_name: ModuleName::Payload.as_str().to_string(),
                    });
                }
            },
            unknown => {
                report.errors.push(KickstartMessage {
                    message: format!("unknown kickstart section: %{unknown}"),
                    line_number: section.line_number,
                    file_name: file_name.to_string(),
                    module_name: String::new(),
                });
            }
        }
    }

    (data, report)
}
