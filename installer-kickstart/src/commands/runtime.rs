// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Runtime module: the display mode family, vnc,
//! mediacheck, updates and the deprecated pwpolicy.

use clap::Parser;

use installer_types::{DisplayMode, PasswordPolicy, VncConfiguration};

use super::{push_flag, push_opt, quote};

/// The `graphical`, `text` and `cmdline` commands.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct DisplayModeCommand {
    #[arg(skip)]
    pub mode: DisplayMode,

    #[arg(long = "non-interactive")]
    pub non_interactive: bool,
}

impl Default for DisplayModeCommand {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Gui,
            non_interactive: false,
        }
    }
}

impl DisplayModeCommand {
    pub fn parse_tokens(mode: DisplayMode, tokens: &[String]) -> Result<Self, clap::Error> {
        let mut command = Self::try_parse_from(tokens)?;
        command.mode = mode;
        Ok(command)
    }

    pub fn emit(&self) -> String {
        let mut out = self.mode.kickstart_name().to_string();
        push_flag(&mut out, "non-interactive", self.non_interactive);
        out
    }
}

/// `vnc [--host=...] [--port=...] [--password=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "vnc", no_binary_name = true, disable_help_flag = true)]
pub struct VncCommand {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub password: Option<String>,
}

impl VncCommand {
    pub fn to_configuration(&self) -> VncConfiguration {
        VncConfiguration {
            enabled: true,
            host: self.host.clone().unwrap_or_default(),
            port: self.port.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("vnc");
        push_opt(&mut out, "host", &self.host);
        if let Some(port) = &self.port {
            out.push_str(&format!(" --port={port}"));
        }
        push_opt(&mut out, "password", &self.password);
        out
    }
}

/// `mediacheck`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "mediacheck", no_binary_name = true, disable_help_flag = true)]
pub struct MediacheckCommand {}

impl MediacheckCommand {
    pub fn emit(&self) -> String {
        "mediacheck".to_string()
    }
}

/// `updates [url]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "updates", no_binary_name = true, disable_help_flag = true)]
pub struct UpdatesCommand {
    pub url: Option<String>,
}

impl UpdatesCommand {
    pub fn emit(&self) -> String {
        match &self.url {
            Some(url) => format!("updates {}", quote(url)),
            None => "updates".to_string(),
        }
    }
}

/// `pwpolicy <name> [--minlen=...] [--minquality=...] [--strict|--notstrict]
/// [--emptyok|--notempty]`
///
/// Deprecated; parsing succeeds with a deprecation warning and the command
/// is dropped from emission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "pwpolicy", no_binary_name = true, disable_help_flag = true)]
pub struct PwPolicyCommand {
    pub name: String,

    #[arg(long)]
    pub minlen: Option<u32>,

    #[arg(long)]
    pub minquality: Option<u32>,

    #[arg(long)]
    pub strict: bool,

    #[arg(long)]
    pub notstrict: bool,

    #[arg(long)]
    pub emptyok: bool,

    #[arg(long)]
    pub notempty: bool,
}

impl PwPolicyCommand {
    pub fn to_policy(&self) -> PasswordPolicy {
        let defaults = PasswordPolicy::named(&self.name);
        PasswordPolicy {
            min_quality: self.minquality.unwrap_or(defaults.min_quality),
            min_length: self.minlen.unwrap_or(defaults.min_length),
            allow_empty: if self.notempty {
                false
            } else if self.emptyok {
                true
            } else {
                defaults.allow_empty
            },
            is_strict: if self.notstrict {
                false
            } else if self.strict {
                true
            } else {
                defaults.is_strict
            },
        }
    }
}
