// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Localization module: lang, keyboard, xconfig.

use clap::Parser;

use super::{push_flag, push_opt, quote, split_csv};

/// `lang <code> [--addsupport=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "lang", no_binary_name = true, disable_help_flag = true)]
pub struct LangCommand {
    pub language: String,

    #[arg(long)]
    pub addsupport: Option<String>,
}

impl LangCommand {
    pub fn support_list(&self) -> Vec<String> {
        self.addsupport.as_deref().map(split_csv).unwrap_or_default()
    }

    pub fn emit(&self) -> String {
        let mut out = format!("lang {}", quote(&self.language));
        push_opt(&mut out, "addsupport", &self.addsupport);
        out
    }
}

/// `keyboard [layout] [--vckeymap=...] [--xlayouts=...] [--switch=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "keyboard", no_binary_name = true, disable_help_flag = true)]
pub struct KeyboardCommand {
    pub layout: Option<String>,

    #[arg(long)]
    pub vckeymap: Option<String>,

    #[arg(long)]
    pub xlayouts: Option<String>,

    #[arg(long = "switch")]
    pub switch_options: Option<String>,
}

impl KeyboardCommand {
    pub fn x_layouts(&self) -> Vec<String> {
        self.xlayouts.as_deref().map(split_csv).unwrap_or_default()
    }

    pub fn switch_list(&self) -> Vec<String> {
        self.switch_options
            .as_deref()
            .map(split_csv)
            .unwrap_or_default()
    }

    /// The console keymap: an explicit --vckeymap wins over the positional.
    pub fn console_keymap(&self) -> Option<&str> {
        self.vckeymap.as_deref().or(self.layout.as_deref())
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("keyboard");
        if let Some(layout) = &self.layout {
            out.push_str(&format!(" {}", quote(layout)));
        }
        push_opt(&mut out, "vckeymap", &self.vckeymap);
        push_opt(&mut out, "xlayouts", &self.xlayouts);
        push_opt(&mut out, "switch", &self.switch_options);
        out
    }
}

/// `xconfig [--startxonboot] [--defaultdesktop=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "xconfig", no_binary_name = true, disable_help_flag = true)]
pub struct XConfigCommand {
    #[arg(long)]
    pub startxonboot: bool,

    #[arg(long)]
    pub defaultdesktop: Option<String>,
}

impl XConfigCommand {
    pub fn emit(&self) -> String {
        let mut out = String::from("xconfig");
        push_flag(&mut out, "startxonboot", self.startxonboot);
        push_opt(&mut out, "defaultdesktop", &self.defaultdesktop);
        out
    }
}
