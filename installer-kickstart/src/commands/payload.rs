// SPDX-License-Identifier: GPL-3.0-only

//! Payload-owned input: the driverdisk command and the %packages section.

use clap::Parser;

use installer_types::PackagesSelection;

use super::{push_flag, push_opt, quote};
use crate::tokenize::Section;

/// `driverdisk [<partition>] [--source=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "driverdisk", no_binary_name = true, disable_help_flag = true)]
pub struct DriverdiskCommand {
    pub partition: Option<String>,

    #[arg(long)]
    pub source: Option<String>,
}

impl DriverdiskCommand {
    pub fn emit(&self) -> String {
        let mut out = String::from("driverdisk");
        if let Some(partition) = &self.partition {
            out.push_str(&format!(" {}", quote(partition)));
        }
        push_opt(&mut out, "source", &self.source);
        out
    }
}

/// Header options of the %packages section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "%packages", no_binary_name = true, disable_help_flag = true)]
pub struct PackagesHeader {
    #[arg(long)]
    pub nocore: bool,

    #[arg(long)]
    pub default: bool,

    #[arg(long, alias = "excludedocs")]
    pub exclude_docs: bool,

    #[arg(long = "exclude-weakdeps")]
    pub exclude_weakdeps: bool,

    #[arg(long)]
    pub ignoremissing: bool,

    #[arg(long)]
    pub multilib: bool,

    #[arg(long = "instLangs")]
    pub inst_langs: Option<String>,

    #[arg(long)]
    pub timeout: Option<i32>,

    #[arg(long)]
    pub retries: Option<i32>,
}

/// The parsed %packages section: header options plus its entries in input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagesSection {
    pub header: PackagesHeader,
    pub environment: Option<String>,
    pub groups: Vec<String>,
    pub packages: Vec<String>,
    pub excluded_groups: Vec<String>,
    pub excluded_packages: Vec<String>,
}

impl PackagesSection {
    pub fn parse(section: &Section) -> Result<Self, clap::Error> {
        let header = PackagesHeader::try_parse_from(&section.header_tokens)?;
        let mut parsed = Self {
            header,
            ..Default::default()
        };

        for raw in &section.body {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            if let Some(environment) = line.strip_prefix("@^") {
                parsed.environment = Some(environment.trim().to_string());
            } else if let Some(group) = line.strip_prefix("-@") {
                parsed.excluded_groups.push(group.trim().to_string());
            } else if let Some(group) = line.strip_prefix('@') {
                parsed.groups.push(group.trim().to_string());
            } else if let Some(package) = line.strip_prefix('-') {
                parsed.excluded_packages.push(package.trim().to_string());
            } else {
                parsed.packages.push(line.to_string());
            }
        }
        Ok(parsed)
    }

    pub fn to_selection(&self) -> PackagesSelection {
        PackagesSelection {
            core_group_enabled: !self.header.nocore,
            default_environment_enabled: self.header.default,
            environment: self.environment.clone().unwrap_or_default(),
            groups: self.groups.clone(),
            packages: self.packages.clone(),
            excluded_groups: self.excluded_groups.clone(),
            excluded_packages: self.excluded_packages.clone(),
            docs_excluded: self.header.exclude_docs,
            weakdeps_excluded: self.header.exclude_weakdeps,
            missing_ignored: self.header.ignoremissing,
            languages: self.header.inst_langs.clone().unwrap_or_default(),
            multilib_policy: if self.header.multilib {
                "all".into()
            } else {
                "best".into()
            },
            timeout: self.header.timeout.unwrap_or(-1),
            retries: self.header.retries.unwrap_or(-1),
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("%packages");
        push_flag(&mut out, "nocore", self.header.nocore);
        push_flag(&mut out, "default", self.header.default);
        push_flag(&mut out, "exclude-docs", self.header.exclude_docs);
        push_flag(&mut out, "exclude-weakdeps", self.header.exclude_weakdeps);
        push_flag(&mut out, "ignoremissing", self.header.ignoremissing);
        push_flag(&mut out, "multilib", self.header.multilib);
        push_opt(&mut out, "instLangs", &self.header.inst_langs);
        if let Some(timeout) = self.header.timeout {
            out.push_str(&format!(" --timeout={timeout}"));
        }
        if let Some(retries) = self.header.retries {
            out.push_str(&format!(" --retries={retries}"));
        }
        out.push('\n');

        if let Some(environment) = &self.environment {
            out.push_str(&format!("@^{environment}\n"));
        }
        for group in &self.groups {
            out.push_str(&format!("@{group}\n"));
        }
        for package in &self.packages {
            out.push_str(&format!("{package}\n"));
        }
        for group in &self.excluded_groups {
            out.push_str(&format!("-@{group}\n"));
        }
        for package in &self.excluded_packages {
            out.push_str(&format!("-{package}\n"));
        }
        out.push_str("%end");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    fn section(source: &str) -> Section {
        tokenize(source).expect("tokenize").sections.remove(0)
    }

    #[test]
    fn packages_section_round_trip() {
        let parsed = PackagesSection::parse(&section(
            "%packages --nocore --ignoremissing\n@^workstation-product-environment\n@core\nvim\n-@games\n-nano\n%end\n",
        ))
        .expect("parse");

        assert_eq!(
            parsed.environment.as_deref(),
            Some("workstation-product-environment")
        );
        assert_eq!(parsed.groups, vec!["core"]);
        assert_eq!(parsed.excluded_packages, vec!["nano"]);
        assert_eq!(
            parsed.emit(),
            "%packages --nocore --ignoremissing\n@^workstation-product-environment\n@core\nvim\n-@games\n-nano\n%end"
        );
    }

    #[test]
    fn selection_reflects_header_options() {
        let parsed = PackagesSection::parse(&section(
            "%packages --nocore --exclude-weakdeps --multilib\n%end\n",
        ))
        .expect("parse");
        let selection = parsed.to_selection();
        assert!(!selection.core_group_enabled);
        assert!(selection.weakdeps_excluded);
        assert_eq!(selection.multilib_policy, "all");
        assert_eq!(selection.timeout, -1);
    }
}
