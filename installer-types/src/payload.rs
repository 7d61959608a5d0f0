// SPDX-License-Identifier: GPL-3.0-only

//! Payload domain records: package selection and repository configuration.

use installer_dbus::structure_fields;
use installer_dbus::structure::WireConvert;
use installer_dbus::wire::{TypeHint, WireData, WireError};
use serde::{Deserialize, Serialize};

/// Where a repository definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoOrigin {
    #[default]
    User,
    System,
    Treeinfo,
}

impl WireConvert for RepoOrigin {
    fn hint() -> TypeHint {
        TypeHint::Str
    }

    fn to_wire(&self) -> WireData {
        WireData::Str(
            match self {
                Self::User => "user",
                Self::System => "system",
                Self::Treeinfo => "treeinfo",
            }
            .to_string(),
        )
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Str(value) if value == "user" => Ok(Self::User),
            WireData::Str(value) if value == "system" => Ok(Self::System),
            WireData::Str(value) if value == "treeinfo" => Ok(Self::Treeinfo),
            _ => Err(WireError::TypeMismatch {
                expected: "s (repo origin)".into(),
            }),
        }
    }
}

/// Installation source kinds derivable from a repository URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Nfs,
    Harddrive,
    Url,
}

/// One package repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfigurationData {
    pub name: String,
    pub origin: RepoOrigin,
    pub url: String,
    pub cost: i32,
    pub enabled: bool,
    /// Whether the repository also feeds the installation transaction.
    pub installation_enabled: bool,
    pub excluded_packages: Vec<String>,
    pub included_packages: Vec<String>,
    pub proxy: String,
    pub ssl_verification_enabled: bool,
}

structure_fields! {
    impl RepoConfigurationData {
        "name" => name: String,
        "origin" => origin: RepoOrigin,
        "url" => url: String,
        "cost" => cost: i32,
        "enabled" => enabled: bool,
        "installation-enabled" => installation_enabled: bool,
        "excluded-packages" => excluded_packages: Vec<String>,
        "included-packages" => included_packages: Vec<String>,
        "proxy" => proxy: String,
        "ssl-verification-enabled" => ssl_verification_enabled: bool,
    }
}

impl RepoConfigurationData {
    pub fn url_scheme(&self) -> Option<&str> {
        self.url.split_once(':').map(|(scheme, _)| scheme)
    }
}

/// The software selection of the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagesSelection {
    pub core_group_enabled: bool,
    pub default_environment_enabled: bool,
    pub environment: String,
    pub groups: Vec<String>,
    pub packages: Vec<String>,
    pub excluded_groups: Vec<String>,
    pub excluded_packages: Vec<String>,
    pub docs_excluded: bool,
    pub weakdeps_excluded: bool,
    pub missing_ignored: bool,
    pub languages: String,
    pub multilib_policy: String,
    pub timeout: i32,
    pub retries: i32,
}

structure_fields! {
    impl PackagesSelection {
        "core-group-enabled" => core_group_enabled: bool,
        "default-environment-enabled" => default_environment_enabled: bool,
        "environment" => environment: String,
        "groups" => groups: Vec<String>,
        "packages" => packages: Vec<String>,
        "excluded-groups" => excluded_groups: Vec<String>,
        "excluded-packages" => excluded_packages: Vec<String>,
        "docs-excluded" => docs_excluded: bool,
        "weakdeps-excluded" => weakdeps_excluded: bool,
        "missing-ignored" => missing_ignored: bool,
        "languages" => languages: String,
        "multilib-policy" => multilib_policy: String,
        "timeout" => timeout: i32,
        "retries" => retries: i32,
    }
}

impl Default for PackagesSelection {
    fn default() -> Self {
        Self {
            core_group_enabled: true,
            default_environment_enabled: false,
            environment: String::new(),
            groups: Vec::new(),
            packages: Vec::new(),
            excluded_groups: Vec::new(),
            excluded_packages: Vec::new(),
            docs_excluded: false,
            weakdeps_excluded: false,
            missing_ignored: false,
            languages: String::new(),
            multilib_policy: "best".into(),
            timeout: -1,
            retries: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn repo_structure_round_trip() {
        let repo = RepoConfigurationData {
            name: "DD-1".into(),
            origin: RepoOrigin::User,
            url: "file:///run/install/DD-1".into(),
            enabled: true,
            installation_enabled: true,
            ssl_verification_enabled: true,
            ..Default::default()
        };
        let decoded =
            RepoConfigurationData::from_structure(repo.to_structure()).expect("decode");
        assert_eq!(decoded, repo);
    }

    #[test]
    fn url_scheme_extraction() {
        let mut repo = RepoConfigurationData::default();
        assert_eq!(repo.url_scheme(), None);
        repo.url = "nfs:server:/path".into();
        assert_eq!(repo.url_scheme(), Some("nfs"));
        repo.url = "https://mirror.example.com/os".into();
        assert_eq!(repo.url_scheme(), Some("https"));
    }

    #[test]
    fn selection_round_trip_keeps_defaults() {
        let selection = PackagesSelection::default();
        let decoded =
            PackagesSelection::from_structure(selection.to_structure()).expect("decode");
        assert_eq!(decoded, selection);
        assert!(decoded.core_group_enabled);
        assert_eq!(decoded.timeout, -1);
    }
}
