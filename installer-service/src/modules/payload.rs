// SPDX-License-Identifier: GPL-3.0-only

//! The Payload module: package selection, repositories and installation
//! sources.

use std::path::Path;
use std::sync::Arc;

use installer_contracts::{InstallerError, InstallerErrorKind, PackageResolverProvider};
use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_sys::boot_tools;
use installer_sys::runner::ToolRunner;
use installer_types::{PackagesSelection, RepoConfigurationData, RepoOrigin, SourceKind};

pub const PAYLOAD_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Payload";
pub const PAYLOAD_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Payload";

/// The state slice owned by the Payload module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadState {
    pub selection: PackagesSelection,
    pub packages_seen: bool,
    pub repositories: Vec<RepoConfigurationData>,
    /// Driver disks requested by kickstart.
    pub driver_disk_sources: Vec<String>,
}

impl PayloadState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(packages) = &data.packages {
            self.selection = packages.to_selection();
            self.packages_seen = true;
        }
        self.driver_disk_sources = data
            .driverdisks
            .iter()
            .filter_map(|command| {
                command
                    .partition
                    .clone()
                    .or_else(|| command.source.clone())
            })
            .collect();
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "CoreGroupEnabled" => Ok(tagged(&self.selection.core_group_enabled)),
            "Environment" => Ok(tagged(&self.selection.environment)),
            "Packages" => Ok(tagged(&self.selection.packages)),
            "Groups" => Ok(tagged(&self.selection.groups)),
            "ExcludedPackages" => Ok(tagged(&self.selection.excluded_packages)),
            "Repositories" => Ok(tagged(
                &serde_json::to_string(&self.repositories).unwrap_or_default(),
            )),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    ObjectDecl {
        interface: InterfaceDecl::new(
            PAYLOAD_INTERFACE,
            vec![
                Member::Property {
                    name: "CoreGroupEnabled".into(),
                    hint: TypeHint::Bool,
                    access: Access::Read,
                },
                Member::Property {
                    name: "Environment".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "Packages".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::Read,
                },
                Member::Property {
                    name: "Groups".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::Read,
                },
                Member::Property {
                    name: "ExcludedPackages".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::Read,
                },
                Member::Property {
                    name: "Repositories".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
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

/// Scan a directory for `DD-<n>` driver-disk repositories, synthesizing
/// metadata where the disk shipped bare RPMs.
pub fn generate_driver_disk_repositories(
    directory: &Path,
    runner: &dyn ToolRunner,
    driver_disks_usable: bool,
) -> Result<Vec<RepoConfigurationData>, InstallerError> {
    if !driver_disks_usable {
        tracing::debug!("driver disk repositories are disabled on this host");
        return Ok(Vec::new());
    }
    let Ok(entries) = std::fs::read_dir(directory) else {
        return Ok(Vec::new());
    };

    let mut numbered: Vec<(u32, std::path::PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let number: u32 = name.strip_prefix("DD-")?.parse().ok()?;
            path.is_dir().then_some((number, path))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);

    let mut repositories = Vec::new();
    for (number, path) in numbered {
        let has_rpms = std::fs::read_dir(&path)
            .map(|entries| {
                entries.filter_map(|entry| entry.ok()).any(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .ends_with(".rpm")
                })
            })
            .unwrap_or(false);
        if !has_rpms {
            continue;
        }
        if !path.join("repodata").exists() {
            boot_tools::createrepo(runner, &path)
                .map_err(|error| InstallerError::os(error.to_string()))?;
        }
        repositories.push(RepoConfigurationData {
            name: format!("DD-{number}"),
            origin: RepoOrigin::User,
            url: format!("file://{}", path.display()),
            enabled: true,
            installation_enabled: true,
            ssl_verification_enabled: true,
            ..Default::default()
        });
    }
    Ok(repositories)
}

/// Derive per-child repositories from tree metadata, inheriting everything
/// from the base repository.
pub fn generate_treeinfo_repositories(
    base: &RepoConfigurationData,
    children: &[(String, String)],
) -> Vec<RepoConfigurationData> {
    children
        .iter()
        .map(|(name, url)| {
            let mut repo = base.clone();
            repo.name = name.clone();
            repo.url = url.clone();
            repo.origin = RepoOrigin::Treeinfo;
            repo.installation_enabled = false;
            repo
        })
        .collect()
}

/// Turn a repository into an installation source, dispatching on the URL
/// scheme.
pub fn generate_source_from_repository(
    repo: &RepoConfigurationData,
) -> Result<(SourceKind, String), InstallerError> {
    if repo.origin == RepoOrigin::System {
        return Err(InstallerError::new(
            InstallerErrorKind::SourceSetup,
            format!("repository {} is owned by the installed system", repo.name),
        ));
    }
    if repo.url.is_empty() {
        return Err(InstallerError::new(
            InstallerErrorKind::SourceSetup,
            format!("repository {} has no URL", repo.name),
        ));
    }
    match repo.url_scheme() {
        Some("nfs") => Ok((SourceKind::Nfs, repo.url.clone())),
        Some("hd") => Ok((SourceKind::Harddrive, repo.url.clone())),
        Some("ftp" | "http" | "https" | "file") => Ok((SourceKind::Url, repo.url.clone())),
        _ => Err(InstallerError::new(
            InstallerErrorKind::SourceSetup,
            format!("unsupported protocol in {}", repo.url),
        )),
    }
}

/// Pick the kernel package to install.
pub async fn select_kernel_package(
    resolver: &Arc<dyn PackageResolverProvider>,
    lpae_available: bool,
    excluded_packages: &[String],
) -> Result<Option<String>, InstallerError> {
    let mut candidates = Vec::new();
    if lpae_available {
        candidates.push("kernel-lpae");
    }
    candidates.push("kernel");

    for candidate in candidates {
        if excluded_packages.iter().any(|excluded| excluded == candidate) {
            continue;
        }
        if resolver.is_package_available(candidate).await? {
            return Ok(Some(candidate.to_string()));
        }
    }
    Ok(None)
}
