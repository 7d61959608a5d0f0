// SPDX-License-Identifier: GPL-3.0-only

//! Contracts of the external collaborators.
//!
//! The block-device library and the package manager backend stay outside
//! this codebase; these traits pin down exactly what the services consume.

use async_trait::async_trait;

use installer_types::{DeviceNode, RepoConfigurationData};

use crate::InstallerError;

/// The block-device provider: a loaded device tree plus the operations the
/// storage module delegates to it.
#[async_trait]
pub trait DeviceTreeProvider: Send + Sync {
    async fn get_devices(&self) -> Result<Vec<DeviceNode>, InstallerError>;

    async fn get_disks(&self) -> Result<Vec<DeviceNode>, InstallerError>;

    async fn get_mount_points(&self) -> Result<Vec<(String, String)>, InstallerError>;

    async fn get_device_data(&self, name: &str) -> Result<DeviceNode, InstallerError>;

    /// Scheduled actions, human readable, in execution order.
    async fn get_actions(&self) -> Result<Vec<String>, InstallerError>;

    async fn get_required_device_size(&self, bytes: u64) -> Result<u64, InstallerError>;

    async fn get_file_system_free_space(
        &self,
        mount_points: &[String],
    ) -> Result<u64, InstallerError>;

    async fn get_disk_free_space(&self, disk_names: &[String]) -> Result<u64, InstallerError>;

    async fn get_disk_reclaimable_space(
        &self,
        disk_names: &[String],
    ) -> Result<u64, InstallerError>;

    async fn setup_device(&self, name: &str) -> Result<(), InstallerError>;

    async fn teardown_device(&self, name: &str) -> Result<(), InstallerError>;

    async fn mount_device(&self, name: &str, mount_point: &str) -> Result<(), InstallerError>;

    async fn unmount_device(&self, name: &str, mount_point: &str) -> Result<(), InstallerError>;

    async fn unlock_device(&self, name: &str, passphrase: &str) -> Result<bool, InstallerError>;

    async fn find_optical_media(&self) -> Result<Vec<String>, InstallerError>;

    async fn find_mountable_partitions(&self) -> Result<Vec<String>, InstallerError>;
}

/// The package manager backend.
#[async_trait]
pub trait PackageResolverProvider: Send + Sync {
    async fn get_download_size(&self) -> Result<u64, InstallerError>;

    async fn get_installation_size(&self) -> Result<u64, InstallerError>;

    async fn is_package_available(&self, name: &str) -> Result<bool, InstallerError>;

    async fn set_repository_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<(), InstallerError>;

    async fn add_repository(&self, repo: &RepoConfigurationData) -> Result<(), InstallerError>;

    async fn load_repository(&self, name: &str) -> Result<(), InstallerError>;

    async fn get_matching_repositories(&self, pattern: &str)
    -> Result<Vec<String>, InstallerError>;

    /// Configure $releasever and friends for URL substitution.
    async fn configure_substitution(&self, release_version: &str) -> Result<(), InstallerError>;

    async fn substitute(&self, url: &str) -> Result<String, InstallerError>;
}
