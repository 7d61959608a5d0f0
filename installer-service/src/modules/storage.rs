// SPDX-License-Identifier: GPL-3.0-only

//! The Storage module: disk selection, partitioning requests and the
//! device-tree facade.

use std::sync::Arc;

use installer_contracts::{DeviceTreeProvider, InstallerError};
use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_kickstart::commands::storage::{
    AutopartCommand, IgnorediskCommand, IscsiCommand, IscsinameCommand, NvdimmCommand,
    ZfcpCommand,
};
use installer_types::{DeviceNode, DiskSelection, MountPointRequest, PartitioningRequest};

pub const STORAGE_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Storage";
pub const STORAGE_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Storage";

/// The state slice owned by the Storage module (bootloader aside).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageState {
    pub disk_selection: DiskSelection,
    pub partitioning: Option<PartitioningRequest>,
    pub iscsi_initiator: String,
    pub iscsi_targets: Vec<IscsiCommand>,
    pub zfcp_devices: Vec<ZfcpCommand>,
    pub nvdimm_actions: Vec<NvdimmCommand>,
}

impl StorageState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(ignoredisk) = &data.ignoredisk {
            ignoredisk.apply(&mut self.disk_selection);
            // The exclusive set doubles as the selection.
            self.disk_selection.selected_disks = self.disk_selection.exclusive_disks.clone();
        }
        self.partitioning = data
            .autopart
            .as_ref()
            .map(AutopartCommand::to_partitioning_request);
        self.iscsi_initiator = data
            .iscsi_name
            .as_ref()
            .map(|command| command.name.clone())
            .unwrap_or_default();
        self.iscsi_targets = data.iscsi.clone();
        self.zfcp_devices = data.zfcp.clone();
        self.nvdimm_actions = data.nvdimm.clone();
    }

    pub fn setup_kickstart(&self, data: &mut KickstartData) {
        if !self.disk_selection.ignored_disks.is_empty()
            || !self.disk_selection.exclusive_disks.is_empty()
        {
            data.ignoredisk = Some(IgnorediskCommand {
                drives: if self.disk_selection.ignored_disks.is_empty() {
                    None
                } else {
                    Some(self.disk_selection.ignored_disks.join(","))
                },
                only_use: if self.disk_selection.exclusive_disks.is_empty() {
                    None
                } else {
                    Some(self.disk_selection.exclusive_disks.join(","))
                },
            });
        }
        if let Some(partitioning) = &self.partitioning {
            data.autopart = Some(AutopartCommand {
                scheme: match partitioning.partitioning_scheme {
                    1 => Some("btrfs".into()),
                    2 => Some("lvm".into()),
                    3 => Some("thinp".into()),
                    _ => None,
                },
                fstype: (!partitioning.file_system_type.is_empty())
                    .then(|| partitioning.file_system_type.clone()),
                nohome: partitioning
                    .excluded_mount_points
                    .iter()
                    .any(|mount| mount == "/home"),
                noboot: partitioning
                    .excluded_mount_points
                    .iter()
                    .any(|mount| mount == "/boot"),
                noswap: partitioning
                    .excluded_mount_points
                    .iter()
                    .any(|mount| mount == "swap"),
                encrypted: partitioning.encrypted,
                passphrase: (!partitioning.passphrase.is_empty())
                    .then(|| partitioning.passphrase.clone()),
                cipher: (!partitioning.cipher.is_empty()).then(|| partitioning.cipher.clone()),
                luks_version: (!partitioning.luks_version.is_empty())
                    .then(|| partitioning.luks_version.clone()),
                pbkdf: (!partitioning.pbkdf.is_empty()).then(|| partitioning.pbkdf.clone()),
                pbkdf_memory: (partitioning.pbkdf_memory != 0).then_some(partitioning.pbkdf_memory),
                pbkdf_time: (partitioning.pbkdf_time != 0).then_some(partitioning.pbkdf_time),
                pbkdf_iterations: (partitioning.pbkdf_iterations != 0)
                    .then_some(partitioning.pbkdf_iterations),
                escrowcert: (!partitioning.escrow_certificate.is_empty())
                    .then(|| partitioning.escrow_certificate.clone()),
                backuppassphrase: partitioning.backup_passphrase_enabled,
            });
        }
        if !self.iscsi_initiator.is_empty() {
            data.iscsi_name = Some(IscsinameCommand {
                name: self.iscsi_initiator.clone(),
            });
        }
        data.iscsi = self.iscsi_targets.clone();
        data.zfcp = self.zfcp_devices.clone();
        data.nvdimm = self.nvdimm_actions.clone();
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "SelectedDisks" => Ok(tagged(&self.disk_selection.selected_disks)),
            "ExclusiveDisks" => Ok(tagged(&self.disk_selection.exclusive_disks)),
            "IgnoredDisks" => Ok(tagged(&self.disk_selection.ignored_disks)),
            "ProtectedDevices" => Ok(tagged(&self.disk_selection.protected_devices)),
            "IscsiInitiator" => Ok(tagged(&self.iscsi_initiator)),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    let list_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Array(Box::new(TypeHint::Str)),
        access: Access::ReadWrite,
    };
    ObjectDecl {
        interface: InterfaceDecl::new(
            STORAGE_INTERFACE,
            vec![
                list_property("SelectedDisks"),
                list_property("ExclusiveDisks"),
                list_property("IgnoredDisks"),
                list_property("ProtectedDevices"),
                Member::Property {
                    name: "IscsiInitiator".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Method {
                    name: "GatherRequests".into(),
                    args: vec![],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "InstallBootloaderWithTasks".into(),
                    args: vec![
                        Arg::new("payload_type", TypeHint::Str),
                        Arg::new("kernel_versions", TypeHint::Array(Box::new(TypeHint::Str))),
                    ],
                    ret: Some(TypeHint::Array(Box::new(TypeHint::ObjectPath))),
                },
                Member::Method {
                    name: "ReadKickstart".into(),
                    args: vec![Arg::new("kickstart", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "GenerateKickstart".into(),
                    args: vec![],
                    ret: Some(TypeHint::Str),
                },
            ],
        ),
        inherited: vec![],
    }
}

/// Whether manual partitioning should offer this device at all.
fn is_usable(device: &DeviceNode, selection: &DiskSelection) -> bool {
    if device.protected || device.size == 0 {
        return false;
    }
    if selection.selected_disks.is_empty() {
        return true;
    }
    if device.is_disk() {
        return selection.selected_disks.contains(&device.name);
    }
    device
        .disks
        .iter()
        .any(|disk| selection.selected_disks.contains(disk))
}

/// One mount point request for every usable formatted device.
pub fn gather_requests(
    devices: &[DeviceNode],
    selection: &DiskSelection,
) -> Vec<MountPointRequest> {
    devices
        .iter()
        .filter(|device| is_usable(device, selection))
        .filter(|device| !device.format.format_type.is_empty())
        .map(|device| MountPointRequest {
            device_spec: device.name.clone(),
            mount_point: device.format.mount_point.clone(),
            reformat: false,
            format_type: device.format.format_type.clone(),
            format_options: String::new(),
            mount_options: String::new(),
        })
        .collect()
}

/// The facade every storage consumer goes through; the provider stays
/// behind this seam.
pub struct DeviceTreeFacade {
    provider: Arc<dyn DeviceTreeProvider>,
}

impl DeviceTreeFacade {
    pub fn new(provider: Arc<dyn DeviceTreeProvider>) -> Self {
        Self { provider }
    }

    pub async fn devices(&self) -> Result<Vec<DeviceNode>, InstallerError> {
        self.provider.get_devices().await
    }

    pub async fn disks(&self) -> Result<Vec<DeviceNode>, InstallerError> {
        self.provider.get_disks().await
    }

    pub async fn device_data(&self, name: &str) -> Result<DeviceNode, InstallerError> {
        self.provider.get_device_data(name).await
    }

    pub async fn mount_points(&self) -> Result<Vec<(String, String)>, InstallerError> {
        self.provider.get_mount_points().await
    }

    pub async fn actions(&self) -> Result<Vec<String>, InstallerError> {
        self.provider.get_actions().await
    }

    pub async fn setup_device(&self, name: &str) -> Result<(), InstallerError> {
        self.provider.setup_device(name).await
    }

    pub async fn teardown_device(&self, name: &str) -> Result<(), InstallerError> {
        self.provider.teardown_device(name).await
    }

    pub async fn mount_device(&self, name: &str, path: &str) -> Result<(), InstallerError> {
        self.provider.mount_device(name, path).await
    }

    pub async fn unmount_device(&self, name: &str, path: &str) -> Result<(), InstallerError> {
        self.provider.unmount_device(name, path).await
    }

    pub async fn unlock_device(
        &self,
        name: &str,
        passphrase: &str,
    ) -> Result<bool, InstallerError> {
        self.provider.unlock_device(name, passphrase).await
    }

    pub async fn find_optical_media(&self) -> Result<Vec<String>, InstallerError> {
        self.provider.find_optical_media().await
    }

    pub async fn find_mountable_partitions(&self) -> Result<Vec<String>, InstallerError> {
        self.provider.find_mountable_partitions().await
    }
}
