// SPDX-License-Identifier: GPL-3.0-only

//! Storage domain records: the device model consumed by the device-tree
//! facade and the bootloader, and the partitioning request shapes.

use std::fmt;

use installer_dbus::structure_fields;
use serde::{Deserialize, Serialize};

/// Format information of one block device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFormat {
    /// Format type, e.g. "ext4", "biosboot", "swap". Empty when unformatted.
    pub format_type: String,
    pub label: String,
    pub mount_point: String,
    pub mountable: bool,
    /// Size constraints imposed by the format; 0 means unconstrained.
    pub min_size: u64,
    pub max_size: u64,
}

structure_fields! {
    impl DeviceFormat {
        "format-type" => format_type: String,
        "label" => label: String,
        "mount-point" => mount_point: String,
        "mountable" => mountable: bool,
        "min-size" => min_size: u64,
        "max-size" => max_size: u64,
    }
}

/// One node of the device tree, as reported by the block-device provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceNode {
    pub name: String,
    /// Device type, e.g. "disk", "partition", "mdarray", "btrfs subvolume",
    /// "lvmlv", "luks/dm-crypt", "iscsi".
    pub kind: String,
    pub size: u64,
    pub format: DeviceFormat,
    /// Direct parents in the tree.
    pub parents: Vec<String>,
    /// The physical disks this device ultimately lives on.
    pub disks: Vec<String>,
    /// Disk label type when this node is a disk ("gpt", "msdos", "dasd").
    pub disk_label: String,
    /// RAID level of an mdarray or btrfs volume ("raid1", ...).
    pub raid_level: String,
    /// Metadata version of an existing mdarray.
    pub raid_metadata: String,
    pub protected: bool,
    pub encrypted: bool,
    pub exists: bool,
    /// iSCSI provenance.
    pub is_iscsi: bool,
    pub ibft_configured: bool,
    /// End of a partition, in sectors, 0 when not a partition.
    pub partition_end: u64,
    pub sector_size: u64,
    /// Fstab spec used in kernel arguments (UUID=..., /dev/...).
    pub fstab_spec: String,
}

impl DeviceNode {
    pub fn is_disk(&self) -> bool {
        self.kind == "disk"
    }

    /// Non-linux labels claimed by installation media.
    pub fn carries_install_media_label(&self) -> bool {
        matches!(self.format.label.as_str(), "ANACONDA" | "LIVE")
    }
}

/// Configuration of automatic partitioning.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitioningRequest {
    /// Partitioning scheme: 0 plain, 1 btrfs, 2 lvm, 3 lvm thin.
    pub partitioning_scheme: i32,
    pub file_system_type: String,
    pub excluded_mount_points: Vec<String>,
    pub encrypted: bool,
    pub passphrase: String,
    pub cipher: String,
    pub luks_version: String,
    pub pbkdf: String,
    pub pbkdf_memory: i32,
    pub pbkdf_time: i32,
    pub pbkdf_iterations: i32,
    pub escrow_certificate: String,
    pub backup_passphrase_enabled: bool,
}

structure_fields! {
    impl PartitioningRequest {
        "partitioning-scheme" => partitioning_scheme: i32,
        "file-system-type" => file_system_type: String,
        "excluded-mount-points" => excluded_mount_points: Vec<String>,
        "encrypted" => encrypted: bool,
        "passphrase" => passphrase: String,
        "cipher" => cipher: String,
        "luks-version" => luks_version: String,
        "pbkdf" => pbkdf: String,
        "pbkdf-memory" => pbkdf_memory: i32,
        "pbkdf-time" => pbkdf_time: i32,
        "pbkdf-iterations" => pbkdf_iterations: i32,
        "escrow-certificate" => escrow_certificate: String,
        "backup-passphrase-enabled" => backup_passphrase_enabled: bool,
    }
}

impl fmt::Debug for PartitioningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitioningRequest")
            .field("partitioning_scheme", &self.partitioning_scheme)
            .field("file_system_type", &self.file_system_type)
            .field("encrypted", &self.encrypted)
            .field("passphrase_set", &!self.passphrase.is_empty())
            .finish_non_exhaustive()
    }
}

/// One mount point assignment for manual partitioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPointRequest {
    pub device_spec: String,
    pub mount_point: String,
    pub reformat: bool,
    pub format_type: String,
    pub format_options: String,
    pub mount_options: String,
}

structure_fields! {
    impl MountPointRequest {
        "device-spec" => device_spec: String,
        "mount-point" => mount_point: String,
        "reformat" => reformat: bool,
        "format-type" => format_type: String,
        "format-options" => format_options: String,
        "mount-options" => mount_options: String,
    }
}

/// Request consumed by the device factory (interactive partitioning).
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceFactoryRequest {
    /// Device type: 0 lvm, 1 md, 2 partition, 3 btrfs, 4 disk, 5 lvm thin.
    pub device_type: i32,
    pub device_spec: String,
    pub disks: Vec<String>,
    pub mount_point: String,
    pub reformat: bool,
    pub format_type: String,
    pub label: String,
    pub device_name: String,
    pub device_size: u64,
    pub device_encrypted: bool,
    pub passphrase: String,
    pub device_raid_level: String,
    pub container_name: String,
    pub container_encrypted: bool,
    pub container_raid_level: String,
    /// 0 auto, positive fixed size, negative unlimited growth.
    pub container_size_policy: i64,
}

structure_fields! {
    impl DeviceFactoryRequest {
        "device-type" => device_type: i32,
        "device-spec" => device_spec: String,
        "disks" => disks: Vec<String>,
        "mount-point" => mount_point: String,
        "reformat" => reformat: bool,
        "format-type" => format_type: String,
        "label" => label: String,
        "device-name" => device_name: String,
        "device-size" => device_size: u64,
        "device-encrypted" => device_encrypted: bool,
        "passphrase" => passphrase: String,
        "device-raid-level" => device_raid_level: String,
        "container-name" => container_name: String,
        "container-encrypted" => container_encrypted: bool,
        "container-raid-level" => container_raid_level: String,
        "container-size-policy" => container_size_policy: i64,
    }
}

impl fmt::Debug for DeviceFactoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceFactoryRequest")
            .field("device_type", &self.device_type)
            .field("device_spec", &self.device_spec)
            .field("device_encrypted", &self.device_encrypted)
            .field("passphrase_set", &!self.passphrase.is_empty())
            .finish_non_exhaustive()
    }
}

/// Disk selection state of the storage module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSelection {
    pub selected_disks: Vec<String>,
    pub exclusive_disks: Vec<String>,
    pub ignored_disks: Vec<String>,
    pub protected_devices: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;
    use installer_dbus::structure::StructureError;

    #[test]
    fn device_node_structure_round_trip() {
        let node = DeviceNode {
            name: "sda2".into(),
            kind: "partition".into(),
            size: 1 << 30,
            format: DeviceFormat {
                format_type: "ext4".into(),
                mount_point: "/boot".into(),
                mountable: true,
                ..Default::default()
            },
            parents: vec!["sda".into()],
            disks: vec!["sda".into()],
            sector_size: 512,
            partition_end: 2097152,
            exists: true,
            fstab_spec: "UUID=abc".into(),
            ..Default::default()
        };
        let decoded = DeviceFormat::from_structure(node.format.to_structure()).expect("decode");
        assert_eq!(decoded, node.format);
    }

    #[test]
    fn install_media_labels_are_recognized() {
        let mut node = DeviceNode::default();
        assert!(!node.carries_install_media_label());
        node.format.label = "ANACONDA".into();
        assert!(node.carries_install_media_label());
        node.format.label = "LIVE".into();
        assert!(node.carries_install_media_label());
    }

    #[test]
    fn mount_point_request_round_trip() {
        let request = MountPointRequest {
            device_spec: "/dev/sda2".into(),
            mount_point: "/boot".into(),
            reformat: true,
            format_type: "ext4".into(),
            format_options: String::new(),
            mount_options: "ro".into(),
        };
        let decoded = MountPointRequest::from_structure(request.to_structure()).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn partitioning_request_rejects_extra_fields() {
        let mut map = PartitioningRequest::default().to_structure();
        map.insert("surprise".into(), installer_dbus::tagged(&1u32));
        assert!(matches!(
            PartitioningRequest::from_structure(map),
            Err(StructureError::UnknownField(_))
        ));
    }

    #[test]
    fn factory_request_debug_redacts_passphrase() {
        let request = DeviceFactoryRequest {
            passphrase: "tops3cret".into(),
            device_encrypted: true,
            ..Default::default()
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("tops3cret"));
        assert!(rendered.contains("passphrase_set: true"));
    }
}
