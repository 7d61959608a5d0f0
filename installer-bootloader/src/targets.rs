// SPDX-License-Identifier: GPL-3.0-only

//! Install-target expansion.
//!
//! When stage1 is a whole disk and stage2 lives on redundant RAID, the
//! loader is installed onto every member disk so the machine still boots
//! after losing one.

use std::collections::BTreeMap;

use installer_types::DeviceNode;

use crate::base::LoaderKind;

/// `(stage1, stage2)` pairs to install, expanded for redundancy.
pub fn install_targets(
    loader: LoaderKind,
    stage1: &DeviceNode,
    stage2: &DeviceNode,
    devices: &BTreeMap<String, DeviceNode>,
) -> Vec<(String, String)> {
    if stage1.is_disk() {
        if let Some(member_disks) = redundant_member_disks(loader, stage2, devices) {
            return member_disks
                .into_iter()
                .map(|disk| (disk, stage2.name.clone()))
                .collect();
        }
    }
    vec![(stage1.name.clone(), stage2.name.clone())]
}

/// The member disks of a redundant stage2, when expansion applies.
fn redundant_member_disks(
    loader: LoaderKind,
    stage2: &DeviceNode,
    devices: &BTreeMap<String, DeviceNode>,
) -> Option<Vec<String>> {
    let allowed = loader.stage2_raid_levels();

    // An mdraid stage2: expand through the member partitions' disks.
    if stage2.kind == "mdarray" {
        if !allowed.contains(&stage2.raid_level.as_str()) {
            return None;
        }
        return Some(disks_of_parents(stage2, devices));
    }

    // A btrfs subvolume on a RAID volume: the volume's parents are the
    // underlying partitions.
    if stage2.kind == "btrfs subvolume" {
        let volume = stage2
            .parents
            .first()
            .and_then(|parent| devices.get(parent))?;
        if volume.raid_level.is_empty() || !allowed.contains(&volume.raid_level.as_str()) {
            return None;
        }
        return Some(disks_of_parents(volume, devices));
    }

    None
}

fn disks_of_parents(device: &DeviceNode, devices: &BTreeMap<String, DeviceNode>) -> Vec<String> {
    let mut disks = Vec::new();
    for parent in &device.parents {
        let Some(member) = devices.get(parent) else {
            continue;
        };
        for disk in &member.disks {
            if !disks.contains(disk) {
                disks.push(disk.clone());
            }
        }
    }
    disks
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_types::DeviceFormat;

    fn partition(name: &str, disk: &str) -> DeviceNode {
        DeviceNode {
            name: name.into(),
            kind: "partition".into(),
            parents: vec![disk.into()],
            disks: vec![disk.into()],
            ..Default::default()
        }
    }

    fn raid_layout() -> BTreeMap<String, DeviceNode> {
        let mut devices = BTreeMap::new();
        for disk in ["sda", "sdb"] {
            devices.insert(
                disk.to_string(),
                DeviceNode {
                    name: disk.into(),
                    kind: "disk".into(),
                    ..Default::default()
                },
            );
        }
        devices.insert("sda2".into(), partition("sda2", "sda"));
        devices.insert("sdb2".into(), partition("sdb2", "sdb"));
        devices.insert(
            "md0".into(),
            DeviceNode {
                name: "md0".into(),
                kind: "mdarray".into(),
                raid_level: "raid1".into(),
                parents: vec!["sda2".into(), "sdb2".into()],
                format: DeviceFormat {
                    format_type: "ext4".into(),
                    mount_point: "/boot".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        devices
    }

    #[test]
    fn disk_stage1_with_raid1_stage2_expands_to_member_disks() {
        let devices = raid_layout();
        let targets = install_targets(
            LoaderKind::Grub2,
            &devices["sda"],
            &devices["md0"],
            &devices,
        );
        assert_eq!(
            targets,
            vec![
                ("sda".to_string(), "md0".to_string()),
                ("sdb".to_string(), "md0".to_string()),
            ]
        );
    }

    #[test]
    fn partition_stage1_does_not_expand() {
        let mut devices = raid_layout();
        devices.insert(
            "sda1".into(),
            DeviceNode {
                name: "sda1".into(),
                kind: "partition".into(),
                format: DeviceFormat {
                    format_type: "biosboot".into(),
                    ..Default::default()
                },
                parents: vec!["sda".into()],
                disks: vec!["sda".into()],
                ..Default::default()
            },
        );
        let targets = install_targets(
            LoaderKind::Grub2,
            &devices["sda1"],
            &devices["md0"],
            &devices,
        );
        assert_eq!(targets, vec![("sda1".to_string(), "md0".to_string())]);
    }

    #[test]
    fn btrfs_subvolume_on_raid_expands_through_the_volume() {
        let mut devices = raid_layout();
        devices.insert("sda4".into(), partition("sda4", "sda"));
        devices.insert("sdb4".into(), partition("sdb4", "sdb"));
        devices.insert(
            "btrfs-volume".into(),
            DeviceNode {
                name: "btrfs-volume".into(),
                kind: "btrfs volume".into(),
                raid_level: "raid1".into(),
                parents: vec!["sda4".into(), "sdb4".into()],
                ..Default::default()
            },
        );
        devices.insert(
            "root-subvol".into(),
            DeviceNode {
                name: "root-subvol".into(),
                kind: "btrfs subvolume".into(),
                parents: vec!["btrfs-volume".into()],
                ..Default::default()
            },
        );

        let targets = install_targets(
            LoaderKind::Grub2,
            &devices["sda"],
            &devices["root-subvol"],
            &devices,
        );
        assert_eq!(
            targets,
            vec![
                ("sda".to_string(), "root-subvol".to_string()),
                ("sdb".to_string(), "root-subvol".to_string()),
            ]
        );
    }

    #[test]
    fn unsupported_raid_levels_do_not_expand() {
        let mut devices = raid_layout();
        devices.get_mut("md0").expect("md0").raid_level = "raid0".into();
        let targets = install_targets(
            LoaderKind::Grub2,
            &devices["sda"],
            &devices["md0"],
            &devices,
        );
        assert_eq!(targets, vec![("sda".to_string(), "md0".to_string())]);
    }
}
