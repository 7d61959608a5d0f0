// SPDX-License-Identifier: GPL-3.0-only

//! Stage1 device eligibility and selection.

use std::collections::BTreeMap;

use installer_contracts::InstallerError;
use installer_types::DeviceNode;

use crate::base::{LoaderKind, stage2_device_errors};
use crate::platform::Platform;

/// Everything the eligibility rules read.
pub struct EligibilityContext<'a> {
    pub platform: Platform,
    pub loader: LoaderKind,
    pub devices: &'a BTreeMap<String, DeviceNode>,
    /// `nonibftiscsiboot` boot option: allow stage1 on software iSCSI that
    /// the firmware does not know about.
    pub non_ibft_iscsi_boot: bool,
}

impl EligibilityContext<'_> {
    fn device(&self, name: &str) -> Option<&DeviceNode> {
        self.devices.get(name)
    }
}

/// All reasons a device is not a valid stage1 target. Empty means valid.
///
/// The early flag skips the mount-point rule, for calls made before
/// mount-point assignment has settled.
pub fn stage1_device_errors(
    ctx: &EligibilityContext<'_>,
    device: &DeviceNode,
    early: bool,
    stage2: Option<&DeviceNode>,
) -> Vec<String> {
    // Stage1 on the stage2 device reuses the stage2 verdict; policy has to
    // explicitly allow that arrangement.
    if let Some(stage2) = stage2 {
        if stage2.name == device.name {
            let mut errors = stage2_device_errors(ctx.loader, stage2);
            if errors.is_empty() {
                errors.push(format!(
                    "{} holds the boot files; using it as the boot target must be explicitly allowed",
                    device.name
                ));
            }
            return errors;
        }
    }

    let constraints = ctx.platform.stage1_constraints();
    let mut errors = Vec::new();
    let name = &device.name;

    // 1. Device type.
    if !constraints.device_types.contains(&device.kind.as_str()) {
        errors.push(format!(
            "{} is of type {}, which this platform cannot boot from",
            name, device.kind
        ));
    }

    // 2. Software iSCSI without firmware configuration.
    if device.is_iscsi && !device.ibft_configured && !ctx.non_ibft_iscsi_boot {
        errors.push(format!(
            "{name} is on an iSCSI disk the firmware does not know how to boot from"
        ));
    }

    // 3. Disk labels of every backing disk.
    for disk_name in &device.disks {
        let Some(disk) = ctx.device(disk_name) else {
            continue;
        };
        let label = disk.disk_label.as_str();
        if label.is_empty() {
            continue;
        }
        if !ctx.platform.disk_label_types().contains(&label)
            || !constraints.disk_label_types.contains(&label)
        {
            errors.push(format!(
                "{name} resides on {disk_name} with an unsupported disk label {label}"
            ));
        }
    }

    // 4. Size window of the format.
    if device.format.min_size > 0 && device.size < device.format.min_size {
        errors.push(format!("{name} is too small for the boot loader"));
    }
    if device.format.max_size > 0 && device.size > device.format.max_size {
        errors.push(format!("{name} is too large for the boot loader"));
    }

    // 5. Firmware-addressable end.
    if let Some(max_end) = constraints.max_end {
        if device.partition_end > 0 && device.sector_size > 0 {
            let end_bytes = device.partition_end.saturating_mul(device.sector_size);
            if end_bytes > max_end {
                errors.push(format!(
                    "{name} ends beyond the address range the firmware can boot from"
                ));
            }
        }
    }

    // 6. RAID shape.
    if !device.raid_level.is_empty() {
        if !constraints.raid_levels.contains(&device.raid_level.as_str()) {
            errors.push(format!(
                "{} uses RAID level {} which cannot hold a boot target here",
                name, device.raid_level
            ));
        } else if device.exists
            && !device.raid_metadata.is_empty()
            && !constraints
                .raid_metadata
                .contains(&device.raid_metadata.as_str())
        {
            errors.push(format!(
                "{} uses RAID metadata {} which the firmware cannot read",
                name, device.raid_metadata
            ));
        }
    }

    // 7. Protection.
    if device.protected {
        errors.push(format!("{name} is protected and cannot be written to"));
    }

    // 8. Installer source media.
    if device.carries_install_media_label() {
        errors.push(format!(
            "{} carries the installation media label {}",
            name, device.format.label
        ));
    }

    // 9. Format type and mount point.
    if !constraints.format_types.is_empty()
        && !constraints
            .format_types
            .contains(&device.format.format_type.as_str())
    {
        errors.push(format!(
            "{} must carry one of {:?}, found {:?}",
            name, constraints.format_types, device.format.format_type
        ));
    }
    if !early
        && !constraints.mount_points.is_empty()
        && !device.format.mount_point.is_empty()
        && !constraints
            .mount_points
            .contains(&device.format.mount_point.as_str())
    {
        errors.push(format!(
            "{} is mounted at {}, not an allowed boot target",
            name, device.format.mount_point
        ));
    }

    // 10. Encryption.
    if device.encrypted && !ctx.loader.encryption_supported() {
        errors.push(format!(
            "{name} is encrypted and the boot loader cannot start from it"
        ));
    }

    errors
}

pub fn is_valid_stage1_device(
    ctx: &EligibilityContext<'_>,
    device: &DeviceNode,
    early: bool,
    stage2: Option<&DeviceNode>,
) -> bool {
    stage1_device_errors(ctx, device, early, stage2).is_empty()
}

/// Pick the first valid stage1 device from an ordered candidate list,
/// restricted to the chosen stage1 disk.
pub fn choose_stage1_device<'a>(
    ctx: &EligibilityContext<'a>,
    candidates: impl IntoIterator<Item = &'a DeviceNode>,
    stage1_disk: &str,
    early: bool,
    stage2: Option<&DeviceNode>,
) -> Result<String, InstallerError> {
    let mut collected = Vec::new();
    for candidate in candidates {
        let on_disk = candidate.name == stage1_disk
            || candidate.disks.iter().any(|disk| disk == stage1_disk);
        if !on_disk {
            continue;
        }
        let errors = stage1_device_errors(ctx, candidate, early, stage2);
        if errors.is_empty() {
            return Ok(candidate.name.clone());
        }
        collected.extend(errors);
    }

    if collected.is_empty() {
        collected.push(format!("no boot target candidates found on {stage1_disk}"));
    }
    Err(InstallerError::bootloader(collected.join("\n")))
}

/// Unwrap a disk image device to its first parent for image installs.
pub fn unwrap_image_device<'a>(
    devices: &'a BTreeMap<String, DeviceNode>,
    device: &'a DeviceNode,
) -> &'a DeviceNode {
    device
        .parents
        .first()
        .and_then(|parent| devices.get(parent))
        .unwrap_or(device)
}
