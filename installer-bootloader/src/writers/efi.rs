// SPDX-License-Identifier: GPL-3.0-only

//! EFI firmware boot entry management for the GRUB EFI variants.

use installer_contracts::InstallerError;
use installer_sys::boot_tools;

use crate::base::BootLoader;
use crate::writers::{WriterContext, partition_number, runner_failure};

/// The EFI binary registered in firmware.
fn efi_binary_path(product_short_name: &str) -> String {
    format!("\\EFI\\{product_short_name}\\shimx64.efi")
}

/// Register the product's firmware boot entry.
///
/// Unless the boot order is to be kept, stale entries carrying the product
/// label are removed first so reinstallation does not accumulate entries.
pub fn install(
    ctx: &WriterContext<'_>,
    loader: &BootLoader,
) -> Result<(), InstallerError> {
    let stage1_name = loader
        .stage1_device
        .as_deref()
        .ok_or_else(|| InstallerError::bootloader("no stage1 device for the EFI entry"))?;
    let stage1 = ctx.device(stage1_name)?;
    let disk = stage1
        .disks
        .first()
        .ok_or_else(|| InstallerError::bootloader(format!("{stage1_name} has no backing disk")))?;
    let partition = partition_number(stage1_name).ok_or_else(|| {
        InstallerError::bootloader(format!("{stage1_name} has no partition number"))
    })?;

    if !loader.keep_boot_order {
        for entry in boot_tools::efibootmgr_list(ctx.runner).map_err(runner_failure)? {
            if entry.label == ctx.product_name {
                boot_tools::efibootmgr_remove(ctx.runner, &entry.number)
                    .map_err(runner_failure)?;
            }
        }
    }

    boot_tools::efibootmgr_create(
        ctx.runner,
        &ctx.product_name,
        &format!("/dev/{disk}"),
        partition,
        &efi_binary_path(&ctx.product_short_name),
    )
    .map_err(runner_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LoaderKind;
    use installer_sys::{RecordingRunner, ToolOutcome};
    use installer_types::{DeviceFormat, DeviceNode};
    use std::collections::BTreeMap;

    fn devices() -> BTreeMap<String, DeviceNode> {
        let mut map = BTreeMap::new();
        map.insert(
            "sda1".to_string(),
            DeviceNode {
                name: "sda1".into(),
                kind: "partition".into(),
                format: DeviceFormat {
                    format_type: "efi".into(),
                    mount_point: "/boot/efi".into(),
                    ..Default::default()
                },
                disks: vec!["sda".into()],
                ..Default::default()
            },
        );
        map
    }

    #[test]
    fn stale_product_entries_are_removed_then_recreated() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "Boot0000* Fedora Linux\nBoot0001* UEFI OS\n".into(),
            stderr: String::new(),
        });
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = WriterContext {
            runner: &runner,
            sysroot: dir.path().to_path_buf(),
            devices: &devices,
            product_name: "Fedora Linux".into(),
            product_short_name: "fedora".into(),
            machine_id: "abcd".into(),
            console: None,
            menu_auto_hide: false,
            new_kernel_pkg_present: false,
            is_xen_guest: false,
            root_uuid: "uuid".into(),
            root_subvolume: None,
        };
        let mut loader = BootLoader::new(LoaderKind::EfiGrub);
        loader.stage1_device = Some("sda1".into());

        install(&ctx, &loader).expect("install");

        assert_eq!(
            runner.rendered(),
            vec![
                "efibootmgr",
                "efibootmgr -b 0000 -B",
                "efibootmgr -c -w -L Fedora Linux -d /dev/sda -p 1 -l \\EFI\\fedora\\shimx64.efi",
            ]
        );
    }

    #[test]
    fn keep_boot_order_skips_the_cleanup() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = WriterContext {
            runner: &runner,
            sysroot: dir.path().to_path_buf(),
            devices: &devices,
            product_name: "Fedora Linux".into(),
            product_short_name: "fedora".into(),
            machine_id: "abcd".into(),
            console: None,
            menu_auto_hide: false,
            new_kernel_pkg_present: false,
            is_xen_guest: false,
            root_uuid: "uuid".into(),
            root_subvolume: None,
        };
        let mut loader = BootLoader::new(LoaderKind::EfiGrub);
        loader.stage1_device = Some("sda1".into());
        loader.keep_boot_order = true;

        install(&ctx, &loader).expect("install");
        assert_eq!(runner.invocation_count(), 1);
        assert!(runner.rendered()[0].starts_with("efibootmgr -c"));
    }
}
