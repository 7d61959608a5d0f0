// SPDX-License-Identifier: GPL-3.0-only

//! Kernel command line synthesis.
//!
//! Arguments are collected in a fixed order: user extras, storage-derived
//! arguments, preserved host arguments, the graphical boot pair, and the
//! SELinux switch. Ordering within the result follows the argument
//! container's contract.

use installer_types::DeviceNode;

use crate::args::BootLoaderArguments;
use crate::platform::Platform;

/// Everything the synthesis pass reads, assembled by the storage service.
#[derive(Debug, Clone, Default)]
pub struct BootArgsContext {
    /// User-provided extra arguments, first in.
    pub extra_args: Vec<String>,
    pub fips_enabled: bool,
    /// Whether /boot is its own filesystem.
    pub separate_boot: bool,
    /// Fstab spec of the stage2 device, for `boot=` under FIPS.
    pub stage2_fstab_spec: String,
    /// Devices transitively required to reach /, /usr and swap.
    pub required_devices: Vec<DeviceNode>,
    /// Swap devices, any order; the largest wins the resume argument.
    pub swap_devices: Vec<DeviceNode>,
    /// FCoE NICs as (nic, hardware address).
    pub fcoe_nics: Vec<(String, String)>,
    /// /sys/firmware/iscsi_boot* exists.
    pub firmware_iscsi_present: bool,
    /// Host command line arguments on the configured allowlist, with their
    /// values.
    pub preserved_args: Vec<(String, Option<String>)>,
    pub graphical: bool,
    /// rhgb or plymouth is provided by the installed system.
    pub plymouth_available: bool,
    pub selinux_disabled: bool,
    pub platform: Platform,
}

/// Arguments a device needs so dracut can assemble it at boot.
fn dracut_arguments(device: &DeviceNode) -> Vec<String> {
    match device.kind.as_str() {
        "fcoe" => vec![format!("fcoe={}:nodcb", device.name)],
        "iscsi" => {
            if device.ibft_configured {
                // The network provider owns iBFT wiring; dracut just needs
                // the firmware switch.
                vec!["rd.iscsi.firmware".to_string()]
            } else {
                vec![format!("netroot=iscsi:{}", device.name)]
            }
        }
        "mdarray" => vec![format!(
            "rd.md.uuid={}",
            device.fstab_spec.trim_start_matches("UUID=")
        )],
        "lvmlv" => vec![format!("rd.lvm.lv={}", device.name)],
        "luks/dm-crypt" => vec![format!(
            "rd.luks.uuid={}",
            device.fstab_spec.trim_start_matches("UUID=")
        )],
        _ => Vec::new(),
    }
}

/// Collect the full kernel command line for the installed system.
pub fn collect_boot_args(ctx: &BootArgsContext) -> BootLoaderArguments {
    let mut args = BootLoaderArguments::new();

    // 1. User extras.
    args.update(ctx.extra_args.iter().cloned());

    // 2. Storage-derived arguments.
    if ctx.fips_enabled && ctx.separate_boot && !ctx.stage2_fstab_spec.is_empty() {
        args.add(format!("boot={}", ctx.stage2_fstab_spec));
    }
    for device in &ctx.required_devices {
        args.update(dracut_arguments(device));
    }
    if ctx.platform.supports_resume() {
        if let Some(swap) = ctx.swap_devices.iter().max_by_key(|device| device.size) {
            if !swap.fstab_spec.is_empty() {
                args.add(format!("resume={}", swap.fstab_spec));
            }
        }
    }
    for (nic, mac) in &ctx.fcoe_nics {
        args.add(format!("ifname={nic}:{mac}"));
    }
    if ctx.firmware_iscsi_present {
        args.add("rd.iscsi.firmware");
    }

    // 3. Preserved host arguments.
    for (name, value) in &ctx.preserved_args {
        match value {
            Some(value) => args.add(format!("{name}={value}")),
            None => args.add(name.clone()),
        }
    }

    // 4. Graphical boot.
    if ctx.graphical && !ctx.platform.is_s390() && ctx.plymouth_available {
        args.add("rhgb");
        args.add("quiet");
    }

    // 5. SELinux.
    if ctx.selinux_disabled {
        args.add("selinux=0");
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_types::DeviceFormat;

    fn swap(name: &str, size: u64) -> DeviceNode {
        DeviceNode {
            name: name.into(),
            kind: "partition".into(),
            size,
            format: DeviceFormat {
                format_type: "swap".into(),
                ..Default::default()
            },
            fstab_spec: format!("UUID={name}"),
            ..Default::default()
        }
    }

    #[test]
    fn the_largest_swap_wins_resume() {
        let ctx = BootArgsContext {
            swap_devices: vec![swap("small", 1 << 30), swap("large", 8 << 30)],
            ..Default::default()
        };
        let args = collect_boot_args(&ctx);
        assert!(args.contains("resume=UUID=large"));
        assert!(!args.contains("resume=UUID=small"));
    }

    #[test]
    fn s390_never_boots_graphically() {
        let ctx = BootArgsContext {
            graphical: true,
            plymouth_available: true,
            platform: Platform::S390,
            ..Default::default()
        };
        let args = collect_boot_args(&ctx);
        assert!(!args.contains("rhgb"));
        // And no resume on s390 either.
        assert!(!args.iter().any(|token| token.starts_with("resume=")));
    }

    #[test]
    fn fips_with_separate_boot_names_the_boot_device() {
        let ctx = BootArgsContext {
            fips_enabled: true,
            separate_boot: true,
            stage2_fstab_spec: "UUID=boot".into(),
            ..Default::default()
        };
        assert!(collect_boot_args(&ctx).contains("boot=UUID=boot"));
    }

    #[test]
    fn extras_come_first_and_selinux_last() {
        let ctx = BootArgsContext {
            extra_args: vec!["audit=1".into()],
            selinux_disabled: true,
            graphical: true,
            plymouth_available: true,
            ..Default::default()
        };
        let rendered = collect_boot_args(&ctx).render();
        assert_eq!(rendered, "audit=1 rhgb quiet selinux=0");
    }

    #[test]
    fn required_devices_bring_their_dracut_arguments() {
        let ctx = BootArgsContext {
            required_devices: vec![
                DeviceNode {
                    name: "md0".into(),
                    kind: "mdarray".into(),
                    fstab_spec: "UUID=1234".into(),
                    ..Default::default()
                },
                DeviceNode {
                    name: "fedora/root".into(),
                    kind: "lvmlv".into(),
                    ..Default::default()
                },
            ],
            firmware_iscsi_present: true,
            ..Default::default()
        };
        let args = collect_boot_args(&ctx);
        assert!(args.contains("rd.md.uuid=1234"));
        assert!(args.contains("rd.lvm.lv=fedora/root"));
        assert!(args.contains("rd.iscsi.firmware"));
    }

    #[test]
    fn preserved_arguments_keep_their_values() {
        let ctx = BootArgsContext {
            preserved_args: vec![
                ("console".into(), Some("ttyS0,115200".into())),
                ("nosmt".into(), None),
            ],
            ..Default::default()
        };
        let args = collect_boot_args(&ctx);
        assert!(args.contains("console=ttyS0,115200"));
        assert!(args.contains("nosmt"));
    }
}
