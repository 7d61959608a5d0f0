// SPDX-License-Identifier: GPL-3.0-only

//! Loader classes and the shared loader state.

use installer_types::DeviceNode;

use crate::args::BootLoaderArguments;
use crate::image::{ChainBootLoaderImage, LinuxBootLoaderImage};
use crate::platform::Platform;

/// The closed set of loader classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Generic,
    Grub2,
    EfiGrub,
    MacEfiGrub,
    IpSeriesGrub2,
    PowerNvGrub2,
    Zipl,
    Extlinux,
    Aarch64EfiGrub,
    ArmEfiGrub,
    Riscv64EfiGrub,
    SystemdBoot,
}

impl LoaderKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Grub2 => "GRUB2",
            Self::EfiGrub => "EFIGRUB",
            Self::MacEfiGrub => "MacEFIGRUB",
            Self::IpSeriesGrub2 => "IPSeriesGRUB2",
            Self::PowerNvGrub2 => "PowerNVGRUB2",
            Self::Zipl => "ZIPL",
            Self::Extlinux => "EXTLINUX",
            Self::Aarch64EfiGrub => "Aarch64EFIGRUB",
            Self::ArmEfiGrub => "ArmEFIGRUB",
            Self::Riscv64EfiGrub => "RISCV64EFIGRUB",
            Self::SystemdBoot => "SDBOOT",
        }
    }

    pub fn is_efi_grub(self) -> bool {
        matches!(
            self,
            Self::EfiGrub | Self::MacEfiGrub | Self::Aarch64EfiGrub | Self::ArmEfiGrub
                | Self::Riscv64EfiGrub
        )
    }

    pub fn is_grub_family(self) -> bool {
        matches!(
            self,
            Self::Grub2 | Self::IpSeriesGrub2 | Self::PowerNvGrub2
        ) || self.is_efi_grub()
    }

    /// Device types acceptable as stage2.
    pub fn stage2_device_types(self) -> &'static [&'static str] {
        match self {
            Self::Grub2 | Self::IpSeriesGrub2 | Self::PowerNvGrub2 => {
                &["partition", "mdarray", "lvmlv", "btrfs volume", "btrfs subvolume"]
            }
            kind if kind.is_efi_grub() => &["partition", "mdarray", "lvmlv"],
            Self::SystemdBoot => &["partition"],
            Self::Zipl => &["partition"],
            Self::Extlinux => &["partition", "disk"],
            _ => &["partition"],
        }
    }

    /// Filesystems stage2 can read.
    pub fn stage2_format_types(self) -> &'static [&'static str] {
        match self {
            Self::Grub2 | Self::IpSeriesGrub2 | Self::PowerNvGrub2 => {
                &["ext4", "ext3", "ext2", "btrfs", "xfs"]
            }
            kind if kind.is_efi_grub() => &["ext4", "ext3", "ext2", "btrfs", "xfs"],
            Self::SystemdBoot => &["vfat"],
            Self::Zipl => &["ext4", "ext3", "ext2", "xfs"],
            Self::Extlinux => &["ext4", "ext3", "ext2"],
            _ => &["ext4", "ext3", "ext2"],
        }
    }

    pub fn stage2_mount_points(self) -> &'static [&'static str] {
        match self {
            Self::SystemdBoot => &["/boot"],
            _ => &["/boot", "/"],
        }
    }

    /// RAID levels stage2 may live on; redundancy only.
    pub fn stage2_raid_levels(self) -> &'static [&'static str] {
        match self {
            Self::Grub2 | Self::IpSeriesGrub2 | Self::PowerNvGrub2 => &["raid1", "raid4", "raid5", "raid6", "raid10"],
            kind if kind.is_efi_grub() => &["raid1"],
            _ => &[],
        }
    }

    /// Whether the loader can read its stage2 through LUKS.
    pub fn encryption_supported(self) -> bool {
        matches!(self, Self::Grub2 | Self::IpSeriesGrub2 | Self::PowerNvGrub2)
    }

    /// Whether this loader keeps its entries as BLS snippets.
    pub fn supports_bls(self) -> bool {
        self.is_grub_family() || matches!(self, Self::Zipl | Self::SystemdBoot)
    }
}

/// Mutable loader state shared by every class.
#[derive(Debug, Clone, Default)]
pub struct BootLoader {
    pub kind_name: String,
    pub stage1_device: Option<String>,
    pub stage2_device: Option<String>,
    /// Disks the loader may touch, in BIOS order.
    pub disks: Vec<String>,
    /// Explicit ordering preference from the user.
    pub disk_order: Vec<String>,
    pub timeout: Option<u32>,
    pub password: Option<String>,
    pub encrypted_password: Option<String>,
    pub secure: String,
    pub keep_boot_order: bool,
    pub boot_args: BootLoaderArguments,
    pub images: Vec<LinuxBootLoaderImage>,
    pub chain_images: Vec<ChainBootLoaderImage>,
    pub default_image: Option<String>,
    pub skip: bool,
    pub use_bls: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BootLoader {
    pub fn new(kind: LoaderKind) -> Self {
        Self {
            kind_name: kind.name().to_string(),
            use_bls: kind.supports_bls(),
            ..Default::default()
        }
    }

    pub fn default_image(&self) -> Option<&LinuxBootLoaderImage> {
        let version = self.default_image.as_deref()?;
        self.images.iter().find(|image| image.version == version)
    }

    pub fn add_image(&mut self, image: LinuxBootLoaderImage, make_default: bool) {
        if make_default {
            self.default_image = Some(image.version.clone());
        }
        self.images.push(image);
    }

    /// Sort disks by the explicit preference, keeping the rest in place.
    pub fn ordered_disks(&self) -> Vec<String> {
        let mut ordered: Vec<String> = self
            .disk_order
            .iter()
            .filter(|name| self.disks.contains(name))
            .cloned()
            .collect();
        for disk in &self.disks {
            if !ordered.contains(disk) {
                ordered.push(disk.clone());
            }
        }
        ordered
    }
}

/// Stage2 validity under one loader class.
pub fn stage2_device_errors(kind: LoaderKind, device: &DeviceNode) -> Vec<String> {
    let mut errors = Vec::new();
    let name = &device.name;

    if !kind
        .stage2_device_types()
        .contains(&device.kind.as_str())
    {
        errors.push(format!(
            "{} cannot hold the boot files: device type {} is not supported by {}",
            name,
            device.kind,
            kind.name()
        ));
    }
    if !device.format.format_type.is_empty()
        && !kind
            .stage2_format_types()
            .contains(&device.format.format_type.as_str())
    {
        errors.push(format!(
            "{} has an unsupported filesystem {} for the boot files",
            name, device.format.format_type
        ));
    }
    if !device.format.mount_point.is_empty()
        && !kind
            .stage2_mount_points()
            .contains(&device.format.mount_point.as_str())
    {
        errors.push(format!(
            "{} is mounted at {}, which the boot loader cannot use",
            name, device.format.mount_point
        ));
    }
    if !device.raid_level.is_empty()
        && !kind
            .stage2_raid_levels()
            .contains(&device.raid_level.as_str())
    {
        errors.push(format!(
            "{} uses RAID level {} which {} cannot boot from",
            name,
            device.raid_level,
            kind.name()
        ));
    }
    if device.encrypted && !kind.encryption_supported() {
        errors.push(format!("{name} is encrypted and the boot loader cannot read it"));
    }
    if device.carries_install_media_label() {
        errors.push(format!(
            "{} carries the installation media label {}",
            name, device.format.label
        ));
    }
    if device.protected {
        errors.push(format!("{name} is protected and cannot be used for boot files"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_types::DeviceFormat;

    fn boot_partition() -> DeviceNode {
        DeviceNode {
            name: "sda2".into(),
            kind: "partition".into(),
            size: 1 << 30,
            format: DeviceFormat {
                format_type: "ext4".into(),
                mount_point: "/boot".into(),
                mountable: true,
                ..Default::default()
            },
            disks: vec!["sda".into()],
            ..Default::default()
        }
    }

    #[test]
    fn a_plain_boot_partition_is_a_valid_stage2() {
        let errors = stage2_device_errors(LoaderKind::Grub2, &boot_partition());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn systemd_boot_rejects_ext4_stage2() {
        let errors =
            stage2_device_errors(LoaderKind::SystemdBoot, &boot_partition());
        assert!(!errors.is_empty());
    }

    #[test]
    fn live_labels_disqualify() {
        let mut device = boot_partition();
        device.format.label = "LIVE".into();
        let errors = stage2_device_errors(LoaderKind::Grub2, &device);
        assert!(errors.iter().any(|error| error.contains("LIVE")));
    }

    #[test]
    fn encrypted_stage2_needs_loader_support() {
        let mut device = boot_partition();
        device.encrypted = true;
        assert!(stage2_device_errors(LoaderKind::Grub2, &device).is_empty());
        assert!(!stage2_device_errors(LoaderKind::Extlinux, &device).is_empty());
    }

    #[test]
    fn disk_order_preference_is_applied() {
        let mut loader = BootLoader::new(LoaderKind::Grub2);
        loader.disks = vec!["sda".into(), "sdb".into(), "sdc".into()];
        loader.disk_order = vec!["sdc".into(), "sdx".into()];
        assert_eq!(loader.ordered_disks(), vec!["sdc", "sda", "sdb"]);
    }
}
