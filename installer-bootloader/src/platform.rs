// SPDX-License-Identifier: GPL-3.0-only

//! Hardware platforms and their stage1 constraints.

/// The platforms the installer can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    #[default]
    X86,
    Efi,
    MacEfi,
    Ppc,
    IpSeriesPpc,
    PowerNv,
    S390,
    Aarch64Efi,
    Arm,
    ArmEfi,
    Riscv64,
    Riscv64Efi,
}

/// What a platform accepts as a stage1 target.
#[derive(Debug, Clone, Copy)]
pub struct Stage1Constraints {
    pub device_types: &'static [&'static str],
    pub disk_label_types: &'static [&'static str],
    pub format_types: &'static [&'static str],
    pub mount_points: &'static [&'static str],
    pub raid_levels: &'static [&'static str],
    pub raid_metadata: &'static [&'static str],
    /// Highest byte a stage1 partition may end at, when the firmware cares.
    pub max_end: Option<u64>,
}

const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

impl Platform {
    /// Disk label types the block-device provider can create here.
    pub fn disk_label_types(self) -> &'static [&'static str] {
        match self {
            Self::X86 => &["gpt", "msdos"],
            Self::Efi | Self::MacEfi | Self::Aarch64Efi | Self::ArmEfi | Self::Riscv64Efi => {
                &["gpt"]
            }
            Self::Ppc | Self::IpSeriesPpc | Self::PowerNv => &["msdos", "gpt"],
            Self::S390 => &["msdos", "dasd"],
            Self::Arm | Self::Riscv64 => &["msdos", "gpt"],
        }
    }

    pub fn stage1_constraints(self) -> Stage1Constraints {
        match self {
            Self::X86 => Stage1Constraints {
                device_types: &["disk", "partition"],
                disk_label_types: &["gpt", "msdos"],
                format_types: &["biosboot", ""],
                mount_points: &[],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: Some(2 * TIB),
            },
            Self::Efi | Self::MacEfi | Self::Aarch64Efi | Self::ArmEfi | Self::Riscv64Efi => {
                Stage1Constraints {
                    device_types: &["partition", "mdarray"],
                    disk_label_types: &["gpt"],
                    format_types: &["efi"],
                    mount_points: &["/boot/efi"],
                    raid_levels: &["raid1"],
                    raid_metadata: &["1.0"],
                    max_end: None,
                }
            }
            Self::Ppc => Stage1Constraints {
                device_types: &["partition"],
                disk_label_types: &["msdos"],
                format_types: &["prepboot"],
                mount_points: &[],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: Some(4 * GIB),
            },
            Self::IpSeriesPpc => Stage1Constraints {
                device_types: &["partition"],
                disk_label_types: &["msdos", "gpt"],
                format_types: &["prepboot"],
                mount_points: &[],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: Some(4 * GIB),
            },
            Self::PowerNv => Stage1Constraints {
                device_types: &["partition"],
                disk_label_types: &["msdos", "gpt"],
                format_types: &[],
                mount_points: &["/boot", "/"],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: None,
            },
            Self::S390 => Stage1Constraints {
                device_types: &["disk", "partition"],
                disk_label_types: &["msdos", "dasd"],
                format_types: &["ext4", "ext3", "ext2"],
                mount_points: &["/boot", "/"],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: None,
            },
            Self::Arm | Self::Riscv64 => Stage1Constraints {
                device_types: &["disk", "partition"],
                disk_label_types: &["msdos", "gpt"],
                format_types: &["ext4", "ext3", "ext2", "vfat", ""],
                mount_points: &["/boot", "/"],
                raid_levels: &[],
                raid_metadata: &[],
                max_end: None,
            },
        }
    }

    pub fn is_s390(self) -> bool {
        self == Self::S390
    }

    /// Whether resume-from-swap arguments make sense here.
    pub fn supports_resume(self) -> bool {
        matches!(
            self,
            Self::X86 | Self::Efi | Self::MacEfi | Self::Arm | Self::ArmEfi | Self::Aarch64Efi
        )
    }

    /// Map a machine identifier to the platform, EFI-aware.
    pub fn detect(machine: &str, efi: bool) -> Self {
        match machine {
            "x86_64" | "i686" => {
                if efi {
                    Self::Efi
                } else {
                    Self::X86
                }
            }
            "aarch64" => {
                if efi {
                    Self::Aarch64Efi
                } else {
                    Self::Arm
                }
            }
            "armv7l" => {
                if efi {
                    Self::ArmEfi
                } else {
                    Self::Arm
                }
            }
            "riscv64" => {
                if efi {
                    Self::Riscv64Efi
                } else {
                    Self::Riscv64
                }
            }
            "ppc64" | "ppc64le" => Self::IpSeriesPpc,
            "s390x" => Self::S390,
            _ => Self::X86,
        }
    }
}
