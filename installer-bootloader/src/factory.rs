// SPDX-License-Identifier: GPL-3.0-only

//! Loader class selection.

use crate::base::LoaderKind;
use crate::platform::Platform;

/// The loader class a platform boots with.
pub fn platform_loader(platform: Platform) -> LoaderKind {
    match platform {
        Platform::X86 => LoaderKind::Grub2,
        Platform::Efi => LoaderKind::EfiGrub,
        Platform::MacEfi => LoaderKind::MacEfiGrub,
        Platform::Ppc => LoaderKind::Grub2,
        Platform::IpSeriesPpc => LoaderKind::IpSeriesGrub2,
        Platform::PowerNv => LoaderKind::PowerNvGrub2,
        Platform::S390 => LoaderKind::Zipl,
        Platform::Aarch64Efi => LoaderKind::Aarch64EfiGrub,
        Platform::Arm => LoaderKind::Extlinux,
        Platform::ArmEfi => LoaderKind::ArmEfiGrub,
        Platform::Riscv64 => LoaderKind::Extlinux,
        Platform::Riscv64Efi => LoaderKind::Riscv64EfiGrub,
    }
}

/// Select the loader class: an explicit default wins, then a name-based
/// override, then the platform mapping, then the generic base.
pub fn select_loader(
    explicit_default: Option<LoaderKind>,
    name_override: Option<&str>,
    platform: Option<Platform>,
) -> LoaderKind {
    if let Some(kind) = explicit_default {
        return kind;
    }
    if let Some(name) = name_override {
        match name {
            "EXTLINUX" => return LoaderKind::Extlinux,
            // The concrete systemd-boot class depends on the platform; on
            // non-EFI platforms the request falls through.
            "SDBOOT" => {
                if platform.is_some_and(|platform| {
                    platform_loader(platform) != LoaderKind::Zipl
                        && platform != Platform::Ppc
                        && platform != Platform::IpSeriesPpc
                        && platform != Platform::PowerNv
                }) {
                    return LoaderKind::SystemdBoot;
                }
            }
            _ => {}
        }
    }
    platform.map(platform_loader).unwrap_or(LoaderKind::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_platform_mapping_is_exhaustive() {
        let expectations = [
            (Platform::X86, LoaderKind::Grub2),
            (Platform::Efi, LoaderKind::EfiGrub),
            (Platform::MacEfi, LoaderKind::MacEfiGrub),
            (Platform::Ppc, LoaderKind::Grub2),
            (Platform::IpSeriesPpc, LoaderKind::IpSeriesGrub2),
            (Platform::PowerNv, LoaderKind::PowerNvGrub2),
            (Platform::S390, LoaderKind::Zipl),
            (Platform::Aarch64Efi, LoaderKind::Aarch64EfiGrub),
            (Platform::Arm, LoaderKind::Extlinux),
            (Platform::ArmEfi, LoaderKind::ArmEfiGrub),
            (Platform::Riscv64, LoaderKind::Extlinux),
            (Platform::Riscv64Efi, LoaderKind::Riscv64EfiGrub),
        ];
        for (platform, kind) in expectations {
            assert_eq!(platform_loader(platform), kind, "{platform:?}");
        }
    }

    #[test]
    fn explicit_default_wins() {
        assert_eq!(
            select_loader(Some(LoaderKind::Zipl), Some("EXTLINUX"), Some(Platform::X86)),
            LoaderKind::Zipl
        );
    }

    #[test]
    fn name_overrides_apply() {
        assert_eq!(
            select_loader(None, Some("EXTLINUX"), Some(Platform::X86)),
            LoaderKind::Extlinux
        );
        assert_eq!(
            select_loader(None, Some("SDBOOT"), Some(Platform::Efi)),
            LoaderKind::SystemdBoot
        );
        // systemd-boot cannot serve s390; the platform class stands.
        assert_eq!(
            select_loader(None, Some("SDBOOT"), Some(Platform::S390)),
            LoaderKind::Zipl
        );
    }

    #[test]
    fn no_platform_falls_back_to_generic() {
        assert_eq!(select_loader(None, None, None), LoaderKind::Generic);
    }
}
