// SPDX-License-Identifier: GPL-3.0-only

//! Per-loader configuration writers and installers.

pub mod efi;
pub mod extlinux;
pub mod grub2;
pub mod systemd_boot;
pub mod zipl;

use std::collections::BTreeMap;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use installer_contracts::InstallerError;
use installer_sys::ToolRunner;
use installer_types::DeviceNode;

/// Everything a writer needs besides the loader state itself.
pub struct WriterContext<'a> {
    pub runner: &'a dyn ToolRunner,
    pub sysroot: PathBuf,
    pub devices: &'a BTreeMap<String, DeviceNode>,
    pub product_name: String,
    pub product_short_name: String,
    pub machine_id: String,
    /// The `console=` argument value, when serial output is requested.
    pub console: Option<String>,
    pub menu_auto_hide: bool,
    pub new_kernel_pkg_present: bool,
    pub is_xen_guest: bool,
    /// Filesystem UUID of the root device, for entry command lines.
    pub root_uuid: String,
    /// Btrfs subvolume the root lives on, when any.
    pub root_subvolume: Option<String>,
}

impl WriterContext<'_> {
    pub fn path(&self, relative: &str) -> PathBuf {
        self.sysroot.join(relative.trim_start_matches('/'))
    }

    pub fn device(&self, name: &str) -> Result<&DeviceNode, InstallerError> {
        self.devices
            .get(name)
            .ok_or_else(|| InstallerError::unknown_device(name))
    }
}

/// Whether entries are managed as BLS snippets.
///
/// One predicate serves both the GRUB2 auto-disable and the BLS entry
/// creation task: legacy new-kernel-pkg tooling and Xen guests force the
/// non-BLS path.
pub fn bls_supported(new_kernel_pkg_present: bool, is_xen_guest: bool) -> bool {
    !new_kernel_pkg_present && !is_xen_guest
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), InstallerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|error| InstallerError::os(format!("creating {}: {error}", parent.display())))?;
    }
    std::fs::write(path, contents)
        .map_err(|error| InstallerError::os(format!("writing {}: {error}", path.display())))
}

/// Write a secret-bearing file with mode 0600.
pub(crate) fn write_secret_file(path: &Path, contents: &str) -> Result<(), InstallerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|error| InstallerError::os(format!("creating {}: {error}", parent.display())))?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    options.mode(0o600);
    let mut file = options
        .open(path)
        .map_err(|error| InstallerError::os(format!("opening {}: {error}", path.display())))?;
    file.write_all(contents.as_bytes())
        .map_err(|error| InstallerError::os(format!("writing {}: {error}", path.display())))?;
    Ok(())
}

/// Trailing partition number of a device name ("sda2" is 2, "nvme0n1p3"
/// is 3).
pub(crate) fn partition_number(name: &str) -> Option<u32> {
    let digits: String = name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() || digits.len() == name.len() {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn runner_failure(error: installer_sys::SysError) -> InstallerError {
    InstallerError::bootloader(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_numbers() {
        assert_eq!(partition_number("sda2"), Some(2));
        assert_eq!(partition_number("nvme0n1p3"), Some(3));
        assert_eq!(partition_number("sda"), None);
        assert_eq!(partition_number("123"), None);
    }

    #[test]
    fn the_bls_predicate_is_shared() {
        assert!(bls_supported(false, false));
        assert!(!bls_supported(true, false));
        assert!(!bls_supported(false, true));
    }

    #[test]
    fn secret_files_are_created_0600() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("user.cfg");
        write_secret_file(&path, "GRUB2_PASSWORD=hash\n").expect("write");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
