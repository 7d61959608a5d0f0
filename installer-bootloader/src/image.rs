// SPDX-License-Identifier: GPL-3.0-only

//! Boot images known to the loader.

use serde::{Deserialize, Serialize};

/// A bootable Linux kernel entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinuxBootLoaderImage {
    /// Device the image boots from (the root device name).
    pub device: String,
    pub label: String,
    pub version: String,
    kernel: Option<String>,
    initrd: Option<String>,
}

impl LinuxBootLoaderImage {
    pub fn new(device: impl Into<String>, label: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            label: label.into(),
            version: version.into(),
            kernel: None,
            initrd: None,
        }
    }

    /// Kernel file name, defaulting from the version.
    pub fn kernel(&self) -> String {
        self.kernel
            .clone()
            .unwrap_or_else(|| format!("vmlinuz-{}", self.version))
    }

    /// Initramfs file name, defaulting from the version.
    pub fn initrd(&self) -> String {
        self.initrd
            .clone()
            .unwrap_or_else(|| format!("initramfs-{}.img", self.version))
    }

    pub fn with_kernel(mut self, kernel: impl Into<String>) -> Self {
        self.kernel = Some(kernel.into());
        self
    }

    pub fn with_initrd(mut self, initrd: impl Into<String>) -> Self {
        self.initrd = Some(initrd.into());
        self
    }
}

/// A chain-loaded foreign system entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBootLoaderImage {
    pub device: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_default_from_the_version() {
        let image = LinuxBootLoaderImage::new("sda3", "anaconda", "6.8.0-101.fc41.x86_64");
        assert_eq!(image.kernel(), "vmlinuz-6.8.0-101.fc41.x86_64");
        assert_eq!(image.initrd(), "initramfs-6.8.0-101.fc41.x86_64.img");
    }

    #[test]
    fn explicit_file_names_win() {
        let image = LinuxBootLoaderImage::new("sda3", "rescue", "6.8.0")
            .with_kernel("vmlinuz-0-rescue")
            .with_initrd("initramfs-0-rescue.img");
        assert_eq!(image.kernel(), "vmlinuz-0-rescue");
        assert_eq!(image.initrd(), "initramfs-0-rescue.img");
    }
}
