// SPDX-License-Identifier: GPL-3.0-only

//! The bootloader installation task graph.
//!
//! Seven tasks run in order, each guarded by payload type and bootloader
//! mode. Cancellation is honored between subprocess invocations.

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use installer_contracts::InstallerError;
use installer_dbus::task::{InstallationTask, TaskContext, TaskFailure};
use installer_sys::runner::{ToolCommand, ToolRunner};
use installer_sys::boot_tools;
use installer_types::DeviceNode;

use crate::base::{BootLoader, LoaderKind};
use crate::image::LinuxBootLoaderImage;
use crate::platform::Platform;
use crate::writers::{WriterContext, bls_supported, efi, extlinux, grub2, systemd_boot, zipl};

/// How the payload delivers the target system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Dnf,
    LiveImage,
    LiveOs,
    Ostree,
}

/// What the user asked of the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootloaderMode {
    Disabled,
    Enabled,
    Skipped,
}

/// Shared state of one bootloader installation.
pub struct BootloaderInstallation {
    pub runner: Arc<dyn ToolRunner>,
    pub sysroot: PathBuf,
    pub payload: PayloadKind,
    pub mode: BootloaderMode,
    pub kind: LoaderKind,
    pub platform: Platform,
    pub kernel_versions: Vec<String>,
    pub image_install: bool,
    pub directory_install: bool,
    /// Name of the device the root filesystem lives on.
    pub root_device: String,
    pub root_on_btrfs: bool,
    pub devices: BTreeMap<String, DeviceNode>,
    /// `(stage1, stage2)` pairs, already expanded for redundancy.
    pub install_targets: Vec<(String, String)>,
    pub product_name: String,
    pub product_short_name: String,
    pub machine_id: String,
    pub console: Option<String>,
    pub menu_auto_hide: bool,
    pub is_xen_guest: bool,
    pub root_uuid: String,
    pub root_subvolume: Option<String>,
    pub loader: Mutex<BootLoader>,
}

impl BootloaderInstallation {
    fn writer_context(&self) -> WriterContext<'_> {
        WriterContext {
            runner: &*self.runner,
            sysroot: self.sysroot.clone(),
            devices: &self.devices,
            product_name: self.product_name.clone(),
            product_short_name: self.product_short_name.clone(),
            machine_id: self.machine_id.clone(),
            console: self.console.clone(),
            menu_auto_hide: self.menu_auto_hide,
            new_kernel_pkg_present: self.new_kernel_pkg_present(),
            is_xen_guest: self.is_xen_guest,
            root_uuid: self.root_uuid.clone(),
            root_subvolume: self.root_subvolume.clone(),
        }
    }

    fn new_kernel_pkg_present(&self) -> bool {
        self.sysroot.join("usr/sbin/new-kernel-pkg").exists()
    }

    fn bootupd_owns_the_install(&self) -> bool {
        self.payload == PayloadKind::Ostree && self.sysroot.join("usr/bin/bootupctl").exists()
    }

    fn bls_in_use(&self) -> bool {
        bls_supported(self.new_kernel_pkg_present(), self.is_xen_guest)
            && self.kind.supports_bls()
    }

    /// Write the configuration and run the class installer.
    fn write(&self) -> Result<(), InstallerError> {
        let ctx = self.writer_context();
        let mut loader = self.loader.lock().expect("loader lock");
        match self.kind {
            kind if kind.is_grub_family() => {
                grub2::write_config(&ctx, &mut loader, kind)?;
                grub2::install(&ctx, &loader, kind, &self.install_targets)?;
                if kind.is_efi_grub() {
                    efi::install(&ctx, &loader)?;
                }
                Ok(())
            }
            LoaderKind::Zipl => {
                zipl::write_config(&ctx, &mut loader)?;
                zipl::install(&ctx).map(|_| ())
            }
            LoaderKind::SystemdBoot => {
                systemd_boot::write_config(&ctx, &mut loader)?;
                systemd_boot::install(&ctx)
            }
            LoaderKind::Extlinux => {
                extlinux::write_config(&ctx, &mut loader)?;
                extlinux::install(&ctx)
            }
            _ => Ok(()),
        }
    }

    /// Resolve the loader class, stage1 device, install targets and kernel
    /// arguments from a loaded device tree.
    pub fn plan(
        &mut self,
        stage1_disk: &str,
        stage2_name: &str,
        candidates: &[String],
        args_context: &crate::cmdline::BootArgsContext,
    ) -> Result<(), InstallerError> {
        let stage2 = self
            .devices
            .get(stage2_name)
            .ok_or_else(|| InstallerError::unknown_device(stage2_name))?
            .clone();

        let stage2_errors = crate::base::stage2_device_errors(self.kind, &stage2);
        if !stage2_errors.is_empty() {
            return Err(InstallerError::bootloader(stage2_errors.join("\n")));
        }

        let ctx = crate::stage1::EligibilityContext {
            platform: self.platform,
            loader: self.kind,
            devices: &self.devices,
            non_ibft_iscsi_boot: false,
        };
        let ordered: Vec<&DeviceNode> = candidates
            .iter()
            .filter_map(|name| self.devices.get(name))
            .collect();
        let stage1_name =
            crate::stage1::choose_stage1_device(&ctx, ordered, stage1_disk, false, Some(&stage2))?;
        let stage1 = self.devices[&stage1_name].clone();

        self.install_targets =
            crate::targets::install_targets(self.kind, &stage1, &stage2, &self.devices);

        let mut loader = self.loader.lock().expect("loader lock");
        loader.stage1_device = Some(stage1_name);
        loader.stage2_device = Some(stage2.name.clone());
        loader.boot_args = crate::cmdline::collect_boot_args(args_context);
        Ok(())
    }

    /// The guarded task graph, in execution order.
    pub fn tasks(self: &Arc<Self>) -> Vec<Arc<dyn InstallationTask>> {
        vec![
            Arc::new(CreateRescueImagesTask(self.clone())),
            Arc::new(ConfigureBootloaderTask(self.clone())),
            Arc::new(InstallBootloaderTask(self.clone())),
            Arc::new(CreateBlsEntriesTask(self.clone())),
            Arc::new(RecreateInitrdsTask(self.clone())),
            Arc::new(FixBtrfsBootloaderTask(self.clone())),
            Arc::new(FixZiplBootloaderTask(self.clone())),
        ]
    }
}

fn failure(error: InstallerError) -> TaskFailure {
    error.into()
}

/// Rebuild rescue images after a live payload lands on disk.
pub struct CreateRescueImagesTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for CreateRescueImagesTask {
    fn name(&self) -> &str {
        "Create rescue images"
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if install.payload != PayloadKind::LiveImage {
            return Ok(());
        }

        let machine_id = install.sysroot.join("etc/machine-id");
        let missing = std::fs::read_to_string(&machine_id)
            .map(|contents| contents.trim().is_empty())
            .unwrap_or(true);
        if missing {
            boot_tools::machine_id_setup(&*install.runner)
                .map_err(|error| TaskFailure::new("os", error.to_string()))?;
        }

        for version in &install.kernel_versions {
            if context.check_cancelled() {
                return Ok(());
            }
            if install.new_kernel_pkg_present() {
                boot_tools::new_kernel_pkg(&*install.runner, &["--rpmposttrans"], version)
                    .map_err(|error| TaskFailure::new("os", error.to_string()))?;
            } else {
                run_postinst_scripts(install, version)?;
            }
        }
        Ok(())
    }
}

/// Run each executable in /etc/kernel/postinst.d, sorted by name.
fn run_postinst_scripts(
    install: &BootloaderInstallation,
    version: &str,
) -> Result<(), TaskFailure> {
    let dir = install.sysroot.join("etc/kernel/postinst.d");
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(());
    };

    let mut scripts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            std::fs::metadata(path)
                .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        })
        .collect();
    scripts.sort();

    for script in scripts {
        let command = ToolCommand::new(
            &script.display().to_string(),
            &[version, &format!("/boot/vmlinuz-{version}")],
        );
        let outcome = install
            .runner
            .run(&command)
            .map_err(|error| TaskFailure::new("os", error.to_string()))?;
        if !outcome.success() {
            return Err(TaskFailure::new(
                "os",
                format!("{} exited {}", command.render(), outcome.status),
            ));
        }
    }
    Ok(())
}

/// Register the freshly installed kernel as the default boot entry.
pub struct ConfigureBootloaderTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for ConfigureBootloaderTask {
    fn name(&self) -> &str {
        "Configure the boot loader"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if install.payload == PayloadKind::Ostree || install.mode != BootloaderMode::Enabled {
            tracing::debug!("boot loader configuration is owned elsewhere, skipping");
            return Ok(());
        }

        let mut loader = install.loader.lock().expect("loader lock");
        for (index, version) in install.kernel_versions.iter().enumerate() {
            let image =
                LinuxBootLoaderImage::new(install.root_device.clone(), "anaconda", version.clone());
            loader.add_image(image, index == 0);
        }
        Ok(())
    }
}

/// Write the configuration and install the loader.
pub struct InstallBootloaderTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for InstallBootloaderTask {
    fn name(&self) -> &str {
        "Install the boot loader"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if install.mode != BootloaderMode::Enabled {
            return Ok(());
        }
        if install.bootupd_owns_the_install() {
            tracing::info!("bootupd owns the boot loader on this system");
            return Ok(());
        }
        install.write().map_err(failure)
    }
}

/// Recreate BLS entries for kernels delivered by a live image.
pub struct CreateBlsEntriesTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for CreateBlsEntriesTask {
    fn name(&self) -> &str {
        "Create BLS entries"
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if install.payload != PayloadKind::LiveImage || !install.bls_in_use() {
            return Ok(());
        }

        // Entries copied from the live medium describe its kernels, not
        // ours.
        let entry_dir = install.sysroot.join("boot/loader/entries");
        if let Ok(entries) = std::fs::read_dir(&entry_dir) {
            for entry in entries.filter_map(|entry| entry.ok()) {
                std::fs::remove_file(entry.path()).map_err(|error| {
                    TaskFailure::new("os", format!("removing stale BLS entry: {error}"))
                })?;
            }
        }

        for version in &install.kernel_versions {
            if context.check_cancelled() {
                return Ok(());
            }
            boot_tools::kernel_install_add(&*install.runner, version)
                .map_err(|error| TaskFailure::new("os", error.to_string()))?;
        }

        let config_file = grub2::config_file(install.kind, &install.product_short_name);
        boot_tools::grub2_mkconfig(&*install.runner, &config_file)
            .map_err(|error| TaskFailure::new("bootloader", error.to_string()))
    }
}

/// Regenerate initramfs images against the installed system.
pub struct RecreateInitrdsTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for RecreateInitrdsTask {
    fn name(&self) -> &str {
        "Recreate initrds"
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        for version in &install.kernel_versions {
            if context.check_cancelled() {
                return Ok(());
            }
            if install.new_kernel_pkg_present() {
                boot_tools::new_kernel_pkg(
                    &*install.runner,
                    &["--mkinitrd", "--dracut", "--depmod", "--update"],
                    version,
                )
                .map_err(|error| TaskFailure::new("os", error.to_string()))?;
            } else {
                boot_tools::depmod(&*install.runner, version)
                    .map_err(|error| TaskFailure::new("os", error.to_string()))?;
                boot_tools::dracut(
                    &*install.runner,
                    &format!("/boot/initramfs-{version}.img"),
                    version,
                    install.image_install,
                )
                .map_err(|error| TaskFailure::new("os", error.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Re-run configure and install when the root landed on btrfs.
pub struct FixBtrfsBootloaderTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for FixBtrfsBootloaderTask {
    fn name(&self) -> &str {
        "Fix the boot loader on btrfs"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if !install.root_on_btrfs
            || install.directory_install
            || install.mode != BootloaderMode::Enabled
        {
            return Ok(());
        }
        install.write().map_err(failure)
    }
}

/// Re-run zipl so the IPL record matches the final configuration.
pub struct FixZiplBootloaderTask(pub Arc<BootloaderInstallation>);

#[async_trait]
impl InstallationTask for FixZiplBootloaderTask {
    fn name(&self) -> &str {
        "Rerun zipl"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if !install.platform.is_s390() || install.mode != BootloaderMode::Enabled {
            return Ok(());
        }
        boot_tools::zipl(&*install.runner)
            .map(|_| ())
            .map_err(|error| TaskFailure::new("bootloader", error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_sys::RecordingRunner;

    fn installation(
        runner: Arc<RecordingRunner>,
        sysroot: PathBuf,
        payload: PayloadKind,
        mode: BootloaderMode,
    ) -> Arc<BootloaderInstallation> {
        Arc::new(BootloaderInstallation {
            runner,
            sysroot,
            payload,
            mode,
            kind: LoaderKind::Grub2,
            platform: Platform::X86,
            kernel_versions: vec!["6.8.0".into()],
            image_install: false,
            directory_install: false,
            root_device: "sda3".into(),
            root_on_btrfs: false,
            devices: BTreeMap::new(),
            install_targets: vec![("sda".into(), "sda2".into())],
            product_name: "Fedora Linux".into(),
            product_short_name: "fedora".into(),
            machine_id: "abcd".into(),
            console: None,
            menu_auto_hide: false,
            is_xen_guest: false,
            root_uuid: "uuid".into(),
            root_subvolume: None,
            loader: Mutex::new(BootLoader::new(LoaderKind::Grub2)),
        })
    }

    #[test]
    fn planning_selects_stage1_targets_and_arguments() {
        use installer_types::DeviceFormat;

        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let mut install = Arc::try_unwrap(installation(
            runner,
            dir.path().to_path_buf(),
            PayloadKind::Dnf,
            BootloaderMode::Enabled,
        ))
        .unwrap_or_else(|_| panic!("sole owner"));

        install.devices.insert(
            "sda".into(),
            DeviceNode {
                name: "sda".into(),
                kind: "disk".into(),
                disk_label: "msdos".into(),
                sector_size: 512,
                exists: true,
                ..Default::default()
            },
        );
        install.devices.insert(
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
                sector_size: 512,
                partition_end: 4096,
                exists: true,
                ..Default::default()
            },
        );
        install.devices.insert(
            "sda2".into(),
            DeviceNode {
                name: "sda2".into(),
                kind: "partition".into(),
                format: DeviceFormat {
                    format_type: "ext4".into(),
                    mount_point: "/boot".into(),
                    ..Default::default()
                },
                parents: vec!["sda".into()],
                disks: vec!["sda".into()],
                ..Default::default()
            },
        );

        let args_context = crate::cmdline::BootArgsContext {
            extra_args: vec!["audit=1".into()],
            selinux_disabled: true,
            ..Default::default()
        };
        install
            .plan("sda", "sda2", &["sda1".to_string()], &args_context)
            .expect("plan");

        assert_eq!(
            install.install_targets,
            vec![("sda1".to_string(), "sda2".to_string())]
        );
        let loader = install.loader.lock().expect("loader");
        assert_eq!(loader.stage1_device.as_deref(), Some("sda1"));
        assert_eq!(loader.boot_args.render(), "audit=1 selinux=0");
    }

    #[tokio::test]
    async fn configure_registers_the_default_image() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(
            runner,
            dir.path().to_path_buf(),
            PayloadKind::Dnf,
            BootloaderMode::Enabled,
        );

        let task = ConfigureBootloaderTask(install.clone());
        let task_runner = installer_dbus::TaskRunner::new(Arc::new(task));
        task_runner.run().await.expect("run");

        let loader = install.loader.lock().expect("loader");
        assert_eq!(loader.images.len(), 1);
        assert_eq!(loader.images[0].label, "anaconda");
        assert_eq!(loader.default_image.as_deref(), Some("6.8.0"));
    }

    #[tokio::test]
    async fn disabled_mode_registers_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(
            runner,
            dir.path().to_path_buf(),
            PayloadKind::Dnf,
            BootloaderMode::Disabled,
        );

        let task = ConfigureBootloaderTask(install.clone());
        let context_runner = installer_dbus::TaskRunner::new(Arc::new(task));
        context_runner.run().await.expect("run");

        assert!(install.loader.lock().expect("loader").images.is_empty());
    }

    #[tokio::test]
    async fn recreate_initrds_runs_depmod_and_dracut() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(
            runner.clone(),
            dir.path().to_path_buf(),
            PayloadKind::Dnf,
            BootloaderMode::Enabled,
        );

        let task_runner =
            installer_dbus::TaskRunner::new(Arc::new(RecreateInitrdsTask(install)));
        task_runner.run().await.expect("run");

        assert_eq!(
            runner.rendered(),
            vec![
                "depmod -a 6.8.0",
                "dracut -f /boot/initramfs-6.8.0.img 6.8.0",
            ]
        );
    }

    #[tokio::test]
    async fn ostree_with_bootupd_skips_the_install() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("usr/bin")).expect("usr/bin");
        std::fs::write(dir.path().join("usr/bin/bootupctl"), "").expect("bootupctl");

        let install = installation(
            runner.clone(),
            dir.path().to_path_buf(),
            PayloadKind::Ostree,
            BootloaderMode::Enabled,
        );
        let task_runner =
            installer_dbus::TaskRunner::new(Arc::new(InstallBootloaderTask(install)));
        task_runner.run().await.expect("run");

        assert!(runner.rendered().is_empty());
    }

    #[tokio::test]
    async fn zipl_fixup_only_runs_on_s390() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(
            runner.clone(),
            dir.path().to_path_buf(),
            PayloadKind::Dnf,
            BootloaderMode::Enabled,
        );

        let task_runner =
            installer_dbus::TaskRunner::new(Arc::new(FixZiplBootloaderTask(install)));
        task_runner.run().await.expect("run");
        assert!(runner.rendered().is_empty());
    }
}
