// SPDX-License-Identifier: GPL-3.0-only

//! GRUB2 configuration writing and installation, including the IPSeries
//! and PowerNV variants.

use std::sync::OnceLock;

use installer_contracts::InstallerError;
use installer_sys::boot_tools;
use regex::Regex;

use crate::base::{BootLoader, LoaderKind};
use crate::writers::{
    WriterContext, bls_supported, partition_number, runner_failure, write_file, write_secret_file,
};

const DEFAULTS_FILE: &str = "/etc/default/grub";
const CONFIG_DIR: &str = "/boot/grub2";

/// The grub.cfg location for one loader class.
pub fn config_file(kind: LoaderKind, product_short_name: &str) -> String {
    if kind.is_efi_grub() {
        format!("/boot/efi/EFI/{product_short_name}/grub.cfg")
    } else {
        format!("{CONFIG_DIR}/grub.cfg")
    }
}

/// GRUB-style device name: `(hdN)` for a disk, `(hdN,<label><part>)` for a
/// partition.
pub fn grub_device_name(
    ctx: &WriterContext<'_>,
    loader: &BootLoader,
    device_name: &str,
) -> Result<String, InstallerError> {
    let device = ctx.device(device_name)?;
    let ordered = loader.ordered_disks();

    if device.is_disk() {
        let index = ordered
            .iter()
            .position(|disk| disk == device_name)
            .ok_or_else(|| InstallerError::unknown_device(device_name))?;
        return Ok(format!("(hd{index})"));
    }

    let disk_name = device
        .disks
        .first()
        .ok_or_else(|| InstallerError::bootloader(format!("{device_name} has no backing disk")))?;
    let disk = ctx.device(disk_name)?;
    let index = ordered
        .iter()
        .position(|candidate| candidate == disk_name)
        .ok_or_else(|| InstallerError::unknown_device(disk_name))?;
    let number = partition_number(device_name).ok_or_else(|| {
        InstallerError::bootloader(format!("{device_name} has no partition number"))
    })?;
    Ok(format!("(hd{index},{}{number})", disk.disk_label))
}

fn write_device_map(ctx: &WriterContext<'_>, loader: &BootLoader) -> Result<(), InstallerError> {
    let mut contents = String::from("# this device map was generated by the installer\n");
    for (index, disk) in loader.ordered_disks().iter().enumerate() {
        contents.push_str(&format!("(hd{index})      /dev/{disk}\n"));
    }
    write_file(&ctx.path(&format!("{CONFIG_DIR}/device.map")), &contents)
}

/// `GRUB_SERIAL_COMMAND` from a `console=ttyS0,115200n81`-style value.
pub fn serial_command(console: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^ttyS(\d+)(?:,(\d+)([noe])?(\d)?(\d)?)?$").expect("console pattern")
    });
    let captures = pattern.captures(console)?;

    let unit = captures.get(1).map(|m| m.as_str()).unwrap_or("0");
    let mut command = format!("serial --unit={unit}");
    if let Some(speed) = captures.get(2) {
        command.push_str(&format!(" --speed={}", speed.as_str()));
    }
    match captures.get(3).map(|m| m.as_str()) {
        Some("o") => command.push_str(" --parity=odd"),
        Some("e") => command.push_str(" --parity=even"),
        _ => {}
    }
    if let Some(word) = captures.get(4) {
        command.push_str(&format!(" --word={}", word.as_str()));
    }
    if let Some(stop) = captures.get(5) {
        command.push_str(&format!(" --stop={}", stop.as_str()));
    }
    Some(command)
}

fn write_defaults(
    ctx: &WriterContext<'_>,
    loader: &BootLoader,
    kind: LoaderKind,
) -> Result<(), InstallerError> {
    let mut contents = String::new();
    contents.push_str(&format!(
        "GRUB_TIMEOUT={}\n",
        loader.timeout.unwrap_or(5)
    ));
    contents.push_str(&format!(
        "GRUB_DISTRIBUTOR=\"{}\"\n",
        ctx.product_name
    ));
    contents.push_str("GRUB_DEFAULT=saved\n");
    contents.push_str("GRUB_DISABLE_SUBMENU=true\n");

    let serial = ctx.console.as_deref().and_then(serial_command);
    match &serial {
        Some(command) => {
            contents.push_str("GRUB_TERMINAL=\"serial console\"\n");
            contents.push_str(&format!("GRUB_SERIAL_COMMAND=\"{command}\"\n"));
        }
        None => contents.push_str("GRUB_TERMINAL_OUTPUT=\"console\"\n"),
    }

    if kind == LoaderKind::IpSeriesGrub2 {
        contents.push_str("GRUB_TERMINFO=\"terminfo -g 80x24 console\"\n");
        contents.push_str("GRUB_DISABLE_OS_PROBER=true\n");
    }

    contents.push_str(&format!(
        "GRUB_CMDLINE_LINUX=\"{}\"\n",
        loader.boot_args.render()
    ));
    contents.push_str("GRUB_DISABLE_RECOVERY=true\n");
    if loader.use_bls {
        contents.push_str("GRUB_ENABLE_BLSCFG=true\n");
    }

    write_file(&ctx.path(DEFAULTS_FILE), &contents)
}

fn write_password(
    ctx: &WriterContext<'_>,
    loader: &mut BootLoader,
) -> Result<(), InstallerError> {
    let hash = match (&loader.encrypted_password, &loader.password) {
        (Some(encrypted), _) => {
            if !encrypted.starts_with("grub.pbkdf2.") {
                return Err(InstallerError::bootloader(
                    "the encrypted boot loader password is not a grub pbkdf2 hash",
                ));
            }
            encrypted.clone()
        }
        (None, Some(password)) => {
            boot_tools::grub2_mkpasswd(ctx.runner, password).map_err(runner_failure)?
        }
        (None, None) => return Ok(()),
    };

    write_secret_file(
        &ctx.path(&format!("{CONFIG_DIR}/user.cfg")),
        &format!("GRUB2_PASSWORD={hash}\n"),
    )?;
    // A password-protected menu must not fall into a debug shell.
    loader.boot_args.add("rd.shell=0");
    Ok(())
}

/// Write the full GRUB2 configuration.
pub fn write_config(
    ctx: &WriterContext<'_>,
    loader: &mut BootLoader,
    kind: LoaderKind,
) -> Result<(), InstallerError> {
    if loader.use_bls && !bls_supported(ctx.new_kernel_pkg_present, ctx.is_xen_guest) {
        tracing::info!("BLS is not usable here, writing legacy menu entries");
        loader.use_bls = false;
    }

    if !kind.is_efi_grub() {
        write_device_map(ctx, loader)?;
    }
    write_password(ctx, loader)?;
    write_defaults(ctx, loader, kind)?;

    if let Some(default) = loader.default_image() {
        let entry = format!("{}-{}", ctx.machine_id, default.version);
        boot_tools::grub2_set_default(ctx.runner, &entry).map_err(runner_failure)?;
    }
    if ctx.menu_auto_hide {
        boot_tools::grub2_editenv_set(ctx.runner, &["menu_auto_hide=1", "boot_success=1"])
            .map_err(runner_failure)?;
    }

    boot_tools::grub2_mkconfig(ctx.runner, &config_file(kind, &ctx.product_short_name))
        .map_err(runner_failure)
}

/// Install the loader onto every stage1 target.
pub fn install(
    ctx: &WriterContext<'_>,
    loader: &BootLoader,
    kind: LoaderKind,
    targets: &[(String, String)],
) -> Result<(), InstallerError> {
    // PowerNV boots petitboot straight from the kernel; writing the config
    // is the whole job.
    if kind == LoaderKind::PowerNvGrub2 {
        return Ok(());
    }

    for (stage1, _stage2) in targets {
        let stage1_path = format!("/dev/{stage1}");
        if kind == LoaderKind::IpSeriesGrub2 {
            if !loader.keep_boot_order {
                boot_tools::bootlist(ctx.runner, &stage1_path).map_err(runner_failure)?;
            }
            boot_tools::grub2_install(ctx.runner, &stage1_path, true).map_err(runner_failure)?;
        } else {
            boot_tools::grub2_install(ctx.runner, &stage1_path, false).map_err(runner_failure)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::LinuxBootLoaderImage;
    use installer_sys::{RecordingRunner, ToolOutcome};
    use installer_types::{DeviceFormat, DeviceNode};
    use std::collections::BTreeMap;

    fn devices() -> BTreeMap<String, DeviceNode> {
        let mut map = BTreeMap::new();
        map.insert(
            "sda".to_string(),
            DeviceNode {
                name: "sda".into(),
                kind: "disk".into(),
                disk_label: "msdos".into(),
                ..Default::default()
            },
        );
        map.insert(
            "sdb".to_string(),
            DeviceNode {
                name: "sdb".into(),
                kind: "disk".into(),
                disk_label: "gpt".into(),
                ..Default::default()
            },
        );
        map.insert(
            "sda1".to_string(),
            DeviceNode {
                name: "sda1".into(),
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
        map
    }

    fn context<'a>(
        runner: &'a RecordingRunner,
        devices: &'a BTreeMap<String, DeviceNode>,
        sysroot: &std::path::Path,
    ) -> WriterContext<'a> {
        WriterContext {
            runner,
            sysroot: sysroot.to_path_buf(),
            devices,
            product_name: "Fedora Linux".into(),
            product_short_name: "fedora".into(),
            machine_id: "abcd1234".into(),
            console: None,
            menu_auto_hide: false,
            new_kernel_pkg_present: false,
            is_xen_guest: false,
            root_uuid: "uuid-root".into(),
            root_subvolume: None,
        }
    }

    fn loader() -> BootLoader {
        let mut loader = BootLoader::new(LoaderKind::Grub2);
        loader.disks = vec!["sda".into(), "sdb".into()];
        loader.add_image(
            LinuxBootLoaderImage::new("sda2", "anaconda", "6.8.0"),
            true,
        );
        loader
    }

    #[test]
    fn grub_device_names() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&runner, &devices, dir.path());
        let loader = loader();

        assert_eq!(grub_device_name(&ctx, &loader, "sda").expect("disk"), "(hd0)");
        assert_eq!(grub_device_name(&ctx, &loader, "sdb").expect("disk"), "(hd1)");
        assert_eq!(
            grub_device_name(&ctx, &loader, "sda1").expect("partition"),
            "(hd0,msdos1)"
        );
    }

    #[test]
    fn serial_commands_parse_console_options() {
        assert_eq!(
            serial_command("ttyS0,115200n81").expect("serial"),
            "serial --unit=0 --speed=115200 --word=8 --stop=1"
        );
        assert_eq!(
            serial_command("ttyS1,9600e").expect("serial"),
            "serial --unit=1 --speed=9600 --parity=even"
        );
        assert_eq!(
            serial_command("ttyS2").expect("serial"),
            "serial --unit=2"
        );
        assert!(serial_command("tty0").is_none());
    }

    #[test]
    fn config_writes_defaults_and_runs_mkconfig() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&runner, &devices, dir.path());
        let mut loader = loader();
        loader.boot_args.update(["ro", "quiet"]);

        write_config(&ctx, &mut loader, LoaderKind::Grub2).expect("write config");

        let defaults =
            std::fs::read_to_string(dir.path().join("etc/default/grub")).expect("defaults");
        assert!(defaults.contains("GRUB_DEFAULT=saved"));
        assert!(defaults.contains("GRUB_CMDLINE_LINUX=\"ro quiet\""));
        assert!(defaults.contains("GRUB_ENABLE_BLSCFG=true"));
        assert!(defaults.contains("GRUB_DISABLE_RECOVERY=true"));

        let device_map =
            std::fs::read_to_string(dir.path().join("boot/grub2/device.map")).expect("map");
        assert!(device_map.contains("(hd0)      /dev/sda"));

        let rendered = runner.rendered();
        assert!(rendered.contains(&"grub2-set-default abcd1234-6.8.0".to_string()));
        assert!(rendered.contains(&"grub2-mkconfig -o /boot/grub2/grub.cfg".to_string()));
    }

    #[test]
    fn new_kernel_pkg_disables_bls() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(&runner, &devices, dir.path());
        ctx.new_kernel_pkg_present = true;
        let mut loader = loader();

        write_config(&ctx, &mut loader, LoaderKind::Grub2).expect("write config");
        assert!(!loader.use_bls);
        let defaults =
            std::fs::read_to_string(dir.path().join("etc/default/grub")).expect("defaults");
        assert!(!defaults.contains("GRUB_ENABLE_BLSCFG"));
    }

    #[test]
    fn passwords_are_hashed_and_stored_0600() {
        use std::os::unix::fs::PermissionsExt;

        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "PBKDF2 hash of your password is grub.pbkdf2.sha512.10000.AA.BB\n".into(),
            stderr: String::new(),
        });
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&runner, &devices, dir.path());
        let mut loader = loader();
        loader.password = Some("secret".into());

        write_config(&ctx, &mut loader, LoaderKind::Grub2).expect("write config");

        let user_cfg_path = dir.path().join("boot/grub2/user.cfg");
        let user_cfg = std::fs::read_to_string(&user_cfg_path).expect("user.cfg");
        assert_eq!(user_cfg, "GRUB2_PASSWORD=grub.pbkdf2.sha512.10000.AA.BB\n");
        let mode = std::fs::metadata(&user_cfg_path)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(loader.boot_args.contains("rd.shell=0"));
    }

    #[test]
    fn ipseries_updates_the_boot_list_before_installing() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&runner, &devices, dir.path());
        let loader = loader();

        install(
            &ctx,
            &loader,
            LoaderKind::IpSeriesGrub2,
            &[("sda1".to_string(), "md0".to_string())],
        )
        .expect("install");

        assert_eq!(
            runner.rendered(),
            vec![
                "bootlist -m normal -o /dev/sda1",
                "grub2-install --no-nvram /dev/sda1",
            ]
        );
    }

    #[test]
    fn powernv_installation_is_a_no_op() {
        let runner = RecordingRunner::new();
        let devices = devices();
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&runner, &devices, dir.path());

        install(
            &ctx,
            &loader(),
            LoaderKind::PowerNvGrub2,
            &[("sda".to_string(), "sda2".to_string())],
        )
        .expect("install");
        assert!(runner.rendered().is_empty());
    }
}
