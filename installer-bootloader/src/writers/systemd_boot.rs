// SPDX-License-Identifier: GPL-3.0-only

//! systemd-boot configuration writing and installation.

use installer_contracts::InstallerError;
use installer_sys::boot_tools;
use installer_sys::runner::ToolCommand;

use crate::base::BootLoader;
use crate::writers::{WriterContext, runner_failure, write_file};

const CMDLINE_FILE: &str = "/etc/kernel/cmdline";
const ESP_MOUNT: &str = "/boot/efi";

/// The kernel command line entries boot with.
fn render_cmdline(ctx: &WriterContext<'_>, loader: &BootLoader) -> String {
    let mut cmdline = loader.boot_args.render();
    if !cmdline.is_empty() {
        cmdline.push(' ');
    }
    cmdline.push_str(&format!("root=UUID={}", ctx.root_uuid));
    if let Some(subvolume) = &ctx.root_subvolume {
        cmdline.push_str(&format!(" rootflags=subvol={subvolume}"));
    }
    cmdline.push('\n');
    cmdline
}

pub fn write_config(
    ctx: &WriterContext<'_>,
    loader: &mut BootLoader,
) -> Result<(), InstallerError> {
    let esp_path = boot_tools::bootctl_esp_path(ctx.runner).map_err(runner_failure)?;

    let loader_conf = format!(
        "timeout {}\n# console-mode keep\n",
        loader.timeout.unwrap_or(5)
    );
    write_file(
        &ctx.path(&format!("{}/loader/loader.conf", esp_path.trim_end_matches('/'))),
        &loader_conf,
    )?;
    write_file(&ctx.path(CMDLINE_FILE), &render_cmdline(ctx, loader))?;

    // Reconcile the entries on the ESP with the installed kernels.
    let outcome = ctx
        .runner
        .run(&ToolCommand::new("updateloaderentries", &["--all"]))
        .map_err(runner_failure)?;
    if !outcome.success() {
        return Err(InstallerError::bootloader(format!(
            "updateloaderentries failed: {}",
            outcome.stderr.trim()
        )));
    }
    Ok(())
}

pub fn install(ctx: &WriterContext<'_>) -> Result<(), InstallerError> {
    boot_tools::bootctl_install(ctx.runner, ESP_MOUNT, &ctx.product_short_name)
        .map_err(runner_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LoaderKind;
    use installer_sys::{RecordingRunner, ToolOutcome};
    use std::collections::BTreeMap;

    #[test]
    fn cmdline_carries_root_and_subvolume() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "/boot/efi\n".into(),
            stderr: String::new(),
        });
        let devices = BTreeMap::new();
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
            root_uuid: "1234-abcd".into(),
            root_subvolume: Some("root".into()),
        };

        let mut loader = BootLoader::new(LoaderKind::SystemdBoot);
        loader.boot_args.update(["ro", "quiet"]);
        loader.timeout = Some(3);

        write_config(&ctx, &mut loader).expect("write");

        let cmdline =
            std::fs::read_to_string(dir.path().join("etc/kernel/cmdline")).expect("cmdline");
        assert_eq!(cmdline, "ro quiet root=UUID=1234-abcd rootflags=subvol=root\n");

        let loader_conf =
            std::fs::read_to_string(dir.path().join("boot/efi/loader/loader.conf"))
                .expect("loader.conf");
        assert!(loader_conf.starts_with("timeout 3\n"));

        let rendered = runner.rendered();
        assert!(rendered.contains(&"bootctl --print-esp-path".to_string()));
        assert!(rendered.contains(&"updateloaderentries --all".to_string()));

        install(&ctx).expect("install");
        let last = runner.rendered().pop().expect("last");
        assert_eq!(
            last,
            "bootctl install --esp-path=/boot/efi --efi-boot-option-description=fedora"
        );
    }
}
