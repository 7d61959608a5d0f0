// SPDX-License-Identifier: GPL-3.0-only

//! ZIPL configuration writing and installation (s390).

use installer_contracts::InstallerError;
use installer_sys::boot_tools;

use crate::base::BootLoader;
use crate::writers::{WriterContext, runner_failure, write_file};

const CONFIG_FILE: &str = "/etc/zipl.conf";
const ENTRY_DIR: &str = "/boot/loader/entries";

fn render_config(loader: &BootLoader) -> String {
    let mut contents = String::new();
    contents.push_str("[defaultboot]\n");
    if let Some(default) = loader.default_image() {
        contents.push_str(&format!("default={}\n", default.label));
    } else {
        contents.push_str("defaultauto\n");
    }
    contents.push_str("prompt=1\n");
    contents.push_str(&format!("timeout={}\n", loader.timeout.unwrap_or(5)));
    contents.push_str("target=/boot\n");
    if !loader.secure.is_empty() {
        contents.push_str(&format!("secure={}\n", loader.secure));
    }

    if !loader.use_bls {
        for image in &loader.images {
            contents.push_str(&format!("\n[{}]\n", image.label));
            contents.push_str(&format!("image=/boot/{}\n", image.kernel()));
            contents.push_str(&format!("ramdisk=/boot/{}\n", image.initrd()));
            contents.push_str(&format!("parameters=\"{}\"\n", loader.boot_args.render()));
        }
    }
    contents
}

/// Rewrite the `options` line of the per-machine-id BLS entry.
fn rewrite_bls_options(
    ctx: &WriterContext<'_>,
    loader: &BootLoader,
) -> Result<(), InstallerError> {
    let Some(default) = loader.default_image() else {
        return Ok(());
    };
    let entry_path = ctx.path(&format!(
        "{ENTRY_DIR}/{}-{}.conf",
        ctx.machine_id, default.version
    ));
    if !entry_path.exists() {
        tracing::debug!("no BLS entry at {}", entry_path.display());
        return Ok(());
    }

    let contents = std::fs::read_to_string(&entry_path)
        .map_err(|error| InstallerError::os(format!("reading {}: {error}", entry_path.display())))?;
    let rewritten: Vec<String> = contents
        .lines()
        .map(|line| {
            if line.starts_with("options ") {
                format!("options {}", loader.boot_args.render())
            } else {
                line.to_string()
            }
        })
        .collect();
    write_file(&entry_path, &(rewritten.join("\n") + "\n"))
}

pub fn write_config(
    ctx: &WriterContext<'_>,
    loader: &mut BootLoader,
) -> Result<(), InstallerError> {
    write_file(&ctx.path(CONFIG_FILE), &render_config(loader))?;
    if loader.use_bls {
        rewrite_bls_options(ctx, loader)?;
    }
    Ok(())
}

/// Run zipl; the IPL device it reports is logged for the reipl step.
pub fn install(ctx: &WriterContext<'_>) -> Result<Option<String>, InstallerError> {
    let ipl_device = boot_tools::zipl(ctx.runner).map_err(runner_failure)?;
    if let Some(device) = &ipl_device {
        tracing::info!("zipl prepared boot device {device}");
    }
    Ok(ipl_device)
}
