// SPDX-License-Identifier: GPL-3.0-only

//! EXTLINUX configuration writing and installation.

use installer_contracts::InstallerError;
use installer_sys::runner::ToolCommand;

use crate::base::BootLoader;
use crate::writers::{WriterContext, runner_failure, write_file};

const CONFIG_DIR: &str = "/boot/extlinux";

fn render_config(loader: &BootLoader) -> String {
    let mut contents = String::new();
    if let Some(default) = loader.default_image() {
        contents.push_str(&format!("ui menu.c32\ndefault {}\n", default.label));
    }
    contents.push_str(&format!("timeout {}\n", loader.timeout.unwrap_or(5) * 10));

    for image in &loader.images {
        contents.push_str(&format!("\nlabel {}\n", image.label));
        contents.push_str(&format!("\tkernel /{}\n", image.kernel()));
        contents.push_str(&format!("\tinitrd /{}\n", image.initrd()));
        contents.push_str(&format!("\tappend {}\n", loader.boot_args.render()));
    }
    contents
}

pub fn write_config(
    ctx: &WriterContext<'_>,
    loader: &mut BootLoader,
) -> Result<(), InstallerError> {
    write_file(
        &ctx.path(&format!("{CONFIG_DIR}/extlinux.conf")),
        &render_config(loader),
    )
}

pub fn install(ctx: &WriterContext<'_>) -> Result<(), InstallerError> {
    let outcome = ctx
        .runner
        .run(&ToolCommand::new("extlinux", &["--install", CONFIG_DIR]))
        .map_err(runner_failure)?;
    if !outcome.success() {
        return Err(InstallerError::bootloader(format!(
            "extlinux failed: {}",
            outcome.stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LoaderKind;
    use crate::image::LinuxBootLoaderImage;

    #[test]
    fn entries_list_kernel_and_append_lines() {
        let mut loader = BootLoader::new(LoaderKind::Extlinux);
        loader.boot_args.update(["root=/dev/mmcblk0p2", "ro"]);
        loader.timeout = Some(3);
        loader.add_image(LinuxBootLoaderImage::new("mmcblk0p2", "linux", "6.8.0"), true);

        let rendered = render_config(&loader);
        assert!(rendered.contains("default linux"));
        assert!(rendered.contains("timeout 30"));
        assert!(rendered.contains("\tkernel /vmlinuz-6.8.0"));
        assert!(rendered.contains("\tappend root=/dev/mmcblk0p2 ro"));
    }
}
