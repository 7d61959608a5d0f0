// SPDX-License-Identifier: GPL-3.0-only

//! Boot-chain tools: the GRUB2 family, zipl, bootctl, efibootmgr, dracut
//! and the kernel maintenance helpers.

use std::path::Path;

use crate::error::{Result, SysError};
use crate::runner::{ToolCommand, ToolRunner};

fn checked(runner: &dyn ToolRunner, command: ToolCommand) -> Result<String> {
    let outcome = runner.run(&command)?;
    if !outcome.success() {
        return Err(SysError::OperationFailed {
            command: command.render(),
            stderr: format!("exited {}: {}", outcome.status, outcome.stderr.trim()),
        });
    }
    Ok(outcome.stdout)
}

/// `grub2-install [--no-nvram] <stage1>`
pub fn grub2_install(
    runner: &dyn ToolRunner,
    stage1_path: &str,
    no_nvram: bool,
) -> Result<()> {
    let mut args = Vec::new();
    if no_nvram {
        args.push("--no-nvram".to_string());
    }
    args.push(stage1_path.to_string());
    checked(runner, ToolCommand::with_args("grub2-install", args)).map(|_| ())
}

/// `grub2-mkconfig -o <config-file>`
pub fn grub2_mkconfig(runner: &dyn ToolRunner, config_file: &str) -> Result<()> {
    checked(
        runner,
        ToolCommand::new("grub2-mkconfig", &["-o", config_file]),
    )
    .map(|_| ())
}

/// `grub2-set-default <entry>`
pub fn grub2_set_default(runner: &dyn ToolRunner, entry: &str) -> Result<()> {
    checked(runner, ToolCommand::new("grub2-set-default", &[entry])).map(|_| ())
}

/// `grub2-editenv - set <assignments...>`
pub fn grub2_editenv_set(runner: &dyn ToolRunner, assignments: &[&str]) -> Result<()> {
    let mut args = vec!["-".to_string(), "set".to_string()];
    args.extend(assignments.iter().map(ToString::to_string));
    checked(runner, ToolCommand::with_args("grub2-editenv", args)).map(|_| ())
}

/// Hash a boot password with `grub2-mkpasswd-pbkdf2`.
///
/// The password is written twice on a pipe; the hash is the last
/// whitespace-separated token of the output and must carry the pbkdf2
/// prefix.
pub fn grub2_mkpasswd(runner: &dyn ToolRunner, password: &str) -> Result<String> {
    let command =
        ToolCommand::new("grub2-mkpasswd-pbkdf2", &[]).feeding(format!("{password}\n{password}\n"));
    let stdout = checked(runner, command)?;
    let hash = stdout
        .split_whitespace()
        .next_back()
        .unwrap_or_default()
        .to_string();
    if !hash.starts_with("grub.pbkdf2.") {
        return Err(SysError::Other(format!(
            "unexpected grub2-mkpasswd-pbkdf2 output: {}",
            stdout.trim()
        )));
    }
    Ok(hash)
}

/// Run `zipl`, returning the IPL device scraped from its output.
///
/// An argument-length complaint is surfaced verbatim; it means the kernel
/// command line must be shortened.
pub fn zipl(runner: &dyn ToolRunner) -> Result<Option<String>> {
    let command = ToolCommand::new("zipl", &[]);
    let outcome = runner.run(&command)?;

    for line in outcome.stderr.lines().chain(outcome.stdout.lines()) {
        if line.starts_with("Error: The length of the parameters") {
            return Err(SysError::Other(line.to_string()));
        }
    }
    if !outcome.success() {
        return Err(SysError::OperationFailed {
            command: command.render(),
            stderr: format!("exited {}: {}", outcome.status, outcome.stderr.trim()),
        });
    }

    // "Preparing boot device: dasda (0200)." names the IPL device.
    for line in outcome.stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("Preparing boot device: ") {
            let device = rest
                .split([' ', '.'])
                .next()
                .unwrap_or_default()
                .to_string();
            if !device.is_empty() {
                return Ok(Some(device));
            }
        }
    }
    Ok(None)
}

/// `bootctl --print-esp-path`
pub fn bootctl_esp_path(runner: &dyn ToolRunner) -> Result<String> {
    let stdout = checked(runner, ToolCommand::new("bootctl", &["--print-esp-path"]))?;
    Ok(stdout.trim().to_string())
}

/// `bootctl install --esp-path=... --efi-boot-option-description=...`
pub fn bootctl_install(
    runner: &dyn ToolRunner,
    esp_path: &str,
    description: &str,
) -> Result<()> {
    checked(
        runner,
        ToolCommand::new(
            "bootctl",
            &[
                "install",
                &format!("--esp-path={esp_path}"),
                &format!("--efi-boot-option-description={description}"),
            ],
        ),
    )
    .map(|_| ())
}

/// A firmware boot entry parsed from `efibootmgr` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EfiBootEntry {
    pub number: String,
    pub label: String,
}

/// Parse `Boot0001* Fedora ...` lines.
pub fn parse_efi_boot_entries(output: &str) -> Vec<EfiBootEntry> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix("Boot")?;
            let (number, label) = rest.split_once(' ')?;
            let number = number.trim_end_matches('*');
            if number.len() != 4 || !number.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            Some(EfiBootEntry {
                number: number.to_string(),
                label: label.trim().to_string(),
            })
        })
        .collect()
}

/// `efibootmgr` (listing)
pub fn efibootmgr_list(runner: &dyn ToolRunner) -> Result<Vec<EfiBootEntry>> {
    let stdout = checked(runner, ToolCommand::new("efibootmgr", &[]))?;
    Ok(parse_efi_boot_entries(&stdout))
}

/// `efibootmgr -b <num> -B`
pub fn efibootmgr_remove(runner: &dyn ToolRunner, number: &str) -> Result<()> {
    checked(runner, ToolCommand::new("efibootmgr", &["-b", number, "-B"])).map(|_| ())
}

/// `efibootmgr -c -w -L <label> -d <disk> -p <partition> -l <loader>`
pub fn efibootmgr_create(
    runner: &dyn ToolRunner,
    label: &str,
    disk: &str,
    partition: u32,
    loader: &str,
) -> Result<()> {
    checked(
        runner,
        ToolCommand::new(
            "efibootmgr",
            &[
                "-c",
                "-w",
                "-L",
                label,
                "-d",
                disk,
                "-p",
                &partition.to_string(),
                "-l",
                loader,
            ],
        ),
    )
    .map(|_| ())
}

/// `depmod -a <version>`
pub fn depmod(runner: &dyn ToolRunner, version: &str) -> Result<()> {
    checked(runner, ToolCommand::new("depmod", &["-a", version])).map(|_| ())
}

/// `dracut -f <image> <version>`, with image-install extras when asked.
pub fn dracut(
    runner: &dyn ToolRunner,
    image: &str,
    version: &str,
    image_install: bool,
) -> Result<()> {
    let mut args = vec!["-f".to_string(), image.to_string(), version.to_string()];
    if image_install {
        args.push("-N".to_string());
        args.push("--persistent-policy".to_string());
        args.push("by-uuid".to_string());
    }
    checked(runner, ToolCommand::with_args("dracut", args)).map(|_| ())
}

/// `kernel-install add <version> <vmlinuz>`
pub fn kernel_install_add(runner: &dyn ToolRunner, version: &str) -> Result<()> {
    checked(
        runner,
        ToolCommand::new(
            "kernel-install",
            &[
                "add",
                version,
                &format!("/lib/modules/{version}/vmlinuz"),
            ],
        ),
    )
    .map(|_| ())
}

/// `new-kernel-pkg <args...> <version>`
pub fn new_kernel_pkg(runner: &dyn ToolRunner, args: &[&str], version: &str) -> Result<()> {
    let mut full = args.iter().map(ToString::to_string).collect::<Vec<_>>();
    full.push(version.to_string());
    checked(runner, ToolCommand::with_args("new-kernel-pkg", full)).map(|_| ())
}

/// `systemd-machine-id-setup`
pub fn machine_id_setup(runner: &dyn ToolRunner) -> Result<()> {
    checked(runner, ToolCommand::new("systemd-machine-id-setup", &[])).map(|_| ())
}

/// `bootlist -m normal -o <stage1>`
pub fn bootlist(runner: &dyn ToolRunner, stage1_path: &str) -> Result<()> {
    checked(
        runner,
        ToolCommand::new("bootlist", &["-m", "normal", "-o", stage1_path]),
    )
    .map(|_| ())
}

/// `createrepo_c <directory>`
pub fn createrepo(runner: &dyn ToolRunner, directory: &Path) -> Result<()> {
    checked(
        runner,
        ToolCommand::new("createrepo_c", &[&directory.display().to_string()]),
    )
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RecordingRunner, ToolOutcome};

    #[test]
    fn mkpasswd_scrapes_the_last_token() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "Enter password:\nReenter password:\nPBKDF2 hash of your password is grub.pbkdf2.sha512.10000.AAAA.BBBB\n".into(),
            stderr: String::new(),
        });

        let hash = grub2_mkpasswd(&runner, "secret").expect("hash");
        assert_eq!(hash, "grub.pbkdf2.sha512.10000.AAAA.BBBB");

        let invocation = &runner.invocations()[0];
        assert_eq!(invocation.stdin.as_deref(), Some("secret\nsecret\n"));
    }

    #[test]
    fn mkpasswd_rejects_unexpected_output() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "something went sideways\n".into(),
            stderr: String::new(),
        });
        assert!(grub2_mkpasswd(&runner, "secret").is_err());
    }

    #[test]
    fn zipl_scrapes_the_ipl_device() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 0,
            stdout: "Building bootmap\nPreparing boot device: dasda (0200).\nDone.\n".into(),
            stderr: String::new(),
        });
        assert_eq!(zipl(&runner).expect("zipl"), Some("dasda".to_string()));
    }

    #[test]
    fn zipl_surfaces_parameter_length_errors_verbatim() {
        let runner = RecordingRunner::new();
        runner.push_outcome(ToolOutcome {
            status: 1,
            stdout: String::new(),
            stderr: "Error: The length of the parameters line exceeds 895 bytes\n".into(),
        });
        let error = zipl(&runner).expect_err("length error");
        assert!(error.to_string().contains("length of the parameters"));
    }

    #[test]
    fn efi_entries_parse() {
        let entries = parse_efi_boot_entries(
            "BootCurrent: 0001\nTimeout: 1 seconds\nBootOrder: 0001,0000\nBoot0000* Fedora\nBoot0001* UEFI OS\n",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].number, "0000");
        assert_eq!(entries[0].label, "Fedora");
    }
}
