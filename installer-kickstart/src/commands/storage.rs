// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Storage module.

use clap::Parser;

use installer_types::{DiskSelection, PartitioningRequest};

use super::{push_flag, push_opt, quote, split_csv};

/// `autopart [--type=...] [--fstype=...] [--encrypted ...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "autopart", no_binary_name = true, disable_help_flag = true)]
pub struct AutopartCommand {
    #[arg(long = "type")]
    pub scheme: Option<String>,

    #[arg(long)]
    pub fstype: Option<String>,

    #[arg(long)]
    pub nohome: bool,

    #[arg(long)]
    pub noboot: bool,

    #[arg(long)]
    pub noswap: bool,

    #[arg(long)]
    pub encrypted: bool,

    #[arg(long)]
    pub passphrase: Option<String>,

    #[arg(long)]
    pub cipher: Option<String>,

    #[arg(long = "luks-version")]
    pub luks_version: Option<String>,

    #[arg(long)]
    pub pbkdf: Option<String>,

    #[arg(long = "pbkdf-memory")]
    pub pbkdf_memory: Option<i32>,

    #[arg(long = "pbkdf-time")]
    pub pbkdf_time: Option<i32>,

    #[arg(long = "pbkdf-iterations")]
    pub pbkdf_iterations: Option<i32>,

    #[arg(long)]
    pub escrowcert: Option<String>,

    #[arg(long)]
    pub backuppassphrase: bool,
}

impl AutopartCommand {
    pub fn to_partitioning_request(&self) -> PartitioningRequest {
        let mut excluded = Vec::new();
        if self.nohome {
            excluded.push("/home".to_string());
        }
        if self.noboot {
            excluded.push("/boot".to_string());
        }
        if self.noswap {
            excluded.push("swap".to_string());
        }
        PartitioningRequest {
            partitioning_scheme: match self.scheme.as_deref() {
                Some("btrfs") => 1,
                Some("lvm") => 2,
                Some("thinp") => 3,
                _ => 0,
            },
            file_system_type: self.fstype.clone().unwrap_or_default(),
            excluded_mount_points: excluded,
            encrypted: self.encrypted,
            passphrase: self.passphrase.clone().unwrap_or_default(),
            cipher: self.cipher.clone().unwrap_or_default(),
            luks_version: self.luks_version.clone().unwrap_or_default(),
            pbkdf: self.pbkdf.clone().unwrap_or_default(),
            pbkdf_memory: self.pbkdf_memory.unwrap_or_default(),
            pbkdf_time: self.pbkdf_time.unwrap_or_default(),
            pbkdf_iterations: self.pbkdf_iterations.unwrap_or_default(),
            escrow_certificate: self.escrowcert.clone().unwrap_or_default(),
            backup_passphrase_enabled: self.backuppassphrase,
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("autopart");
        push_opt(&mut out, "type", &self.scheme);
        push_opt(&mut out, "fstype", &self.fstype);
        push_flag(&mut out, "nohome", self.nohome);
        push_flag(&mut out, "noboot", self.noboot);
        push_flag(&mut out, "noswap", self.noswap);
        push_flag(&mut out, "encrypted", self.encrypted);
        push_opt(&mut out, "passphrase", &self.passphrase);
        push_opt(&mut out, "cipher", &self.cipher);
        push_opt(&mut out, "luks-version", &self.luks_version);
        push_opt(&mut out, "pbkdf", &self.pbkdf);
        if let Some(memory) = self.pbkdf_memory {
            out.push_str(&format!(" --pbkdf-memory={memory}"));
        }
        if let Some(time) = self.pbkdf_time {
            out.push_str(&format!(" --pbkdf-time={time}"));
        }
        if let Some(iterations) = self.pbkdf_iterations {
            out.push_str(&format!(" --pbkdf-iterations={iterations}"));
        }
        push_opt(&mut out, "escrowcert", &self.escrowcert);
        push_flag(&mut out, "backuppassphrase", self.backuppassphrase);
        out
    }
}

/// `part <mntpoint> [options]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "part", no_binary_name = true, disable_help_flag = true)]
pub struct PartCommand {
    pub mount_point: String,

    #[arg(long)]
    pub size: Option<u64>,

    #[arg(long)]
    pub grow: bool,

    #[arg(long)]
    pub maxsize: Option<u64>,

    #[arg(long)]
    pub ondisk: Option<String>,

    #[arg(long)]
    pub fstype: Option<String>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long)]
    pub encrypted: bool,

    #[arg(long)]
    pub passphrase: Option<String>,
}

impl PartCommand {
    pub fn emit(&self) -> String {
        let mut out = format!("part {}", quote(&self.mount_point));
        if let Some(size) = self.size {
            out.push_str(&format!(" --size={size}"));
        }
        push_flag(&mut out, "grow", self.grow);
        if let Some(maxsize) = self.maxsize {
            out.push_str(&format!(" --maxsize={maxsize}"));
        }
        push_opt(&mut out, "ondisk", &self.ondisk);
        push_opt(&mut out, "fstype", &self.fstype);
        push_opt(&mut out, "label", &self.label);
        push_flag(&mut out, "encrypted", self.encrypted);
        push_opt(&mut out, "passphrase", &self.passphrase);
        out
    }
}

/// `ignoredisk --drives=... | --only-use=...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "ignoredisk", no_binary_name = true, disable_help_flag = true)]
pub struct IgnorediskCommand {
    #[arg(long)]
    pub drives: Option<String>,

    #[arg(long = "only-use")]
    pub only_use: Option<String>,
}

impl IgnorediskCommand {
    pub fn apply(&self, selection: &mut DiskSelection) {
        if let Some(drives) = &self.drives {
            selection.ignored_disks = split_csv(drives);
        }
        if let Some(only) = &self.only_use {
            selection.exclusive_disks = split_csv(only);
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("ignoredisk");
        push_opt(&mut out, "drives", &self.drives);
        push_opt(&mut out, "only-use", &self.only_use);
        out
    }
}

/// `iscsi --ipaddr=... [options]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "iscsi", no_binary_name = true, disable_help_flag = true)]
pub struct IscsiCommand {
    #[arg(long)]
    pub ipaddr: String,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub target: Option<String>,

    #[arg(long)]
    pub iface: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long = "reverse-user")]
    pub reverse_user: Option<String>,

    #[arg(long = "reverse-password")]
    pub reverse_password: Option<String>,
}

impl IscsiCommand {
    pub fn emit(&self) -> String {
        let mut out = format!("iscsi --ipaddr={}", quote(&self.ipaddr));
        if let Some(port) = self.port {
            out.push_str(&format!(" --port={port}"));
        }
        push_opt(&mut out, "target", &self.target);
        push_opt(&mut out, "iface", &self.iface);
        push_opt(&mut out, "user", &self.user);
        push_opt(&mut out, "password", &self.password);
        push_opt(&mut out, "reverse-user", &self.reverse_user);
        push_opt(&mut out, "reverse-password", &self.reverse_password);
        out
    }
}

/// `iscsiname <initiator-name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "iscsiname", no_binary_name = true, disable_help_flag = true)]
pub struct IscsinameCommand {
    pub name: String,
}

impl IscsinameCommand {
    pub fn emit(&self) -> String {
        format!("iscsiname {}", quote(&self.name))
    }
}

/// `zfcp --devnum=... [--wwpn=... --fcplun=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "zfcp", no_binary_name = true, disable_help_flag = true)]
pub struct ZfcpCommand {
    #[arg(long)]
    pub devnum: String,

    #[arg(long)]
    pub wwpn: Option<String>,

    #[arg(long)]
    pub fcplun: Option<String>,
}

impl ZfcpCommand {
    pub fn emit(&self) -> String {
        let mut out = format!("zfcp --devnum={}", quote(&self.devnum));
        push_opt(&mut out, "wwpn", &self.wwpn);
        push_opt(&mut out, "fcplun", &self.fcplun);
        out
    }
}

/// `nvdimm <action> [--namespace=...] [--mode=...] [--blockdevs=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "nvdimm", no_binary_name = true, disable_help_flag = true)]
pub struct NvdimmCommand {
    pub action: String,

    #[arg(long)]
    pub namespace: Option<String>,

    #[arg(long)]
    pub mode: Option<String>,

    #[arg(long)]
    pub sectorsize: Option<u32>,

    #[arg(long)]
    pub blockdevs: Option<String>,
}

impl NvdimmCommand {
    pub fn emit(&self) -> String {
        let mut out = format!("nvdimm {}", quote(&self.action));
        push_opt(&mut out, "namespace", &self.namespace);
        push_opt(&mut out, "mode", &self.mode);
        if let Some(size) = self.sectorsize {
            out.push_str(&format!(" --sectorsize={size}"));
        }
        push_opt(&mut out, "blockdevs", &self.blockdevs);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autopart_maps_to_a_partitioning_request() {
        let command = AutopartCommand::try_parse_from([
            "--type=lvm",
            "--fstype=xfs",
            "--nohome",
            "--encrypted",
            "--passphrase=p",
        ])
        .expect("parse");
        let request = command.to_partitioning_request();
        assert_eq!(request.partitioning_scheme, 2);
        assert_eq!(request.file_system_type, "xfs");
        assert_eq!(request.excluded_mount_points, vec!["/home"]);
        assert!(request.encrypted);
    }

    #[test]
    fn autopart_round_trip() {
        let command =
            AutopartCommand::try_parse_from(["--type=btrfs", "--encrypted", "--passphrase=p"])
                .expect("parse");
        assert_eq!(
            command.emit(),
            "autopart --type=btrfs --encrypted --passphrase=p"
        );
    }

    #[test]
    fn part_round_trip() {
        let command =
            PartCommand::try_parse_from(["/boot", "--size=1024", "--fstype=ext4", "--ondisk=sda"])
                .expect("parse");
        assert_eq!(
            command.emit(),
            "part /boot --size=1024 --ondisk=sda --fstype=ext4"
        );
    }

    #[test]
    fn ignoredisk_fills_the_selection() {
        let command =
            IgnorediskCommand::try_parse_from(["--only-use=sda,sdb"]).expect("parse");
        let mut selection = DiskSelection::default();
        command.apply(&mut selection);
        assert_eq!(selection.exclusive_disks, vec!["sda", "sdb"]);
    }
}
