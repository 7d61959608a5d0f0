// SPDX-License-Identifier: GPL-3.0-only

//! Commands owned by the Users module: rootpw, user, group, sshkey, sshpw.

use clap::Parser;

use installer_types::{GroupData, SshKeyData, UserData};

use super::{push_flag, push_opt, quote, split_csv};

/// `rootpw [--iscrypted|--plaintext] [--allow-ssh] [--lock] [password]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "rootpw", no_binary_name = true, disable_help_flag = true)]
pub struct RootpwCommand {
    #[arg(long)]
    pub iscrypted: bool,

    #[arg(long)]
    pub plaintext: bool,

    #[arg(long = "allow-ssh")]
    pub allow_ssh: bool,

    #[arg(long)]
    pub lock: bool,

    pub password: Option<String>,
}

impl RootpwCommand {
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    pub fn is_crypted(&self) -> bool {
        // --plaintext wins when both are given; a bare password is plain.
        self.iscrypted && !self.plaintext
    }

    /// Whether the root account ends up locked.
    pub fn locks_account(&self) -> bool {
        self.lock || self.password().is_empty()
    }

    /// Canonical form: the crypt flag is always explicit when a password is
    /// present, and a lone `--lock` line stands for "nothing else said".
    pub fn emit(&self) -> String {
        let mut out = String::from("rootpw");
        if self.password().is_empty() {
            push_flag(&mut out, "allow-ssh", self.allow_ssh);
            out.push_str(" --lock");
            return out;
        }
        push_flag(&mut out, "iscrypted", self.is_crypted());
        push_flag(&mut out, "plaintext", !self.is_crypted());
        push_flag(&mut out, "allow-ssh", self.allow_ssh);
        push_flag(&mut out, "lock", self.lock);
        out.push_str(&format!(" {}", quote(self.password())));
        out
    }
}

/// `user --name=... [options]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "user", no_binary_name = true, disable_help_flag = true)]
pub struct UserCommand {
    #[arg(long)]
    pub groups: Option<String>,

    #[arg(long)]
    pub homedir: Option<String>,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub iscrypted: bool,

    #[arg(long)]
    pub plaintext: bool,

    #[arg(long)]
    pub lock: bool,

    #[arg(long)]
    pub shell: Option<String>,

    #[arg(long)]
    pub uid: Option<u32>,

    #[arg(long)]
    pub gid: Option<u32>,

    #[arg(long)]
    pub gecos: Option<String>,
}

impl UserCommand {
    pub fn to_user_data(&self) -> UserData {
        let mut data = UserData {
            name: self.name.clone(),
            groups: self.groups.as_deref().map(split_csv).unwrap_or_default(),
            homedir: self.homedir.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            is_crypted: self.iscrypted && !self.plaintext,
            lock: self.lock,
            shell: self.shell.clone().unwrap_or_default(),
            gecos: self.gecos.clone().unwrap_or_default(),
            ..Default::default()
        };
        data.set_uid(self.uid);
        data.set_gid(self.gid);
        data
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("user");
        push_opt(&mut out, "groups", &self.groups);
        push_opt(&mut out, "homedir", &self.homedir);
        out.push_str(&format!(" --name={}", quote(&self.name)));
        push_opt(&mut out, "password", &self.password);
        push_flag(&mut out, "iscrypted", self.iscrypted && !self.plaintext);
        push_flag(&mut out, "lock", self.lock);
        push_opt(&mut out, "shell", &self.shell);
        if let Some(uid) = self.uid {
            out.push_str(&format!(" --uid={uid}"));
        }
        if let Some(gid) = self.gid {
            out.push_str(&format!(" --gid={gid}"));
        }
        push_opt(&mut out, "gecos", &self.gecos);
        out
    }
}

/// `group --name=... [--gid=...]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "group", no_binary_name = true, disable_help_flag = true)]
pub struct GroupCommand {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub gid: Option<u32>,
}

impl GroupCommand {
    pub fn to_group_data(&self) -> GroupData {
        let mut data = GroupData {
            name: self.name.clone(),
            ..Default::default()
        };
        data.set_gid(self.gid);
        data
    }

    pub fn emit(&self) -> String {
        let mut out = format!("group --name={}", quote(&self.name));
        if let Some(gid) = self.gid {
            out.push_str(&format!(" --gid={gid}"));
        }
        out
    }
}

/// `sshkey --username=... "key"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "sshkey", no_binary_name = true, disable_help_flag = true)]
pub struct SshKeyCommand {
    #[arg(long)]
    pub username: String,

    pub key: String,
}

impl SshKeyCommand {
    pub fn to_ssh_key_data(&self) -> SshKeyData {
        SshKeyData {
            username: self.username.clone(),
            key: self.key.clone(),
        }
    }

    pub fn emit(&self) -> String {
        // The key always renders quoted; it contains spaces by nature.
        format!("sshkey --username={} \"{}\"", quote(&self.username), self.key)
    }
}

/// `sshpw --username=... [--iscrypted|--plaintext] [--lock] password`
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "sshpw", no_binary_name = true, disable_help_flag = true)]
pub struct SshPwCommand {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub iscrypted: bool,

    #[arg(long)]
    pub plaintext: bool,

    #[arg(long)]
    pub lock: bool,

    pub password: String,
}

impl SshPwCommand {
    pub fn emit(&self) -> String {
        let mut out = format!("sshpw --username={}", quote(&self.username));
        push_flag(&mut out, "iscrypted", self.iscrypted && !self.plaintext);
        push_flag(&mut out, "plaintext", !self.iscrypted || self.plaintext);
        push_flag(&mut out, "lock", self.lock);
        out.push_str(&format!(" {}", quote(&self.password)));
        out
    }
}
