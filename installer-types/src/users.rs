// SPDX-License-Identifier: GPL-3.0-only

//! User, group and SSH key records.

use std::fmt;

use installer_dbus::structure_fields;
use installer_dbus::wire::{TypeHint, WireData, WireError};
use installer_dbus::structure::WireConvert;
use serde::{Deserialize, Serialize};

/// The group whose membership grants administrative privileges.
pub const ADMIN_GROUP: &str = "wheel";

/// Whether a numeric id is system-assigned or requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    #[default]
    Default,
    Value,
}

impl WireConvert for IdMode {
    fn hint() -> TypeHint {
        TypeHint::Str
    }

    fn to_wire(&self) -> WireData {
        WireData::Str(
            match self {
                Self::Default => "default",
                Self::Value => "value",
            }
            .to_string(),
        )
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Str(value) if value == "default" => Ok(Self::Default),
            WireData::Str(value) if value == "value" => Ok(Self::Value),
            _ => Err(WireError::TypeMismatch {
                expected: "s (id mode)".into(),
            }),
        }
    }
}

/// One user to create on the installed system.
///
/// Equality is name-based: two records describe the same user exactly when
/// their names match.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
    pub uid_mode: IdMode,
    pub uid: u32,
    pub gid_mode: IdMode,
    pub gid: u32,
    pub groups: Vec<String>,
    pub homedir: String,
    pub password: String,
    pub is_crypted: bool,
    pub lock: bool,
    pub shell: String,
    pub gecos: String,
}

structure_fields! {
    impl UserData {
        "name" => name: String,
        "uid-mode" => uid_mode: IdMode,
        "uid" => uid: u32,
        "gid-mode" => gid_mode: IdMode,
        "gid" => gid: u32,
        "groups" => groups: Vec<String>,
        "homedir" => homedir: String,
        "password" => password: String,
        "is-crypted" => is_crypted: bool,
        "lock" => lock: bool,
        "shell" => shell: String,
        "gecos" => gecos: String,
    }
}

impl PartialEq for UserData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for UserData {}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserData")
            .field("name", &self.name)
            .field("uid", &self.get_uid())
            .field("gid", &self.get_gid())
            .field("groups", &self.groups)
            .field("homedir", &self.homedir)
            .field("lock", &self.lock)
            .field("password_set", &!self.password.is_empty())
            .finish()
    }
}

impl UserData {
    /// The requested uid, or None when the system should assign one.
    pub fn get_uid(&self) -> Option<u32> {
        match self.uid_mode {
            IdMode::Value => Some(self.uid),
            IdMode::Default => None,
        }
    }

    pub fn set_uid(&mut self, uid: Option<u32>) {
        match uid {
            Some(value) => {
                self.uid = value;
                self.uid_mode = IdMode::Value;
            }
            None => {
                self.uid = 0;
                self.uid_mode = IdMode::Default;
            }
        }
    }

    pub fn get_gid(&self) -> Option<u32> {
        match self.gid_mode {
            IdMode::Value => Some(self.gid),
            IdMode::Default => None,
        }
    }

    pub fn set_gid(&mut self, gid: Option<u32>) {
        match gid {
            Some(value) => {
                self.gid = value;
                self.gid_mode = IdMode::Value;
            }
            None => {
                self.gid = 0;
                self.gid_mode = IdMode::Default;
            }
        }
    }

    /// Admin privilege is membership of the wheel group.
    pub fn has_admin_privileges(&self) -> bool {
        self.groups.iter().any(|group| group == ADMIN_GROUP)
    }

    pub fn set_admin_privileges(&mut self, admin: bool) {
        let is_member = self.has_admin_privileges();
        if admin && !is_member {
            self.groups.push(ADMIN_GROUP.to_string());
        } else if !admin && is_member {
            self.groups.retain(|group| group != ADMIN_GROUP);
        }
    }

    /// The home directory to create, defaulting under /home.
    pub fn effective_homedir(&self) -> String {
        if self.homedir.is_empty() {
            format!("/home/{}", self.name)
        } else {
            self.homedir.clone()
        }
    }
}

/// One group to create on the installed system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    pub name: String,
    pub gid_mode: IdMode,
    pub gid: u32,
}

structure_fields! {
    impl GroupData {
        "name" => name: String,
        "gid-mode" => gid_mode: IdMode,
        "gid" => gid: u32,
    }
}

impl GroupData {
    pub fn get_gid(&self) -> Option<u32> {
        match self.gid_mode {
            IdMode::Value => Some(self.gid),
            IdMode::Default => None,
        }
    }

    pub fn set_gid(&mut self, gid: Option<u32>) {
        match gid {
            Some(value) => {
                self.gid = value;
                self.gid_mode = IdMode::Value;
            }
            None => {
                self.gid = 0;
                self.gid_mode = IdMode::Default;
            }
        }
    }
}

/// One authorized SSH key to install for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyData {
    pub username: String,
    pub key: String,
}

structure_fields! {
    impl SshKeyData {
        "username" => username: String,
        "key" => key: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    fn user() -> UserData {
        UserData {
            name: "ada".into(),
            uid_mode: IdMode::Value,
            uid: 1000,
            gid_mode: IdMode::Default,
            gid: 0,
            groups: vec!["wheel".into(), "users".into()],
            homedir: String::new(),
            password: "secret".into(),
            is_crypted: false,
            lock: false,
            shell: "/bin/zsh".into(),
            gecos: "Ada L.".into(),
        }
    }

    #[test]
    fn equality_is_name_based() {
        let mut other = user();
        other.uid = 2000;
        other.groups.clear();
        assert_eq!(user(), other);

        other.name = "grace".into();
        assert_ne!(user(), other);
    }

    #[test]
    fn default_id_mode_reports_unset() {
        let mut data = user();
        assert_eq!(data.get_uid(), Some(1000));
        assert_eq!(data.get_gid(), None);

        data.set_uid(None);
        data.uid = 42; // stored number must not leak through
        assert_eq!(data.get_uid(), None);
    }

    #[test]
    fn admin_privileges_follow_wheel_membership() {
        let mut data = user();
        assert!(data.has_admin_privileges());
        data.set_admin_privileges(false);
        assert!(!data.has_admin_privileges());
        assert_eq!(data.groups, vec!["users".to_string()]);
        data.set_admin_privileges(true);
        assert!(data.has_admin_privileges());
    }

    #[test]
    fn structure_round_trip() {
        let data = user();
        let decoded = UserData::from_structure(data.to_structure()).expect("decode");
        // Name equality is not enough here; compare the full wire form.
        assert_eq!(decoded.to_structure(), data.to_structure());
    }

    #[test]
    fn debug_omits_the_password() {
        let rendered = format!("{:?}", user());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("password_set: true"));
    }

    #[test]
    fn homedir_defaults_under_home() {
        let mut data = user();
        assert_eq!(data.effective_homedir(), "/home/ada");
        data.homedir = "/srv/ada".into();
        assert_eq!(data.effective_homedir(), "/srv/ada");
    }

    #[test]
    fn group_structure_round_trip() {
        let group = GroupData {
            name: "staff".into(),
            gid_mode: IdMode::Value,
            gid: 500,
        };
        let decoded = GroupData::from_structure(group.to_structure()).expect("decode");
        assert_eq!(decoded, group);
    }
}
