// SPDX-License-Identifier: GPL-3.0-only

//! The Users module: root account state, user/group/key records and the
//! account configuration tasks.

pub mod checks;
pub mod names;
pub mod tasks;

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::commands::users::{
    GroupCommand, RootpwCommand, SshKeyCommand, UserCommand,
};
use installer_kickstart::document::KickstartData;
use installer_types::{GroupData, SshKeyData, UserData};

pub const USERS_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Users";
pub const USERS_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Users";

/// The whole state slice owned by the Users module.
#[derive(Debug, Clone, PartialEq)]
pub struct UsersState {
    pub users: Vec<UserData>,
    pub groups: Vec<GroupData>,
    pub ssh_keys: Vec<SshKeyData>,
    pub root_password: String,
    pub root_password_is_crypted: bool,
    /// The root account starts locked; only an explicit transition unlocks
    /// it.
    pub root_account_locked: bool,
    /// A kickstart that spoke of rootpw freezes the password against
    /// interactive changes.
    pub rootpw_kickstarted: bool,
    pub root_password_ssh_login_allowed: bool,
}

impl Default for UsersState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            groups: Vec::new(),
            ssh_keys: Vec::new(),
            root_password: String::new(),
            root_password_is_crypted: false,
            root_account_locked: true,
            rootpw_kickstarted: false,
            root_password_ssh_login_allowed: false,
        }
    }
}

impl UsersState {
    pub fn is_root_password_set(&self) -> bool {
        !self.root_password.is_empty()
    }

    pub fn can_change_root_password(&self) -> bool {
        !self.rootpw_kickstarted
    }

    /// An administrator exists when root is usable, or some unlocked user
    /// carries the wheel group.
    pub fn check_admin_user_exists(&self) -> bool {
        let root_usable = self.is_root_password_set() && !self.root_account_locked;
        root_usable
            || self
                .users
                .iter()
                .any(|user| user.has_admin_privileges() && !user.lock)
    }

    pub fn set_crypted_root_password(&mut self, password: String) {
        self.root_password = password;
        self.root_password_is_crypted = true;
    }

    pub fn clear_root_password(&mut self) {
        self.root_password.clear();
        self.root_password_is_crypted = false;
    }

    /// Consume this module's slice of a parsed kickstart.
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(rootpw) = &data.rootpw {
            self.root_password = rootpw.password().to_string();
            self.root_password_is_crypted = rootpw.is_crypted();
            self.root_account_locked = rootpw.locks_account();
            self.root_password_ssh_login_allowed = rootpw.allow_ssh;
            self.rootpw_kickstarted = true;
        }
        self.users = data.users.iter().map(UserCommand::to_user_data).collect();
        self.groups = data
            .groups
            .iter()
            .map(GroupCommand::to_group_data)
            .collect();
        self.ssh_keys = data
            .ssh_keys
            .iter()
            .map(SshKeyCommand::to_ssh_key_data)
            .collect();
    }

    /// Reconstruct this module's slice of a kickstart document.
    pub fn setup_kickstart(&self, data: &mut KickstartData) {
        data.rootpw = Some(RootpwCommand {
            iscrypted: self.root_password_is_crypted,
            plaintext: !self.root_password_is_crypted && self.is_root_password_set(),
            allow_ssh: self.root_password_ssh_login_allowed,
            lock: self.root_account_locked,
            password: if self.is_root_password_set() {
                Some(self.root_password.clone())
            } else {
                None
            },
        });
        data.users = self
            .users
            .iter()
            .map(|user| UserCommand {
                groups: if user.groups.is_empty() {
                    None
                } else {
                    Some(user.groups.join(","))
                },
                homedir: (!user.homedir.is_empty()).then(|| user.homedir.clone()),
                name: user.name.clone(),
                password: (!user.password.is_empty()).then(|| user.password.clone()),
                iscrypted: user.is_crypted,
                plaintext: !user.is_crypted && !user.password.is_empty(),
                lock: user.lock,
                shell: (!user.shell.is_empty()).then(|| user.shell.clone()),
                uid: user.get_uid(),
                gid: user.get_gid(),
                gecos: (!user.gecos.is_empty()).then(|| user.gecos.clone()),
            })
            .collect();
        data.groups = self
            .groups
            .iter()
            .map(|group| GroupCommand {
                name: group.name.clone(),
                gid: group.get_gid(),
            })
            .collect();
        data.ssh_keys = self
            .ssh_keys
            .iter()
            .map(|key| SshKeyCommand {
                username: key.username.clone(),
                key: key.key.clone(),
            })
            .collect();
    }

    /// Current value of one bus property.
    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "Users" => Ok(tagged(
                &serde_json::to_string(&self.users).unwrap_or_default(),
            )),
            "Groups" => Ok(tagged(
                &serde_json::to_string(&self.groups).unwrap_or_default(),
            )),
            "SshKeys" => Ok(tagged(
                &serde_json::to_string(&self.ssh_keys).unwrap_or_default(),
            )),
            "IsRootPasswordSet" => Ok(tagged(&self.is_root_password_set())),
            "IsRootPasswordCrypted" => Ok(tagged(&self.root_password_is_crypted)),
            "IsRootAccountLocked" => Ok(tagged(&self.root_account_locked)),
            "CanChangeRootPassword" => Ok(tagged(&self.can_change_root_password())),
            "RootPasswordSSHLoginAllowed" => {
                Ok(tagged(&self.root_password_ssh_login_allowed))
            }
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

/// The module's bus shape, also the source of its property mapping.
pub fn interface_decl() -> ObjectDecl {
    let bool_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Bool,
        access: Access::Read,
    };
    let json_property = |name: &str| Member::Property {
        name: name.into(),
        hint: TypeHint::Str,
        access: Access::Read,
    };

    ObjectDecl {
        interface: InterfaceDecl::new(
            USERS_INTERFACE,
            vec![
                json_property("Users"),
                json_property("Groups"),
                json_property("SshKeys"),
                bool_property("IsRootPasswordSet"),
                bool_property("IsRootPasswordCrypted"),
                bool_property("IsRootAccountLocked"),
                bool_property("CanChangeRootPassword"),
                bool_property("RootPasswordSSHLoginAllowed"),
                Member::Method {
                    name: "SetCryptedRootPassword".into(),
                    args: vec![installer_dbus::Arg::new("password", TypeHint::Str)],
                    ret: None,
                },
                Member::Method {
                    name: "ClearRootPassword".into(),
                    args: vec![],
                    ret: None,
                },
                Member::Method {
                    name: "SetRootAccountLocked".into(),
                    args: vec![installer_dbus::Arg::new("locked", TypeHint::Bool)],
                    ret: None,
                },
                Member::Method {
                    name: "CheckAdminUserExists".into(),
                    args: vec![],
                    ret: Some(TypeHint::Bool),
                },
                Member::Method {
                    name: "GuessUsernameFromFullName".into(),
                    args: vec![installer_dbus::Arg::new("full_name", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "ReadKickstart".into(),
                    args: vec![installer_dbus::Arg::new("kickstart", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "GenerateKickstart".into(),
                    args: vec![],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "InstallWithTasks".into(),
                    args: vec![],
                    ret: Some(TypeHint::Array(Box::new(TypeHint::ObjectPath))),
                },
                Member::Method {
                    name: "Install".into(),
                    args: vec![],
                    ret: None,
                },
                Member::Method {
                    name: "Quit".into(),
                    args: vec![],
                    ret: None,
                },
            ],
        ),
        inherited: vec![],
    }
}
