// SPDX-License-Identifier: GPL-3.0-only

//! User configuration tasks, run in order against the target system.

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use installer_dbus::task::{InstallationTask, TaskContext, TaskFailure};
use installer_sys::account_tools::{
    self, CreateGroupError, CreateUserError, UseraddOptions,
};
use installer_sys::crypt::crypt_password;
use installer_sys::runner::ToolRunner;
use installer_types::{GroupData, SshKeyData, UserData};

/// Shared inputs of the users task graph.
pub struct UsersInstallation {
    pub runner: Arc<dyn ToolRunner>,
    pub sysroot: PathBuf,
    pub users: Vec<UserData>,
    pub groups: Vec<GroupData>,
    pub ssh_keys: Vec<SshKeyData>,
    pub root_password: String,
    pub root_password_is_crypted: bool,
    pub root_ssh_login_allowed: bool,
}

impl UsersInstallation {
    pub fn tasks(self: &Arc<Self>) -> Vec<Arc<dyn InstallationTask>> {
        vec![
            Arc::new(CreateGroupsTask(self.clone())),
            Arc::new(CreateUsersTask(self.clone())),
            Arc::new(SetRootPasswordTask(self.clone())),
            Arc::new(SetSshKeysTask(self.clone())),
            Arc::new(ConfigureRootPasswordSshLoginTask(self.clone())),
        ]
    }
}

fn os_failure(error: impl std::fmt::Display) -> TaskFailure {
    TaskFailure::new("os", error.to_string())
}

/// One row of the target's /etc/passwd.
fn lookup_passwd(sysroot: &Path, name: &str) -> Option<(u32, u32, String)> {
    let contents = std::fs::read_to_string(sysroot.join("etc/passwd")).ok()?;
    for line in contents.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() >= 6 && fields[0] == name {
            let uid = fields[2].parse().ok()?;
            let gid = fields[3].parse().ok()?;
            return Some((uid, gid, fields[5].to_string()));
        }
    }
    None
}

/// Split a `name(gid)` group spec into its parts.
fn parse_group_spec(spec: &str) -> (String, Option<u32>) {
    if let Some((name, rest)) = spec.split_once('(') {
        if let Some(gid) = rest.strip_suffix(')').and_then(|gid| gid.parse().ok()) {
            return (name.to_string(), Some(gid));
        }
    }
    (spec.to_string(), None)
}

/// Hash a password unless it already arrived hashed.
fn crypted(password: &str, is_crypted: bool) -> Result<String, TaskFailure> {
    if is_crypted {
        Ok(password.to_string())
    } else {
        crypt_password(password).map_err(os_failure)
    }
}

fn set_password(
    runner: &dyn ToolRunner,
    sysroot: &Path,
    name: &str,
    password: &str,
    is_crypted: bool,
) -> Result<(), TaskFailure> {
    let hash = crypted(password, is_crypted)?;
    account_tools::set_crypted_password(runner, sysroot, name, &hash).map_err(os_failure)?;
    account_tools::reset_password_age(runner, sysroot, name).map_err(os_failure)
}

/// Create the requested groups.
pub struct CreateGroupsTask(pub Arc<UsersInstallation>);

#[async_trait]
impl InstallationTask for CreateGroupsTask {
    fn name(&self) -> &str {
        "Create groups"
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        for group in &install.groups {
            if context.check_cancelled() {
                return Ok(());
            }
            account_tools::create_group(
                &*install.runner,
                &install.sysroot,
                &group.name,
                group.get_gid(),
            )
            .map_err(|error| match error {
                CreateGroupError::GidExists(gid) => {
                    TaskFailure::new("os", format!("GID {gid} already exists"))
                }
                CreateGroupError::GroupExists(name) => {
                    TaskFailure::new("os", format!("group {name} already exists"))
                }
                CreateGroupError::Os(error) => os_failure(error),
            })?;
        }
        Ok(())
    }
}

/// Create the requested users, their groups, homes and passwords.
pub struct CreateUsersTask(pub Arc<UsersInstallation>);

impl CreateUsersTask {
    fn create_user_groups(&self, user: &UserData) -> Result<Vec<String>, TaskFailure> {
        let install = &self.0;
        let mut names = Vec::new();
        for spec in &user.groups {
            let (name, gid) = parse_group_spec(spec);
            match account_tools::create_group(&*install.runner, &install.sysroot, &name, gid) {
                Ok(()) => {}
                // Present already is fine; a conflicting GID is not.
                Err(CreateGroupError::GroupExists(_)) => {}
                Err(CreateGroupError::GidExists(gid)) => {
                    return Err(TaskFailure::new(
                        "os",
                        format!("cannot create group {name}: GID {gid} already exists"),
                    ));
                }
                Err(CreateGroupError::Os(error)) => return Err(os_failure(error)),
            }
            names.push(name);
        }
        Ok(names)
    }

    fn create_one(&self, user: &UserData) -> Result<(), TaskFailure> {
        let install = &self.0;
        let sysroot = &install.sysroot;
        let groups = self.create_user_groups(user)?;

        let homedir = user.effective_homedir();
        let homedir_in_root = sysroot.join(homedir.trim_start_matches('/'));
        let pre_existing = homedir_in_root.exists();
        let old_ids = if pre_existing {
            std::fs::metadata(&homedir_in_root)
                .map(|meta| (meta.uid(), meta.gid()))
                .ok()
        } else {
            if let Some(parent) = homedir_in_root.parent() {
                std::fs::create_dir_all(parent).map_err(os_failure)?;
            }
            None
        };

        let options = UseraddOptions {
            name: user.name.clone(),
            uid: user.get_uid(),
            gid: user.get_gid(),
            groups,
            homedir: homedir.clone(),
            create_home: !pre_existing,
            shell: user.shell.clone(),
            gecos: user.gecos.clone(),
        };
        account_tools::create_user(&*install.runner, sysroot, &options).map_err(
            |error| match error {
                CreateUserError::UidExists(uid) => TaskFailure::new(
                    "os",
                    format!("UID {} already exists", uid.unwrap_or_default()),
                ),
                CreateUserError::InvalidGroups(name) => {
                    TaskFailure::new("os", format!("invalid groups for user {name}"))
                }
                CreateUserError::UserExists(name) => {
                    TaskFailure::new("os", format!("user {name} already exists"))
                }
                CreateUserError::Os(error) => os_failure(error),
            },
        )?;

        // A pre-existing home keeps its content but must follow the new
        // ownership.
        if let Some((old_uid, old_gid)) = old_ids {
            if let Some((new_uid, new_gid, _)) = lookup_passwd(sysroot, &user.name) {
                if (old_uid, old_gid) != (new_uid, new_gid) {
                    account_tools::reown_homedir(
                        &*install.runner,
                        &homedir_in_root,
                        old_uid,
                        old_gid,
                        new_uid,
                        new_gid,
                    )
                    .map_err(os_failure)?;
                    account_tools::restore_context(&*install.runner, &homedir_in_root)
                        .map_err(os_failure)?;
                }
            }
        }

        if !user.password.is_empty() {
            set_password(
                &*install.runner,
                sysroot,
                &user.name,
                &user.password,
                user.is_crypted,
            )?;
        }
        Ok(())
    }
}

#[async_trait]
impl InstallationTask for CreateUsersTask {
    fn name(&self) -> &str {
        "Create users"
    }

    fn steps(&self) -> u32 {
        self.0.users.len() as u32
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        for (index, user) in self.0.users.iter().enumerate() {
            if context.check_cancelled() {
                return Ok(());
            }
            context.progress_step(index as u32 + 1, format!("Creating user {}", user.name));
            self.create_one(user)?;
        }
        Ok(())
    }
}

/// Apply the root password.
pub struct SetRootPasswordTask(pub Arc<UsersInstallation>);

#[async_trait]
impl InstallationTask for SetRootPasswordTask {
    fn name(&self) -> &str {
        "Set the root password"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if install.root_password.is_empty() {
            return Ok(());
        }
        set_password(
            &*install.runner,
            &install.sysroot,
            "root",
            &install.root_password,
            install.root_password_is_crypted,
        )
    }
}

/// Install authorized SSH keys.
pub struct SetSshKeysTask(pub Arc<UsersInstallation>);

impl SetSshKeysTask {
    fn install_key(&self, key: &SshKeyData) -> Result<(), TaskFailure> {
        let install = &self.0;
        let sysroot = &install.sysroot;
        let (uid, gid, home) = lookup_passwd(sysroot, &key.username).ok_or_else(|| {
            TaskFailure::new(
                "os",
                format!("user {} does not exist on the target", key.username),
            )
        })?;

        let ssh_dir = sysroot.join(home.trim_start_matches('/')).join(".ssh");
        if !ssh_dir.exists() {
            std::fs::create_dir_all(&ssh_dir).map_err(os_failure)?;
            std::fs::set_permissions(&ssh_dir, std::fs::Permissions::from_mode(0o700))
                .map_err(os_failure)?;
            std::os::unix::fs::chown(&ssh_dir, Some(uid), Some(gid)).map_err(os_failure)?;
        }

        let keys_file = ssh_dir.join("authorized_keys");
        let pre_existing = keys_file.exists();

        let mut contents = if pre_existing {
            std::fs::read_to_string(&keys_file).map_err(os_failure)?
        } else {
            String::new()
        };
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&key.key);
        contents.push('\n');
        std::fs::write(&keys_file, contents).map_err(os_failure)?;
        std::fs::set_permissions(&keys_file, std::fs::Permissions::from_mode(0o600))
            .map_err(os_failure)?;
        std::os::unix::fs::chown(&keys_file, Some(uid), Some(gid)).map_err(os_failure)?;

        // Fresh files need their SELinux context; appending kept it.
        if !pre_existing {
            account_tools::restore_context(&*install.runner, &ssh_dir).map_err(os_failure)?;
        }
        Ok(())
    }
}

#[async_trait]
impl InstallationTask for SetSshKeysTask {
    fn name(&self) -> &str {
        "Install SSH keys"
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
        for key in &self.0.ssh_keys {
            if context.check_cancelled() {
                return Ok(());
            }
            self.install_key(key)?;
        }
        Ok(())
    }
}

/// Permit root SSH login when the kickstart asked for it.
pub struct ConfigureRootPasswordSshLoginTask(pub Arc<UsersInstallation>);

const SSHD_DROPIN: &str = "etc/ssh/sshd_config.d/01-permitrootlogin.conf";

#[async_trait]
impl InstallationTask for ConfigureRootPasswordSshLoginTask {
    fn name(&self) -> &str {
        "Configure root SSH login"
    }

    async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
        let install = &self.0;
        if !install.root_ssh_login_allowed {
            return Ok(());
        }
        let path = install.sysroot.join(SSHD_DROPIN);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(os_failure)?;
        }
        std::fs::write(
            &path,
            "# Generated by the installer.\nPermitRootLogin yes\n",
        )
        .map_err(os_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::TaskRunner;
    use installer_sys::RecordingRunner;
    use installer_types::IdMode;

    fn write_passwd(sysroot: &Path, lines: &str) {
        std::fs::create_dir_all(sysroot.join("etc")).expect("etc");
        std::fs::write(sysroot.join("etc/passwd"), lines).expect("passwd");
    }

    fn installation(
        runner: Arc<RecordingRunner>,
        sysroot: PathBuf,
    ) -> Arc<UsersInstallation> {
        Arc::new(UsersInstallation {
            runner,
            sysroot,
            users: vec![UserData {
                name: "ada".into(),
                groups: vec!["wheel".into(), "staff(500)".into()],
                password: "$6$salt$hash".into(),
                is_crypted: true,
                shell: "/bin/bash".into(),
                ..Default::default()
            }],
            groups: vec![GroupData {
                name: "staff".into(),
                gid_mode: IdMode::Value,
                gid: 500,
            }],
            ssh_keys: vec![SshKeyData {
                username: "ada".into(),
                key: "ssh-ed25519 AAAA ada@host".into(),
            }],
            root_password: "$6$salt$roothash".into(),
            root_password_is_crypted: true,
            root_ssh_login_allowed: true,
        })
    }

    #[tokio::test]
    async fn groups_task_invokes_groupadd() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(CreateGroupsTask(install)))
            .run()
            .await
            .expect("run");

        assert_eq!(
            runner.rendered(),
            vec![format!(
                "groupadd -R {} -g 500 staff",
                dir.path().display()
            )]
        );
    }

    #[tokio::test]
    async fn users_task_builds_the_full_sequence() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        write_passwd(
            dir.path(),
            "root:x:0:0:root:/root:/bin/bash\nada:x:1000:1000::/home/ada:/bin/bash\n",
        );
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(CreateUsersTask(install)))
            .run()
            .await
            .expect("run");

        let rendered = runner.rendered();
        // wheel and staff(500) both get creation attempts first.
        assert!(rendered[0].starts_with("groupadd"));
        assert!(rendered[1].contains("-g 500 staff"));
        let useradd = rendered
            .iter()
            .find(|line| line.starts_with("useradd"))
            .expect("useradd");
        assert!(useradd.contains("-G wheel,staff"));
        assert!(useradd.contains("-d /home/ada"));
        assert!(useradd.contains("-m"));
        assert!(useradd.ends_with("ada"));
        assert!(rendered.iter().any(|line| line.starts_with("chpasswd")));
        assert!(rendered.iter().any(|line| line.starts_with("chage")));
    }

    #[tokio::test]
    async fn pre_existing_homes_are_reowned() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("home/ada")).expect("home");
        write_passwd(dir.path(), "ada:x:1000:1000::/home/ada:/bin/bash\n");
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(CreateUsersTask(install)))
            .run()
            .await
            .expect("run");

        let rendered = runner.rendered();
        let useradd = rendered
            .iter()
            .find(|line| line.starts_with("useradd"))
            .expect("useradd");
        assert!(useradd.contains("-M"), "{useradd}");
        assert!(rendered.iter().any(|line| line.starts_with("chown --recursive --no-dereference --from=")));
        assert!(rendered.iter().any(|line| line.starts_with("restorecon")));
    }

    #[tokio::test]
    async fn ssh_keys_land_with_tight_permissions() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        write_passwd(dir.path(), "ada:x:1000:1000::/home/ada:/bin/bash\n");
        std::fs::create_dir_all(dir.path().join("home/ada")).expect("home");
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(SetSshKeysTask(install)))
            .run()
            .await
            .expect("run");

        let ssh_dir = dir.path().join("home/ada/.ssh");
        let keys_file = ssh_dir.join("authorized_keys");
        let contents = std::fs::read_to_string(&keys_file).expect("authorized_keys");
        assert_eq!(contents, "ssh-ed25519 AAAA ada@host\n");

        let dir_mode = std::fs::metadata(&ssh_dir).expect("meta").permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        let file_mode = std::fs::metadata(&keys_file)
            .expect("meta")
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);

        // The .ssh directory was fresh, so its context was restored.
        assert!(runner.rendered().iter().any(|line| line.starts_with("restorecon")));
    }

    #[tokio::test]
    async fn appending_a_key_skips_restorecon() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        write_passwd(dir.path(), "ada:x:1000:1000::/home/ada:/bin/bash\n");
        let ssh_dir = dir.path().join("home/ada/.ssh");
        std::fs::create_dir_all(&ssh_dir).expect("ssh dir");
        std::fs::write(ssh_dir.join("authorized_keys"), "existing-key\n").expect("seed");
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(SetSshKeysTask(install)))
            .run()
            .await
            .expect("run");

        let contents =
            std::fs::read_to_string(ssh_dir.join("authorized_keys")).expect("authorized_keys");
        assert_eq!(contents, "existing-key\nssh-ed25519 AAAA ada@host\n");
        assert!(runner.rendered().is_empty());
    }

    #[tokio::test]
    async fn sshd_dropin_is_written_only_when_allowed() {
        let runner = Arc::new(RecordingRunner::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let install = installation(runner.clone(), dir.path().to_path_buf());

        TaskRunner::new(Arc::new(ConfigureRootPasswordSshLoginTask(install)))
            .run()
            .await
            .expect("run");
        let contents =
            std::fs::read_to_string(dir.path().join(SSHD_DROPIN)).expect("dropin");
        assert!(contents.contains("PermitRootLogin yes"));

        let dir2 = tempfile::tempdir().expect("tempdir");
        let mut install = installation(runner, dir2.path().to_path_buf());
        Arc::get_mut(&mut install)
            .expect("sole owner")
            .root_ssh_login_allowed = false;
        TaskRunner::new(Arc::new(ConfigureRootPasswordSshLoginTask(install)))
            .run()
            .await
            .expect("run");
        assert!(!dir2.path().join(SSHD_DROPIN).exists());
    }
}
