// SPDX-License-Identifier: GPL-3.0-only

//! Account management tools: groupadd, useradd, chpasswd, chage, chown,
//! restorecon. Each wrapper builds the argv and interprets the exit status
//! against the tool's documented taxonomy.

use std::path::Path;

use thiserror::Error;

use crate::error::SysError;
use crate::runner::{ToolCommand, ToolRunner};

#[derive(Debug, Error)]
pub enum CreateGroupError {
    #[error("group id {0} already exists")]
    GidExists(u32),

    #[error("group {0} already exists")]
    GroupExists(String),

    #[error(transparent)]
    Os(#[from] SysError),
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("user id {0:?} already exists")]
    UidExists(Option<u32>),

    #[error("invalid groups for user {0}")]
    InvalidGroups(String),

    #[error("user {0} already exists")]
    UserExists(String),

    #[error(transparent)]
    Os(#[from] SysError),
}

fn os_error(command: &ToolCommand, status: i32, stderr: &str) -> SysError {
    SysError::OperationFailed {
        command: command.render(),
        stderr: format!("exited {status}: {}", stderr.trim()),
    }
}

/// `groupadd -R <sysroot> [-g gid] name`
pub fn create_group(
    runner: &dyn ToolRunner,
    sysroot: &Path,
    name: &str,
    gid: Option<u32>,
) -> Result<(), CreateGroupError> {
    let mut args = vec!["-R".to_string(), sysroot.display().to_string()];
    if let Some(gid) = gid {
        args.push("-g".to_string());
        args.push(gid.to_string());
    }
    args.push(name.to_string());

    let command = ToolCommand::with_args("groupadd", args);
    let outcome = runner.run(&command).map_err(CreateGroupError::Os)?;
    match outcome.status {
        0 => Ok(()),
        4 => Err(CreateGroupError::GidExists(gid.unwrap_or_default())),
        9 => Err(CreateGroupError::GroupExists(name.to_string())),
        status => Err(os_error(&command, status, &outcome.stderr).into()),
    }
}

/// Options for one `useradd` invocation.
#[derive(Debug, Clone, Default)]
pub struct UseraddOptions {
    pub name: String,
    pub uid: Option<u32>,
    /// Primary group id; when unset a user group is created (-U).
    pub gid: Option<u32>,
    pub groups: Vec<String>,
    pub homedir: String,
    /// Skip home directory creation when it already exists.
    pub create_home: bool,
    pub shell: String,
    pub gecos: String,
}

/// `useradd -R <sysroot> [-g gid|-U] [-G ...] -d home [-m|-M] [-s shell]
/// [-u uid] [-c gecos] name`
pub fn create_user(
    runner: &dyn ToolRunner,
    sysroot: &Path,
    options: &UseraddOptions,
) -> Result<(), CreateUserError> {
    let mut args = vec!["-R".to_string(), sysroot.display().to_string()];
    match options.gid {
        Some(gid) => {
            args.push("-g".to_string());
            args.push(gid.to_string());
        }
        None => args.push("-U".to_string()),
    }
    if !options.groups.is_empty() {
        args.push("-G".to_string());
        args.push(options.groups.join(","));
    }
    args.push("-d".to_string());
    args.push(options.homedir.clone());
    args.push(if options.create_home { "-m" } else { "-M" }.to_string());
    if !options.shell.is_empty() {
        args.push("-s".to_string());
        args.push(options.shell.clone());
    }
    if let Some(uid) = options.uid {
        args.push("-u".to_string());
        args.push(uid.to_string());
    }
    if !options.gecos.is_empty() {
        args.push("-c".to_string());
        args.push(options.gecos.clone());
    }
    args.push(options.name.clone());

    let command = ToolCommand::with_args("useradd", args);
    let outcome = runner.run(&command).map_err(CreateUserError::Os)?;
    match outcome.status {
        0 => Ok(()),
        4 => Err(CreateUserError::UidExists(options.uid)),
        6 => Err(CreateUserError::InvalidGroups(options.name.clone())),
        9 => Err(CreateUserError::UserExists(options.name.clone())),
        status => Err(os_error(&command, status, &outcome.stderr).into()),
    }
}

/// `chpasswd -R <sysroot> -e` fed `name:crypted`.
pub fn set_crypted_password(
    runner: &dyn ToolRunner,
    sysroot: &Path,
    name: &str,
    crypted: &str,
) -> Result<(), SysError> {
    let command = ToolCommand::new("chpasswd", &["-R", &sysroot.display().to_string(), "-e"])
        .feeding(format!("{name}:{crypted}\n"));
    let outcome = runner.run(&command)?;
    if !outcome.success() {
        return Err(os_error(&command, outcome.status, &outcome.stderr));
    }
    Ok(())
}

/// `chage -R <sysroot> -d "" name` resets the last password change so
/// expiry policies start counting from first boot.
pub fn reset_password_age(
    runner: &dyn ToolRunner,
    sysroot: &Path,
    name: &str,
) -> Result<(), SysError> {
    let command = ToolCommand::new(
        "chage",
        &["-R", &sysroot.display().to_string(), "-d", "", name],
    );
    let outcome = runner.run(&command)?;
    if !outcome.success() {
        return Err(os_error(&command, outcome.status, &outcome.stderr));
    }
    Ok(())
}

/// Re-own a pre-existing home directory to its new ids.
pub fn reown_homedir(
    runner: &dyn ToolRunner,
    path: &Path,
    old_uid: u32,
    old_gid: u32,
    new_uid: u32,
    new_gid: u32,
) -> Result<(), SysError> {
    let command = ToolCommand::new(
        "chown",
        &[
            "--recursive",
            "--no-dereference",
            &format!("--from={old_uid}:{old_gid}"),
            &format!("{new_uid}:{new_gid}"),
            &path.display().to_string(),
        ],
    );
    let outcome = runner.run(&command)?;
    if !outcome.success() {
        return Err(os_error(&command, outcome.status, &outcome.stderr));
    }
    Ok(())
}

/// `restorecon -r <path>`; missing SELinux tooling is not an error.
pub fn restore_context(runner: &dyn ToolRunner, path: &Path) -> Result<(), SysError> {
    let command = ToolCommand::new("restorecon", &["-r", &path.display().to_string()]);
    let outcome = runner.run(&command)?;
    if !outcome.success() {
        tracing::debug!("restorecon on {} exited {}", path.display(), outcome.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RecordingRunner;
    use std::path::PathBuf;

    fn sysroot() -> PathBuf {
        PathBuf::from("/mnt/sysroot")
    }

    #[test]
    fn groupadd_argv_and_taxonomy() {
        let runner = RecordingRunner::new();
        create_group(&runner, &sysroot(), "wheel", Some(10)).expect("create group");
        assert_eq!(
            runner.rendered(),
            vec!["groupadd -R /mnt/sysroot -g 10 wheel"]
        );

        runner.push_exit(4);
        assert!(matches!(
            create_group(&runner, &sysroot(), "wheel", Some(10)),
            Err(CreateGroupError::GidExists(10))
        ));

        runner.push_exit(9);
        assert!(matches!(
            create_group(&runner, &sysroot(), "wheel", None),
            Err(CreateGroupError::GroupExists(_))
        ));

        runner.push_exit(1);
        assert!(matches!(
            create_group(&runner, &sysroot(), "wheel", None),
            Err(CreateGroupError::Os(_))
        ));
    }

    #[test]
    fn useradd_argv_construction() {
        let runner = RecordingRunner::new();
        let options = UseraddOptions {
            name: "ada".into(),
            uid: Some(1000),
            gid: None,
            groups: vec!["wheel".into(), "users".into()],
            homedir: "/home/ada".into(),
            create_home: true,
            shell: "/bin/zsh".into(),
            gecos: "Ada".into(),
        };
        create_user(&runner, &sysroot(), &options).expect("create user");
        assert_eq!(
            runner.rendered(),
            vec![
                "useradd -R /mnt/sysroot -U -G wheel,users -d /home/ada -m -s /bin/zsh -u 1000 -c Ada ada"
            ]
        );
    }

    #[test]
    fn useradd_taxonomy() {
        let runner = RecordingRunner::new();
        let options = UseraddOptions {
            name: "ada".into(),
            ..Default::default()
        };

        for (status, check) in [
            (4, CreateUserError::UidExists(None)),
            (6, CreateUserError::InvalidGroups("ada".into())),
            (9, CreateUserError::UserExists("ada".into())),
        ] {
            runner.push_exit(status);
            let error = create_user(&runner, &sysroot(), &options).expect_err("taxonomy");
            assert_eq!(
                std::mem::discriminant(&error),
                std::mem::discriminant(&check)
            );
        }
    }

    #[test]
    fn chpasswd_feeds_the_pair_on_stdin() {
        let runner = RecordingRunner::new();
        set_crypted_password(&runner, &sysroot(), "root", "$6$salt$hash").expect("chpasswd");
        let invocations = runner.invocations();
        assert_eq!(invocations[0].stdin.as_deref(), Some("root:$6$salt$hash\n"));
    }
}
