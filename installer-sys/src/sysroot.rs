// SPDX-License-Identifier: GPL-3.0-only

//! The system-root bind mount.
//!
//! The target filesystem is assembled under one process-wide mount point.
//! Switching the physical root is a mutating global action serialized
//! through the storage service; repeating the current root is a no-op.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, SysError};

/// Default mount point of the target filesystem.
pub const SYSTEM_ROOT_PATH: &str = "/mnt/sysroot";

/// Performs the actual bind mounts. Split out so the switching logic can be
/// exercised without privileges.
pub trait Mounter: Send + Sync {
    fn bind(&self, source: &Path, target: &Path) -> Result<()>;

    fn unbind(&self, target: &Path) -> Result<()>;
}

/// Mounts on the live system via mount(2)/umount(2).
#[derive(Debug, Default)]
pub struct SystemMounter;

impl Mounter for SystemMounter {
    fn bind(&self, source: &Path, target: &Path) -> Result<()> {
        std::fs::create_dir_all(target)?;
        nix::mount::mount(
            Some(source),
            target,
            None::<&str>,
            nix::mount::MsFlags::MS_BIND | nix::mount::MsFlags::MS_REC,
            None::<&str>,
        )
        .map_err(|errno| {
            SysError::Mount(format!(
                "binding {} onto {}: {errno}",
                source.display(),
                target.display()
            ))
        })
    }

    fn unbind(&self, target: &Path) -> Result<()> {
        nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH).map_err(|errno| {
            SysError::Mount(format!("unmounting {}: {errno}", target.display()))
        })
    }
}

/// Owns the process-wide system root.
pub struct SystemRoot {
    mount_point: PathBuf,
    mounter: Box<dyn Mounter>,
    current: Mutex<Option<PathBuf>>,
}

impl SystemRoot {
    pub fn new(mount_point: impl Into<PathBuf>, mounter: Box<dyn Mounter>) -> Self {
        Self {
            mount_point: mount_point.into(),
            mounter,
            current: Mutex::new(None),
        }
    }

    pub fn with_system_mounter() -> Self {
        Self::new(SYSTEM_ROOT_PATH, Box::new(SystemMounter))
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.current.lock().expect("system root lock").clone()
    }

    /// Bind-remount a physical path onto the system root, tearing down any
    /// previous bind first. Repeating the current root does nothing.
    pub fn set_root(&self, physical: &Path) -> Result<()> {
        let mut current = self.current.lock().expect("system root lock");
        if current.as_deref() == Some(physical) {
            tracing::debug!("system root already at {}", physical.display());
            return Ok(());
        }
        if current.is_some() {
            self.mounter.unbind(&self.mount_point)?;
            *current = None;
        }
        self.mounter.bind(physical, &self.mount_point)?;
        *current = Some(physical.to_path_buf());
        tracing::info!(
            "system root {} now binds {}",
            self.mount_point.display(),
            physical.display()
        );
        Ok(())
    }

    /// Drop the current bind, if any.
    pub fn teardown(&self) -> Result<()> {
        let mut current = self.current.lock().expect("system root lock");
        if current.take().is_some() {
            self.mounter.unbind(&self.mount_point)?;
        }
        Ok(())
    }
}
