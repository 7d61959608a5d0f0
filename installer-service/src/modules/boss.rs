// SPDX-License-Identifier: GPL-3.0-only

//! The Boss: module lifecycle tracking and installation progress.

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::ModuleName;

pub const BOSS_INTERFACE: &str = "org.fedoraproject.Anaconda.Boss";
pub const BOSS_PATH: &str = "/org/fedoraproject/Anaconda/Boss";

/// The Boss's view of one installation.
#[derive(Debug, Clone, PartialEq)]
pub struct BossState {
    /// Names of the modules the Boss tracks as alive.
    pub active_modules: Vec<String>,
    pub installation_running: bool,
    pub progress_step: u32,
    pub progress_total: u32,
    pub progress_description: String,
    /// Object path of the task that last reported failure, for
    /// correlation by the front-end.
    pub failing_task_path: String,
    pub cancel_requested: bool,
}

impl Default for BossState {
    fn default() -> Self {
        Self {
            active_modules: ModuleName::ALL
                .iter()
                .map(|module| module.as_str().to_string())
                .collect(),
            installation_running: false,
            progress_step: 0,
            progress_total: 0,
            progress_description: String::new(),
            failing_task_path: String::new(),
            cancel_requested: false,
        }
    }
}

impl BossState {
    /// Begin tracking an installation of `total` steps.
    pub fn start_installation(&mut self, total: u32) {
        self.installation_running = true;
        self.cancel_requested = false;
        self.progress_step = 0;
        self.progress_total = total;
        self.progress_description.clear();
        self.failing_task_path.clear();
    }

    /// Record progress; step indexes never go backwards.
    pub fn report_progress(&mut self, step: u32, description: impl Into<String>) {
        self.progress_step = self.progress_step.max(step);
        self.progress_description = description.into();
    }

    /// Normalized progress in 0.0..=1.0.
    pub fn progress_fraction(&self) -> f64 {
        if self.progress_total == 0 {
            return 0.0;
        }
        (f64::from(self.progress_step) / f64::from(self.progress_total)).clamp(0.0, 1.0)
    }

    pub fn finish_installation(&mut self) {
        self.installation_running = false;
        self.progress_step = self.progress_total;
    }

    /// Advisory: the running task decides when to yield.
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub fn record_task_failure(&mut self, task_path: impl Into<String>) {
        self.failing_task_path = task_path.into();
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "ActiveModules" => Ok(tagged(&self.active_modules)),
            "InstallationRunning" => Ok(tagged(&self.installation_running)),
            "ProgressStep" => Ok(tagged(&self.progress_step)),
            "ProgressDescription" => Ok(tagged(&self.progress_description)),
            "ProgressFraction" => Ok(tagged(&self.progress_fraction())),
            "FailingTaskPath" => Ok(tagged(&self.failing_task_path)),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    ObjectDecl {
        interface: InterfaceDecl::new(
            BOSS_INTERFACE,
            vec![
                Member::Property {
                    name: "ActiveModules".into(),
                    hint: TypeHint::Array(Box::new(TypeHint::Str)),
                    access: Access::Read,
                },
                Member::Property {
                    name: "InstallationRunning".into(),
                    hint: TypeHint::Bool,
                    access: Access::Read,
                },
                Member::Property {
                    name: "ProgressStep".into(),
                    hint: TypeHint::UInt32,
                    access: Access::Read,
                },
                Member::Property {
                    name: "ProgressDescription".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Property {
                    name: "ProgressFraction".into(),
                    hint: TypeHint::Double,
                    access: Access::Read,
                },
                Member::Property {
                    name: "FailingTaskPath".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Method {
                    name: "ReadKickstartFile".into(),
                    args: vec![Arg::new("path", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "InstallSystem".into(),
                    args: vec![],
                    ret: None,
                },
                Member::Method {
                    name: "Cancel".into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installation_running_flips_and_back() {
        let mut boss = BossState::default();
        assert!(!boss.installation_running);

        boss.start_installation(4);
        assert!(boss.installation_running);
        assert_eq!(boss.progress_fraction(), 0.0);

        boss.report_progress(2, "Installing the boot loader");
        assert_eq!(boss.progress_fraction(), 0.5);

        boss.finish_installation();
        assert!(!boss.installation_running);
        assert_eq!(boss.progress_fraction(), 1.0);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut boss = BossState::default();
        boss.start_installation(10);
        boss.report_progress(5, "five");
        boss.report_progress(3, "stale");
        assert_eq!(boss.progress_step, 5);
        assert_eq!(boss.progress_description, "stale");
    }

    #[test]
    fn cancel_is_advisory() {
        let mut boss = BossState::default();
        boss.start_installation(2);
        boss.request_cancel();
        assert!(boss.cancel_requested);
        // The flag alone does not stop the installation.
        assert!(boss.installation_running);
    }

    #[test]
    fn empty_total_keeps_fraction_at_zero() {
        let boss = BossState::default();
        assert_eq!(boss.progress_fraction(), 0.0);
    }

    #[test]
    fn all_modules_start_tracked() {
        let boss = BossState::default();
        assert_eq!(boss.active_modules.len(), 8);
        assert!(boss.active_modules.contains(&"Users".to_string()));
    }
}
