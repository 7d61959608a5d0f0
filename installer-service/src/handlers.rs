// SPDX-License-Identifier: GPL-3.0-only

//! The zbus handlers publishing each module's state slice.
//!
//! Every handler owns its state, a property bridge, and a shutdown handle.
//! Mutators report changed properties; the `#[emits_properties_changed]`
//! wrapper flushes them after the method body returns.

use std::path::PathBuf;
use std::sync::Arc;

use installer_macros::emits_properties_changed;
use tokio::sync::{Notify, mpsc};
use zbus::fdo;
use zbus::interface;

use installer_contracts::KickstartReport;
use installer_dbus::properties::PropertiesChangedBatch;
use installer_kickstart::{ModuleName, parse_kickstart};
use installer_kickstart::document::KickstartData;
use installer_sys::runner::ToolRunner;
use installer_types::UserData;

use crate::bridge::PropertyBridge;
use crate::modules::users::tasks::UsersInstallation;
use crate::modules::{
    boss, localization, network, payload, runtime, security, services, storage, users,
};

type BatchReceiver = mpsc::UnboundedReceiver<PropertiesChangedBatch>;

/// Keep only the entries a module owns. Entries with no module name (for
/// example unknown commands) stay with the Boss.
fn filter_report(report: KickstartReport, module: ModuleName) -> KickstartReport {
    let own = module.as_str();
    KickstartReport {
        errors: report
            .errors
            .into_iter()
            .filter(|entry| entry.module_name == own)
            .collect(),
        warnings: report
            .warnings
            .into_iter()
            .filter(|entry| entry.module_name == own)
            .collect(),
    }
}

fn report_json(report: &KickstartReport) -> String {
    serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
}

// ---------------------------------------------------------------------------
// Users

pub struct UsersHandler {
    state: users::UsersState,
    bridge: PropertyBridge,
    runner: Arc<dyn ToolRunner>,
    sysroot: PathBuf,
    shutdown: Arc<Notify>,
}

impl UsersHandler {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        sysroot: PathBuf,
        shutdown: Arc<Notify>,
    ) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&users::interface_decl())?;
        Ok((
            Self {
                state: users::UsersState::default(),
                bridge,
                runner,
                sysroot,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }

    fn installation(&self) -> Arc<UsersInstallation> {
        Arc::new(UsersInstallation {
            runner: self.runner.clone(),
            sysroot: self.sysroot.clone(),
            users: self.state.users.clone(),
            groups: self.state.groups.clone(),
            ssh_keys: self.state.ssh_keys.clone(),
            root_password: self.state.root_password.clone(),
            root_password_is_crypted: self.state.root_password_is_crypted,
            root_ssh_login_allowed: self.state.root_password_ssh_login_allowed,
        })
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Users")]
impl UsersHandler {
    #[zbus(property)]
    fn users(&self) -> String {
        serde_json::to_string(&self.state.users).unwrap_or_default()
    }

    #[zbus(property)]
    fn groups(&self) -> String {
        serde_json::to_string(&self.state.groups).unwrap_or_default()
    }

    #[zbus(property)]
    fn ssh_keys(&self) -> String {
        serde_json::to_string(&self.state.ssh_keys).unwrap_or_default()
    }

    #[zbus(property)]
    fn is_root_password_set(&self) -> bool {
        self.state.is_root_password_set()
    }

    #[zbus(property)]
    fn is_root_password_crypted(&self) -> bool {
        self.state.root_password_is_crypted
    }

    #[zbus(property)]
    fn is_root_account_locked(&self) -> bool {
        self.state.root_account_locked
    }

    #[zbus(property)]
    fn can_change_root_password(&self) -> bool {
        self.state.can_change_root_password()
    }

    #[zbus(property, name = "RootPasswordSSHLoginAllowed")]
    fn root_password_ssh_login_allowed(&self) -> bool {
        self.state.root_password_ssh_login_allowed
    }

    #[emits_properties_changed]
    async fn set_users(&mut self, users_json: String) -> fdo::Result<()> {
        let users: Vec<UserData> = serde_json::from_str(&users_json)
            .map_err(|error| fdo::Error::InvalidArgs(error.to_string()))?;
        self.state.users = users;
        self.bridge.report("Users");
        Ok(())
    }

    #[emits_properties_changed]
    async fn set_crypted_root_password(&mut self, password: String) {
        self.state.set_crypted_root_password(password);
        self.bridge.report("IsRootPasswordSet");
        self.bridge.report("IsRootPasswordCrypted");
    }

    #[emits_properties_changed]
    async fn clear_root_password(&mut self) {
        self.state.clear_root_password();
        self.bridge.report("IsRootPasswordSet");
        self.bridge.report("IsRootPasswordCrypted");
    }

    #[emits_properties_changed]
    async fn set_root_account_locked(&mut self, locked: bool) {
        if self.state.root_account_locked != locked {
            self.state.root_account_locked = locked;
            self.bridge.report("IsRootAccountLocked");
        }
    }

    #[emits_properties_changed]
    async fn set_rootpw_kickstarted(&mut self, kickstarted: bool) {
        if self.state.rootpw_kickstarted != kickstarted {
            self.state.rootpw_kickstarted = kickstarted;
            self.bridge.report("CanChangeRootPassword");
        }
    }

    #[zbus(name = "SetRootPasswordSSHLoginAllowed")]
    #[emits_properties_changed]
    async fn set_root_password_ssh_login_allowed(&mut self, allowed: bool) {
        if self.state.root_password_ssh_login_allowed != allowed {
            self.state.root_password_ssh_login_allowed = allowed;
            self.bridge.report("RootPasswordSSHLoginAllowed");
        }
    }

    fn check_admin_user_exists(&self) -> bool {
        self.state.check_admin_user_exists()
    }

    fn guess_username_from_full_name(&self, full_name: String) -> String {
        users::names::guess_username(&full_name)
    }

    fn check_username(&self, name: String) -> bool {
        users::names::check_username(&name)
    }

    fn check_grouplist(&self, list: String) -> bool {
        users::names::check_grouplist(&list)
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in [
            "Users",
            "Groups",
            "SshKeys",
            "IsRootPasswordSet",
            "IsRootPasswordCrypted",
            "IsRootAccountLocked",
            "CanChangeRootPassword",
            "RootPasswordSSHLoginAllowed",
        ] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Users))
    }

    fn generate_kickstart(&self) -> String {
        let mut data = KickstartData::default();
        self.state.setup_kickstart(&mut data);
        data.emit()
    }

    /// Publish the account configuration tasks, each at its own path, and
    /// return the paths. Callers start and observe them individually.
    async fn install_with_tasks(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
    ) -> fdo::Result<Vec<String>> {
        let installation = self.installation();
        let mut paths = Vec::new();
        for (index, task) in installation.tasks().into_iter().enumerate() {
            let path = format!("{}/Tasks/{}", users::USERS_PATH, index + 1);
            crate::tasks::publish_task(connection, path.clone(), task)
                .await
                .map_err(|error| fdo::Error::Failed(error.to_string()))?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Run the account configuration tasks to completion.
    async fn install(&self) -> fdo::Result<()> {
        let installation = self.installation();
        for task in installation.tasks() {
            let runner = installer_dbus::TaskRunner::new(task);
            match runner.run().await {
                Ok(installer_dbus::TaskOutcome::Failed(failure)) => {
                    return Err(fdo::Error::Failed(failure.to_string()));
                }
                Ok(_) => {}
                Err(failure) => return Err(fdo::Error::Failed(failure.to_string())),
            }
        }
        Ok(())
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Storage

use installer_contracts::{DeviceTreeProvider, InstallerError};

pub struct StorageHandler {
    state: storage::StorageState,
    bridge: PropertyBridge,
    provider: Option<Arc<dyn DeviceTreeProvider>>,
    runner: Arc<dyn ToolRunner>,
    sysroot: PathBuf,
    shutdown: Arc<Notify>,
}

impl StorageHandler {
    pub fn new(
        provider: Option<Arc<dyn DeviceTreeProvider>>,
        runner: Arc<dyn ToolRunner>,
        sysroot: PathBuf,
        shutdown: Arc<Notify>,
    ) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&storage::interface_decl())?;
        Ok((
            Self {
                state: storage::StorageState::default(),
                bridge,
                provider,
                runner,
                sysroot,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }

    fn facade(&self) -> Result<storage::DeviceTreeFacade, InstallerError> {
        self.provider
            .clone()
            .map(storage::DeviceTreeFacade::new)
            .ok_or_else(InstallerError::storage_unavailable)
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Storage")]
impl StorageHandler {
    #[zbus(property)]
    fn selected_disks(&self) -> Vec<String> {
        self.state.disk_selection.selected_disks.clone()
    }

    #[zbus(property)]
    async fn set_selected_disks(&mut self, disks: Vec<String>) {
        if self.state.disk_selection.selected_disks != disks {
            self.state.disk_selection.selected_disks = disks;
            self.bridge.report("SelectedDisks");
            self.flush_property_changes();
        }
    }

    #[zbus(property)]
    fn exclusive_disks(&self) -> Vec<String> {
        self.state.disk_selection.exclusive_disks.clone()
    }

    #[zbus(property)]
    fn ignored_disks(&self) -> Vec<String> {
        self.state.disk_selection.ignored_disks.clone()
    }

    #[zbus(property)]
    fn protected_devices(&self) -> Vec<String> {
        self.state.disk_selection.protected_devices.clone()
    }

    #[zbus(property)]
    fn iscsi_initiator(&self) -> String {
        self.state.iscsi_initiator.clone()
    }

    /// Publish the bootloader installation task graph against the current
    /// device tree and return the task paths.
    async fn install_bootloader_with_tasks(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        payload_type: String,
        kernel_versions: Vec<String>,
    ) -> fdo::Result<Vec<String>> {
        use installer_bootloader::{
            BootLoader, BootloaderInstallation, BootloaderMode, PayloadKind, Platform,
            platform_loader,
        };

        let facade = self.facade().map_err(fdo::Error::from)?;
        let devices: std::collections::BTreeMap<String, installer_types::DeviceNode> = facade
            .devices()
            .await
            .map_err(fdo::Error::from)?
            .into_iter()
            .map(|device| (device.name.clone(), device))
            .collect();

        let platform = Platform::detect(
            std::env::consts::ARCH,
            std::path::Path::new("/sys/firmware/efi").exists(),
        );
        let kind = platform_loader(platform);
        let payload = match payload_type.as_str() {
            "LIVE_IMAGE" => PayloadKind::LiveImage,
            "LIVE_OS" => PayloadKind::LiveOs,
            "OSTREE" => PayloadKind::Ostree,
            _ => PayloadKind::Dnf,
        };
        let machine_id = std::fs::read_to_string(self.sysroot.join("etc/machine-id"))
            .unwrap_or_default()
            .trim()
            .to_string();
        let root_device = devices
            .values()
            .find(|device| device.format.mount_point == "/")
            .map(|device| device.name.clone())
            .unwrap_or_default();
        let root_on_btrfs = devices
            .values()
            .any(|device| device.format.mount_point == "/" && device.kind == "btrfs subvolume");

        let installation = Arc::new(BootloaderInstallation {
            runner: self.runner.clone(),
            sysroot: self.sysroot.clone(),
            payload,
            mode: BootloaderMode::Enabled,
            kind,
            platform,
            kernel_versions,
            image_install: false,
            directory_install: false,
            root_device,
            root_on_btrfs,
            devices,
            install_targets: Vec::new(),
            product_name: String::new(),
            product_short_name: String::new(),
            machine_id,
            console: None,
            menu_auto_hide: false,
            is_xen_guest: false,
            root_uuid: String::new(),
            root_subvolume: None,
            loader: std::sync::Mutex::new(BootLoader::new(kind)),
        });

        let mut paths = Vec::new();
        for (index, task) in installation.tasks().into_iter().enumerate() {
            let path = format!("{}/Bootloader/Tasks/{}", storage::STORAGE_PATH, index + 1);
            crate::tasks::publish_task(connection, path.clone(), task)
                .await
                .map_err(|error| fdo::Error::Failed(error.to_string()))?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// One mount point request per usable formatted device.
    async fn gather_requests(&self) -> fdo::Result<String> {
        let facade = self.facade().map_err(fdo::Error::from)?;
        let devices = facade.devices().await.map_err(fdo::Error::from)?;
        let requests = storage::gather_requests(&devices, &self.state.disk_selection);
        serde_json::to_string(&requests)
            .map_err(|error| fdo::Error::Failed(error.to_string()))
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in [
            "SelectedDisks",
            "ExclusiveDisks",
            "IgnoredDisks",
            "IscsiInitiator",
        ] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Storage))
    }

    fn generate_kickstart(&self) -> String {
        let mut data = KickstartData::default();
        self.state.setup_kickstart(&mut data);
        data.emit()
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

/// The device-tree facade at its own path under the storage module.
pub struct DeviceTreeHandler {
    provider: Option<Arc<dyn DeviceTreeProvider>>,
}

impl DeviceTreeHandler {
    pub fn new(provider: Option<Arc<dyn DeviceTreeProvider>>) -> Self {
        Self { provider }
    }

    fn facade(&self) -> fdo::Result<storage::DeviceTreeFacade> {
        self.provider
            .clone()
            .map(storage::DeviceTreeFacade::new)
            .ok_or_else(|| fdo::Error::from(InstallerError::storage_unavailable()))
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Storage.DeviceTree")]
impl DeviceTreeHandler {
    async fn get_devices(&self) -> fdo::Result<String> {
        let devices = self.facade()?.devices().await.map_err(fdo::Error::from)?;
        serde_json::to_string(&devices).map_err(|error| fdo::Error::Failed(error.to_string()))
    }

    async fn get_disks(&self) -> fdo::Result<String> {
        let disks = self.facade()?.disks().await.map_err(fdo::Error::from)?;
        serde_json::to_string(&disks).map_err(|error| fdo::Error::Failed(error.to_string()))
    }

    async fn get_mount_points(&self) -> fdo::Result<Vec<(String, String)>> {
        self.facade()?
            .mount_points()
            .await
            .map_err(fdo::Error::from)
    }

    async fn get_device_data(&self, name: String) -> fdo::Result<String> {
        let device = self
            .facade()?
            .device_data(&name)
            .await
            .map_err(fdo::Error::from)?;
        serde_json::to_string(&device).map_err(|error| fdo::Error::Failed(error.to_string()))
    }

    async fn get_actions(&self) -> fdo::Result<Vec<String>> {
        self.facade()?.actions().await.map_err(fdo::Error::from)
    }

    async fn setup_device(&self, name: String) -> fdo::Result<()> {
        self.facade()?
            .setup_device(&name)
            .await
            .map_err(fdo::Error::from)
    }

    async fn teardown_device(&self, name: String) -> fdo::Result<()> {
        self.facade()?
            .teardown_device(&name)
            .await
            .map_err(fdo::Error::from)
    }

    async fn mount_device(&self, name: String, mount_point: String) -> fdo::Result<()> {
        self.facade()?
            .mount_device(&name, &mount_point)
            .await
            .map_err(fdo::Error::from)
    }

    async fn unmount_device(&self, name: String, mount_point: String) -> fdo::Result<()> {
        self.facade()?
            .unmount_device(&name, &mount_point)
            .await
            .map_err(fdo::Error::from)
    }

    async fn unlock_device(&self, name: String, passphrase: String) -> fdo::Result<bool> {
        self.facade()?
            .unlock_device(&name, &passphrase)
            .await
            .map_err(fdo::Error::from)
    }

    async fn find_optical_media(&self) -> fdo::Result<Vec<String>> {
        self.facade()?
            .find_optical_media()
            .await
            .map_err(fdo::Error::from)
    }

    async fn find_mountable_partitions(&self) -> fdo::Result<Vec<String>> {
        self.facade()?
            .find_mountable_partitions()
            .await
            .map_err(fdo::Error::from)
    }
}

// ---------------------------------------------------------------------------
// Payload

pub struct PayloadHandler {
    state: payload::PayloadState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl PayloadHandler {
    pub fn new(shutdown: Arc<Notify>) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&payload::interface_decl())?;
        Ok((
            Self {
                state: payload::PayloadState::default(),
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Payload")]
impl PayloadHandler {
    #[zbus(property)]
    fn core_group_enabled(&self) -> bool {
        self.state.selection.core_group_enabled
    }

    #[zbus(property)]
    fn environment(&self) -> String {
        self.state.selection.environment.clone()
    }

    #[zbus(property)]
    fn packages(&self) -> Vec<String> {
        self.state.selection.packages.clone()
    }

    #[zbus(property)]
    fn groups(&self) -> Vec<String> {
        self.state.selection.groups.clone()
    }

    #[zbus(property)]
    fn excluded_packages(&self) -> Vec<String> {
        self.state.selection.excluded_packages.clone()
    }

    #[zbus(property)]
    fn repositories(&self) -> String {
        serde_json::to_string(&self.state.repositories).unwrap_or_default()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in ["CoreGroupEnabled", "Environment", "Packages", "Groups"] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Payload))
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Network

pub struct NetworkHandler {
    state: network::NetworkModuleState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl NetworkHandler {
    pub fn new(shutdown: Arc<Notify>) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&network::interface_decl())?;
        Ok((
            Self {
                state: network::NetworkModuleState::default(),
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Network")]
impl NetworkHandler {
    #[zbus(property)]
    fn hostname(&self) -> String {
        self.state.state.hostname.clone()
    }

    #[zbus(property)]
    async fn set_hostname(&mut self, hostname: String) {
        if self.state.state.hostname != hostname {
            self.state.state.hostname = hostname;
            self.bridge.report("Hostname");
            self.flush_property_changes();
        }
    }

    #[zbus(property)]
    fn current_hostname(&self) -> String {
        self.state.state.current_hostname.clone()
    }

    #[zbus(property)]
    fn device_configurations(&self) -> String {
        serde_json::to_string(&self.state.state.device_configurations).unwrap_or_default()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        self.bridge.report("Hostname");
        self.bridge.report("DeviceConfigurations");
        report_json(&filter_report(report, ModuleName::Network))
    }

    fn generate_kickstart(&self) -> String {
        let mut data = KickstartData::default();
        self.state.setup_kickstart(&mut data);
        data.emit()
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Localization

pub struct LocalizationHandler {
    state: localization::LocalizationModuleState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl LocalizationHandler {
    pub fn new(shutdown: Arc<Notify>) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&localization::interface_decl())?;
        Ok((
            Self {
                state: localization::LocalizationModuleState::default(),
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Localization")]
impl LocalizationHandler {
    #[zbus(property)]
    fn language(&self) -> String {
        self.state.state.language.clone()
    }

    #[zbus(property)]
    async fn set_language(&mut self, language: String) {
        if self.state.state.language != language {
            self.state.state.language = language;
            self.bridge.report("Language");
            self.flush_property_changes();
        }
    }

    #[zbus(property)]
    fn language_support(&self) -> Vec<String> {
        self.state.state.language_support.clone()
    }

    #[zbus(property)]
    fn virtual_console_keymap(&self) -> String {
        self.state.state.vc_keymap.clone()
    }

    #[zbus(property, name = "XLayouts")]
    fn x_layouts(&self) -> Vec<String> {
        self.state.state.x_layouts.clone()
    }

    #[zbus(property)]
    fn layout_switch_options(&self) -> Vec<String> {
        self.state.state.layout_switch_options.clone()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in ["Language", "LanguageSupport", "VirtualConsoleKeymap", "XLayouts"] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Localization))
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Security

pub struct SecurityHandler {
    state: security::SecurityModuleState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl SecurityHandler {
    pub fn new(shutdown: Arc<Notify>) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&security::interface_decl())?;
        Ok((
            Self {
                state: security::SecurityModuleState::default(),
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Security")]
impl SecurityHandler {
    #[zbus(property, name = "SELinux")]
    fn selinux(&self) -> i32 {
        self.state.state.selinux.to_int()
    }

    #[zbus(property)]
    fn authselect(&self) -> Vec<String> {
        self.state.state.authselect.clone()
    }

    #[zbus(property)]
    fn authconfig(&self) -> Vec<String> {
        self.state.state.authconfig.clone()
    }

    #[zbus(property)]
    fn realm(&self) -> String {
        serde_json::to_string(&self.state.state.realm).unwrap_or_default()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in ["SELinux", "Authselect", "Authconfig", "Realm"] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Security))
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Services

pub struct ServicesHandler {
    state: services::ServicesModuleState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl ServicesHandler {
    pub fn new(shutdown: Arc<Notify>) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&services::interface_decl())?;
        Ok((
            Self {
                state: services::ServicesModuleState::default(),
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Services")]
impl ServicesHandler {
    #[zbus(property)]
    fn enabled_services(&self) -> Vec<String> {
        self.state.state.enabled_services.clone()
    }

    #[zbus(property)]
    fn disabled_services(&self) -> Vec<String> {
        self.state.state.disabled_services.clone()
    }

    #[zbus(property)]
    fn default_target(&self) -> String {
        self.state.state.default_target.clone()
    }

    #[zbus(property)]
    fn default_desktop(&self) -> String {
        self.state.state.default_desktop.clone()
    }

    #[zbus(property)]
    fn setup_on_boot(&self) -> i32 {
        self.state.state.setup_on_boot.to_int()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in [
            "EnabledServices",
            "DisabledServices",
            "DefaultTarget",
            "DefaultDesktop",
            "SetupOnBoot",
        ] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Services))
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Runtime

pub struct RuntimeHandler {
    state: runtime::RuntimeState,
    bridge: PropertyBridge,
    shutdown: Arc<Notify>,
}

impl RuntimeHandler {
    pub fn new(
        state: runtime::RuntimeState,
        shutdown: Arc<Notify>,
    ) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&runtime::interface_decl())?;
        Ok((
            Self {
                state,
                bridge,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Modules.Runtime")]
impl RuntimeHandler {
    #[zbus(property)]
    fn display_mode(&self) -> String {
        self.state.display_mode.kickstart_name().to_string()
    }

    #[zbus(property)]
    fn non_interactive(&self) -> bool {
        self.state.non_interactive
    }

    #[zbus(property)]
    fn vnc_enabled(&self) -> bool {
        self.state.vnc.enabled
    }

    #[zbus(property)]
    fn product_name(&self) -> String {
        self.state.product.name.clone()
    }

    #[zbus(property)]
    fn product_version(&self) -> String {
        self.state.product.version.clone()
    }

    #[zbus(property)]
    fn is_final_release(&self) -> bool {
        self.state.product.is_final_release
    }

    fn get_password_policy(&self, policy_name: String) -> String {
        serde_json::to_string(&self.state.policy(&policy_name)).unwrap_or_default()
    }

    /// Run the password check pipeline against a named policy.
    fn check_password(
        &self,
        password: String,
        confirmation: String,
        policy_name: String,
    ) -> String {
        use crate::modules::users::checks;

        let request = installer_types::PasswordCheckRequest {
            password,
            confirmation,
            policy: self.state.policy(&policy_name),
            ..Default::default()
        };
        let validity = checks::check_validity(&request);
        let confirmation = checks::check_confirmation(&request);
        let ascii = checks::check_ascii(&request);

        serde_json::json!({
            "success": validity.success && confirmation.success,
            "error-message": if !validity.success {
                validity.error_message.clone()
            } else {
                confirmation.error_message.clone()
            },
            "password-score": validity.password_score,
            "status": validity.status.describe(),
            "quality": validity.quality,
            "length-ok": validity.length_ok,
            "is-ascii": ascii.success,
        })
        .to_string()
    }

    #[emits_properties_changed]
    async fn read_kickstart(&mut self, kickstart: String) -> String {
        let (data, report) = parse_kickstart(&kickstart, "ks.cfg");
        self.state.process_kickstart(&data);
        for name in ["DisplayMode", "NonInteractive", "VncEnabled"] {
            self.bridge.report(name);
        }
        report_json(&filter_report(report, ModuleName::Runtime))
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Boss

pub struct BossHandler {
    state: boss::BossState,
    bridge: PropertyBridge,
    connection: zbus::Connection,
    shutdown: Arc<Notify>,
}

impl BossHandler {
    pub fn new(
        connection: zbus::Connection,
        shutdown: Arc<Notify>,
    ) -> anyhow::Result<(Self, BatchReceiver)> {
        let (bridge, receiver) = PropertyBridge::new(&boss::interface_decl())?;
        Ok((
            Self {
                state: boss::BossState::default(),
                bridge,
                connection,
                shutdown,
            },
            receiver,
        ))
    }

    fn flush_property_changes(&mut self) {
        let Self { state, bridge, .. } = self;
        bridge.flush_with(&|name: &str| state.property_value(name));
    }

    async fn module_proxy(
        &self,
        module: ModuleName,
    ) -> zbus::Result<zbus::Proxy<'static>> {
        let name = module.as_str();
        zbus::Proxy::new(
            &self.connection,
            format!("org.fedoraproject.Anaconda.Modules.{name}"),
            format!("/org/fedoraproject/Anaconda/Modules/{name}"),
            format!("org.fedoraproject.Anaconda.Modules.{name}"),
        )
        .await
    }
}

#[interface(name = "org.fedoraproject.Anaconda.Boss")]
impl BossHandler {
    #[zbus(property)]
    fn active_modules(&self) -> Vec<String> {
        self.state.active_modules.clone()
    }

    #[zbus(property)]
    fn installation_running(&self) -> bool {
        self.state.installation_running
    }

    #[zbus(property)]
    fn progress_step(&self) -> u32 {
        self.state.progress_step
    }

    #[zbus(property)]
    fn progress_description(&self) -> String {
        self.state.progress_description.clone()
    }

    #[zbus(property)]
    fn progress_fraction(&self) -> f64 {
        self.state.progress_fraction()
    }

    #[zbus(property)]
    fn failing_task_path(&self) -> String {
        self.state.failing_task_path.clone()
    }

    /// Read a kickstart file and distribute it to every module. Problems
    /// come back as a structured report, never as a bus error.
    async fn read_kickstart_file(&mut self, path: String) -> String {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(error) => {
                let mut report = KickstartReport::default();
                report.errors.push(installer_contracts::KickstartMessage {
                    message: format!("cannot read {path}: {error}"),
                    line_number: 0,
                    file_name: path,
                    module_name: String::new(),
                });
                return report_json(&report);
            }
        };

        // The Boss keeps the entries nobody owns (unknown commands).
        let (_, parse_report) = parse_kickstart(&source, &path);
        let mut merged = KickstartReport {
            errors: parse_report
                .errors
                .into_iter()
                .filter(|entry| entry.module_name.is_empty())
                .collect(),
            warnings: parse_report
                .warnings
                .into_iter()
                .filter(|entry| entry.module_name.is_empty())
                .collect(),
        };

        for module in ModuleName::ALL {
            let proxy = match self.module_proxy(module).await {
                Ok(proxy) => proxy,
                Err(error) => {
                    tracing::warn!("module {} unreachable: {error}", module.as_str());
                    continue;
                }
            };
            match proxy
                .call::<_, _, String>("ReadKickstart", &(source.clone(),))
                .await
            {
                Ok(json) => {
                    if let Ok(report) = serde_json::from_str::<KickstartReport>(&json) {
                        merged.merge(report);
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        "module {} failed to read the kickstart: {error}",
                        module.as_str()
                    );
                }
            }
        }
        report_json(&merged)
    }

    /// Run the installation. Progress is published step by step; the
    /// failing task path is recorded for the front-end.
    #[emits_properties_changed]
    async fn install_system(&mut self) -> fdo::Result<()> {
        let modules = [ModuleName::Users];
        self.state.start_installation(modules.len() as u32);
        self.bridge.report("InstallationRunning");
        self.flush_property_changes();

        let mut result = Ok(());
        for (index, module) in modules.iter().enumerate() {
            self.state.report_progress(
                index as u32 + 1,
                format!("Configuring {}", module.as_str()),
            );
            self.bridge.report("ProgressStep");
            self.bridge.report("ProgressDescription");
            self.bridge.report("ProgressFraction");
            self.flush_property_changes();

            let proxy = self
                .module_proxy(*module)
                .await
                .map_err(|error| fdo::Error::Failed(error.to_string()))?;
            if let Err(error) = proxy.call::<_, _, ()>("Install", &()).await {
                self.state.record_task_failure(format!(
                    "/org/fedoraproject/Anaconda/Modules/{}",
                    module.as_str()
                ));
                self.bridge.report("FailingTaskPath");
                result = Err(fdo::Error::Failed(error.to_string()));
                break;
            }
        }

        self.state.finish_installation();
        self.bridge.report("InstallationRunning");
        result
    }

    /// Advisory cancellation; the current task yields at its safe point.
    fn cancel(&mut self) {
        self.state.request_cancel();
    }

    fn quit(&self) {
        self.shutdown.notify_waiters();
    }
}
