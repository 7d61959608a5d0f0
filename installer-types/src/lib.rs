// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the installer services.
//!
//! This crate defines the single source of truth for the installation
//! domain types. These models are used throughout the stack:
//!
//! - **installer-kickstart**: populates them from parsed commands
//! - **installer-service**: publishes them on the bus as structures
//! - **installer-bootloader**: consumes the device model for eligibility
//!
//! Records that cross the bus implement
//! [`installer_dbus::DbusStructure`], with hyphenated on-wire field names.

pub mod localization;
pub mod network;
pub mod payload;
pub mod policy;
pub mod product;
pub mod security;
pub mod services;
pub mod storage;
pub mod users;

pub use localization::LocalizationState;
pub use network::{NetworkDeviceConfiguration, NetworkState};
pub use payload::{PackagesSelection, RepoConfigurationData, RepoOrigin, SourceKind};
pub use policy::{
    PasswordCheckRequest, PasswordPolicy, PasswordStatus, PasswordValidityResult, SecretType,
};
pub use product::{DisplayMode, ProductData, VncConfiguration};
pub use security::{RealmData, SELinuxMode, SecurityState};
pub use services::{ServicesState, SetupOnBoot};
pub use storage::{
    DeviceFactoryRequest, DeviceFormat, DeviceNode, DiskSelection, MountPointRequest,
    PartitioningRequest,
};
pub use users::{GroupData, IdMode, SshKeyData, UserData};
