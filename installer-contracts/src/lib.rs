// SPDX-License-Identifier: GPL-3.0-only

pub mod protocol;
pub mod providers;

pub use protocol::{InstallerError, InstallerErrorKind, KickstartMessage, KickstartReport};
pub use providers::{DeviceTreeProvider, PackageResolverProvider};
