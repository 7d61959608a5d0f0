// SPDX-License-Identifier: GPL-3.0-only

//! The boot loader subsystem.
//!
//! Responsibilities, in the order an installation exercises them:
//!
//! - pick the loader class for the platform ([`factory`])
//! - validate stage1/stage2 devices ([`stage1`], [`base`])
//! - expand install targets for redundant layouts ([`targets`])
//! - synthesize the kernel command line ([`cmdline`], [`args`])
//! - write per-class configuration and install ([`writers`])
//! - drive the guarded installation task graph ([`tasks`])

pub mod args;
pub mod base;
pub mod cmdline;
pub mod factory;
pub mod image;
pub mod platform;
pub mod stage1;
pub mod targets;
pub mod tasks;
pub mod writers;

pub use args::BootLoaderArguments;
pub use base::{BootLoader, LoaderKind, stage2_device_errors};
pub use cmdline::{BootArgsContext, collect_boot_args};
pub use factory::{platform_loader, select_loader};
pub use image::{ChainBootLoaderImage, LinuxBootLoaderImage};
pub use platform::Platform;
pub use stage1::{
    EligibilityContext, choose_stage1_device, is_valid_stage1_device, stage1_device_errors,
};
pub use targets::install_targets;
pub use tasks::{BootloaderInstallation, BootloaderMode, PayloadKind};
pub use writers::{WriterContext, bls_supported};
