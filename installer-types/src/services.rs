// SPDX-License-Identifier: GPL-3.0-only

//! Services domain state.

use serde::{Deserialize, Serialize};

/// Initial-setup policy for the first boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOnBoot {
    /// Nothing was requested; the product default applies.
    #[default]
    Default,
    Disabled,
    Enabled,
    Reconfig,
}

impl SetupOnBoot {
    pub fn to_int(self) -> i32 {
        match self {
            Self::Default => -1,
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::Reconfig => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::Default),
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabled),
            2 => Some(Self::Reconfig),
            _ => None,
        }
    }
}

/// Services module state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesState {
    pub enabled_services: Vec<String>,
    pub disabled_services: Vec<String>,
    pub default_target: String,
    pub default_desktop: String,
    pub setup_on_boot: SetupOnBoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_on_boot_int_round_trip() {
        for policy in [
            SetupOnBoot::Default,
            SetupOnBoot::Disabled,
            SetupOnBoot::Enabled,
            SetupOnBoot::Reconfig,
        ] {
            assert_eq!(SetupOnBoot::from_int(policy.to_int()), Some(policy));
        }
        assert_eq!(SetupOnBoot::from_int(9), None);
    }
}
