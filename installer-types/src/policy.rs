// SPDX-License-Identifier: GPL-3.0-only

//! Password policy records and check shapes.

use std::fmt;

use installer_dbus::structure_fields;
use serde::{Deserialize, Serialize};

/// Well-known policy names.
pub const POLICY_ROOT: &str = "root";
pub const POLICY_USER: &str = "user";
pub const POLICY_LUKS: &str = "luks";

/// Requirements applied to one class of secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_quality: u32,
    pub min_length: u32,
    pub allow_empty: bool,
    pub is_strict: bool,
}

structure_fields! {
    impl PasswordPolicy {
        "min-quality" => min_quality: u32,
        "min-length" => min_length: u32,
        "allow-empty" => allow_empty: bool,
        "is-strict" => is_strict: bool,
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_quality: 1,
            min_length: 6,
            allow_empty: true,
            is_strict: false,
        }
    }
}

impl PasswordPolicy {
    /// The default policy for a well-known name; unknown names share the
    /// user defaults.
    pub fn named(name: &str) -> Self {
        match name {
            POLICY_LUKS => Self {
                min_length: 8,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

/// What kind of secret a check request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    #[default]
    Password,
    Passphrase,
}

impl SecretType {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Passphrase => "passphrase",
        }
    }
}

/// Input to the password check pipeline.
#[derive(Clone, Default)]
pub struct PasswordCheckRequest {
    pub password: String,
    pub confirmation: String,
    pub policy: PasswordPolicy,
    pub username: Option<String>,
    pub fullname: String,
    pub secret_type: SecretType,
    /// An empty confirmation passes the confirmation check when set.
    pub success_if_confirmation_empty: bool,
}

impl fmt::Debug for PasswordCheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCheckRequest")
            .field("policy", &self.policy)
            .field("username", &self.username)
            .field("secret_type", &self.secret_type)
            .field("password_set", &!self.password.is_empty())
            .finish()
    }
}

/// Coarse strength classification of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStatus {
    Empty,
    TooShort,
    Weak,
    Fair,
    Good,
    Strong,
}

impl PasswordStatus {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort => "too short",
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Strong => "strong",
        }
    }
}

/// Output of the validity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordValidityResult {
    pub success: bool,
    pub error_message: String,
    /// 0 to 4, for strength meters.
    pub password_score: u32,
    pub status: PasswordStatus,
    /// 0 to 100.
    pub quality: u32,
    pub length_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::DbusStructure;

    #[test]
    fn luks_policy_requires_longer_secrets() {
        assert_eq!(PasswordPolicy::named(POLICY_LUKS).min_length, 8);
        assert_eq!(PasswordPolicy::named(POLICY_ROOT).min_length, 6);
        assert_eq!(PasswordPolicy::named("other").min_length, 6);
    }

    #[test]
    fn policy_structure_round_trip() {
        let policy = PasswordPolicy {
            min_quality: 10,
            min_length: 1,
            allow_empty: false,
            is_strict: true,
        };
        let decoded = PasswordPolicy::from_structure(policy.to_structure()).expect("decode");
        assert_eq!(decoded, policy);
    }

    #[test]
    fn request_debug_redacts_secrets() {
        let request = PasswordCheckRequest {
            password: "hunter2".into(),
            ..Default::default()
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password_set: true"));
    }
}
