// SPDX-License-Identifier: GPL-3.0-only

//! The password check pipeline.
//!
//! Checks compose in a declared order: validity (with scoring), FIPS,
//! confirmation, ASCII. Each reads the same request and writes a result;
//! the validity check additionally classifies strength.

use installer_types::{PasswordCheckRequest, PasswordStatus, PasswordValidityResult};

/// Quality thresholds, defined once for both the score and status mapping.
pub const QUALITY_WEAK: u32 = 30;
pub const QUALITY_STRONG: u32 = 70;

/// Shortest passphrase FIPS mode accepts.
pub const FIPS_MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub success: bool,
    pub error_message: String,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            success: true,
            error_message: String::new(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: message.into(),
        }
    }
}

/// Crude quality estimate in 0..=100: length and character class variety.
///
/// The engine behind the number is deliberately simple; policy decisions
/// key off the two thresholds above, not the raw figure.
pub fn estimate_quality(password: &str, username: Option<&str>) -> u32 {
    if password.is_empty() {
        return 0;
    }
    if let Some(username) = username {
        if !username.is_empty() && password.eq_ignore_ascii_case(username) {
            return 0;
        }
    }

    let classes = [
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count() as u32;

    let length_points = (password.chars().count() as u32).saturating_mul(6);
    (length_points + classes * 10).min(100)
}

/// The validity check: empty handling, length floor, quality scoring.
pub fn check_validity(request: &PasswordCheckRequest) -> PasswordValidityResult {
    let policy = &request.policy;
    let length = request.password.chars().count() as u32;

    if request.password.is_empty() {
        return PasswordValidityResult {
            success: policy.allow_empty,
            error_message: if policy.allow_empty {
                String::new()
            } else {
                format!("the {} is empty", request.secret_type.describe())
            },
            password_score: if policy.allow_empty { 1 } else { 0 },
            status: PasswordStatus::Empty,
            quality: 0,
            length_ok: false,
        };
    }

    let quality = estimate_quality(&request.password, request.username.as_deref());
    let length_ok = length >= policy.min_length;

    if !length_ok {
        // Too short overrides any quality the characters earned.
        return PasswordValidityResult {
            success: !policy.is_strict,
            error_message: format!("the {} is too short", request.secret_type.describe()),
            password_score: 0,
            status: PasswordStatus::TooShort,
            quality,
            length_ok: false,
        };
    }

    let (password_score, status) = if quality < QUALITY_WEAK {
        if quality < QUALITY_WEAK / 2 {
            (1, PasswordStatus::Weak)
        } else {
            (2, PasswordStatus::Fair)
        }
    } else if quality < QUALITY_STRONG {
        (3, PasswordStatus::Good)
    } else {
        (4, PasswordStatus::Strong)
    };

    let quality_ok = quality >= policy.min_quality || !policy.is_strict;
    PasswordValidityResult {
        success: quality_ok,
        error_message: if quality_ok {
            String::new()
        } else {
            format!("the {} quality is below policy", request.secret_type.describe())
        },
        password_score,
        status,
        quality,
        length_ok: true,
    }
}

/// FIPS mode puts a hard floor under passphrase lengths.
pub fn check_fips(request: &PasswordCheckRequest, fips_enabled: bool) -> CheckResult {
    if !fips_enabled {
        return CheckResult::ok();
    }
    if request.password.chars().count() >= FIPS_MIN_LENGTH {
        return CheckResult::ok();
    }
    CheckResult::fail(format!(
        "in FIPS mode, the {} must be at least {FIPS_MIN_LENGTH} letters long",
        request.secret_type.describe()
    ))
}

/// The confirmation must match, unless an empty confirmation is allowed
/// through.
pub fn check_confirmation(request: &PasswordCheckRequest) -> CheckResult {
    if request.confirmation.is_empty() && request.success_if_confirmation_empty {
        return CheckResult::ok();
    }
    if request.password == request.confirmation {
        return CheckResult::ok();
    }
    CheckResult::fail(format!(
        "the {}s do not match",
        request.secret_type.describe()
    ))
}

/// Non-ASCII characters are risky on the console keymap at boot.
pub fn check_ascii(request: &PasswordCheckRequest) -> CheckResult {
    match request.password.chars().find(|c| !c.is_ascii()) {
        None => CheckResult::ok(),
        Some(_) => CheckResult::fail(format!(
            "the {} contains non-ASCII characters",
            request.secret_type.describe()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_types::PasswordPolicy;

    fn request(password: &str) -> PasswordCheckRequest {
        PasswordCheckRequest {
            password: password.into(),
            confirmation: password.into(),
            policy: PasswordPolicy::default(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_with_allow_empty_scores_one() {
        let result = check_validity(&request(""));
        assert!(result.success);
        assert_eq!(result.password_score, 1);
        assert_eq!(result.status, PasswordStatus::Empty);
        assert_eq!(result.quality, 0);
    }

    #[test]
    fn empty_without_allow_empty_scores_zero() {
        let mut req = request("");
        req.policy.allow_empty = false;
        let result = check_validity(&req);
        assert!(!result.success);
        assert_eq!(result.password_score, 0);
        assert_eq!(result.status, PasswordStatus::Empty);
    }

    #[test]
    fn short_passwords_report_too_short() {
        let result = check_validity(&request("abc"));
        assert_eq!(result.status, PasswordStatus::TooShort);
        assert_eq!(result.password_score, 0);
        assert!(result.error_message.contains("too short"));
        assert!(!result.length_ok);
    }

    #[test]
    fn too_short_overrides_strong_characters() {
        let mut req = request("aB1!x");
        req.policy.min_length = 10;
        let result = check_validity(&req);
        assert_eq!(result.status, PasswordStatus::TooShort);
        assert_eq!(result.password_score, 0);
    }

    #[test]
    fn long_varied_passwords_are_strong() {
        let result = check_validity(&request("Tr0ub4dor&horse-staple"));
        assert_eq!(result.status, PasswordStatus::Strong);
        assert_eq!(result.password_score, 4);
        assert!(result.quality >= QUALITY_STRONG);
    }

    #[test]
    fn fips_floors_the_length() {
        assert!(check_fips(&request("short"), false).success);
        assert!(!check_fips(&request("short"), true).success);
        assert!(check_fips(&request("longenough"), true).success);
    }

    #[test]
    fn confirmation_rules() {
        let mut req = request("secret");
        req.confirmation = "different".into();
        assert!(!check_confirmation(&req).success);

        req.confirmation = String::new();
        assert!(!check_confirmation(&req).success);
        req.success_if_confirmation_empty = true;
        assert!(check_confirmation(&req).success);
    }

    #[test]
    fn ascii_check_flags_non_ascii() {
        assert!(check_ascii(&request("secret")).success);
        assert!(!check_ascii(&request("hesló")).success);
    }

    #[test]
    fn password_matching_username_has_no_quality() {
        let mut req = request("ada");
        req.username = Some("ada".into());
        assert_eq!(estimate_quality(&req.password, req.username.as_deref()), 0);
    }
}
