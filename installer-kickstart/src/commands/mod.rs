// SPDX-License-Identifier: GPL-3.0-only

//! Kickstart command grammars, one module per owning service.
//!
//! Every command is a clap parser fed the words of its line, plus a
//! canonical emitter. Emission renders valued options in `--flag=value`
//! form, in the declared field order, quoting values with whitespace.

pub mod localization;
pub mod network;
pub mod payload;
pub mod runtime;
pub mod security;
pub mod services;
pub mod storage;
pub mod users;

/// Quote a value when it would not survive word splitting.
pub(crate) fn quote(value: &str) -> String {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Append `--flag=value` when the value is present.
pub(crate) fn push_opt(out: &mut String, flag: &str, value: &Option<String>) {
    if let Some(value) = value {
        out.push_str(&format!(" --{flag}={}", quote(value)));
    }
}

pub(crate) fn push_flag(out: &mut String, flag: &str, set: bool) {
    if set {
        out.push_str(&format!(" --{flag}"));
    }
}

/// Split a comma-separated list, tolerating whitespace around names.
pub(crate) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_only_when_needed() {
        assert_eq!(quote("wheel"), "wheel");
        assert_eq!(quote("Ada L."), "\"Ada L.\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn csv_splitting_tolerates_whitespace() {
        assert_eq!(split_csv("foo, bar"), vec!["foo", "bar"]);
        assert_eq!(split_csv(""), Vec::<String>::new());
    }
}
