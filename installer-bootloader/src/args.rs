// SPDX-License-Identifier: GPL-3.0-only

//! The ordered kernel argument multiset.
//!
//! Two invariants shape this container: re-adding an existing token moves
//! it to the end, and `ip=` tokens of the single-colon `iface:cfg` form are
//! merged per interface when rendered, their configurations joined in
//! sorted order.

use std::collections::BTreeMap;

/// Ordered kernel argument list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootLoaderArguments {
    tokens: Vec<String>,
}

/// `ip=iface:cfg` split, for the single-colon form only.
fn split_ip_token(token: &str) -> Option<(&str, &str)> {
    let body = token.strip_prefix("ip=")?;
    let mut parts = body.splitn(2, ':');
    let iface = parts.next()?;
    let cfg = parts.next()?;
    if cfg.contains(':') || iface.is_empty() || cfg.is_empty() {
        return None;
    }
    Some((iface, cfg))
}

impl BootLoaderArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token; an existing equal token moves to the end.
    pub fn add(&mut self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        self.tokens.retain(|existing| *existing != token);
        self.tokens.push(token);
    }

    /// Append every token of an iterable.
    pub fn update<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.add(token);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|existing| existing == token)
    }

    /// Render for the kernel command line, merging `ip=` tokens per
    /// interface at their first occurrence.
    pub fn render(&self) -> String {
        let mut merged: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for token in &self.tokens {
            if let Some((iface, cfg)) = split_ip_token(token) {
                merged.entry(iface).or_default().push(cfg);
            }
        }

        let mut rendered: Vec<String> = Vec::new();
        let mut emitted_ifaces: Vec<&str> = Vec::new();
        for token in &self.tokens {
            match split_ip_token(token) {
                Some((iface, _)) => {
                    if emitted_ifaces.contains(&iface) {
                        continue;
                    }
                    emitted_ifaces.push(iface);
                    let mut cfgs = merged[iface].clone();
                    cfgs.sort_unstable();
                    rendered.push(format!("ip={iface}:{}", cfgs.join(",")));
                }
                None => rendered.push(token.clone()),
            }
        }
        rendered.join(" ")
    }
}

impl std::fmt::Display for BootLoaderArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

impl<'a> IntoIterator for &'a BootLoaderArguments {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter().map(String::as_str)
    }
}
