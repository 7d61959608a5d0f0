// SPDX-License-Identifier: GPL-3.0-only

//! The Runtime module: front-end configuration, password policies and
//! product identity.

use std::collections::BTreeMap;
use std::path::Path;

use configparser::ini::Ini;

use installer_dbus::wire::{TaggedVariant, TypeHint, WireError};
use installer_dbus::{Access, Arg, InterfaceDecl, Member, ObjectDecl, tagged};
use installer_kickstart::document::KickstartData;
use installer_types::{DisplayMode, PasswordPolicy, ProductData, VncConfiguration};

pub const RUNTIME_INTERFACE: &str = "org.fedoraproject.Anaconda.Modules.Runtime";
pub const RUNTIME_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Runtime";

/// The state slice owned by the Runtime module.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeState {
    pub display_mode: DisplayMode,
    pub display_mode_seen: bool,
    pub non_interactive: bool,
    pub vnc: VncConfiguration,
    pub password_policies: BTreeMap<String, PasswordPolicy>,
    pub product: ProductData,
}

impl Default for RuntimeState {
    fn default() -> Self {
        let mut password_policies = BTreeMap::new();
        for name in ["root", "user", "luks"] {
            password_policies.insert(name.to_string(), PasswordPolicy::named(name));
        }
        Self {
            display_mode: DisplayMode::Gui,
            display_mode_seen: false,
            non_interactive: false,
            vnc: VncConfiguration::default(),
            password_policies,
            product: ProductData::default(),
        }
    }
}

impl RuntimeState {
    pub fn process_kickstart(&mut self, data: &KickstartData) {
        if let Some(command) = &data.display_mode {
            self.display_mode = command.mode;
            self.non_interactive = command.non_interactive;
            self.display_mode_seen = true;
        }
        if let Some(vnc) = &data.vnc {
            self.vnc = vnc.to_configuration();
        }
        // Deprecated input still configures the policy map.
        for (name, policy) in data.password_policies() {
            self.password_policies.insert(name, policy);
        }
    }

    pub fn policy(&self, name: &str) -> PasswordPolicy {
        self.password_policies
            .get(name)
            .cloned()
            .unwrap_or_else(|| PasswordPolicy::named(name))
    }

    pub fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        match name {
            "DisplayMode" => Ok(tagged(&self.display_mode.kickstart_name().to_string())),
            "NonInteractive" => Ok(tagged(&self.non_interactive)),
            "VncEnabled" => Ok(tagged(&self.vnc.enabled)),
            "ProductName" => Ok(tagged(&self.product.name)),
            "ProductVersion" => Ok(tagged(&self.product.version)),
            "IsFinalRelease" => Ok(tagged(&self.product.is_final_release)),
            other => Err(WireError::UnknownProperty(other.to_string())),
        }
    }
}

pub fn interface_decl() -> ObjectDecl {
    ObjectDecl {
        interface: InterfaceDecl::new(
            RUNTIME_INTERFACE,
            vec![
                Member::Property {
                    name: "DisplayMode".into(),
                    hint: TypeHint::Str,
                    access: Access::ReadWrite,
                },
                Member::Property {
                    name: "NonInteractive".into(),
                    hint: TypeHint::Bool,
                    access: Access::Read,
                },
                Member::Property {
                    name: "VncEnabled".into(),
                    hint: TypeHint::Bool,
                    access: Access::Read,
                },
                Member::Property {
                    name: "ProductName".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Property {
                    name: "ProductVersion".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                },
                Member::Property {
                    name: "IsFinalRelease".into(),
                    hint: TypeHint::Bool,
                    access: Access::Read,
                },
                Member::Method {
                    name: "GetPasswordPolicy".into(),
                    args: vec![Arg::new("policy_name", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "CheckPassword".into(),
                    args: vec![
                        Arg::new("password", TypeHint::Str),
                        Arg::new("confirmation", TypeHint::Str),
                        Arg::new("policy_name", TypeHint::Str),
                    ],
                    ret: Some(TypeHint::Str),
                },
                Member::Method {
                    name: "ReadKickstart".into(),
                    args: vec![Arg::new("kickstart", TypeHint::Str)],
                    ret: Some(TypeHint::Str),
                },
            ],
        ),
        inherited: vec![],
    }
}

/// Parse an INI buildstamp: `[Main]` with Product, Version, IsFinal.
fn product_from_buildstamp(path: &Path) -> Option<ProductData> {
    let mut ini = Ini::new();
    ini.load(path.to_str()?).ok()?;
    let name = ini.get("Main", "Product")?;
    let version = ini
        .get("Main", "Version")
        .unwrap_or_else(|| "rawhide".to_string());
    let is_final = ini
        .getboolcoerce("Main", "IsFinal")
        .ok()
        .flatten()
        .unwrap_or(false);
    Some(ProductData {
        is_final_release: is_final,
        short_name: ProductData::short_name_from(&name),
        version: ProductData::display_version(&version),
        name,
    })
}

/// Parse /etc/os-release KEY=VALUE pairs.
fn product_from_os_release(path: &Path) -> Option<ProductData> {
    let contents = std::fs::read_to_string(path).ok()?;
    let mut name = None;
    let mut version = None;
    let mut release_type = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "NAME" => name = Some(value),
            "VERSION_ID" => version = Some(value),
            "RELEASE_TYPE" => release_type = Some(value),
            _ => {}
        }
    }
    let name = name?;
    Some(ProductData {
        is_final_release: release_type.as_deref() == Some("stable"),
        short_name: ProductData::short_name_from(&name),
        version: ProductData::display_version(&version.unwrap_or_else(|| "rawhide".into())),
        name,
    })
}

/// Derive the product identity: the buildstamp named by PRODBUILDPATH wins,
/// then /.buildstamp, then os-release, then static defaults.
pub fn derive_product_data(
    prodbuild_path: Option<&Path>,
    default_buildstamp: &Path,
    os_release: &Path,
) -> ProductData {
    if let Some(path) = prodbuild_path {
        if let Some(product) = product_from_buildstamp(path) {
            return product;
        }
    }
    if let Some(product) = product_from_buildstamp(default_buildstamp) {
        return product;
    }
    if let Some(product) = product_from_os_release(os_release) {
        return product;
    }
    ProductData::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_kickstart::parse_kickstart;

    #[test]
    fn defaults_include_the_three_policies() {
        let state = RuntimeState::default();
        assert_eq!(state.policy("root").min_length, 6);
        assert_eq!(state.policy("luks").min_length, 8);
        assert_eq!(state.policy("unknown").min_length, 6);
    }

    #[test]
    fn kickstart_configures_mode_vnc_and_policies() {
        let (data, _) = parse_kickstart(
            "text --non-interactive\nvnc --host=10.0.0.5 --password=p\npwpolicy root --minlen=12 --strict\n",
            "ks.cfg",
        );
        let mut state = RuntimeState::default();
        state.process_kickstart(&data);

        assert_eq!(state.display_mode, DisplayMode::Tui);
        assert!(state.non_interactive);
        assert!(state.vnc.enabled);
        assert_eq!(state.policy("root").min_length, 12);
        assert!(state.policy("root").is_strict);
        // Unmentioned policies keep their defaults.
        assert_eq!(state.policy("user").min_length, 6);
    }

    #[test]
    fn buildstamp_wins_over_os_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        let buildstamp = dir.path().join("buildstamp");
        std::fs::write(
            &buildstamp,
            "[Main]\nProduct=Fedora Linux\nVersion=41.0.7\nIsFinal=true\n",
        )
        .expect("buildstamp");
        let os_release = dir.path().join("os-release");
        std::fs::write(&os_release, "NAME=\"Something Else\"\nVERSION_ID=9\n")
            .expect("os-release");

        let product = derive_product_data(Some(&buildstamp), &buildstamp, &os_release);
        assert_eq!(product.name, "Fedora Linux");
        assert_eq!(product.short_name, "fl");
        assert_eq!(product.version, "41.0");
        assert!(product.is_final_release);
    }

    #[test]
    fn os_release_is_the_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let os_release = dir.path().join("os-release");
        std::fs::write(
            &os_release,
            "NAME=\"Fedora Linux\"\nVERSION_ID=development\nRELEASE_TYPE=development\n",
        )
        .expect("os-release");

        let product = derive_product_data(
            None,
            &dir.path().join("missing-buildstamp"),
            &os_release,
        );
        assert_eq!(product.name, "Fedora Linux");
        assert_eq!(product.version, "rawhide");
        assert!(!product.is_final_release);
    }

    #[test]
    fn static_defaults_close_the_chain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let product = derive_product_data(
            None,
            &dir.path().join("missing"),
            &dir.path().join("also-missing"),
        );
        assert_eq!(product, ProductData::default());
    }
}
