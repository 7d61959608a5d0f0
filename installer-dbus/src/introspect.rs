// SPDX-License-Identifier: GPL-3.0-only

//! Declarative interface descriptions and introspection XML generation.
//!
//! A service object declares one local interface plus the interfaces it
//! inherits. Generation validates member names, silently drops local members
//! already provided by an inherited interface, injects the three standard
//! interfaces for collision purposes, and renders deterministic XML.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::wire::{TypeHint, WireError};

/// Property access derived from which half of the getter/setter pair exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "readwrite",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub hint: TypeHint,
}

impl Arg {
    pub fn new(name: impl Into<String>, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            hint,
        }
    }
}

/// The three member categories of a bus interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Method {
        name: String,
        args: Vec<Arg>,
        ret: Option<TypeHint>,
    },
    Property {
        name: String,
        hint: TypeHint,
        access: Access,
    },
    Signal {
        name: String,
        args: Vec<Arg>,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Self::Method { name, .. } | Self::Property { name, .. } | Self::Signal { name, .. } => {
                name
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub members: Vec<Member>,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

/// A bus object: one local interface plus everything it inherits.
#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub interface: InterfaceDecl,
    pub inherited: Vec<InterfaceDecl>,
}

/// A name is exportable iff it is a bare CamelCase identifier.
pub fn is_exportable(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new("^[A-Z][A-Za-z0-9]*$").expect("exportable pattern"))
        .is_match(name)
}

/// The standard interfaces every object implements. Always part of the
/// inherited set for collision detection, whether or not declared.
pub fn standard_interfaces() -> Vec<InterfaceDecl> {
    let s = TypeHint::Str;
    vec![
        InterfaceDecl::new(
            "org.freedesktop.DBus.Introspectable",
            vec![Member::Method {
                name: "Introspect".into(),
                args: vec![],
                ret: Some(s.clone()),
            }],
        ),
        InterfaceDecl::new(
            "org.freedesktop.DBus.Peer",
            vec![
                Member::Method {
                    name: "Ping".into(),
                    args: vec![],
                    ret: None,
                },
                Member::Method {
                    name: "GetMachineId".into(),
                    args: vec![],
                    ret: Some(s.clone()),
                },
            ],
        ),
        InterfaceDecl::new(
            "org.freedesktop.DBus.Properties",
            vec![
                Member::Method {
                    name: "Get".into(),
                    args: vec![
                        Arg::new("interface_name", s.clone()),
                        Arg::new("property_name", s.clone()),
                    ],
                    ret: Some(TypeHint::Variant),
                },
                Member::Method {
                    name: "Set".into(),
                    args: vec![
                        Arg::new("interface_name", s.clone()),
                        Arg::new("property_name", s.clone()),
                        Arg::new("value", TypeHint::Variant),
                    ],
                    ret: None,
                },
                Member::Method {
                    name: "GetAll".into(),
                    args: vec![Arg::new("interface_name", s.clone())],
                    ret: Some(TypeHint::Dict(
                        Box::new(TypeHint::Str),
                        Box::new(TypeHint::Variant),
                    )),
                },
                Member::Signal {
                    name: "PropertiesChanged".into(),
                    args: vec![
                        Arg::new("interface_name", s.clone()),
                        Arg::new(
                            "changed_properties",
                            TypeHint::Dict(Box::new(TypeHint::Str), Box::new(TypeHint::Variant)),
                        ),
                        Arg::new(
                            "invalidated_properties",
                            TypeHint::Array(Box::new(TypeHint::Str)),
                        ),
                    ],
                },
            ],
        ),
    ]
}

/// All interfaces of a generated object plus its introspection document.
#[derive(Debug, Clone)]
pub struct GeneratedObject {
    pub interfaces: Vec<InterfaceDecl>,
    pub xml: String,
}

/// Generate the introspection document for an object declaration.
///
/// Local members whose names collide with any inherited member are dropped
/// from the local interface. Non-exportable names and duplicate local
/// members fail generation.
pub fn generate_introspection(decl: &ObjectDecl) -> Result<GeneratedObject, WireError> {
    let mut inherited = standard_interfaces();
    for interface in &decl.inherited {
        if !inherited.iter().any(|known| known.name == interface.name) {
            inherited.push(interface.clone());
        }
    }

    let inherited_members: BTreeSet<&str> = inherited
        .iter()
        .flat_map(|interface| interface.members.iter())
        .map(Member::name)
        .collect();

    let mut local = InterfaceDecl::new(decl.interface.name.clone(), Vec::new());
    let mut seen = BTreeSet::new();
    for member in &decl.interface.members {
        let name = member.name();
        if !is_exportable(name) {
            return Err(WireError::NotExportable(name.to_string()));
        }
        if inherited_members.contains(name) {
            continue;
        }
        if !seen.insert(name.to_string()) {
            return Err(WireError::DuplicateMember(name.to_string()));
        }
        // Signatures must render; this rejects malformed container hints in
        // method, property and signal declarations up front.
        validate_member(member)?;
        local.members.push(member.clone());
    }

    let mut interfaces = inherited;
    interfaces.push(local);

    let xml = render_xml(&interfaces)?;
    Ok(GeneratedObject { interfaces, xml })
}

fn validate_member(member: &Member) -> Result<(), WireError> {
    match member {
        Member::Method { args, ret, .. } => {
            for arg in args {
                arg.hint.signature()?;
            }
            if let Some(ret) = ret {
                ret.signature()?;
            }
        }
        Member::Property { hint, .. } => {
            hint.signature()?;
        }
        Member::Signal { args, .. } => {
            for arg in args {
                arg.hint.signature()?;
            }
        }
    }
    Ok(())
}

/// Build the property-name to interface-name map for a set of interfaces.
///
/// A property name must be unique across all interfaces of one object.
pub fn property_mapping(
    interfaces: &[InterfaceDecl],
) -> Result<BTreeMap<String, String>, WireError> {
    let mut mapping = BTreeMap::new();
    for interface in interfaces {
        for member in &interface.members {
            if let Member::Property { name, .. } = member {
                if let Some(first) = mapping.insert(name.clone(), interface.name.clone()) {
                    return Err(WireError::PropertyCollision {
                        property: name.clone(),
                        first,
                        second: interface.name.clone(),
                    });
                }
            }
        }
    }
    Ok(mapping)
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_arg(out: &mut String, arg: &Arg, direction: Option<&str>) -> Result<(), WireError> {
    out.push_str(&format!(
        "    <arg name=\"{}\" type=\"{}\"",
        escape(&arg.name),
        arg.hint.signature()?
    ));
    if let Some(direction) = direction {
        out.push_str(&format!(" direction=\"{direction}\""));
    }
    out.push_str("/>\n");
    Ok(())
}

fn render_xml(interfaces: &[InterfaceDecl]) -> Result<String, WireError> {
    let mut out = String::from("<node>\n");
    for interface in interfaces {
        out.push_str(&format!(
            "  <interface name=\"{}\">\n",
            escape(&interface.name)
        ));
        for member in &interface.members {
            match member {
                Member::Method { name, args, ret } => {
                    out.push_str(&format!("  <method name=\"{}\">\n", escape(name)));
                    for arg in args {
                        render_arg(&mut out, arg, Some("in"))?;
                    }
                    if let Some(ret) = ret {
                        render_arg(
                            &mut out,
                            &Arg::new("return", ret.clone()),
                            Some("out"),
                        )?;
                    }
                    out.push_str("  </method>\n");
                }
                Member::Property { name, hint, access } => {
                    out.push_str(&format!(
                        "  <property name=\"{}\" type=\"{}\" access=\"{}\"/>\n",
                        escape(name),
                        hint.signature()?,
                        access.as_str()
                    ));
                }
                Member::Signal { name, args } => {
                    out.push_str(&format!("  <signal name=\"{}\">\n", escape(name)));
                    for arg in args {
                        render_arg(&mut out, arg, None)?;
                    }
                    out.push_str("  </signal>\n");
                }
            }
        }
        out.push_str("  </interface>\n");
    }
    out.push_str("</node>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str) -> Member {
        Member::Property {
            name: name.into(),
            hint: TypeHint::Str,
            access: Access::Read,
        }
    }

    fn object(members: Vec<Member>, inherited: Vec<InterfaceDecl>) -> ObjectDecl {
        ObjectDecl {
            interface: InterfaceDecl::new("org.example.Sample", members),
            inherited,
        }
    }

    #[test]
    fn exportable_names() {
        assert!(is_exportable("SetRootAccountLocked"));
        assert!(is_exportable("Quit"));
        assert!(!is_exportable("set_locked"));
        assert!(!is_exportable("_Private"));
        assert!(!is_exportable("lowercase"));
        assert!(!is_exportable(""));
    }

    #[test]
    fn generation_rejects_non_exportable_members() {
        let decl = object(
            vec![Member::Method {
                name: "not_exported".into(),
                args: vec![],
                ret: None,
            }],
            vec![],
        );
        assert!(matches!(
            generate_introspection(&decl),
            Err(WireError::NotExportable(_))
        ));
    }

    #[test]
    fn standard_interfaces_are_always_present() {
        let decl = object(vec![property("Hostname")], vec![]);
        let generated = generate_introspection(&decl).expect("generate");
        let names: Vec<&str> = generated
            .interfaces
            .iter()
            .map(|interface| interface.name.as_str())
            .collect();
        assert!(names.contains(&"org.freedesktop.DBus.Introspectable"));
        assert!(names.contains(&"org.freedesktop.DBus.Peer"));
        assert!(names.contains(&"org.freedesktop.DBus.Properties"));
        assert!(names.contains(&"org.example.Sample"));
    }

    #[test]
    fn inherited_members_are_not_redefined() {
        let base = InterfaceDecl::new("org.example.Base", vec![property("Hostname")]);
        let decl = object(vec![property("Hostname"), property("Domain")], vec![base]);
        let generated = generate_introspection(&decl).expect("generate");
        let local = generated
            .interfaces
            .iter()
            .find(|interface| interface.name == "org.example.Sample")
            .expect("local interface");
        let names: Vec<&str> = local.members.iter().map(Member::name).collect();
        assert_eq!(names, vec!["Domain"]);
    }

    #[test]
    fn members_colliding_with_standard_interfaces_are_dropped() {
        let decl = object(
            vec![
                Member::Method {
                    name: "Ping".into(),
                    args: vec![],
                    ret: None,
                },
                property("Hostname"),
            ],
            vec![],
        );
        let generated = generate_introspection(&decl).expect("generate");
        let local = generated
            .interfaces
            .iter()
            .find(|interface| interface.name == "org.example.Sample")
            .expect("local interface");
        assert_eq!(local.members.len(), 1);
        assert_eq!(local.members[0].name(), "Hostname");
    }

    #[test]
    fn duplicate_local_members_fail() {
        let decl = object(vec![property("Hostname"), property("Hostname")], vec![]);
        assert!(matches!(
            generate_introspection(&decl),
            Err(WireError::DuplicateMember(_))
        ));
    }

    #[test]
    fn method_xml_carries_directions() {
        let decl = object(
            vec![Member::Method {
                name: "SetHostname".into(),
                args: vec![Arg::new("hostname", TypeHint::Str)],
                ret: Some(TypeHint::Bool),
            }],
            vec![],
        );
        let generated = generate_introspection(&decl).expect("generate");
        assert!(generated.xml.contains("<method name=\"SetHostname\">"));
        assert!(generated
            .xml
            .contains("<arg name=\"hostname\" type=\"s\" direction=\"in\"/>"));
        assert!(generated
            .xml
            .contains("<arg name=\"return\" type=\"b\" direction=\"out\"/>"));
    }

    #[test]
    fn property_mapping_is_a_function() {
        let generated = generate_introspection(&object(
            vec![property("Hostname"), property("Domain")],
            vec![InterfaceDecl::new(
                "org.example.Base",
                vec![property("Uptime")],
            )],
        ))
        .expect("generate");
        let mapping = property_mapping(&generated.interfaces).expect("mapping");
        assert_eq!(mapping["Hostname"], "org.example.Sample");
        assert_eq!(mapping["Uptime"], "org.example.Base");
    }

    #[test]
    fn property_collision_across_interfaces_fails() {
        let interfaces = vec![
            InterfaceDecl::new("org.example.A", vec![property("Hostname")]),
            InterfaceDecl::new("org.example.B", vec![property("Hostname")]),
        ];
        assert!(matches!(
            property_mapping(&interfaces),
            Err(WireError::PropertyCollision { .. })
        ));
    }
}
