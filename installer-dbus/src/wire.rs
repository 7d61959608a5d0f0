// SPDX-License-Identifier: GPL-3.0-only

//! Wire type tags and tagged variants.
//!
//! Every value crossing the bus carries a type tag. The tag set is closed:
//! thirteen scalars plus the three container shapes. Containers nest, with
//! one restriction inherited from the wire format itself: dictionary keys
//! must be scalar and must not be variants.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown wire type signature: {0}")]
    UnknownSignature(String),

    #[error("dictionary keys must be scalar, got {0}")]
    InvalidDictKey(String),

    #[error("value does not conform to wire type {expected}")]
    TypeMismatch { expected: String },

    #[error("empty tuple is not a valid wire type")]
    EmptyTuple,

    #[error("member name is not exportable: {0}")]
    NotExportable(String),

    #[error("property {property} is declared by both {first} and {second}")]
    PropertyCollision {
        property: String,
        first: String,
        second: String,
    },

    #[error("duplicate member {0} in interface declaration")]
    DuplicateMember(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),
}

/// A wire type tag. `signature` renders the tag in its canonical string
/// form; `parse` accepts the same strings back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Bool,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    Str,
    ObjectPath,
    FileDescriptor,
    Variant,
    Tuple(Vec<TypeHint>),
    Array(Box<TypeHint>),
    Dict(Box<TypeHint>, Box<TypeHint>),
}

impl TypeHint {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Tuple(_) | Self::Array(_) | Self::Dict(..))
    }

    /// Render the canonical signature string for this tag.
    ///
    /// Fails on malformed container shapes: a dictionary keyed by a
    /// container or a variant, or an empty tuple.
    pub fn signature(&self) -> Result<String, WireError> {
        match self {
            Self::Bool => Ok("b".into()),
            Self::Byte => Ok("y".into()),
            Self::Int16 => Ok("n".into()),
            Self::UInt16 => Ok("q".into()),
            Self::Int32 => Ok("i".into()),
            Self::UInt32 => Ok("u".into()),
            Self::Int64 => Ok("x".into()),
            Self::UInt64 => Ok("t".into()),
            Self::Double => Ok("d".into()),
            Self::Str => Ok("s".into()),
            Self::ObjectPath => Ok("o".into()),
            Self::FileDescriptor => Ok("h".into()),
            Self::Variant => Ok("v".into()),
            Self::Tuple(members) => {
                if members.is_empty() {
                    return Err(WireError::EmptyTuple);
                }
                let mut out = String::from("(");
                for member in members {
                    out.push_str(&member.signature()?);
                }
                out.push(')');
                Ok(out)
            }
            Self::Array(element) => Ok(format!("a{}", element.signature()?)),
            Self::Dict(key, value) => {
                if !key.is_scalar() || **key == TypeHint::Variant {
                    return Err(WireError::InvalidDictKey(format!("{key:?}")));
                }
                Ok(format!("a{{{}{}}}", key.signature()?, value.signature()?))
            }
        }
    }

    /// Parse a canonical signature string back into a tag.
    pub fn parse(signature: &str) -> Result<Self, WireError> {
        let mut chars = signature.chars().peekable();
        let hint = Self::parse_one(&mut chars, signature)?;
        if chars.next().is_some() {
            return Err(WireError::UnknownSignature(signature.to_string()));
        }
        Ok(hint)
    }

    fn parse_one(
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        full: &str,
    ) -> Result<Self, WireError> {
        let unknown = || WireError::UnknownSignature(full.to_string());
        match chars.next().ok_or_else(unknown)? {
            'b' => Ok(Self::Bool),
            'y' => Ok(Self::Byte),
            'n' => Ok(Self::Int16),
            'q' => Ok(Self::UInt16),
            'i' => Ok(Self::Int32),
            'u' => Ok(Self::UInt32),
            'x' => Ok(Self::Int64),
            't' => Ok(Self::UInt64),
            'd' => Ok(Self::Double),
            's' => Ok(Self::Str),
            'o' => Ok(Self::ObjectPath),
            'h' => Ok(Self::FileDescriptor),
            'v' => Ok(Self::Variant),
            '(' => {
                let mut members = Vec::new();
                loop {
                    if chars.peek() == Some(&')') {
                        chars.next();
                        break;
                    }
                    if chars.peek().is_none() {
                        return Err(unknown());
                    }
                    members.push(Self::parse_one(chars, full)?);
                }
                if members.is_empty() {
                    return Err(WireError::EmptyTuple);
                }
                Ok(Self::Tuple(members))
            }
            'a' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let key = Self::parse_one(chars, full)?;
                    let value = Self::parse_one(chars, full)?;
                    if chars.next() != Some('}') {
                        return Err(unknown());
                    }
                    if !key.is_scalar() || key == TypeHint::Variant {
                        return Err(WireError::InvalidDictKey(format!("{key:?}")));
                    }
                    Ok(Self::Dict(Box::new(key), Box::new(value)))
                } else {
                    Ok(Self::Array(Box::new(Self::parse_one(chars, full)?)))
                }
            }
            _ => Err(unknown()),
        }
    }
}

/// An untagged wire value. Pairing one with a [`TypeHint`] produces a
/// [`TaggedVariant`].
#[derive(Debug, Clone, PartialEq)]
pub enum WireData {
    Bool(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    ObjectPath(String),
    Variant(Box<TaggedVariant>),
    Tuple(Vec<WireData>),
    Array(Vec<WireData>),
    Dict(BTreeMap<String, WireData>),
}

impl WireData {
    /// Whether this value conforms to the given tag.
    pub fn conforms(&self, hint: &TypeHint) -> bool {
        match (self, hint) {
            (Self::Bool(_), TypeHint::Bool) => true,
            (Self::Byte(_), TypeHint::Byte) => true,
            (Self::Int16(_), TypeHint::Int16) => true,
            (Self::UInt16(_), TypeHint::UInt16) => true,
            (Self::Int32(_), TypeHint::Int32) => true,
            (Self::UInt32(_), TypeHint::UInt32) => true,
            (Self::Int64(_), TypeHint::Int64) => true,
            (Self::UInt64(_), TypeHint::UInt64) => true,
            (Self::Double(_), TypeHint::Double) => true,
            (Self::Str(_), TypeHint::Str) => true,
            (Self::ObjectPath(_), TypeHint::ObjectPath) => true,
            (Self::Variant(inner), TypeHint::Variant) => inner.is_valid(),
            (Self::Tuple(values), TypeHint::Tuple(members)) => {
                values.len() == members.len()
                    && values
                        .iter()
                        .zip(members.iter())
                        .all(|(value, member)| value.conforms(member))
            }
            (Self::Array(values), TypeHint::Array(element)) => {
                values.iter().all(|value| value.conforms(element))
            }
            // Dictionaries are carried with string keys; the tag decides how
            // the key is rendered on the wire.
            (Self::Dict(entries), TypeHint::Dict(key, value)) => {
                key.is_scalar()
                    && **key != TypeHint::Variant
                    && entries.values().all(|entry| entry.conforms(value))
            }
            _ => false,
        }
    }
}

/// A value carrying its wire type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedVariant {
    hint: TypeHint,
    data: WireData,
}

impl TaggedVariant {
    /// Pair a value with a tag, verifying conformance.
    pub fn new(hint: TypeHint, data: WireData) -> Result<Self, WireError> {
        if !data.conforms(&hint) {
            return Err(WireError::TypeMismatch {
                expected: hint.signature().unwrap_or_else(|_| format!("{hint:?}")),
            });
        }
        Ok(Self { hint, data })
    }

    /// Internal constructor for values produced by conversions that are
    /// conforming by construction.
    pub(crate) fn trusted(hint: TypeHint, data: WireData) -> Self {
        Self { hint, data }
    }

    pub fn hint(&self) -> &TypeHint {
        &self.hint
    }

    pub fn data(&self) -> &WireData {
        &self.data
    }

    /// Unpack into the contained value and its tag.
    pub fn into_parts(self) -> (WireData, TypeHint) {
        (self.data, self.hint)
    }

    fn is_valid(&self) -> bool {
        self.data.conforms(&self.hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(hint: TypeHint) -> String {
        hint.signature().expect("signature")
    }

    #[test]
    fn scalar_signatures_match_the_table() {
        let table = [
            (TypeHint::Bool, "b"),
            (TypeHint::Byte, "y"),
            (TypeHint::Int16, "n"),
            (TypeHint::UInt16, "q"),
            (TypeHint::Int32, "i"),
            (TypeHint::UInt32, "u"),
            (TypeHint::Int64, "x"),
            (TypeHint::UInt64, "t"),
            (TypeHint::Double, "d"),
            (TypeHint::Str, "s"),
            (TypeHint::ObjectPath, "o"),
            (TypeHint::FileDescriptor, "h"),
            (TypeHint::Variant, "v"),
        ];
        for (hint, expected) in table {
            assert_eq!(sig(hint), expected);
        }
    }

    #[test]
    fn container_signatures_recurse() {
        assert_eq!(
            sig(TypeHint::Tuple(vec![TypeHint::Int32, TypeHint::Bool])),
            "(ib)"
        );
        assert_eq!(sig(TypeHint::Array(Box::new(TypeHint::Str))), "as");
        assert_eq!(
            sig(TypeHint::Array(Box::new(TypeHint::Array(Box::new(
                TypeHint::UInt64
            ))))),
            "aat"
        );
        assert_eq!(
            sig(TypeHint::Dict(
                Box::new(TypeHint::Str),
                Box::new(TypeHint::Variant)
            )),
            "a{sv}"
        );
    }

    #[test]
    fn dict_keyed_by_container_fails() {
        let hint = TypeHint::Dict(
            Box::new(TypeHint::Array(Box::new(TypeHint::Bool))),
            Box::new(TypeHint::Bool),
        );
        assert!(matches!(
            hint.signature(),
            Err(WireError::InvalidDictKey(_))
        ));
    }

    #[test]
    fn dict_keyed_by_variant_fails() {
        let hint = TypeHint::Dict(Box::new(TypeHint::Variant), Box::new(TypeHint::Int32));
        assert!(matches!(
            hint.signature(),
            Err(WireError::InvalidDictKey(_))
        ));
    }

    #[test]
    fn parse_round_trips() {
        for signature in ["b", "as", "a{sv}", "(ib)", "aa{ss}", "a(so)", "v"] {
            let hint = TypeHint::parse(signature).expect(signature);
            assert_eq!(hint.signature().expect(signature), signature);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        for signature in ["z", "a", "(", "(i", "a{asv}", "a{vv}", "()", "ii"] {
            assert!(TypeHint::parse(signature).is_err(), "{signature}");
        }
    }

    #[test]
    fn variant_pairs_value_with_tag() {
        let variant = TaggedVariant::new(TypeHint::UInt32, WireData::UInt32(7)).expect("variant");
        let (data, hint) = variant.into_parts();
        assert_eq!(data, WireData::UInt32(7));
        assert_eq!(hint, TypeHint::UInt32);
    }

    #[test]
    fn variant_rejects_mismatched_tag() {
        assert!(TaggedVariant::new(TypeHint::UInt32, WireData::Str("x".into())).is_err());
    }

    #[test]
    fn nested_array_conformance() {
        let data = WireData::Array(vec![WireData::Str("a".into()), WireData::UInt32(1)]);
        assert!(!data.conforms(&TypeHint::Array(Box::new(TypeHint::Str))));

        let data = WireData::Array(vec![]);
        assert!(data.conforms(&TypeHint::Array(Box::new(TypeHint::Str))));
    }
}
