// SPDX-License-Identifier: GPL-3.0-only

//! Self-describing structure records.
//!
//! A structure is a named record whose fields each carry a wire type and a
//! hyphenated on-wire name. Conversion to and from a string-to-variant map
//! is total: every field must be present on decode, and unknown input keys
//! are rejected.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::wire::{TaggedVariant, TypeHint, WireData, WireError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("missing field {0} in structure input")]
    MissingField(String),

    #[error("unknown field {0} in structure input")]
    UnknownField(String),

    #[error("field {field}: {source}")]
    BadField {
        field: String,
        #[source]
        source: WireError,
    },
}

/// On-wire map form of a structure.
pub type StructureMap = BTreeMap<String, TaggedVariant>;

/// Descriptor for one structure field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Hyphenated on-wire name.
    pub name: &'static str,
    /// Wire type of the field.
    pub hint: TypeHint,
}

/// A record convertible to and from its on-wire map form.
pub trait DbusStructure: Sized {
    fn field_specs() -> Vec<FieldSpec>;

    fn to_structure(&self) -> StructureMap;

    fn from_structure(map: StructureMap) -> Result<Self, StructureError>;

    /// Element-wise list conversion.
    fn to_structure_list(items: &[Self]) -> Vec<StructureMap> {
        items.iter().map(Self::to_structure).collect()
    }

    /// Element-wise list decoding; fails on the first bad element.
    fn from_structure_list(maps: Vec<StructureMap>) -> Result<Vec<Self>, StructureError> {
        maps.into_iter().map(Self::from_structure).collect()
    }

    /// Key-preserving conversion of a dictionary of structures.
    fn to_structure_dict(items: &BTreeMap<String, Self>) -> BTreeMap<String, StructureMap> {
        items
            .iter()
            .map(|(key, value)| (key.clone(), value.to_structure()))
            .collect()
    }

    fn from_structure_dict(
        maps: BTreeMap<String, StructureMap>,
    ) -> Result<BTreeMap<String, Self>, StructureError> {
        maps.into_iter()
            .map(|(key, value)| Ok((key, Self::from_structure(value)?)))
            .collect()
    }
}

/// A field value convertible to and from untagged wire data.
pub trait WireConvert: Sized {
    fn hint() -> TypeHint;

    fn to_wire(&self) -> WireData;

    fn from_wire(data: WireData) -> Result<Self, WireError>;
}

/// Tag a convertible value with its wire type.
pub fn tagged<T: WireConvert>(value: &T) -> TaggedVariant {
    TaggedVariant::trusted(T::hint(), value.to_wire())
}

fn mismatch<T: WireConvert>() -> WireError {
    WireError::TypeMismatch {
        expected: T::hint()
            .signature()
            .unwrap_or_else(|_| "<invalid>".into()),
    }
}

macro_rules! scalar_convert {
    ($($rust:ty => $hint:ident / $data:ident),+ $(,)?) => {
        $(
            impl WireConvert for $rust {
                fn hint() -> TypeHint {
                    TypeHint::$hint
                }

                fn to_wire(&self) -> WireData {
                    WireData::$data(self.clone())
                }

                fn from_wire(data: WireData) -> Result<Self, WireError> {
                    match data {
                        WireData::$data(value) => Ok(value),
                        _ => Err(mismatch::<$rust>()),
                    }
                }
            }
        )+
    };
}

scalar_convert! {
    bool => Bool / Bool,
    u8 => Byte / Byte,
    i16 => Int16 / Int16,
    u16 => UInt16 / UInt16,
    i32 => Int32 / Int32,
    u32 => UInt32 / UInt32,
    i64 => Int64 / Int64,
    u64 => UInt64 / UInt64,
    f64 => Double / Double,
    String => Str / Str,
}

impl<T: WireConvert> WireConvert for Vec<T> {
    fn hint() -> TypeHint {
        TypeHint::Array(Box::new(T::hint()))
    }

    fn to_wire(&self) -> WireData {
        WireData::Array(self.iter().map(WireConvert::to_wire).collect())
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Array(values) => values.into_iter().map(T::from_wire).collect(),
            _ => Err(mismatch::<Vec<T>>()),
        }
    }
}

impl<T: WireConvert> WireConvert for BTreeMap<String, T> {
    fn hint() -> TypeHint {
        TypeHint::Dict(Box::new(TypeHint::Str), Box::new(T::hint()))
    }

    fn to_wire(&self) -> WireData {
        WireData::Dict(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_wire()))
                .collect(),
        )
    }

    fn from_wire(data: WireData) -> Result<Self, WireError> {
        match data {
            WireData::Dict(entries) => entries
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_wire(value)?)))
                .collect(),
            _ => Err(mismatch::<BTreeMap<String, T>>()),
        }
    }
}

/// Implement [`DbusStructure`] from a field table.
///
/// ```ignore
/// structure_fields! {
///     impl SshKeyData {
///         "username" => username: String,
///         "key" => key: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! structure_fields {
    (impl $ty:ty { $($wire:literal => $field:ident : $ftype:ty),+ $(,)? }) => {
        impl $crate::structure::DbusStructure for $ty {
            fn field_specs() -> Vec<$crate::structure::FieldSpec> {
                vec![
                    $(
                        $crate::structure::FieldSpec {
                            name: $wire,
                            hint: <$ftype as $crate::structure::WireConvert>::hint(),
                        },
                    )+
                ]
            }

            fn to_structure(&self) -> $crate::structure::StructureMap {
                let mut map = $crate::structure::StructureMap::new();
                $(
                    map.insert(
                        $wire.to_string(),
                        $crate::structure::tagged::<$ftype>(&self.$field),
                    );
                )+
                map
            }

            fn from_structure(
                mut map: $crate::structure::StructureMap,
            ) -> Result<Self, $crate::structure::StructureError> {
                $(
                    let $field = {
                        let variant = map.remove($wire).ok_or_else(|| {
                            $crate::structure::StructureError::MissingField($wire.to_string())
                        })?;
                        let (data, _hint) = variant.into_parts();
                        <$ftype as $crate::structure::WireConvert>::from_wire(data).map_err(
                            |source| $crate::structure::StructureError::BadField {
                                field: $wire.to_string(),
                                source,
                            },
                        )?
                    };
                )+
                if let Some(extra) = map.keys().next() {
                    return Err($crate::structure::StructureError::UnknownField(
                        extra.clone(),
                    ));
                }
                Ok(Self { $($field),+ })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    struct Sample {
        first_name: String,
        count: u32,
        tags: Vec<String>,
    }

    structure_fields! {
        impl Sample {
            "first-name" => first_name: String,
            "count" => count: u32,
            "tags" => tags: Vec<String>,
        }
    }

    fn sample() -> Sample {
        Sample {
            first_name: "ada".into(),
            count: 3,
            tags: vec!["wheel".into(), "users".into()],
        }
    }

    #[test]
    fn specs_use_hyphenated_names() {
        let specs = Sample::field_specs();
        assert_eq!(specs[0].name, "first-name");
        assert_eq!(specs[0].hint, TypeHint::Str);
        assert_eq!(specs[2].hint, TypeHint::Array(Box::new(TypeHint::Str)));
    }

    #[test]
    fn round_trip_preserves_equality() {
        let original = sample();
        let map = original.to_structure();
        let decoded = Sample::from_structure(map).expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut map = sample().to_structure();
        map.remove("count");
        assert_eq!(
            Sample::from_structure(map),
            Err(StructureError::MissingField("count".into()))
        );
    }

    #[test]
    fn unknown_field_is_an_error() {
        let mut map = sample().to_structure();
        map.insert("surprise".into(), tagged(&true));
        assert_eq!(
            Sample::from_structure(map),
            Err(StructureError::UnknownField("surprise".into()))
        );
    }

    #[test]
    fn list_conversion_is_element_wise() {
        let items = vec![sample(), Sample::default()];
        let maps = Sample::to_structure_list(&items);
        assert_eq!(maps.len(), 2);
        let decoded = Sample::from_structure_list(maps).expect("decode list");
        assert_eq!(decoded, items);
    }

    #[test]
    fn dict_conversion_preserves_keys() {
        let mut dict = BTreeMap::new();
        dict.insert("a".to_string(), sample());
        dict.insert("b".to_string(), Sample::default());
        let maps = Sample::to_structure_dict(&dict);
        assert_eq!(maps.len(), 2);
        let decoded = Sample::from_structure_dict(maps).expect("decode dict");
        assert_eq!(decoded, dict);
    }

    #[test]
    fn wrong_field_type_is_an_error() {
        let mut map = sample().to_structure();
        map.insert(
            "count".into(),
            TaggedVariant::new(TypeHint::Str, WireData::Str("seven".into())).expect("variant"),
        );
        assert!(matches!(
            Sample::from_structure(map),
            Err(StructureError::BadField { field, .. }) if field == "count"
        ));
    }
}
