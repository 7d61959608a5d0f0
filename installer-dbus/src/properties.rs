// SPDX-License-Identifier: GPL-3.0-only

//! Property-change cache with batched flush semantics.
//!
//! Each publishable object holds a cache of changed property names. A flush
//! drains the cache and produces at most one batch per affected interface,
//! carrying the current value of every changed property.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::wire::{TaggedVariant, WireError};

/// One emission of the standard properties-changed signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesChangedBatch {
    pub interface: String,
    pub changed: BTreeMap<String, TaggedVariant>,
    pub invalidated: Vec<String>,
}

/// Supplies the current value of a property at flush time.
pub trait PropertySource {
    fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError>;
}

impl<F> PropertySource for F
where
    F: Fn(&str) -> Result<TaggedVariant, WireError>,
{
    fn property_value(&self, name: &str) -> Result<TaggedVariant, WireError> {
        self(name)
    }
}

#[derive(Debug, Default)]
pub struct PropertyChangeCache {
    mapping: BTreeMap<String, String>,
    changed: BTreeSet<String>,
}

impl PropertyChangeCache {
    /// Build a cache over a property-name to interface-name map.
    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self {
            mapping,
            changed: BTreeSet::new(),
        }
    }

    /// Record a property as changed. Unknown names are a programming error
    /// surfaced to the caller.
    pub fn report_changed(&mut self, name: &str) -> Result<(), WireError> {
        if !self.mapping.contains_key(name) {
            return Err(WireError::UnknownProperty(name.to_string()));
        }
        self.changed.insert(name.to_string());
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Drain the cache. Changed properties are grouped per interface; each
    /// affected interface yields exactly one batch, in interface-name order.
    pub fn flush(
        &mut self,
        source: &dyn PropertySource,
    ) -> Result<Vec<PropertiesChangedBatch>, WireError> {
        let changed = std::mem::take(&mut self.changed);
        let mut per_interface: BTreeMap<String, BTreeMap<String, TaggedVariant>> = BTreeMap::new();
        for name in changed {
            let interface = self
                .mapping
                .get(&name)
                .ok_or_else(|| WireError::UnknownProperty(name.clone()))?;
            per_interface
                .entry(interface.clone())
                .or_default()
                .insert(name.clone(), source.property_value(&name)?);
        }
        Ok(per_interface
            .into_iter()
            .map(|(interface, changed)| PropertiesChangedBatch {
                interface,
                changed,
                invalidated: Vec::new(),
            })
            .collect())
    }
}

/// A callback that reports a fixed property as changed whenever invoked,
/// regardless of its arguments. Bridges underlying-model change signals to
/// the bus cache.
pub fn changed_reporter(
    cache: Arc<Mutex<PropertyChangeCache>>,
    property: impl Into<String>,
) -> impl Fn() {
    let property = property.into();
    move || {
        let mut cache = cache.lock().expect("property cache lock");
        if let Err(error) = cache.report_changed(&property) {
            tracing::warn!("dropping change report for {property}: {error}");
        }
    }
}
