// SPDX-License-Identifier: GPL-3.0-only

//! The property bridge: every module handler owns one.
//!
//! Mutators report changed properties into the cache; the flush after each
//! mutator batches them per interface and hands them to the forwarder task,
//! which emits the standard PropertiesChanged signal on the bus.

use std::collections::HashMap;

use installer_dbus::properties::{PropertiesChangedBatch, PropertyChangeCache, PropertySource};
use installer_dbus::wire::WireData;
use installer_dbus::{ObjectDecl, generate_introspection, property_mapping};
use tokio::sync::mpsc;
use zbus::zvariant::{OwnedValue, Value};

/// Convert a wire value into a zvariant value for live emission.
pub fn to_owned_value(data: &WireData) -> zbus::Result<OwnedValue> {
    let value: Value<'static> = match data {
        WireData::Bool(value) => Value::from(*value),
        WireData::Byte(value) => Value::from(*value),
        WireData::Int16(value) => Value::from(*value),
        WireData::UInt16(value) => Value::from(*value),
        WireData::Int32(value) => Value::from(*value),
        WireData::UInt32(value) => Value::from(*value),
        WireData::Int64(value) => Value::from(*value),
        WireData::UInt64(value) => Value::from(*value),
        WireData::Double(value) => Value::from(*value),
        WireData::Str(value) => Value::from(value.clone()),
        WireData::Array(items)
            if items
                .iter()
                .all(|item| matches!(item, WireData::Str(_))) =>
        {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    WireData::Str(value) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            Value::from(strings)
        }
        // Structured payloads travel as JSON strings, the same shape the
        // property getters expose.
        other => Value::from(format!("{other:?}")),
    };
    value
        .try_to_owned()
        .map_err(|error| zbus::Error::Failure(error.to_string()))
}

/// One module's property-change side: cache plus batch channel.
pub struct PropertyBridge {
    cache: PropertyChangeCache,
    sender: mpsc::UnboundedSender<PropertiesChangedBatch>,
}

impl PropertyBridge {
    /// Build the bridge from the module's object declaration. The
    /// declaration also validates the module's introspection rules at
    /// startup.
    pub fn new(
        decl: &ObjectDecl,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<PropertiesChangedBatch>)> {
        let generated = generate_introspection(decl)?;
        let mapping = property_mapping(&generated.interfaces)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok((
            Self {
                cache: PropertyChangeCache::new(mapping),
                sender,
            },
            receiver,
        ))
    }

    /// Record a changed property. A name missing from the declaration is a
    /// programming error worth a loud log, not a crash.
    pub fn report(&mut self, name: &str) {
        if let Err(error) = self.cache.report_changed(name) {
            tracing::error!("cannot report property change: {error}");
        }
    }

    /// Drain the cache into batches and hand them to the forwarder.
    pub fn flush_with(&mut self, source: &dyn PropertySource) {
        match self.cache.flush(source) {
            Ok(batches) => {
                for batch in batches {
                    // A dropped receiver just means nobody forwards anymore.
                    let _ = self.sender.send(batch);
                }
            }
            Err(error) => tracing::error!("property flush failed: {error}"),
        }
    }
}

/// Forward flushed batches as PropertiesChanged signals at the given path.
pub fn spawn_properties_forwarder(
    connection: zbus::Connection,
    path: &'static str,
    mut receiver: mpsc::UnboundedReceiver<PropertiesChangedBatch>,
) {
    tokio::spawn(async move {
        while let Some(batch) = receiver.recv().await {
            let mut changed: HashMap<String, OwnedValue> = HashMap::new();
            for (name, variant) in &batch.changed {
                match to_owned_value(variant.data()) {
                    Ok(value) => {
                        changed.insert(name.clone(), value);
                    }
                    Err(error) => {
                        tracing::error!("cannot marshal property {name}: {error}");
                    }
                }
            }
            let body = (batch.interface.clone(), changed, batch.invalidated.clone());
            if let Err(error) = connection
                .emit_signal(
                    None::<zbus::names::BusName<'_>>,
                    path,
                    "org.freedesktop.DBus.Properties",
                    "PropertiesChanged",
                    &body,
                )
                .await
            {
                tracing::error!("cannot emit PropertiesChanged at {path}: {error}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_dbus::wire::TypeHint;
    use installer_dbus::{Access, InterfaceDecl, Member};

    fn decl() -> ObjectDecl {
        ObjectDecl {
            interface: InterfaceDecl::new(
                "org.fedoraproject.Anaconda.Modules.Sample",
                vec![Member::Property {
                    name: "Hostname".into(),
                    hint: TypeHint::Str,
                    access: Access::Read,
                }],
            ),
            inherited: vec![],
        }
    }

    #[test]
    fn bridge_batches_into_the_channel() {
        let (mut bridge, mut receiver) = PropertyBridge::new(&decl()).expect("bridge");
        bridge.report("Hostname");
        bridge.flush_with(&|_: &str| Ok(installer_dbus::tagged(&"box".to_string())));

        let batch = receiver.try_recv().expect("batch");
        assert_eq!(batch.interface, "org.fedoraproject.Anaconda.Modules.Sample");
        assert_eq!(batch.changed.len(), 1);
    }

    #[test]
    fn scalar_values_marshal() {
        assert!(to_owned_value(&WireData::Bool(true)).is_ok());
        assert!(to_owned_value(&WireData::UInt32(7)).is_ok());
        assert!(
            to_owned_value(&WireData::Array(vec![WireData::Str("a".into())])).is_ok()
        );
    }
}
