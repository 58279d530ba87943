//! Change set accumulation.

use std::collections::BTreeMap;

use crate::properties::Property;
use crate::types::{DesiredResource, DesiredValue, DeviceDefaults, PropertyValue, ResourceRecord};

/// Properties whose desired value differs from the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: BTreeMap<Property, PropertyValue>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pending value.
    pub fn insert(&mut self, property: Property, value: PropertyValue) {
        self.changes.insert(property, value);
    }

    /// Returns the pending value of a property.
    pub fn get(&self, property: Property) -> Option<&PropertyValue> {
        self.changes.get(&property)
    }

    /// Returns true if the property has a pending value.
    pub fn contains(&self, property: Property) -> bool {
        self.changes.contains_key(&property)
    }

    /// Returns true if nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of pending values.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates pending values in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, &PropertyValue)> {
        self.changes.iter().map(|(p, v)| (*p, v))
    }
}

/// Resolves a desired value, replacing the default sentinel with the
/// property's intrinsic or device-computed default.
pub fn resolve(property: Property, value: &DesiredValue, defaults: &DeviceDefaults) -> PropertyValue {
    match value {
        DesiredValue::Value(v) => v.clone(),
        DesiredValue::Default => property.spec().default.resolve(defaults),
    }
}

/// Computes the changes needed to move `current` to `desired`.
///
/// With no current record every desired property is included, so a new
/// instance is fully initialized. Properties the desired resource does not
/// mention are never included.
pub fn diff(
    desired: &DesiredResource,
    current: Option<&ResourceRecord>,
    defaults: &DeviceDefaults,
) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (&property, value) in &desired.properties {
        let target = resolve(property, value, defaults);
        match current.and_then(|record| record.get(property)) {
            Some(existing) if *existing == target => {}
            _ => changes.insert(property, target),
        }
    }

    changes
}
