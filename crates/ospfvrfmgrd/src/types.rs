//! Type definitions for ospfvrfmgrd

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult, Ensure, FieldValues};

use crate::properties::Property;

/// VRF name that can only be removed together with its OSPF process.
pub const PROTECTED_VRF: &str = "default";

/// Identity of an OSPF VRF instance: `(process_id, vrf)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// OSPF process (router) name
    pub process_id: String,
    /// VRF name
    pub vrf: String,
}

impl ResourceKey {
    /// Create a new ResourceKey
    pub fn new(process_id: impl Into<String>, vrf: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            vrf: vrf.into(),
        }
    }

    /// Returns true for the protected `default` VRF.
    pub fn is_protected(&self) -> bool {
        self.vrf == PROTECTED_VRF
    }
}

/// Resource title, `"<process_id> <vrf>"`.
impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.process_id, self.vrf)
    }
}

/// Concrete property value as read from or written to the device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(u32),
    Text(String),
}

impl PropertyValue {
    /// Returns the integer value, if this is a number.
    pub fn as_number(&self) -> Option<u32> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Desired value of a property: a concrete value or the device default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredValue {
    Value(PropertyValue),
    Default,
}

impl From<PropertyValue> for DesiredValue {
    fn from(value: PropertyValue) -> Self {
        DesiredValue::Value(value)
    }
}

impl From<u32> for DesiredValue {
    fn from(value: u32) -> Self {
        DesiredValue::Value(value.into())
    }
}

impl From<&str> for DesiredValue {
    fn from(value: &str) -> Self {
        DesiredValue::Value(value.into())
    }
}

impl From<String> for DesiredValue {
    fn from(value: String) -> Self {
        DesiredValue::Value(value.into())
    }
}

impl fmt::Display for DesiredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredValue::Value(v) => v.fmt(f),
            DesiredValue::Default => f.write_str("default"),
        }
    }
}

/// Defaults the device computes per instance, in canonical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefaults {
    /// Default reference bandwidth, in Mbps.
    pub auto_cost: u32,
}

/// Declared desired state of one OSPF VRF instance.
///
/// Only properties present in `properties` are managed; everything else on
/// the device is left as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredResource {
    pub key: ResourceKey,
    pub ensure: Ensure,
    pub properties: BTreeMap<Property, DesiredValue>,
}

impl DesiredResource {
    /// Create a desired resource that should be present.
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            ensure: Ensure::Present,
            properties: BTreeMap::new(),
        }
    }

    /// Create a desired resource that should be absent.
    pub fn absent(key: ResourceKey) -> Self {
        Self {
            key,
            ensure: Ensure::Absent,
            properties: BTreeMap::new(),
        }
    }

    /// Set the desired value of a property.
    pub fn with(mut self, property: Property, value: impl Into<DesiredValue>) -> Self {
        self.properties.insert(property, value.into());
        self
    }

    /// Request the device default for a property.
    pub fn with_default(mut self, property: Property) -> Self {
        self.properties.insert(property, DesiredValue::Default);
        self
    }

    /// Returns the desired value of a property, if managed.
    pub fn get(&self, property: Property) -> Option<&DesiredValue> {
        self.properties.get(&property)
    }

    /// Checks every concrete desired value against its property domain.
    pub fn validate(&self) -> CfgMgrResult<()> {
        if self.key.process_id.is_empty() || self.key.vrf.is_empty() {
            return Err(CfgMgrError::invalid_config(
                "name",
                format!("incomplete identity '{}'", self.key),
            ));
        }
        for (property, value) in &self.properties {
            if let DesiredValue::Value(v) = value {
                property.spec().domain.validate(*property, v)?;
            }
        }
        Ok(())
    }
}

/// Current state of one OSPF VRF instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub key: ResourceKey,
    pub ensure: Ensure,
    pub properties: BTreeMap<Property, PropertyValue>,
    pub defaults: DeviceDefaults,
}

impl ResourceRecord {
    /// Create a record for an instance present on the device.
    pub fn present(
        key: ResourceKey,
        properties: BTreeMap<Property, PropertyValue>,
        defaults: DeviceDefaults,
    ) -> Self {
        Self {
            key,
            ensure: Ensure::Present,
            properties,
            defaults,
        }
    }

    /// Create a record for an instance missing from the device.
    pub fn absent(key: ResourceKey) -> Self {
        Self {
            key,
            ensure: Ensure::Absent,
            properties: BTreeMap::new(),
            defaults: DeviceDefaults::default(),
        }
    }

    /// Returns the current value of a property.
    pub fn get(&self, property: Property) -> Option<&PropertyValue> {
        self.properties.get(&property)
    }

    /// Returns the record as field-value pairs in table order.
    pub fn field_values(&self) -> FieldValues {
        let mut fvs = vec![
            ("ospf".to_string(), self.key.process_id.clone()),
            ("vrf".to_string(), self.key.vrf.clone()),
            ("ensure".to_string(), self.ensure.to_string()),
        ];
        fvs.extend(
            self.properties
                .iter()
                .map(|(property, value)| (property.name().to_string(), value.to_string())),
        );
        fvs
    }
}

/// Lifecycle state of a managed resource within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Not present on the device.
    Absent,
    /// Present and converged (or not yet diffed).
    PresentClean,
    /// Present with pending mutations not yet fully applied.
    PresentDirty,
    /// Removed from the device in this pass.
    Destroyed,
}

impl ResourceState {
    /// Returns the state name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceState::Absent => "absent",
            ResourceState::PresentClean => "present-clean",
            ResourceState::PresentDirty => "present-dirty",
            ResourceState::Destroyed => "destroyed",
        }
    }
}
