//! In-memory device backend.
//!
//! `MemoryDevice` implements [`OspfVrfDevice`] over a list of instances. It
//! backs the daemon's offline mode (state loaded from and saved to a JSON
//! file) and the test suites, which inspect its call log and inject failures.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};
use tracing::debug;

use crate::device::{DeviceInstance, OspfVrfDevice, RawCost};
use crate::properties::{Property, PropertyGroup};
use crate::types::{DeviceDefaults, PropertyValue, ResourceKey};
use crate::units::CostUnit;

/// Default reference bandwidth of a new instance (40 Gbps).
pub const DEFAULT_COST_VALUE: u32 = 40;

/// Unit of [`DEFAULT_COST_VALUE`].
pub const DEFAULT_COST_UNIT: CostUnit = CostUnit::Gbps;

/// One OSPF VRF instance held by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInstance {
    pub process_id: String,
    pub vrf: String,
    /// Explicitly configured properties; unset ones read back as defaults.
    #[serde(default)]
    pub properties: BTreeMap<Property, PropertyValue>,
    pub cost: RawCost,
    pub default_cost: RawCost,
}

impl MemoryInstance {
    /// Create an instance with every property at its default.
    pub fn new(key: &ResourceKey) -> Self {
        let default_cost = RawCost::new(DEFAULT_COST_VALUE, DEFAULT_COST_UNIT.as_str());
        Self {
            process_id: key.process_id.clone(),
            vrf: key.vrf.clone(),
            properties: BTreeMap::new(),
            cost: default_cost.clone(),
            default_cost,
        }
    }

    /// Set a plain property.
    pub fn with_property(mut self, property: Property, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(property, value.into());
        self
    }

    /// Set the configured reference bandwidth.
    pub fn with_cost(mut self, value: u32, unit: impl Into<String>) -> Self {
        self.cost = RawCost::new(value, unit);
        self
    }

    /// Set the built-in default reference bandwidth.
    pub fn with_default_cost(mut self, value: u32, unit: impl Into<String>) -> Self {
        self.default_cost = RawCost::new(value, unit);
        self
    }

    /// Returns the identity of this instance.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.process_id.clone(), self.vrf.clone())
    }

    /// Returns the effective value of a plain property.
    pub fn effective(&self, property: Property) -> PropertyValue {
        self.properties
            .get(&property)
            .cloned()
            .unwrap_or_else(|| property.spec().default.resolve(&DeviceDefaults::default()))
    }

    fn matches(&self, key: &ResourceKey) -> bool {
        self.process_id == key.process_id && self.vrf == key.vrf
    }
}

/// A call received by the device, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Enumerate,
    ReadProperty {
        key: ResourceKey,
        property: Property,
    },
    ReadCost {
        key: ResourceKey,
    },
    ReadDefaultCost {
        key: ResourceKey,
    },
    WriteProperty {
        key: ResourceKey,
        property: Property,
        value: PropertyValue,
    },
    WriteCost {
        key: ResourceKey,
        value: u32,
        unit: CostUnit,
    },
    WriteGroupedTimers {
        key: ResourceKey,
        group: PropertyGroup,
        values: [u32; 3],
    },
    CreateInstance {
        key: ResourceKey,
    },
    DestroyInstance {
        key: ResourceKey,
    },
}

impl DeviceCall {
    /// Returns true for calls that change device state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DeviceCall::WriteProperty { .. }
                | DeviceCall::WriteCost { .. }
                | DeviceCall::WriteGroupedTimers { .. }
                | DeviceCall::CreateInstance { .. }
                | DeviceCall::DestroyInstance { .. }
        )
    }

    /// Returns the instance the call targets, if any.
    pub fn key(&self) -> Option<&ResourceKey> {
        match self {
            DeviceCall::Enumerate => None,
            DeviceCall::ReadProperty { key, .. }
            | DeviceCall::ReadCost { key }
            | DeviceCall::ReadDefaultCost { key }
            | DeviceCall::WriteProperty { key, .. }
            | DeviceCall::WriteCost { key, .. }
            | DeviceCall::WriteGroupedTimers { key, .. }
            | DeviceCall::CreateInstance { key }
            | DeviceCall::DestroyInstance { key } => Some(key),
        }
    }
}

/// In-memory OSPF VRF device.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryDevice {
    #[serde(default)]
    instances: Vec<MemoryInstance>,

    #[serde(skip)]
    calls: Mutex<Vec<DeviceCall>>,

    #[serde(skip)]
    read_failures: BTreeSet<ResourceKey>,

    #[serde(skip)]
    write_failures: BTreeSet<ResourceKey>,
}

impl MemoryDevice {
    /// Create an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance.
    pub fn with_instance(mut self, instance: MemoryInstance) -> Self {
        self.insert_instance(instance);
        self
    }

    /// Make every read of the given instance fail.
    pub fn fail_reads_for(mut self, key: ResourceKey) -> Self {
        self.read_failures.insert(key);
        self
    }

    /// Make every write, create or destroy of the given instance fail.
    pub fn fail_writes_for(mut self, key: ResourceKey) -> Self {
        self.write_failures.insert(key);
        self
    }

    /// Stop injecting write failures for the given instance.
    pub fn clear_write_failure(&mut self, key: &ResourceKey) {
        self.write_failures.remove(key);
    }

    /// Add or replace an instance.
    pub fn insert_instance(&mut self, instance: MemoryInstance) {
        let key = instance.key();
        self.instances.retain(|i| !i.matches(&key));
        self.instances.push(instance);
    }

    /// Returns an instance by identity.
    pub fn instance(&self, key: &ResourceKey) -> Option<&MemoryInstance> {
        self.instances.iter().find(|i| i.matches(key))
    }

    /// Returns all instances.
    pub fn instances(&self) -> &[MemoryInstance] {
        &self.instances
    }

    /// Returns a copy of the call log.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock_calls().clone()
    }

    /// Returns the state-changing calls of the log.
    pub fn mutation_calls(&self) -> Vec<DeviceCall> {
        self.lock_calls()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Empties the call log.
    pub fn clear_calls(&self) {
        self.lock_calls().clear();
    }

    /// Loads device state from a JSON file.
    pub fn load(path: &Path) -> CfgMgrResult<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| CfgMgrError::manifest(path.display().to_string(), e.to_string()))?;
        Self::from_json(&data)
            .map_err(|e| CfgMgrError::manifest(path.display().to_string(), e.to_string()))
    }

    /// Parses device state from JSON.
    pub fn from_json(data: &str) -> CfgMgrResult<Self> {
        serde_json::from_str(data)
            .map_err(|e| CfgMgrError::invalid_config("device_state", e.to_string()))
    }

    /// Saves device state to a JSON file.
    pub fn save(&self, path: &Path) -> CfgMgrResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| CfgMgrError::internal(e.to_string()))?;
        fs::write(path, data)
            .map_err(|e| CfgMgrError::manifest(path.display().to_string(), e.to_string()))?;
        debug!("Saved {} instances to {}", self.instances.len(), path.display());
        Ok(())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<DeviceCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: DeviceCall) {
        self.lock_calls().push(call);
    }

    fn check_read(&self, key: &ResourceKey, what: &str) -> CfgMgrResult<&MemoryInstance> {
        if self.read_failures.contains(key) {
            return Err(CfgMgrError::discovery_read(
                key.to_string(),
                what,
                "injected read failure",
            ));
        }
        self.instance(key)
            .ok_or_else(|| CfgMgrError::discovery_read(key.to_string(), what, "no such instance"))
    }

    fn check_write(&mut self, key: &ResourceKey, operation: &str) -> CfgMgrResult<&mut MemoryInstance> {
        if self.write_failures.contains(key) {
            return Err(CfgMgrError::mutation(
                operation,
                key.to_string(),
                "injected write failure",
            ));
        }
        self.instances
            .iter_mut()
            .find(|i| i.matches(key))
            .ok_or_else(|| CfgMgrError::mutation(operation, key.to_string(), "no such instance"))
    }
}

#[async_trait]
impl OspfVrfDevice for MemoryDevice {
    type Handle = ResourceKey;

    async fn enumerate_instances(&self) -> CfgMgrResult<Vec<DeviceInstance<ResourceKey>>> {
        self.record(DeviceCall::Enumerate);
        Ok(self
            .instances
            .iter()
            .map(|i| DeviceInstance {
                key: i.key(),
                handle: i.key(),
            })
            .collect())
    }

    async fn read_property(
        &self,
        handle: &ResourceKey,
        property: Property,
    ) -> CfgMgrResult<PropertyValue> {
        self.record(DeviceCall::ReadProperty {
            key: handle.clone(),
            property,
        });
        if property.is_derived() {
            return Err(CfgMgrError::internal(format!(
                "{} must be read with read_cost",
                property
            )));
        }
        Ok(self.check_read(handle, property.name())?.effective(property))
    }

    async fn read_cost(&self, handle: &ResourceKey) -> CfgMgrResult<RawCost> {
        self.record(DeviceCall::ReadCost {
            key: handle.clone(),
        });
        Ok(self.check_read(handle, "auto_cost")?.cost.clone())
    }

    async fn read_default_cost(&self, handle: &ResourceKey) -> CfgMgrResult<RawCost> {
        self.record(DeviceCall::ReadDefaultCost {
            key: handle.clone(),
        });
        Ok(self.check_read(handle, "default_auto_cost")?.default_cost.clone())
    }

    async fn write_property(
        &mut self,
        handle: &ResourceKey,
        property: Property,
        value: &PropertyValue,
    ) -> CfgMgrResult<()> {
        self.record(DeviceCall::WriteProperty {
            key: handle.clone(),
            property,
            value: value.clone(),
        });
        if property.is_derived() || property.group().is_some() {
            return Err(CfgMgrError::mutation(
                "write_property",
                handle.to_string(),
                format!("{} cannot be written individually", property),
            ));
        }
        let instance = self.check_write(handle, "write_property")?;
        instance.properties.insert(property, value.clone());
        Ok(())
    }

    async fn write_cost(
        &mut self,
        handle: &ResourceKey,
        value: u32,
        unit: CostUnit,
    ) -> CfgMgrResult<()> {
        self.record(DeviceCall::WriteCost {
            key: handle.clone(),
            value,
            unit,
        });
        let instance = self.check_write(handle, "write_cost")?;
        instance.cost = RawCost::new(value, unit.as_str());
        Ok(())
    }

    async fn write_grouped_timers(
        &mut self,
        handle: &ResourceKey,
        group: PropertyGroup,
        values: [u32; 3],
    ) -> CfgMgrResult<()> {
        self.record(DeviceCall::WriteGroupedTimers {
            key: handle.clone(),
            group,
            values,
        });
        let instance = self.check_write(handle, "write_grouped_timers")?;
        for (member, value) in group.members().into_iter().zip(values) {
            instance.properties.insert(member, PropertyValue::Number(value));
        }
        Ok(())
    }

    async fn create_instance(&mut self, key: &ResourceKey) -> CfgMgrResult<ResourceKey> {
        self.record(DeviceCall::CreateInstance { key: key.clone() });
        if self.write_failures.contains(key) {
            return Err(CfgMgrError::mutation(
                "create_instance",
                key.to_string(),
                "injected write failure",
            ));
        }
        if self.instance(key).is_none() {
            self.instances.push(MemoryInstance::new(key));
        }
        Ok(key.clone())
    }

    async fn destroy_instance(&mut self, handle: &ResourceKey) -> CfgMgrResult<()> {
        self.record(DeviceCall::DestroyInstance {
            key: handle.clone(),
        });
        self.check_write(handle, "destroy_instance")?;
        self.instances.retain(|i| !i.matches(handle));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn green() -> ResourceKey {
        ResourceKey::new("test", "green")
    }

    #[tokio::test]
    async fn test_unset_properties_read_as_defaults() {
        let device = MemoryDevice::new().with_instance(MemoryInstance::new(&green()));

        let hold = device
            .read_property(&green(), Property::TimerThrottleLsaHold)
            .await
            .unwrap();
        assert_eq!(hold, PropertyValue::Number(5000));

        let cost = device.read_cost(&green()).await.unwrap();
        assert_eq!(cost, RawCost::new(40, "Gbps"));
    }

    #[tokio::test]
    async fn test_grouped_write_sets_all_members() {
        let mut device = MemoryDevice::new().with_instance(MemoryInstance::new(&green()));

        device
            .write_grouped_timers(&green(), PropertyGroup::SpfThrottle, [10, 20, 30])
            .await
            .unwrap();

        let instance = device.instance(&green()).unwrap();
        assert_eq!(
            instance.effective(Property::TimerThrottleSpfHold),
            PropertyValue::Number(20)
        );
        assert_eq!(device.mutation_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_grouped_member_rejected_individually() {
        let mut device = MemoryDevice::new().with_instance(MemoryInstance::new(&green()));
        let result = device
            .write_property(&green(), Property::TimerThrottleLsaMax, &PropertyValue::Number(1))
            .await;
        assert!(matches!(result, Err(CfgMgrError::Mutation { .. })));
    }

    #[tokio::test]
    async fn test_create_is_idempotent_and_destroy_removes() {
        let mut device = MemoryDevice::new();

        device.create_instance(&green()).await.unwrap();
        device.create_instance(&green()).await.unwrap();
        assert_eq!(device.instances().len(), 1);

        device.destroy_instance(&green()).await.unwrap();
        assert!(device.instance(&green()).is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut device = MemoryDevice::new()
            .with_instance(MemoryInstance::new(&green()))
            .fail_reads_for(green())
            .fail_writes_for(green());

        assert!(matches!(
            device.read_cost(&green()).await,
            Err(CfgMgrError::DiscoveryRead { .. })
        ));
        assert!(matches!(
            device.write_cost(&green(), 1, CostUnit::Mbps).await,
            Err(CfgMgrError::Mutation { .. })
        ));

        device.clear_write_failure(&green());
        assert!(device.write_cost(&green(), 1, CostUnit::Mbps).await.is_ok());
    }

    #[test]
    fn test_json_round_trip_keeps_instances() {
        let device = MemoryDevice::new().with_instance(
            MemoryInstance::new(&green())
                .with_property(Property::RouterId, "10.0.0.1")
                .with_cost(100, "Mbps"),
        );
        let file = tempfile::NamedTempFile::new().unwrap();

        device.save(file.path()).unwrap();
        let loaded = MemoryDevice::load(file.path()).unwrap();

        assert_eq!(loaded.instances(), device.instances());
        assert!(loaded.calls().is_empty());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "instances": [
                {
                    "process_id": "test",
                    "vrf": "green",
                    "properties": { "log_adjacency": "detail", "default_metric": 10 },
                    "cost": { "value": 200, "unit": "Gbps" },
                    "default_cost": { "value": 200, "unit": "Gbps" }
                }
            ]
        }"#;
        let device = MemoryDevice::from_json(json).unwrap();
        let instance = device.instance(&green()).unwrap();
        assert_eq!(
            instance.effective(Property::LogAdjacency),
            PropertyValue::Text("detail".into())
        );
        assert_eq!(
            instance.effective(Property::DefaultMetric),
            PropertyValue::Number(10)
        );
        assert!(MemoryDevice::from_json("not json").is_err());
    }
}
