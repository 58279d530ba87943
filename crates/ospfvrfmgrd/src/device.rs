//! Device property interface consumed by the reconciliation engine.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::properties::{Property, PropertyGroup};
use crate::types::{PropertyValue, ResourceKey};
use crate::units::CostUnit;

/// Reference bandwidth as stored by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCost {
    pub value: u32,
    /// Unit label, e.g. "Mbps" or "Gbps".
    pub unit: String,
}

impl RawCost {
    /// Create a new RawCost
    pub fn new(value: u32, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// An instance reported by [`OspfVrfDevice::enumerate_instances`].
#[derive(Debug, Clone)]
pub struct DeviceInstance<H> {
    pub key: ResourceKey,
    pub handle: H,
}

/// Property accessor/mutator interface of a device.
///
/// Implementations own the transport. The engine issues every call in
/// sequence and never retries.
#[async_trait]
pub trait OspfVrfDevice: Send + Sync {
    /// Opaque per-instance handle.
    type Handle: Clone + fmt::Debug + Send + Sync;

    /// Lists every OSPF VRF instance on the device.
    async fn enumerate_instances(&self) -> CfgMgrResult<Vec<DeviceInstance<Self::Handle>>>;

    /// Reads a plain (non-derived) property.
    async fn read_property(
        &self,
        handle: &Self::Handle,
        property: Property,
    ) -> CfgMgrResult<PropertyValue>;

    /// Reads the configured reference bandwidth.
    async fn read_cost(&self, handle: &Self::Handle) -> CfgMgrResult<RawCost>;

    /// Reads the instance's built-in default reference bandwidth.
    async fn read_default_cost(&self, handle: &Self::Handle) -> CfgMgrResult<RawCost>;

    /// Writes a plain (non-derived, ungrouped) property.
    async fn write_property(
        &mut self,
        handle: &Self::Handle,
        property: Property,
        value: &PropertyValue,
    ) -> CfgMgrResult<()>;

    /// Writes the reference bandwidth.
    async fn write_cost(
        &mut self,
        handle: &Self::Handle,
        value: u32,
        unit: CostUnit,
    ) -> CfgMgrResult<()>;

    /// Writes all three timers of a group in one call.
    async fn write_grouped_timers(
        &mut self,
        handle: &Self::Handle,
        group: PropertyGroup,
        values: [u32; 3],
    ) -> CfgMgrResult<()>;

    /// Constructs a new instance.
    async fn create_instance(&mut self, key: &ResourceKey) -> CfgMgrResult<Self::Handle>;

    /// Removes an instance.
    async fn destroy_instance(&mut self, handle: &Self::Handle) -> CfgMgrResult<()>;
}

/// Classifies a failed read as a discovery read error.
pub(crate) fn read_error(key: &ResourceKey, property: &str, err: CfgMgrError) -> CfgMgrError {
    match err {
        e @ (CfgMgrError::DiscoveryRead { .. } | CfgMgrError::UnitConversion { .. }) => e,
        other => CfgMgrError::discovery_read(key.to_string(), property, other.to_string()),
    }
}

/// Classifies a failed write, create or destroy call as a mutation error.
pub(crate) fn mutation_error(key: &ResourceKey, operation: &str, err: CfgMgrError) -> CfgMgrError {
    match err {
        e @ CfgMgrError::Mutation { .. } => e,
        other => CfgMgrError::mutation(operation, key.to_string(), other.to_string()),
    }
}
