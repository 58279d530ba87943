//! Instance discovery.

use std::collections::BTreeMap;

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};
use tracing::{debug, instrument, warn};

use crate::device::{read_error, OspfVrfDevice};
use crate::properties::Property;
use crate::types::{DeviceDefaults, PropertyValue, ResourceKey, ResourceRecord};
use crate::units;

/// A present instance together with its device handle.
#[derive(Debug, Clone)]
pub struct DiscoveredInstance<H> {
    pub handle: H,
    pub record: ResourceRecord,
}

/// Outcome of a full device scan.
#[derive(Debug)]
pub struct Discovery<H> {
    /// Instances whose state was read completely.
    pub instances: Vec<DiscoveredInstance<H>>,
    /// Instances reporting their cost in an unrecognized unit.
    pub unit_errors: Vec<(ResourceKey, CfgMgrError)>,
}

/// Reads the full current state of every instance on the device.
///
/// An instance whose state cannot be read is logged and left out; the
/// remaining instances are still returned. An unrecognized cost unit is
/// kept in `unit_errors` so the resource fails when applied. Only a failure
/// to enumerate instances at all is an error.
#[instrument(skip(device))]
pub async fn discover_all<D: OspfVrfDevice>(device: &D) -> CfgMgrResult<Discovery<D::Handle>> {
    let instances = device.enumerate_instances().await?;
    let total = instances.len();
    let mut discovery = Discovery {
        instances: Vec::with_capacity(total),
        unit_errors: Vec::new(),
    };

    for instance in instances {
        match read_instance(device, &instance.key, &instance.handle).await {
            Ok(record) => discovery.instances.push(DiscoveredInstance {
                handle: instance.handle,
                record,
            }),
            Err(e @ CfgMgrError::UnitConversion { .. }) => {
                warn!("OSPF VRF {} has an unusable cost: {}", instance.key, e);
                discovery.unit_errors.push((instance.key, e));
            }
            Err(e) => warn!("Skipping OSPF VRF {}: {}", instance.key, e),
        }
    }

    debug!(
        "Discovered {} of {} OSPF VRF instances",
        discovery.instances.len(),
        total
    );
    Ok(discovery)
}

/// Reads every managed property of one instance.
pub async fn read_instance<D: OspfVrfDevice>(
    device: &D,
    key: &ResourceKey,
    handle: &D::Handle,
) -> CfgMgrResult<ResourceRecord> {
    debug!("Checking ospf instance, {}", key);

    let mut properties = BTreeMap::new();
    for property in Property::ALL.into_iter().filter(|p| !p.is_derived()) {
        let value = device
            .read_property(handle, property)
            .await
            .map_err(|e| read_error(key, property.name(), e))?;
        properties.insert(property, value);
    }

    // Reported as (value, unit), kept in Mbps.
    let cost = device
        .read_cost(handle)
        .await
        .map_err(|e| read_error(key, Property::AutoCost.name(), e))?;
    properties.insert(
        Property::AutoCost,
        PropertyValue::Number(units::normalize_raw(&cost)?),
    );

    let defaults = DeviceDefaults {
        auto_cost: units::device_default(device, key, handle).await?,
    };

    Ok(ResourceRecord::present(key.clone(), properties, defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDevice, MemoryInstance};
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::Ensure;

    #[tokio::test]
    async fn test_read_instance_normalizes_cost() {
        let key = ResourceKey::new("test", "green");
        let device = MemoryDevice::new().with_instance(
            MemoryInstance::new(&key)
                .with_cost(200, "Gbps")
                .with_property(Property::LogAdjacency, "log"),
        );

        let record = read_instance(&device, &key, &key).await.unwrap();

        assert_eq!(record.ensure, Ensure::Present);
        assert_eq!(record.properties.len(), Property::ALL.len());
        assert_eq!(
            record.get(Property::AutoCost),
            Some(&PropertyValue::Number(200_000))
        );
        assert_eq!(
            record.get(Property::LogAdjacency),
            Some(&PropertyValue::Text("log".into()))
        );
        assert_eq!(record.defaults.auto_cost, 40_000);
    }

    #[tokio::test]
    async fn test_discover_all_skips_unreadable_instances() {
        let a = ResourceKey::new("test", "a");
        let b = ResourceKey::new("test", "b");
        let c = ResourceKey::new("test", "c");
        let device = MemoryDevice::new()
            .with_instance(MemoryInstance::new(&a))
            .with_instance(MemoryInstance::new(&b))
            .with_instance(MemoryInstance::new(&c))
            .fail_reads_for(b.clone());

        let discovery = discover_all(&device).await.unwrap();
        let keys: Vec<_> = discovery
            .instances
            .iter()
            .map(|d| d.record.key.clone())
            .collect();

        assert_eq!(keys, vec![a, c]);
        assert!(discovery.unit_errors.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_unit_fails_instance() {
        let key = ResourceKey::new("test", "green");
        let device = MemoryDevice::new()
            .with_instance(MemoryInstance::new(&key).with_cost(1, "Tbps"));

        let err = read_instance(&device, &key, &key).await.unwrap_err();
        assert!(matches!(err, CfgMgrError::UnitConversion { .. }));

        let discovery = discover_all(&device).await.unwrap();
        assert!(discovery.instances.is_empty());
        assert_eq!(discovery.unit_errors.len(), 1);
        assert_eq!(discovery.unit_errors[0].0, key);
    }
}
