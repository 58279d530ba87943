//! Test fixtures for common cfgmgr patterns
//!
//! Provides reusable devices and desired states for configuration manager testing

use sonic_ospfvrfmgrd::{
    DesiredResource, MemoryDevice, MemoryInstance, Property, ResourceKey, PROTECTED_VRF,
};

/// OSPF process used by the fixtures
pub const PROCESS: &str = "test";

/// Identity of a fixture instance in [`PROCESS`]
pub fn key(vrf: &str) -> ResourceKey {
    ResourceKey::new(PROCESS, vrf)
}

/// Common device fixtures
pub mod device_fixtures {
    use super::*;

    /// Device with one default instance per VRF
    pub fn seeded_device(vrfs: &[&str]) -> MemoryDevice {
        vrfs.iter().fold(MemoryDevice::new(), |device, vrf| {
            device.with_instance(MemoryInstance::new(&key(vrf)))
        })
    }

    /// Device with `count` default instances named `vrf0`, `vrf1`, ...
    pub fn scaled_device(count: usize) -> MemoryDevice {
        (0..count).fold(MemoryDevice::new(), |device, i| {
            device.with_instance(MemoryInstance::new(&key(&format!("vrf{}", i))))
        })
    }

    /// Instance whose reference bandwidth and built-in default are both 200 Gbps
    pub fn high_bandwidth_instance(vrf: &str) -> MemoryInstance {
        MemoryInstance::new(&key(vrf))
            .with_cost(200, "Gbps")
            .with_default_cost(200, "Gbps")
    }

    /// Instance with non-default settings on every plain property
    pub fn customized_instance(vrf: &str) -> MemoryInstance {
        MemoryInstance::new(&key(vrf))
            .with_property(Property::DefaultMetric, 100u32)
            .with_property(Property::LogAdjacency, "detail")
            .with_property(Property::RouterId, "10.1.1.1")
            .with_property(Property::TimerThrottleLsaStart, 50u32)
            .with_property(Property::TimerThrottleSpfMax, 8000u32)
            .with_cost(100_000, "Mbps")
    }

    /// Instance in the protected `default` VRF
    pub fn protected_instance() -> MemoryInstance {
        MemoryInstance::new(&key(PROTECTED_VRF))
    }
}

/// Common desired-state fixtures
pub mod desired_fixtures {
    use super::*;

    /// Every managed property set to a non-default value
    pub fn fully_specified(vrf: &str) -> DesiredResource {
        DesiredResource::new(key(vrf))
            .with(Property::DefaultMetric, 20u32)
            .with(Property::LogAdjacency, "log")
            .with(Property::RouterId, "192.168.0.1")
            .with(Property::TimerThrottleLsaStart, 10u32)
            .with(Property::TimerThrottleLsaHold, 6000u32)
            .with(Property::TimerThrottleLsaMax, 7000u32)
            .with(Property::TimerThrottleSpfStart, 300u32)
            .with(Property::TimerThrottleSpfHold, 1500u32)
            .with(Property::TimerThrottleSpfMax, 9000u32)
            .with(Property::AutoCost, 45_000u32)
    }

    /// Every managed property requested at its default
    pub fn all_defaults(vrf: &str) -> DesiredResource {
        Property::ALL
            .into_iter()
            .fold(DesiredResource::new(key(vrf)), |desired, property| {
                desired.with_default(property)
            })
    }

    /// A single LSA throttle member changed
    pub fn lsa_hold_only(vrf: &str, hold: u32) -> DesiredResource {
        DesiredResource::new(key(vrf)).with(Property::TimerThrottleLsaHold, hold)
    }

    /// Removal request
    pub fn absent(vrf: &str) -> DesiredResource {
        DesiredResource::absent(key(vrf))
    }
}
