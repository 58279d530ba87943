//! OSPF VRF configuration manager for SONiC
//!
//! Reconciles declared OSPF VRF instances (an OSPF process bound to a VRF,
//! with its metric, adjacency logging, router id, throttle timers and
//! reference bandwidth) against the device property interface.

pub mod binder;
pub mod changeset;
pub mod device;
pub mod discovery;
pub mod manifest;
pub mod memory;
mod ospf_vrf_mgr;
pub mod planner;
pub mod properties;
mod types;
pub mod units;

pub use changeset::ChangeSet;
pub use device::{DeviceInstance, OspfVrfDevice, RawCost};
pub use manifest::Manifest;
pub use memory::{DeviceCall, MemoryDevice, MemoryInstance};
pub use ospf_vrf_mgr::*;
pub use planner::MutationCall;
pub use properties::{Property, PropertyGroup};
pub use types::*;
pub use units::CostUnit;
