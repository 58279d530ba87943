//! Reference bandwidth unit normalization.
//!
//! The device stores `auto_cost` as a `(value, unit)` pair. Everything above
//! the device boundary works in Mbps, the finest unit the device reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::device::{OspfVrfDevice, RawCost};
use crate::types::ResourceKey;

/// Scale between two adjacent cost units.
pub const UNIT_STEP: u32 = 1000;

/// Reference bandwidth unit as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostUnit {
    Mbps,
    Gbps,
}

impl CostUnit {
    /// Returns the unit label used by the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            CostUnit::Mbps => "Mbps",
            CostUnit::Gbps => "Gbps",
        }
    }

    /// Returns the multiplier to the canonical unit.
    pub fn multiplier(&self) -> u32 {
        match self {
            CostUnit::Mbps => 1,
            CostUnit::Gbps => UNIT_STEP,
        }
    }
}

impl fmt::Display for CostUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostUnit {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mbps" => Ok(CostUnit::Mbps),
            "gbps" => Ok(CostUnit::Gbps),
            _ => Err(CfgMgrError::unit_conversion(s, "unrecognized cost unit")),
        }
    }
}

/// Converts a `(value, unit)` pair to Mbps.
pub fn normalize(value: u32, unit: CostUnit) -> CfgMgrResult<u32> {
    value.checked_mul(unit.multiplier()).ok_or_else(|| {
        CfgMgrError::unit_conversion(
            unit.as_str(),
            format!("{} {} overflows the canonical unit", value, unit),
        )
    })
}

/// Converts a raw device cost to Mbps.
pub fn normalize_raw(raw: &RawCost) -> CfgMgrResult<u32> {
    let unit: CostUnit = raw.unit.parse()?;
    normalize(raw.value, unit)
}

/// Reads the instance's built-in default cost and converts it to Mbps.
pub async fn device_default<D: OspfVrfDevice + ?Sized>(
    device: &D,
    key: &ResourceKey,
    handle: &D::Handle,
) -> CfgMgrResult<u32> {
    let raw = device
        .read_default_cost(handle)
        .await
        .map_err(|e| crate::device::read_error(key, "default_auto_cost", e))?;
    normalize_raw(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(200, CostUnit::Gbps).unwrap(), 200_000);
        assert_eq!(normalize(45_000, CostUnit::Mbps).unwrap(), 45_000);
        assert_eq!(normalize(0, CostUnit::Gbps).unwrap(), 0);
    }

    #[test]
    fn test_normalize_overflow() {
        let err = normalize(u32::MAX, CostUnit::Gbps).unwrap_err();
        assert!(matches!(err, CfgMgrError::UnitConversion { .. }));
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("Gbps".parse::<CostUnit>().unwrap(), CostUnit::Gbps);
        assert_eq!("mbps".parse::<CostUnit>().unwrap(), CostUnit::Mbps);
        assert!(matches!(
            "Tbps".parse::<CostUnit>(),
            Err(CfgMgrError::UnitConversion { .. })
        ));
    }

    #[test]
    fn test_normalize_raw() {
        assert_eq!(normalize_raw(&RawCost::new(40, "Gbps")).unwrap(), 40_000);
        assert!(normalize_raw(&RawCost::new(40, "kbps")).is_err());
    }
}
