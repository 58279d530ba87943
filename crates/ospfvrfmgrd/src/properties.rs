//! Managed property table for OSPF VRF instances.
//!
//! Each managed property has exactly one entry in [`PROPERTY_SPECS`], which
//! carries its manifest name, value domain, timer group membership and the
//! source of its default value. The table is immutable and shared by the
//! whole process.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::types::{DeviceDefaults, PropertyValue};

/// Accepted values for `log_adjacency`.
pub const LOG_ADJACENCY_CHOICES: &[&str] = &["none", "log", "detail"];

/// Upper bound for every throttle timer, in milliseconds.
pub const TIMER_MAX_MS: u32 = 600_000;

/// A managed OSPF VRF property.
///
/// Declaration order is the table order and the order mutations are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    DefaultMetric,
    LogAdjacency,
    RouterId,
    TimerThrottleLsaStart,
    TimerThrottleLsaHold,
    TimerThrottleLsaMax,
    TimerThrottleSpfStart,
    TimerThrottleSpfHold,
    TimerThrottleSpfMax,
    /// Reference bandwidth, in Mbps.
    AutoCost,
}

impl Property {
    /// All managed properties in table order.
    pub const ALL: [Property; 10] = [
        Property::DefaultMetric,
        Property::LogAdjacency,
        Property::RouterId,
        Property::TimerThrottleLsaStart,
        Property::TimerThrottleLsaHold,
        Property::TimerThrottleLsaMax,
        Property::TimerThrottleSpfStart,
        Property::TimerThrottleSpfHold,
        Property::TimerThrottleSpfMax,
        Property::AutoCost,
    ];

    /// Returns the table entry for this property.
    pub fn spec(self) -> &'static PropertySpec {
        &PROPERTY_SPECS[self as usize]
    }

    /// Returns the manifest/device name of this property.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Returns the timer group this property belongs to, if any.
    pub fn group(self) -> Option<PropertyGroup> {
        self.spec().group
    }

    /// Returns true if values of this property are integers.
    pub fn is_numeric(self) -> bool {
        matches!(self.spec().domain, ValueDomain::Range { .. })
    }

    /// Returns true if the property is stored by the device as a scaled
    /// `(value, unit)` pair rather than a plain value.
    pub fn is_derived(self) -> bool {
        matches!(self.spec().default, DefaultValue::Device)
    }

    /// Looks up a property by its manifest/device name.
    pub fn from_name(name: &str) -> Option<Property> {
        PROPERTIES_BY_NAME.get(name).copied()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of properties the device only accepts together in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyGroup {
    /// `timers throttle lsa <start> <hold> <max>`
    LsaThrottle,
    /// `timers throttle spf <start> <hold> <max>`
    SpfThrottle,
}

impl PropertyGroup {
    /// All property groups.
    pub const ALL: [PropertyGroup; 2] = [PropertyGroup::LsaThrottle, PropertyGroup::SpfThrottle];

    /// Returns the group name.
    pub fn name(self) -> &'static str {
        match self {
            PropertyGroup::LsaThrottle => "timer_throttle_lsa",
            PropertyGroup::SpfThrottle => "timer_throttle_spf",
        }
    }

    /// Returns the group members in call order (start, hold, max).
    pub fn members(self) -> [Property; 3] {
        match self {
            PropertyGroup::LsaThrottle => [
                Property::TimerThrottleLsaStart,
                Property::TimerThrottleLsaHold,
                Property::TimerThrottleLsaMax,
            ],
            PropertyGroup::SpfThrottle => [
                Property::TimerThrottleSpfStart,
                Property::TimerThrottleSpfHold,
                Property::TimerThrottleSpfMax,
            ],
        }
    }
}

impl fmt::Display for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value domain of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    /// Integer in `min..=max`.
    Range { min: u32, max: u32 },
    /// One of a fixed set of keywords.
    Choice(&'static [&'static str]),
    /// IPv4 dotted quad, or empty for "not configured".
    RouterId,
}

impl ValueDomain {
    /// Checks that `value` belongs to this domain.
    pub fn validate(&self, property: Property, value: &PropertyValue) -> CfgMgrResult<()> {
        let valid = match (self, value) {
            (ValueDomain::Range { min, max }, PropertyValue::Number(n)) => (*min..=*max).contains(n),
            (ValueDomain::Choice(choices), PropertyValue::Text(s)) => choices.contains(&s.as_str()),
            (ValueDomain::RouterId, PropertyValue::Text(s)) => {
                s.is_empty() || s.parse::<Ipv4Addr>().is_ok()
            }
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(CfgMgrError::invalid_config(
                property.name(),
                format!("value '{}' is outside {}", value, self),
            ))
        }
    }
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDomain::Range { min, max } => write!(f, "range {}..={}", min, max),
            ValueDomain::Choice(choices) => write!(f, "one of [{}]", choices.join(", ")),
            ValueDomain::RouterId => f.write_str("IPv4 address or empty"),
        }
    }
}

/// Where the "use device default" sentinel resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Number(u32),
    Text(&'static str),
    /// Computed by the device per instance (see [`DeviceDefaults`]).
    Device,
}

impl DefaultValue {
    /// Resolves the default to a concrete value.
    pub fn resolve(&self, defaults: &DeviceDefaults) -> PropertyValue {
        match self {
            DefaultValue::Number(n) => PropertyValue::Number(*n),
            DefaultValue::Text(s) => PropertyValue::Text((*s).to_string()),
            DefaultValue::Device => PropertyValue::Number(defaults.auto_cost),
        }
    }
}

/// Table entry describing one managed property.
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub property: Property,
    pub name: &'static str,
    pub domain: ValueDomain,
    pub group: Option<PropertyGroup>,
    pub default: DefaultValue,
}

const fn timer(
    property: Property,
    name: &'static str,
    group: PropertyGroup,
    default: u32,
) -> PropertySpec {
    PropertySpec {
        property,
        name,
        domain: ValueDomain::Range {
            min: 0,
            max: TIMER_MAX_MS,
        },
        group: Some(group),
        default: DefaultValue::Number(default),
    }
}

/// The managed property table, indexed by `Property as usize`.
pub static PROPERTY_SPECS: [PropertySpec; 10] = [
    PropertySpec {
        property: Property::DefaultMetric,
        name: "default_metric",
        domain: ValueDomain::Range {
            min: 0,
            max: 16_777_214,
        },
        group: None,
        default: DefaultValue::Number(0),
    },
    PropertySpec {
        property: Property::LogAdjacency,
        name: "log_adjacency",
        domain: ValueDomain::Choice(LOG_ADJACENCY_CHOICES),
        group: None,
        default: DefaultValue::Text("none"),
    },
    PropertySpec {
        property: Property::RouterId,
        name: "router_id",
        domain: ValueDomain::RouterId,
        group: None,
        default: DefaultValue::Text(""),
    },
    timer(
        Property::TimerThrottleLsaStart,
        "timer_throttle_lsa_start",
        PropertyGroup::LsaThrottle,
        0,
    ),
    timer(
        Property::TimerThrottleLsaHold,
        "timer_throttle_lsa_hold",
        PropertyGroup::LsaThrottle,
        5000,
    ),
    timer(
        Property::TimerThrottleLsaMax,
        "timer_throttle_lsa_max",
        PropertyGroup::LsaThrottle,
        5000,
    ),
    timer(
        Property::TimerThrottleSpfStart,
        "timer_throttle_spf_start",
        PropertyGroup::SpfThrottle,
        200,
    ),
    timer(
        Property::TimerThrottleSpfHold,
        "timer_throttle_spf_hold",
        PropertyGroup::SpfThrottle,
        1000,
    ),
    timer(
        Property::TimerThrottleSpfMax,
        "timer_throttle_spf_max",
        PropertyGroup::SpfThrottle,
        5000,
    ),
    PropertySpec {
        property: Property::AutoCost,
        name: "auto_cost",
        domain: ValueDomain::Range {
            min: 1,
            max: 4_000_000,
        },
        group: None,
        default: DefaultValue::Device,
    },
];

static PROPERTIES_BY_NAME: Lazy<HashMap<&'static str, Property>> = Lazy::new(|| {
    PROPERTY_SPECS
        .iter()
        .map(|spec| (spec.name, spec.property))
        .collect()
});
