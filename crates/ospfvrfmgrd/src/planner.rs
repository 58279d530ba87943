//! Grouped mutation planning.
//!
//! Turns a [`ChangeSet`] into the device calls that apply it. Ungrouped
//! properties get one call each; a timer group with any changed member gets
//! exactly one call carrying all three members.

use std::fmt;

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::changeset::ChangeSet;
use crate::properties::{Property, PropertyGroup};
use crate::types::{PropertyValue, ResourceRecord};
use crate::units::CostUnit;

/// A single device mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationCall {
    SetProperty {
        property: Property,
        value: PropertyValue,
    },
    /// Reference bandwidth; always written in Mbps.
    SetCost { value: u32, unit: CostUnit },
    SetTimerGroup {
        group: PropertyGroup,
        values: [u32; 3],
    },
}

impl fmt::Display for MutationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationCall::SetProperty { property, value } => {
                write!(f, "{} = {}", property, value)
            }
            MutationCall::SetCost { value, unit } => write!(f, "auto_cost = {} {}", value, unit),
            MutationCall::SetTimerGroup { group, values } => write!(
                f,
                "{} = {} {} {}",
                group, values[0], values[1], values[2]
            ),
        }
    }
}

/// Plans the device calls for `changes` against the pre-change `current`.
pub fn plan(changes: &ChangeSet, current: &ResourceRecord) -> CfgMgrResult<Vec<MutationCall>> {
    let mut calls = Vec::new();

    for (property, value) in changes.iter().filter(|(p, _)| p.group().is_none()) {
        let call = if property.is_derived() {
            MutationCall::SetCost {
                value: number(property, value)?,
                unit: CostUnit::Mbps,
            }
        } else {
            MutationCall::SetProperty {
                property,
                value: value.clone(),
            }
        };
        calls.push(call);
    }

    for group in PropertyGroup::ALL {
        let members = group.members();
        if !members.iter().any(|m| changes.contains(*m)) {
            continue;
        }

        let mut values = [0u32; 3];
        for (slot, member) in values.iter_mut().zip(members) {
            let value = changes
                .get(member)
                .or_else(|| current.get(member))
                .ok_or_else(|| {
                    CfgMgrError::internal(format!(
                        "no current value for {} of {}",
                        member, current.key
                    ))
                })?;
            *slot = number(member, value)?;
        }
        calls.push(MutationCall::SetTimerGroup { group, values });
    }

    Ok(calls)
}

fn number(property: Property, value: &PropertyValue) -> CfgMgrResult<u32> {
    value.as_number().ok_or_else(|| {
        CfgMgrError::invalid_config(property.name(), format!("'{}' is not a number", value))
    })
}
