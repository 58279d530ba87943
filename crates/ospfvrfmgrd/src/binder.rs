//! Binding of desired resources to discovered instances.

use std::collections::{BTreeMap, HashMap};

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};
use tracing::debug;

use crate::discovery::DiscoveredInstance;
use crate::types::{DesiredResource, ResourceKey};

/// A desired resource and the instance it matched, if any.
#[derive(Debug, Clone)]
pub struct Binding<H> {
    pub desired: DesiredResource,
    /// `None` when the instance is missing and is a creation candidate.
    pub current: Option<DiscoveredInstance<H>>,
    /// Set when the matching instance was found but its state is unusable.
    pub failure: Option<CfgMgrError>,
}

impl<H> Binding<H> {
    /// Returns true if a device instance matched the desired resource.
    pub fn is_bound(&self) -> bool {
        self.current.is_some()
    }
}

/// Matches desired resources to discovered instances by identity.
///
/// Discovered instances without a desired counterpart are not part of the
/// result and are never reconciled. A desired resource matching one of
/// `failed` carries that error instead of a current record.
pub fn bind<H>(
    desired: Vec<DesiredResource>,
    discovered: Vec<DiscoveredInstance<H>>,
    failed: Vec<(ResourceKey, CfgMgrError)>,
) -> CfgMgrResult<BTreeMap<ResourceKey, Binding<H>>> {
    let mut by_key: HashMap<ResourceKey, DiscoveredInstance<H>> = discovered
        .into_iter()
        .map(|d| (d.record.key.clone(), d))
        .collect();
    let mut failures: HashMap<ResourceKey, CfgMgrError> = failed.into_iter().collect();

    let mut bindings = BTreeMap::new();
    for spec in desired {
        if bindings.contains_key(&spec.key) {
            return Err(CfgMgrError::invalid_config(
                "name",
                format!("'{}' is declared more than once", spec.key),
            ));
        }
        let current = by_key.remove(&spec.key);
        let failure = failures.remove(&spec.key);
        bindings.insert(
            spec.key.clone(),
            Binding {
                desired: spec,
                current,
                failure,
            },
        );
    }

    if !by_key.is_empty() || !failures.is_empty() {
        debug!(
            "Leaving {} undeclared OSPF VRF instances untouched",
            by_key.len() + failures.len()
        );
    }

    Ok(bindings)
}
