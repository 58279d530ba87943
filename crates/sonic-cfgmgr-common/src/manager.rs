//! Configuration manager traits and common abstractions.
//!
//! This module provides the base trait for all cfgmgr daemon managers and
//! the lifecycle hooks a declarative resource framework drives once per
//! managed resource per run.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CfgMgrResult;

/// Desired or observed existence of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Resource exists on the device.
    #[default]
    Present,
    /// Resource does not exist on the device.
    Absent,
}

impl Ensure {
    /// Returns the ensure value as used in manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ensure::Present => "present",
            Ensure::Absent => "absent",
        }
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base trait for configuration manager daemons.
pub trait CfgMgr: Send + Sync {
    /// Returns the daemon name (e.g., "ospfvrfmgrd").
    ///
    /// This is used for logging.
    fn daemon_name(&self) -> &str;

    /// Returns the managed resource type (e.g., "ospf_vrf").
    fn resource_type(&self) -> &str;
}

/// Lifecycle hooks invoked by the declarative resource framework.
///
/// The framework first calls [`list_managed_resources`] to pre-populate its
/// view of the device, then for each declared resource decides between
/// [`request_create`] and [`request_destroy`] based on [`exists`], and
/// finally calls [`apply`] to flush pending changes.
///
/// [`list_managed_resources`]: ResourceProvider::list_managed_resources
/// [`request_create`]: ResourceProvider::request_create
/// [`request_destroy`]: ResourceProvider::request_destroy
/// [`exists`]: ResourceProvider::exists
/// [`apply`]: ResourceProvider::apply
#[async_trait]
pub trait ResourceProvider: CfgMgr {
    /// Resource identity.
    type Key: Send + Sync;
    /// Desired resource specification.
    type Desired: Send;
    /// Current-state record returned to the framework.
    type Record: Send;
    /// Result of a successful apply.
    type Outcome: Send;

    /// Discovers the device state and binds it to the desired resources.
    async fn list_managed_resources(
        &mut self,
        desired: Vec<Self::Desired>,
    ) -> CfgMgrResult<Vec<Self::Record>>;

    /// Returns true if the resource is currently present on the device.
    fn exists(&self, key: &Self::Key) -> bool;

    /// Marks the resource for creation on the next apply.
    fn request_create(&mut self, key: &Self::Key) -> CfgMgrResult<()>;

    /// Marks the resource for removal on the next apply.
    fn request_destroy(&mut self, key: &Self::Key) -> CfgMgrResult<()>;

    /// Flushes all pending changes for the resource to the device.
    async fn apply(&mut self, key: &Self::Key) -> CfgMgrResult<Self::Outcome>;
}

/// Key-value tuple representing a field and its value.
pub type FieldValue = (String, String);

/// Collection of field-value pairs for a table entry.
pub type FieldValues = Vec<FieldValue>;

/// Helper trait for working with field-value collections.
pub trait FieldValuesExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }
}
