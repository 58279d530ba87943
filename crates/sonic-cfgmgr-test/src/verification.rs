//! Verification helpers for testing configuration managers
//!
//! Provides assertion helpers over the device call log and device state

use sonic_ospfvrfmgrd::{
    DeviceCall, MemoryDevice, Property, PropertyGroup, PropertyValue, ResourceKey,
};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected call {expected} not found in {actual}")]
    CallNotFound { expected: String, actual: String },

    #[error("Unexpected call {call}")]
    UnexpectedCall { call: String },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Instance '{key}' not found on device")]
    InstanceNotFound { key: String },

    #[error("Value mismatch for {key}:{property}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        key: String,
        property: String,
        expected: String,
        actual: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Device call log verifier
pub struct CallVerifier {
    calls: Vec<DeviceCall>,
}

impl CallVerifier {
    /// Create a new call verifier
    pub fn new(calls: Vec<DeviceCall>) -> Self {
        Self { calls }
    }

    /// Create a verifier over a device's current call log
    pub fn from_device(device: &MemoryDevice) -> Self {
        Self::new(device.calls())
    }

    /// State-changing calls, in order
    pub fn mutations(&self) -> Vec<&DeviceCall> {
        self.calls.iter().filter(|c| c.is_mutation()).collect()
    }

    /// State-changing calls targeting one instance
    pub fn mutations_for(&self, key: &ResourceKey) -> Vec<&DeviceCall> {
        self.calls
            .iter()
            .filter(|c| c.is_mutation() && c.key() == Some(key))
            .collect()
    }

    /// Verify that a specific call was made
    pub fn assert_called(&self, expected: &DeviceCall) -> VerifyResult<()> {
        if self.calls.contains(expected) {
            Ok(())
        } else {
            Err(VerificationError::CallNotFound {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", self.calls),
            })
        }
    }

    /// Verify that no call was made at all
    pub fn assert_no_calls(&self) -> VerifyResult<()> {
        match self.calls.first() {
            Some(call) => Err(VerificationError::UnexpectedCall {
                call: format!("{:?}", call),
            }),
            None => Ok(()),
        }
    }

    /// Verify that nothing changed on the device
    pub fn assert_no_mutations(&self) -> VerifyResult<()> {
        match self.mutations().first() {
            Some(call) => Err(VerificationError::UnexpectedCall {
                call: format!("{:?}", call),
            }),
            None => Ok(()),
        }
    }

    /// Verify the number of state-changing calls
    pub fn assert_mutation_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.mutations().len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: "mutations".to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that an instance received no state-changing call
    pub fn assert_untouched(&self, key: &ResourceKey) -> VerifyResult<()> {
        match self.mutations_for(key).first() {
            Some(call) => Err(VerificationError::UnexpectedCall {
                call: format!("{:?}", call),
            }),
            None => Ok(()),
        }
    }

    /// Verify that a timer group was written as exactly one grouped call and
    /// none of its members individually
    pub fn assert_grouped_once(&self, key: &ResourceKey, group: PropertyGroup) -> VerifyResult<()> {
        let mutations = self.mutations_for(key);

        let grouped = mutations
            .iter()
            .filter(|c| matches!(c, DeviceCall::WriteGroupedTimers { group: g, .. } if *g == group))
            .count();
        if grouped != 1 {
            return Err(VerificationError::CountMismatch {
                what: format!("{} writes", group),
                expected: 1,
                actual: grouped,
            });
        }

        if let Some(call) = mutations.iter().find(|c| {
            matches!(c, DeviceCall::WriteProperty { property, .. } if property.group() == Some(group))
        }) {
            return Err(VerificationError::UnexpectedCall {
                call: format!("{:?}", call),
            });
        }

        Ok(())
    }

    /// Get all captured calls
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }
}

/// Device state verifier
pub struct DeviceVerifier<'a> {
    device: &'a MemoryDevice,
}

impl<'a> DeviceVerifier<'a> {
    /// Create a new device verifier
    pub fn new(device: &'a MemoryDevice) -> Self {
        Self { device }
    }

    /// Verify that an instance exists
    pub fn assert_present(&self, key: &ResourceKey) -> VerifyResult<()> {
        self.device
            .instance(key)
            .map(|_| ())
            .ok_or_else(|| VerificationError::InstanceNotFound {
                key: key.to_string(),
            })
    }

    /// Verify that an instance does not exist
    pub fn assert_absent(&self, key: &ResourceKey) -> VerifyResult<()> {
        match self.device.instance(key) {
            Some(_) => Err(VerificationError::ValueMismatch {
                key: key.to_string(),
                property: "ensure".to_string(),
                expected: "absent".to_string(),
                actual: "present".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Verify the effective value of a plain property
    pub fn assert_property(
        &self,
        key: &ResourceKey,
        property: Property,
        expected: impl Into<PropertyValue>,
    ) -> VerifyResult<()> {
        let instance = self
            .device
            .instance(key)
            .ok_or_else(|| VerificationError::InstanceNotFound {
                key: key.to_string(),
            })?;
        let expected = expected.into();
        let actual = instance.effective(property);
        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                key: key.to_string(),
                property: property.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Verify the stored reference bandwidth as `(value, unit)`
    pub fn assert_cost(&self, key: &ResourceKey, value: u32, unit: &str) -> VerifyResult<()> {
        let instance = self
            .device
            .instance(key)
            .ok_or_else(|| VerificationError::InstanceNotFound {
                key: key.to_string(),
            })?;
        if instance.cost.value != value || instance.cost.unit != unit {
            return Err(VerificationError::ValueMismatch {
                key: key.to_string(),
                property: Property::AutoCost.to_string(),
                expected: format!("{} {}", value, unit),
                actual: format!("{} {}", instance.cost.value, instance.cost.unit),
            });
        }
        Ok(())
    }
}
