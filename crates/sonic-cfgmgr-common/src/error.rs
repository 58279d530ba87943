//! Error types for cfgmgr operations.
//!
//! This module defines the error types used throughout the cfgmgr crates.
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur during cfgmgr operations.
#[derive(Debug, Clone, Error)]
pub enum CfgMgrError {
    /// Reading a property of a single device instance failed.
    #[error("Failed to read '{property}' of {resource}: {message}")]
    DiscoveryRead {
        /// The resource title (e.g., "test green").
        resource: String,
        /// The property being read.
        property: String,
        /// Error message.
        message: String,
    },

    /// The requested operation is not allowed on this resource.
    #[error("Policy violation for {resource}: {message}")]
    PolicyViolation {
        /// The resource title.
        resource: String,
        /// Error message.
        message: String,
    },

    /// The device reported a scale unit that cannot be converted.
    #[error("Cannot convert unit '{unit}': {message}")]
    UnitConversion {
        /// The unit label reported by the device.
        unit: String,
        /// Error message.
        message: String,
    },

    /// A write, create or destroy call on the device failed.
    #[error("Device mutation failed: {operation} on {resource}: {message}")]
    Mutation {
        /// The operation that failed (e.g., "write_property", "destroy").
        operation: String,
        /// The resource title.
        resource: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Resource is not part of the managed set.
    #[error("Resource not managed: {resource}")]
    ResourceNotFound {
        /// The resource title.
        resource: String,
    },

    /// Manifest or state file could not be loaded.
    #[error("Failed to load {path}: {message}")]
    Manifest {
        /// Path of the file.
        path: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl CfgMgrError {
    /// Creates a discovery read error.
    pub fn discovery_read(
        resource: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DiscoveryRead {
            resource: resource.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Creates a policy violation error.
    pub fn policy_violation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PolicyViolation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates a unit conversion error.
    pub fn unit_conversion(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnitConversion {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Creates a device mutation error.
    pub fn mutation(
        operation: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Mutation {
            operation: operation.into(),
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a resource not found error.
    pub fn resource_not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
        }
    }

    /// Creates a manifest loading error.
    pub fn manifest(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed when the caller runs another pass.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CfgMgrError::DiscoveryRead { .. } | CfgMgrError::Mutation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CfgMgrError::policy_violation("test default", "cannot remove");
        assert_eq!(
            err.to_string(),
            "Policy violation for test default: cannot remove"
        );
    }

    #[test]
    fn test_discovery_read_error() {
        let err = CfgMgrError::discovery_read("test green", "router_id", "timeout");
        assert_eq!(
            err.to_string(),
            "Failed to read 'router_id' of test green: timeout"
        );
    }

    #[test]
    fn test_mutation_error() {
        let err = CfgMgrError::Mutation {
            operation: "write_cost".to_string(),
            resource: "test green".to_string(),
            message: "session closed".to_string(),
        };
        assert!(err.to_string().contains("write_cost"));
        assert!(err.to_string().contains("session closed"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(CfgMgrError::mutation("destroy", "test green", "busy").is_retryable());
        assert!(CfgMgrError::discovery_read("test green", "auto_cost", "x").is_retryable());
        assert!(!CfgMgrError::policy_violation("test default", "no").is_retryable());
        assert!(!CfgMgrError::unit_conversion("Tbps", "unknown").is_retryable());
        assert!(!CfgMgrError::internal("bug").is_retryable());
    }
}
