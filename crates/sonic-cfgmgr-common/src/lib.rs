//! Common infrastructure for SONiC configuration manager daemons.
//!
//! This crate provides shared functionality for cfgmgr daemons that
//! reconcile declared configuration against a device:
//!
//! - [`CfgMgr`]: Base trait for config managers
//! - [`ResourceProvider`]: Lifecycle hooks driven by the resource framework
//! - [`error`]: Error types for cfgmgr operations
//!
//! # Architecture
//!
//! Configuration managers follow this pattern:
//!
//! 1. Discover the current state of every instance on the device
//! 2. Bind declared resources to discovered instances
//! 3. Compute the minimal property changes per resource
//! 4. Apply the changes through the device property interface
//!
//! # Example
//!
//! ```ignore
//! use sonic_cfgmgr_common::{Ensure, ResourceProvider};
//!
//! let records = mgr.list_managed_resources(desired).await?;
//! if !mgr.exists(&key) {
//!     mgr.request_create(&key)?;
//! }
//! mgr.apply(&key).await?;
//! ```

pub mod error;
pub mod manager;

// Re-export commonly used items at crate root
pub use error::{CfgMgrError, CfgMgrResult};
pub use manager::{CfgMgr, Ensure, FieldValue, FieldValues, FieldValuesExt, ResourceProvider};
