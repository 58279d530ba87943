//! Integration test infrastructure for SONiC configuration managers
//!
//! Provides:
//! - Seeded in-memory devices and desired-state fixtures
//! - Device call log verification helpers
//! - Reconciliation integration and performance suites (under `tests/`)

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
