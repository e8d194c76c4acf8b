//! Test utilities for volctl
//!
//! This crate provides shared test utilities, fixtures and helper functions
//! for testing the volctl control plane.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::standard());
//!     let plane = ctx.plane();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use volctl::config::{Config, CredentialsConfig, DriverConfig, DriverKind, GlobalConfig};
pub use volctl::creds::{CredentialEntry, CredentialManager, OrphanPolicy};
pub use volctl::managers::schedules::RequestContext;

// Re-export in-memory stores from the main crate
pub use volctl::store::document::mock::MemoryDocumentStore;
pub use volctl::store::vault::mock::MemorySecretVault;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
