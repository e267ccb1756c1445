//! Testing utilities and mock implementations.
//!
//! This module provides mocks for the capability and pool-engine traits,
//! allowing registry, router and pool tests to run without LibreOffice
//! or any other external binary installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use docforge_core::testing::{MockCapability, MockEngine};
//!
//! let engine = MockEngine::new();
//! engine.fail_spawns(2);
//!
//! let capability = MockCapability::new(CapabilityId::Pandoc).with_output(b"converted");
//! capability.fail_next(1);
//! ```

mod mock_capability;
mod mock_engine;

pub use mock_capability::MockCapability;
pub use mock_engine::MockEngine;
