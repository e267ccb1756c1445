//! Registry construction errors.

use thiserror::Error;

use crate::capability::CapabilityId;

/// Errors detected while building the format registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The conversion table names a capability that was not registered.
    #[error("conversion table references unregistered capability {0}")]
    MissingCapability(CapabilityId),
}
