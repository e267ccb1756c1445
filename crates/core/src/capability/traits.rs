//! The capability contract.

use async_trait::async_trait;

use super::error::CapabilityError;
use super::types::{CapabilityId, InvokeContext};

/// One concrete strategy for converting between format pairs.
///
/// Implementations are registered at startup and selected by the format
/// registry; they never pick work for themselves. An invocation reads
/// `ctx.input`, may stage through `ctx.scratch_dir`, and must leave the
/// result at `ctx.output.path` on success.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Stable identifier used in registry tables, job history and logs.
    fn id(&self) -> CapabilityId;

    /// Whether invocations must hold a checked-out pool worker.
    fn requires_worker(&self) -> bool {
        false
    }

    /// Performs one conversion attempt.
    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError>;
}
