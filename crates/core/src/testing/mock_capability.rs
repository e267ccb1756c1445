//! Mock capability for testing registry and router behavior.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capability::{Capability, CapabilityError, CapabilityId, InvokeContext};

/// Mock implementation of the [`Capability`] trait.
///
/// Invocations are recorded, can be made to fail a set number of times,
/// can take a configurable amount of time, and can write fixed bytes to
/// the output artifact on success.
///
/// # Example
///
/// ```rust,ignore
/// let capability = MockCapability::new(CapabilityId::Pandoc).with_output(b"result");
/// capability.fail_next(1);
/// // first invoke fails, second succeeds and writes "result"
/// ```
pub struct MockCapability {
    id: CapabilityId,
    requires_worker: bool,
    output: Option<Vec<u8>>,
    delay: Option<Duration>,
    failures_remaining: AtomicU32,
    invocations: AtomicUsize,
    current_invocations: Arc<AtomicUsize>,
    max_concurrent: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter even when the invocation future is
/// dropped mid-await, which is how cancellation reaches the mock.
struct InFlightGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockCapability {
    pub fn new(id: CapabilityId) -> Self {
        Self {
            id,
            requires_worker: false,
            output: None,
            delay: None,
            failures_remaining: AtomicU32::new(0),
            invocations: AtomicUsize::new(0),
            current_invocations: Arc::new(AtomicUsize::new(0)),
            max_concurrent: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Marks the mock as needing a checked-out pool worker.
    pub fn requiring_worker(mut self) -> Self {
        self.requires_worker = true;
        self
    }

    /// Bytes written to the output artifact on every successful invoke.
    pub fn with_output(mut self, bytes: &[u8]) -> Self {
        self.output = Some(bytes.to_vec());
        self
    }

    /// Makes every invocation sleep before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes the next `count` invocations fail with an engine error.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Total invocations, including failed and cancelled ones.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Highest number of invocations that were ever in flight at once.
    pub fn max_concurrent_invocations(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for MockCapability {
    fn id(&self) -> CapabilityId {
        self.id
    }

    fn requires_worker(&self) -> bool {
        self.requires_worker
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.current_invocations.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(in_flight, Ordering::SeqCst);
        let _guard = InFlightGuard {
            current: Arc::clone(&self.current_invocations),
        };

        if self.requires_worker && ctx.worker.is_none() {
            return Err(CapabilityError::WorkerRequired);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining.saturating_sub(1), Ordering::SeqCst);
            return Err(CapabilityError::engine_failed("mock engine failure", None));
        }

        if let Some(bytes) = &self.output {
            tokio::fs::write(&ctx.output.path, bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactId, ArtifactKind};
    use crate::capability::ConversionOptions;
    use crate::format::DocumentFormat;
    use chrono::Utc;

    fn artifact(path: std::path::PathBuf) -> Artifact {
        Artifact {
            id: ArtifactId::generate(),
            kind: ArtifactKind::Output,
            path,
            original_name: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn ctx<'a>(
        input: &'a Artifact,
        output: &'a Artifact,
        options: &'a ConversionOptions,
        scratch: &'a std::path::Path,
    ) -> InvokeContext<'a> {
        InvokeContext {
            source: DocumentFormat::Markdown,
            target: DocumentFormat::Pdf,
            input,
            output,
            options,
            scratch_dir: scratch,
            deadline: Duration::from_secs(5),
            worker: None,
        }
    }

    #[tokio::test]
    async fn test_fail_next_then_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path().join("in.md"));
        let output = artifact(dir.path().join("out.pdf"));
        let options = ConversionOptions::default();

        let capability = MockCapability::new(CapabilityId::Pandoc).with_output(b"pdf bytes");
        capability.fail_next(1);

        let err = capability
            .invoke(ctx(&input, &output, &options, dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::EngineFailed { .. }));

        capability
            .invoke(ctx(&input, &output, &options, dir.path()))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output.path).unwrap(), b"pdf bytes");
        assert_eq!(capability.invocation_count(), 2);
    }

    #[tokio::test]
    async fn test_worker_requirement_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path().join("in.md"));
        let output = artifact(dir.path().join("out.pdf"));
        let options = ConversionOptions::default();

        let capability = MockCapability::new(CapabilityId::OfficeEngine).requiring_worker();
        let err = capability
            .invoke(ctx(&input, &output, &options, dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::WorkerRequired));
    }

    #[tokio::test]
    async fn test_concurrency_high_water_mark() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path().join("in.md"));
        let output = artifact(dir.path().join("out.pdf"));
        let options = ConversionOptions::default();

        let capability =
            Arc::new(MockCapability::new(CapabilityId::Pandoc).with_delay(Duration::from_millis(50)));
        let (a, b) = tokio::join!(
            capability.invoke(ctx(&input, &output, &options, dir.path())),
            capability.invoke(ctx(&input, &output, &options, dir.path())),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(capability.max_concurrent_invocations(), 2);
        assert_eq!(capability.invocation_count(), 2);
    }
}
