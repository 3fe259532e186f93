//! Worker orchestrator capability trait.

use crate::types::worker::{StartRequest, WorkerRef, WorkerState};
use crate::Error;
use async_trait::async_trait;
use std::time::Duration;

/// Abstraction over the substrate that runs bot workers.
///
/// Two interchangeable implementations exist: one addressing a local
/// container runtime and one spawning child processes. The lifecycle layer
/// holds this capability and never learns which one it has; the only
/// observable difference is that `Error::BadImage` can occur on the
/// container substrate alone.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start one worker for a meeting.
    ///
    /// Returns once the substrate has accepted the worker; it does NOT wait
    /// for the worker's joining acknowledgement. Callers bound this with
    /// their own spawn deadline.
    async fn start(&self, request: StartRequest) -> Result<WorkerRef, Error>;

    /// Terminate a worker: soft-stop first, hard kill once `grace` expires.
    ///
    /// Idempotent; stopping an already-gone worker succeeds.
    async fn stop(&self, worker: &WorkerRef, grace: Duration) -> Result<(), Error>;

    /// Report the substrate's view of a worker.
    async fn inspect(&self, worker: &WorkerRef) -> Result<WorkerState, Error>;

    /// Enumerate live workers with the meeting each belongs to.
    ///
    /// Used for reconciliation after an orchestrator restart.
    async fn list(&self) -> Result<Vec<(i32, WorkerRef)>, Error>;

    /// Stable identifier for logs, e.g. "docker" or "process".
    fn orchestrator_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Orch {}

        #[async_trait]
        impl Orchestrator for Orch {
            async fn start(&self, request: StartRequest) -> Result<WorkerRef, Error>;
            async fn stop(&self, worker: &WorkerRef, grace: Duration) -> Result<(), Error>;
            async fn inspect(&self, worker: &WorkerRef) -> Result<WorkerState, Error>;
            async fn list(&self) -> Result<Vec<(i32, WorkerRef)>, Error>;
            fn orchestrator_id(&self) -> &'static str;
        }
    }

    #[tokio::test]
    async fn test_trait_is_object_safe_and_mockable() {
        let mut mock = MockOrch::new();
        mock.expect_inspect()
            .with(eq(WorkerRef("w1".to_string())))
            .returning(|_| Ok(WorkerState::Running));
        mock.expect_orchestrator_id().return_const("mock");

        let orchestrator: Box<dyn Orchestrator> = Box::new(mock);
        let state = orchestrator
            .inspect(&WorkerRef("w1".to_string()))
            .await
            .unwrap();
        assert_eq!(state, WorkerState::Running);
        assert_eq!(orchestrator.orchestrator_id(), "mock");
    }
}
