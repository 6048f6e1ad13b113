//! Collaborators the relay consumes but does not own.
//!
//! Each trait is the narrowest surface the turn relay needs. Production
//! implementations live in `relay-runtime`; tests substitute their own.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::oneshot;

use crate::errors::{DirectoryError, RunError};
use crate::ids::SessionId;
use crate::messages::MessageEvent;
use crate::session::Session;

/// Final result of one run.
pub type RunOutcome = Result<(), RunError>;

/// Resolves exactly once when a run ends. A dropped sender means the engine
/// went away without reporting.
pub type CompletionSignal = oneshot::Receiver<RunOutcome>;

/// Message events for a single run, ending when the run's output is
/// exhausted.
pub type MessageStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn create(&self, title: &str) -> Result<Session, DirectoryError>;
    async fn get(&self, id: &SessionId) -> Result<Session, DirectoryError>;
    async fn delete(&self, id: &SessionId) -> Result<(), DirectoryError>;
}

#[async_trait]
pub trait RunEngine: Send + Sync {
    /// Start a run for `session_id`. Returns once the run is accepted; the
    /// work itself proceeds in the background.
    async fn start(&self, session_id: &SessionId, prompt: String) -> Result<CompletionSignal, RunError>;

    /// Ask the active run for `session_id` to stop. Returns whether a run was
    /// signalled. The run reports the cancellation on its completion signal.
    fn cancel(&self, session_id: &SessionId) -> bool;
}

pub trait EventBus: Send + Sync {
    /// Open a read handle on the current run's events for `session_id`.
    ///
    /// Called right after a successful [`RunEngine::start`]; the stream must
    /// include events the run published before the subscription was made.
    fn subscribe(&self, session_id: &SessionId) -> MessageStream;
}
