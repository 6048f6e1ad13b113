//! Task-backed run engine.
//!
//! Each accepted run gets a cancellation token, a fresh bus channel and a
//! spawned task driving an [`AgentWorker`]. A session has at most one active
//! run; a second `start` is rejected until the first has fully wound down.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_core::{CompletionSignal, RunEngine, RunError, RunId, RunOutcome, SessionId};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventPublisher, SessionBus};

/// Everything a worker needs for one run.
pub struct RunContext {
    pub session_id: SessionId,
    pub run_id: RunId,
    pub prompt: String,
    pub publisher: EventPublisher,
    pub cancel: CancellationToken,
}

/// The agent's execution loop, as seen by the engine.
///
/// Implementations publish cumulative message snapshots through
/// `ctx.publisher` and should return [`RunError::Cancelled`] promptly once
/// `ctx.cancel` fires.
#[async_trait]
pub trait AgentWorker: Send + Sync {
    async fn run(&self, ctx: RunContext) -> RunOutcome;
}

/// Current run state for a session.
#[derive(Debug, Clone)]
pub struct RunState {
    pub is_running: bool,
    pub run_id: Option<RunId>,
}

struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
    started_at: Instant,
}

pub struct TaskRunEngine {
    worker: Arc<dyn AgentWorker>,
    bus: Arc<SessionBus>,
    active_runs: Arc<DashMap<SessionId, ActiveRun>>,
}

impl TaskRunEngine {
    pub fn new(worker: Arc<dyn AgentWorker>, bus: Arc<SessionBus>) -> Self {
        Self {
            worker,
            bus,
            active_runs: Arc::new(DashMap::new()),
        }
    }

    pub fn state(&self, session_id: &SessionId) -> RunState {
        match self.active_runs.get(session_id) {
            Some(run) => RunState {
                is_running: true,
                run_id: Some(run.run_id.clone()),
            },
            None => RunState {
                is_running: false,
                run_id: None,
            },
        }
    }

    pub fn is_running(&self, session_id: &SessionId) -> bool {
        self.active_runs.contains_key(session_id)
    }

    /// Signal every active run. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in self.active_runs.iter() {
            entry.value().cancel.cancel();
            count += 1;
        }
        count
    }
}

#[async_trait]
impl RunEngine for TaskRunEngine {
    async fn start(&self, session_id: &SessionId, prompt: String) -> Result<CompletionSignal, RunError> {
        let run_id = RunId::new();
        let cancel = CancellationToken::new();

        match self.active_runs.entry(session_id.clone()) {
            Entry::Occupied(_) => return Err(RunError::SessionBusy(session_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(ActiveRun {
                    run_id: run_id.clone(),
                    cancel: cancel.clone(),
                    started_at: Instant::now(),
                });
            }
        }

        let publisher = self.bus.open(session_id, &run_id);
        let (done_tx, done_rx) = oneshot::channel();

        let ctx = RunContext {
            session_id: session_id.clone(),
            run_id: run_id.clone(),
            prompt,
            publisher,
            cancel: cancel.clone(),
        };
        let worker = Arc::clone(&self.worker);
        let bus = Arc::clone(&self.bus);
        let active_runs = Arc::clone(&self.active_runs);
        let session_id = session_id.clone();

        tracing::info!(session_id = %session_id, run_id = %run_id, "run started");

        tokio::spawn(async move {
            let mut outcome = worker.run(ctx).await;
            if outcome.is_ok() && cancel.is_cancelled() {
                outcome = Err(RunError::Cancelled);
            }

            let elapsed_ms = active_runs
                .remove_if(&session_id, |_, run| run.run_id == run_id)
                .map(|(_, run)| run.started_at.elapsed().as_millis() as u64)
                .unwrap_or_default();

            match &outcome {
                Ok(()) => tracing::info!(session_id = %session_id, run_id = %run_id, elapsed_ms, "run finished"),
                Err(e) if e.is_cancellation() => {
                    tracing::info!(session_id = %session_id, run_id = %run_id, elapsed_ms, "run cancelled")
                }
                Err(e) => tracing::warn!(
                    session_id = %session_id,
                    run_id = %run_id,
                    error = %e,
                    kind = e.error_kind(),
                    "run failed"
                ),
            }

            // Resolve before closing the channel: a subscriber that sees the
            // end of stream can then read the outcome without waiting.
            if done_tx.send(outcome).is_err() {
                tracing::debug!(session_id = %session_id, "no one waiting on run completion");
            }
            bus.close(&session_id, &run_id);
        });

        Ok(done_rx)
    }

    fn cancel(&self, session_id: &SessionId) -> bool {
        match self.active_runs.get(session_id) {
            Some(run) => {
                run.cancel.cancel();
                tracing::info!(session_id = %session_id, run_id = %run.run_id, "run cancellation requested");
                true
            }
            None => false,
        }
    }
}
