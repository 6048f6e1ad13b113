//! The prompt turn relay.
//!
//! A turn validates the session, starts a run, then waits on two sources at
//! once: the run's completion signal and the session's event stream. Text and
//! reasoning snapshots from assistant messages are diffed and forwarded to
//! the client as chunks until one of the sources ends the turn.

use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use parking_lot::RwLock;
use relay_core::{
    join_prompt_text, CompletionSignal, ContentBlock, EventBus, MessageEvent, MessagePart, MessageStream,
    RelayError, Role, RunEngine, RunError, SessionDirectory, SessionId,
};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::connection::ProtocolConnection;
use crate::delta::DeltaState;
use crate::schema::{ChunkKind, SessionNotification, SessionUpdate, StopReason};

pub struct TurnRelay {
    sessions: Arc<dyn SessionDirectory>,
    engine: Arc<dyn RunEngine>,
    bus: Arc<dyn EventBus>,
    connection: RwLock<Option<Arc<dyn ProtocolConnection>>>,
}

impl TurnRelay {
    pub fn new(sessions: Arc<dyn SessionDirectory>, engine: Arc<dyn RunEngine>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            sessions,
            engine,
            bus,
            connection: RwLock::new(None),
        }
    }

    /// Attach the client connection. Until one is attached, turns still run
    /// and track deltas but nothing is sent.
    pub fn set_connection(&self, connection: Arc<dyn ProtocolConnection>) {
        *self.connection.write() = Some(connection);
    }

    pub fn has_connection(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Run one prompt turn to completion.
    ///
    /// Fails only before the relay loop starts (unknown session, run
    /// rejected). Once running, every outcome is a stop reason.
    #[instrument(skip(self, prompt), fields(session_id = %session_id, fragments = prompt.len()))]
    pub async fn start_turn(&self, session_id: &SessionId, prompt: &[ContentBlock]) -> Result<StopReason, RelayError> {
        let session = self.sessions.get(session_id).await?;

        let text = join_prompt_text(prompt);
        let done = self
            .engine
            .start(&session.id, text)
            .await
            .map_err(RelayError::RunStartFailed)?;
        let events = self.bus.subscribe(&session.id);
        info!("turn started");

        let stop_reason = self.relay(&session.id, done, events).await;
        info!(?stop_reason, "turn finished");
        Ok(stop_reason)
    }

    /// Ask the session's run to stop. The turn itself reports `Cancelled`
    /// once the run acknowledges.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn cancel_turn(&self, session_id: &SessionId) -> Result<(), RelayError> {
        let session = self.sessions.get(session_id).await?;
        if self.engine.cancel(&session.id) {
            info!("turn cancellation requested");
        } else {
            debug!("cancel requested with no active run");
        }
        Ok(())
    }

    async fn relay(&self, session_id: &SessionId, mut done: CompletionSignal, mut events: MessageStream) -> StopReason {
        let mut delta = DeltaState::new();
        loop {
            tokio::select! {
                outcome = &mut done => {
                    return match outcome {
                        Ok(Ok(())) => {
                            self.drain_buffered(session_id, &mut delta, &mut events).await;
                            StopReason::EndTurn
                        }
                        Ok(Err(e)) => stop_for_failure(&e),
                        Err(_) => {
                            warn!("run engine dropped the completion signal");
                            StopReason::Cancelled
                        }
                    };
                }
                event = events.next() => match event {
                    Some(event) => self.forward(session_id, &mut delta, &event).await,
                    None => return stop_after_bus_closed(&mut done),
                },
            }
        }
    }

    /// Forward events that were already queued when the run reported
    /// success. Never waits for new ones.
    async fn drain_buffered(&self, session_id: &SessionId, delta: &mut DeltaState, events: &mut MessageStream) {
        while let Some(Some(event)) = tokio::task::unconstrained(events.next()).now_or_never() {
            self.forward(session_id, delta, &event).await;
        }
    }

    async fn forward(&self, session_id: &SessionId, delta: &mut DeltaState, event: &MessageEvent) {
        if event.role != Role::Assistant {
            trace!(role = ?event.role, "ignoring non-assistant event");
            return;
        }
        for part in &event.parts {
            match part {
                MessagePart::Text { text } => {
                    if let Some(chunk) = delta.text(text) {
                        self.emit(session_id, ChunkKind::Message, chunk).await;
                    }
                }
                MessagePart::Reasoning { thinking } => {
                    if let Some(chunk) = delta.thinking(thinking) {
                        self.emit(session_id, ChunkKind::Thought, chunk).await;
                    }
                }
                MessagePart::ToolCall(_)
                | MessagePart::ToolResult(_)
                | MessagePart::Image { .. }
                | MessagePart::Binary { .. }
                | MessagePart::Finish { .. } => {
                    trace!(part = part.kind(), "no notification for part");
                }
            }
        }
    }

    async fn emit(&self, session_id: &SessionId, kind: ChunkKind, text: &str) {
        let Some(connection) = self.connection.read().clone() else {
            trace!(kind = kind.as_str(), "no connection attached, chunk dropped");
            return;
        };
        let notification = SessionNotification {
            session_id: session_id.clone(),
            update: SessionUpdate::chunk(kind, text),
        };
        if let Err(e) = connection.session_update(notification).await {
            error!(kind = kind.as_str(), error = %e, "failed to send session update");
        }
    }
}

fn stop_for_failure(error: &RunError) -> StopReason {
    if error.is_cancellation() {
        info!("run cancelled");
    } else {
        warn!(error = %error, kind = error.error_kind(), "run failed, reporting as cancelled");
    }
    StopReason::Cancelled
}

/// The event stream ended. The engine resolves completion before closing
/// the stream, so a cancellation that raced the closure is visible here.
fn stop_after_bus_closed(done: &mut CompletionSignal) -> StopReason {
    match done.try_recv() {
        Ok(Err(e)) => stop_for_failure(&e),
        Ok(Ok(())) | Err(oneshot::error::TryRecvError::Empty) => StopReason::EndTurn,
        Err(oneshot::error::TryRecvError::Closed) => {
            warn!("run engine dropped the completion signal");
            StopReason::Cancelled
        }
    }
}
