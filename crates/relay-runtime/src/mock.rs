use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{MessageEvent, MessageId, MessagePart, RunError, RunOutcome};

use crate::engine::{AgentWorker, RunContext};

/// One scripted action of a [`ScriptedWorker`] run.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// Append to the assistant text and publish the accumulated snapshot.
    Text(String),
    /// Append to the reasoning and publish the accumulated snapshot.
    Thinking(String),
    /// Publish an event verbatim.
    Publish(MessageEvent),
    Delay(Duration),
    /// End the run with this error.
    Fail(RunError),
    /// Park until the run is cancelled, then end with [`RunError::Cancelled`].
    WaitForCancel,
}

/// Worker that replays the same script on every run, for deterministic
/// tests without a model behind it.
pub struct ScriptedWorker {
    steps: Vec<ScriptStep>,
    prompts: Mutex<Vec<String>>,
    run_count: AtomicUsize,
}

impl ScriptedWorker {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            prompts: Mutex::new(Vec::new()),
            run_count: AtomicUsize::new(0),
        }
    }

    /// Convenience: stream `chunks` as successive text snapshots.
    pub fn text_chunks(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| ScriptStep::Text((*c).to_string())).collect())
    }

    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::Relaxed)
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl AgentWorker for ScriptedWorker {
    async fn run(&self, ctx: RunContext) -> RunOutcome {
        let _ = self.run_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(ctx.prompt.clone());

        let message_id = MessageId::new();
        let mut text = String::new();
        let mut thinking = String::new();

        for step in &self.steps {
            if ctx.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            match step {
                ScriptStep::Text(chunk) | ScriptStep::Thinking(chunk) => {
                    if matches!(step, ScriptStep::Text(_)) {
                        text.push_str(chunk);
                    } else {
                        thinking.push_str(chunk);
                    }
                    let mut parts = Vec::new();
                    if !thinking.is_empty() {
                        parts.push(MessagePart::reasoning(thinking.clone()));
                    }
                    if !text.is_empty() {
                        parts.push(MessagePart::text(text.clone()));
                    }
                    let event =
                        MessageEvent::assistant(ctx.session_id.clone(), parts).with_message_id(message_id.clone());
                    let _ = ctx.publisher.publish(event);
                }
                ScriptStep::Publish(event) => {
                    let _ = ctx.publisher.publish(event.clone());
                }
                ScriptStep::Delay(duration) => {
                    tokio::select! {
                        () = tokio::time::sleep(*duration) => {}
                        () = ctx.cancel.cancelled() => return Err(RunError::Cancelled),
                    }
                }
                ScriptStep::Fail(error) => return Err(error.clone()),
                ScriptStep::WaitForCancel => {
                    ctx.cancel.cancelled().await;
                    return Err(RunError::Cancelled);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_core::{EventBus, RunEngine, SessionId};
    use tokio_stream::StreamExt;

    use super::*;
    use crate::bus::SessionBus;
    use crate::engine::TaskRunEngine;

    #[tokio::test]
    async fn snapshots_accumulate_per_kind() {
        let worker = Arc::new(ScriptedWorker::new(vec![
            ScriptStep::Thinking("hmm".into()),
            ScriptStep::Text("Hel".into()),
            ScriptStep::Text("lo".into()),
        ]));
        let bus = Arc::new(SessionBus::new(16));
        let engine = TaskRunEngine::new(worker.clone(), Arc::clone(&bus));
        let sid = SessionId::new();

        let done = engine.start(&sid, "hi ".into()).await.unwrap();
        let events: Vec<MessageEvent> = bus.subscribe(&sid).collect().await;
        done.await.unwrap().unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].reasoning(), Some("hmm"));
        assert_eq!(events[0].text(), None);
        assert_eq!(events[2].text(), Some("Hello"));
        assert_eq!(events[2].reasoning(), Some("hmm"));
        assert!(events.iter().all(|e| e.message_id == events[0].message_id));
        assert_eq!(worker.prompts(), vec!["hi ".to_string()]);
        assert_eq!(worker.run_count(), 1);
    }
}
