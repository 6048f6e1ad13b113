//! Per-session run channels.
//!
//! The engine opens a channel when a run starts and closes it when the run's
//! output is exhausted. A receiver is parked at open time so the first
//! subscriber sees everything published since the run began, even if the run
//! raced ahead of the subscription or already finished.

use dashmap::DashMap;
use relay_core::{EventBus, MessageEvent, MessageStream, RunId, SessionId};
use relay_settings::RuntimeSettings;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

struct RunChannel {
    run_id: RunId,
    /// Dropped on close; subscribers see the end of stream once publishers
    /// are gone too.
    sender: Option<broadcast::Sender<MessageEvent>>,
    parked: Option<broadcast::Receiver<MessageEvent>>,
}

impl RunChannel {
    fn is_spent(&self) -> bool {
        self.sender.is_none() && self.parked.is_none()
    }
}

pub struct SessionBus {
    capacity: usize,
    channels: DashMap<SessionId, RunChannel>,
}

/// Write half of a run channel, handed to the run's worker.
#[derive(Clone)]
pub struct EventPublisher {
    session_id: SessionId,
    tx: broadcast::Sender<MessageEvent>,
}

impl EventPublisher {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Publish a snapshot. Returns how many subscribers will see it.
    pub fn publish(&self, event: MessageEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl SessionBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
        }
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self::new(settings.event_buffer_size)
    }

    /// Open a fresh channel for `run_id`, replacing whatever the session had.
    pub fn open(&self, session_id: &SessionId, run_id: &RunId) -> EventPublisher {
        let (tx, parked) = broadcast::channel(self.capacity);
        self.channels.insert(
            session_id.clone(),
            RunChannel {
                run_id: run_id.clone(),
                sender: Some(tx.clone()),
                parked: Some(parked),
            },
        );
        EventPublisher {
            session_id: session_id.clone(),
            tx,
        }
    }

    /// Close the channel opened for `run_id`. A newer run's channel is left
    /// alone.
    pub fn close(&self, session_id: &SessionId, run_id: &RunId) {
        if let Some(mut channel) = self.channels.get_mut(session_id) {
            if channel.run_id == *run_id {
                channel.sender = None;
            }
        }
        self.channels.remove_if(session_id, |_, c| c.is_spent());
    }

    pub fn is_open(&self, session_id: &SessionId) -> bool {
        self.channels
            .get(session_id)
            .is_some_and(|c| c.sender.is_some())
    }
}

impl EventBus for SessionBus {
    fn subscribe(&self, session_id: &SessionId) -> MessageStream {
        let receiver = self.channels.get_mut(session_id).and_then(|mut channel| {
            channel
                .parked
                .take()
                .or_else(|| channel.sender.as_ref().map(broadcast::Sender::subscribe))
        });
        self.channels.remove_if(session_id, |_, c| c.is_spent());

        let Some(receiver) = receiver else {
            tracing::debug!(session_id = %session_id, "no run channel, subscription ends immediately");
            return Box::pin(tokio_stream::empty::<MessageEvent>());
        };

        let session_id = session_id.clone();
        Box::pin(BroadcastStream::new(receiver).filter_map(move |item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(session_id = %session_id, skipped, "subscriber lagged, skipped snapshots");
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut stream: MessageStream) -> Vec<MessageEvent> {
        let mut out = Vec::new();
        while let Some(e) = stream.next().await {
            out.push(e);
        }
        out
    }

    #[tokio::test]
    async fn first_subscriber_sees_events_published_before_subscribing() {
        let bus = SessionBus::new(16);
        let sid = SessionId::new();
        let run = RunId::new();
        let publisher = bus.open(&sid, &run);

        publisher.publish(MessageEvent::assistant_text(sid.clone(), "early"));
        let stream = bus.subscribe(&sid);
        publisher.publish(MessageEvent::assistant_text(sid.clone(), "early and late"));

        drop(publisher);
        bus.close(&sid, &run);

        let texts: Vec<_> = collect(stream).await.iter().map(|e| e.text().unwrap().to_string()).collect();
        assert_eq!(texts, vec!["early", "early and late"]);
    }

    #[tokio::test]
    async fn subscribe_after_close_still_drains_backlog() {
        let bus = SessionBus::new(16);
        let sid = SessionId::new();
        let run = RunId::new();
        let publisher = bus.open(&sid, &run);
        publisher.publish(MessageEvent::assistant_text(sid.clone(), "done already"));
        drop(publisher);
        bus.close(&sid, &run);

        let events = collect(bus.subscribe(&sid)).await;
        assert_eq!(events.len(), 1);
        assert!(!bus.is_open(&sid));
        assert!(bus.channels.is_empty());
    }

    #[tokio::test]
    async fn subscribe_without_run_ends_immediately() {
        let bus = SessionBus::new(16);
        assert!(collect(bus.subscribe(&SessionId::new())).await.is_empty());
    }

    #[tokio::test]
    async fn stale_close_does_not_touch_newer_run() {
        let bus = SessionBus::new(16);
        let sid = SessionId::new();
        let old_run = RunId::new();
        let new_run = RunId::new();
        let _old = bus.open(&sid, &old_run);
        let _new = bus.open(&sid, &new_run);

        bus.close(&sid, &old_run);
        assert!(bus.is_open(&sid));

        bus.close(&sid, &new_run);
        assert!(!bus.is_open(&sid));
    }

    #[tokio::test]
    async fn runs_are_scoped_per_session() {
        let bus = SessionBus::new(16);
        let a = SessionId::new();
        let b = SessionId::new();
        let run_a = RunId::new();
        let run_b = RunId::new();
        let pub_a = bus.open(&a, &run_a);
        let pub_b = bus.open(&b, &run_b);
        let stream_a = bus.subscribe(&a);

        pub_b.publish(MessageEvent::assistant_text(b.clone(), "for b"));
        pub_a.publish(MessageEvent::assistant_text(a.clone(), "for a"));
        drop((pub_a, pub_b));
        bus.close(&a, &run_a);
        bus.close(&b, &run_b);

        let events = collect(stream_a).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, a);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_but_keeps_latest() {
        let bus = SessionBus::new(2);
        let sid = SessionId::new();
        let run = RunId::new();
        let publisher = bus.open(&sid, &run);
        let mut text = String::new();
        for word in ["a", "b", "c", "d", "e"] {
            text.push_str(word);
            publisher.publish(MessageEvent::assistant_text(sid.clone(), text.clone()));
        }
        drop(publisher);
        bus.close(&sid, &run);

        let events = collect(bus.subscribe(&sid)).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events.last().unwrap().text(), Some("abcde"));
    }
}
