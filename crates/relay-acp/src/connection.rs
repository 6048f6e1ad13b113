use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::schema::SessionNotification;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound half of a client connection.
///
/// Shared by every in-flight turn, so implementations must accept
/// concurrent callers.
#[async_trait]
pub trait ProtocolConnection: Send + Sync {
    async fn session_update(&self, notification: SessionNotification) -> Result<(), NotifyError>;
}

/// Connection that hands notifications to a transport task over a channel.
#[derive(Clone)]
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl ChannelConnection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProtocolConnection for ChannelConnection {
    async fn session_update(&self, notification: SessionNotification) -> Result<(), NotifyError> {
        self.tx.send(notification).map_err(|_| NotifyError::Closed)
    }
}
