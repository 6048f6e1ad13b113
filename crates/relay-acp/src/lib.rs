//! Agent Client Protocol bridge.
//!
//! [`TurnRelay`] turns one prompt into a run on the engine and streams the
//! agent's text and reasoning back as `session/update` chunks. [`AcpAgent`]
//! wraps it with the rest of the agent-side request handlers.

pub mod agent;
pub mod connection;
pub mod delta;
pub mod schema;
pub mod turn;

pub use agent::AcpAgent;
pub use connection::{ChannelConnection, NotifyError, ProtocolConnection};
pub use delta::DeltaState;
pub use schema::{ChunkKind, SessionNotification, SessionUpdate, StopReason};
pub use turn::TurnRelay;
