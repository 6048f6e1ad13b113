//! Shared types for the prompt turn relay: ids, the agent's message model,
//! protocol content blocks, error taxonomy and the collaborator traits the
//! relay is written against.

pub mod content;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod ports;
pub mod session;

pub use content::{join_prompt_text, ContentBlock};
pub use errors::{DirectoryError, RelayError, RunError};
pub use ids::{MessageId, RunId, SessionId};
pub use messages::{FinishReason, MessageEvent, MessagePart, Role, ToolCallPart, ToolResultPart};
pub use ports::{CompletionSignal, EventBus, MessageStream, RunEngine, RunOutcome, SessionDirectory};
pub use session::Session;
