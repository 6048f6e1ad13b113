//! In-process collaborators for the turn relay: a session directory, a
//! per-session event bus and a task-backed run engine.

pub mod bus;
pub mod engine;
pub mod mock;
pub mod sessions;

pub use bus::{EventPublisher, SessionBus};
pub use engine::{AgentWorker, RunContext, RunState, TaskRunEngine};
pub use sessions::MemorySessionDirectory;
