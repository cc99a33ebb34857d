//! Session management module.
//!
//! One interactive command session per direct channel: registry,
//! lifecycle states, and the engine driving each session's loop.

mod engine;
mod registry;
mod state;

pub use engine::{OpenedSession, SessionContext, SessionEngine};
pub use registry::{CloseSignal, InboundMessage, SessionHandle, SessionRegistry};
pub use state::SessionState;
