//! # study-hall
//!
//! Core of a chat-platform bot that runs interactive, per-user command
//! sessions over direct channels and keeps course enrollment consistent
//! across the chat platform and a local store.
//!
//! Two subsystems carry the interesting behavior:
//!
//! - **Session engine** ([`session`]): one session per direct channel,
//!   each running as its own tokio task with an inbound queue, an idle
//!   deadline, and a bound command table. A process-wide registry
//!   enforces the single-session-per-channel invariant and gives the
//!   dispatcher atomic lookup-and-enqueue delivery.
//! - **Enrollment saga** ([`enroll`]): joining a course lazily provisions
//!   its external role and channel and keeps grants in sync with
//!   persisted memberships; every committed side effect has a recorded
//!   compensation that runs in reverse order on partial failure.
//!
//! The chat platform ([`chat::ChatClient`]) and the persistence layer
//! ([`store::CourseStore`]) are trait seams; [`memory::MemoryStore`]
//! ships for tests and embedders.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use study_hall::{Config, MemoryStore, Service, SubstringIndex};
//!
//! # fn chat_client() -> Arc<dyn study_hall::ChatClient> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> study_hall::Result<()> {
//!     let config = Config::load(None)?;
//!     study_hall::logging::try_init(&config.logging.level).ok();
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let service = Service::new(chat_client(), store, Arc::new(SubstringIndex::new()), &config);
//!     service.attach_guild(config.guild_context("my-guild".into()))?;
//!
//!     // Feed transport messages into `service.handle_message(..)`.
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod chat;
pub mod commands;
pub mod config;
pub mod enroll;
pub mod error;
pub mod logging;
pub mod memory;
pub mod model;
pub mod service;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use catalog::{CatalogIndex, SubstringIndex};
pub use chat::{ChatClient, ChatError};
pub use commands::CommandTable;
pub use config::Config;
pub use enroll::Enrollment;
pub use error::{Error, ProvisionStep, Result};
pub use memory::MemoryStore;
pub use model::{
    ChannelId, Course, CourseBinding, CourseId, CourseSummary, GuildContext, GuildId,
    PermissionOverwrite, RoleId, User, UserId,
};
pub use service::Service;
pub use session::{
    CloseSignal, InboundMessage, OpenedSession, SessionContext, SessionEngine, SessionRegistry,
    SessionState,
};
pub use store::{CourseStore, StoreError};
