//! Process-wide session registry.
//!
//! Maps the direct channel a session lives on to its handle, enforcing at
//! most one live session per channel. The registry is the only shared
//! mutable state between the dispatcher and session tasks, so every
//! check-then-act sequence (insert-if-absent, lookup-then-enqueue, remove)
//! runs under one lock acquisition. Enqueues use unbounded senders and
//! never await while the lock is held.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::{mpsc, watch};

use super::SessionState;
use crate::error::Error;
use crate::model::{ChannelId, GuildId, UserId};
use crate::Result;

/// A message delivered into a session's inbound queue.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Author of the message.
    pub author: UserId,
    /// Channel the message was sent on.
    pub channel: ChannelId,
    /// Guild the message originated from, if any.
    pub guild: Option<GuildId>,
    /// Whether the author is a bot account.
    pub from_bot: bool,
    /// Raw message text.
    pub content: String,
}

impl InboundMessage {
    /// Create a direct (non-guild) message.
    pub fn direct(author: impl Into<UserId>, channel: impl Into<ChannelId>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            channel: channel.into(),
            guild: None,
            from_bot: false,
            content: content.into(),
        }
    }

    /// Create a guild message.
    pub fn guild(
        author: impl Into<UserId>,
        channel: impl Into<ChannelId>,
        guild: impl Into<GuildId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            channel: channel.into(),
            guild: Some(guild.into()),
            from_bot: false,
            content: content.into(),
        }
    }
}

/// Request to terminate a session.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    /// Reason shown in the closing notice.
    pub reason: String,
    /// Whether this is a forced kill.
    pub kill: bool,
}

/// Registry-side handle to a live session.
pub struct SessionHandle {
    owner: UserId,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    stop: mpsc::Sender<CloseSignal>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        owner: UserId,
        inbound: mpsc::UnboundedSender<InboundMessage>,
        stop: mpsc::Sender<CloseSignal>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            owner,
            inbound,
            stop,
            state,
        }
    }

    /// Owner of the session.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Thread-safe map from channel identity to live session.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ChannelId, SessionHandle>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session on a channel.
    ///
    /// The occupancy check and the insert happen under one lock, so two
    /// concurrent opens on the same channel cannot both succeed.
    pub fn insert(&self, channel: ChannelId, handle: SessionHandle) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| Error::LockPoisoned)?;
        if sessions.contains_key(&channel) {
            return Err(Error::SessionAlreadyActive(channel));
        }
        sessions.insert(channel, handle);
        Ok(())
    }

    /// Remove a session from the registry.
    ///
    /// Called exactly once per session, from its cleanup.
    pub fn remove(&self, channel: &ChannelId) -> Result<Option<SessionHandle>> {
        let mut sessions = self.sessions.write().map_err(|_| Error::LockPoisoned)?;
        Ok(sessions.remove(channel))
    }

    /// Deliver a message into the session on `channel`.
    ///
    /// Lookup and enqueue run under the same lock acquisition, which is
    /// the atomicity the session engine requires of its dispatcher: a
    /// session still present in the map has not closed its queue yet,
    /// except for the narrow window inside cleanup, where a send fails
    /// and is reported as undeliverable, never lost silently into a dead
    /// queue.
    ///
    /// Returns `true` if the message was enqueued, `false` if no live
    /// session accepts messages on this channel.
    pub fn deliver(&self, channel: &ChannelId, message: InboundMessage) -> Result<bool> {
        let sessions = self.sessions.read().map_err(|_| Error::LockPoisoned)?;
        match sessions.get(channel) {
            Some(handle) => Ok(handle.inbound.send(message).is_ok()),
            None => Ok(false),
        }
    }

    /// Ask the session on `channel` to terminate.
    ///
    /// The signal is observed at the session loop's next wait point and
    /// takes priority over a pending idle timeout. Returns
    /// [`Error::NoSuchSession`] if no session exists; never blocks.
    pub fn request_close(&self, channel: &ChannelId, reason: impl Into<String>, kill: bool) -> Result<()> {
        let sessions = self.sessions.read().map_err(|_| Error::LockPoisoned)?;
        let handle = sessions
            .get(channel)
            .ok_or_else(|| Error::NoSuchSession(channel.clone()))?;
        let signal = CloseSignal {
            reason: reason.into(),
            kill,
        };
        // A full buffer means a close is already pending; that is enough.
        let _ = handle.stop.try_send(signal);
        Ok(())
    }

    /// Check if a session exists on a channel.
    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.contains_key(channel))
            .unwrap_or(false)
    }

    /// Current state of the session on `channel`, if one exists.
    pub fn state(&self, channel: &ChannelId) -> Option<SessionState> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(channel).map(SessionHandle::state))
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }
}
