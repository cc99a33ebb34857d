//! Session engine: opening sessions and driving their processing loops.
//!
//! Each session runs as its own tokio task and owns its inbound queue and
//! idle deadline outright. The loop waits on exactly three event sources
//! (close signal, idle deadline, inbound message), with close given priority
//! over the deadline, and both over plain input. The deadline is only
//! polled between commands, so a slow command can never race a spurious
//! expiry; it is re-armed for the full duration after each dispatch
//! returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use super::registry::{CloseSignal, InboundMessage, SessionHandle, SessionRegistry};
use super::SessionState;
use crate::catalog::CatalogIndex;
use crate::chat::ChatClient;
use crate::commands::CommandTable;
use crate::error::Error;
use crate::model::{ChannelId, GuildContext, UserId};
use crate::store::CourseStore;
use crate::Result;

/// Notice sent when a session is opened on an occupied channel.
const ALREADY_ACTIVE_NOTICE: &str = "There is already an active session on this channel. \
Use !close to close it before opening a new one. \
If the session is stuck, use !kill (not recommended).";

/// Reason string used when the idle deadline elapses.
const EXPIRY_REASON: &str = "session expired";

/// A session returned from [`SessionEngine::open`].
///
/// The state receiver outlives the registry entry, so terminal states
/// remain observable after cleanup has removed the session.
#[derive(Debug)]
pub struct OpenedSession {
    /// Direct channel the session is bound to.
    pub channel: ChannelId,
    /// Live view of the session's lifecycle state.
    pub state: watch::Receiver<SessionState>,
}

/// Context handed to every session command handler.
///
/// Carries exactly the references a handler needs: the session's channel
/// and owner, the guild it was spawned from, the triggering message, and
/// the collaborator seams.
#[derive(Clone)]
pub struct SessionContext {
    /// Direct channel the session prints to.
    pub channel: ChannelId,
    /// Owner of the session.
    pub owner: UserId,
    /// Guild the session was spawned from; none for direct sessions.
    pub origin: Option<GuildContext>,
    /// The message being dispatched.
    pub message: InboundMessage,
    /// Chat platform client.
    pub chat: Arc<dyn ChatClient>,
    /// Course store.
    pub store: Arc<dyn CourseStore>,
    /// Catalog lookup.
    pub index: Arc<dyn CatalogIndex>,
}

impl SessionContext {
    /// Print a message to the session's channel.
    pub async fn print(&self, text: &str) -> Result<()> {
        self.chat
            .send_message(&self.channel, text)
            .await
            .map_err(Error::from)
    }
}

/// Opens sessions and spawns their processing loops.
pub struct SessionEngine {
    chat: Arc<dyn ChatClient>,
    store: Arc<dyn CourseStore>,
    index: Arc<dyn CatalogIndex>,
    registry: Arc<SessionRegistry>,
    idle_timeout: Duration,
}

impl SessionEngine {
    /// Create a new engine.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        store: Arc<dyn CourseStore>,
        index: Arc<dyn CatalogIndex>,
        registry: Arc<SessionRegistry>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            chat,
            store,
            index,
            registry,
            idle_timeout,
        }
    }

    /// The registry this engine registers sessions in.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a session for `owner` on their direct channel.
    ///
    /// Resolves the direct channel, registers the session (failing with
    /// [`Error::SessionAlreadyActive`] if the channel is occupied, in
    /// which case the existing session is untouched and a notice is sent),
    /// emits the greeting, and spawns the processing loop.
    pub async fn open(
        &self,
        owner: &UserId,
        origin: Option<GuildContext>,
        table: Arc<CommandTable<SessionContext>>,
        greeting: &str,
    ) -> Result<OpenedSession> {
        let channel = self.chat.open_direct_channel(owner).await?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(SessionState::Created);

        let handle = SessionHandle::new(owner.clone(), inbound_tx, stop_tx, state_rx.clone());
        if let Err(err) = self.registry.insert(channel.clone(), handle) {
            if let Err(notice_err) = self.chat.send_message(&channel, ALREADY_ACTIVE_NOTICE).await {
                warn!(%channel, error = %notice_err, "failed to send already-active notice");
            }
            return Err(err);
        }

        if let Err(err) = self.chat.send_message(&channel, greeting).await {
            warn!(%channel, error = %err, "failed to send session greeting");
        }

        let worker = SessionWorker {
            channel: channel.clone(),
            owner: owner.clone(),
            origin,
            table,
            chat: Arc::clone(&self.chat),
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
            registry: Arc::clone(&self.registry),
            idle_timeout: self.idle_timeout,
        };
        tokio::spawn(worker.run(inbound_rx, stop_rx, state_tx));

        info!(%channel, %owner, "session opened");
        Ok(OpenedSession {
            channel,
            state: state_rx,
        })
    }
}

/// State owned by a session's task.
struct SessionWorker {
    channel: ChannelId,
    owner: UserId,
    origin: Option<GuildContext>,
    table: Arc<CommandTable<SessionContext>>,
    chat: Arc<dyn ChatClient>,
    store: Arc<dyn CourseStore>,
    index: Arc<dyn CatalogIndex>,
    registry: Arc<SessionRegistry>,
    idle_timeout: Duration,
}

impl SessionWorker {
    async fn run(
        self,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
        mut stop: mpsc::Receiver<CloseSignal>,
        state: watch::Sender<SessionState>,
    ) {
        let _ = state.send(SessionState::Active);
        let mut deadline = Instant::now() + self.idle_timeout;

        let (terminal, reason) = loop {
            tokio::select! {
                biased;

                signal = stop.recv() => {
                    let signal = signal.unwrap_or_else(|| CloseSignal {
                        reason: "session aborted".to_string(),
                        kill: true,
                    });
                    let terminal = if signal.kill {
                        SessionState::Killed
                    } else {
                        SessionState::Closed
                    };
                    break (terminal, signal.reason);
                }

                _ = time::sleep_until(deadline) => {
                    break (SessionState::Expired, EXPIRY_REASON.to_string());
                }

                message = inbound.recv() => {
                    match message {
                        Some(message) => {
                            if let Err(reason) = self.handle_message(message).await {
                                break (SessionState::Closed, reason);
                            }
                            // Re-arm only after the command finished.
                            deadline = Instant::now() + self.idle_timeout;
                        }
                        // All senders gone while still registered; treat
                        // as a forced termination.
                        None => break (SessionState::Killed, "inbound queue dropped".to_string()),
                    }
                }
            }
        };

        self.cleanup(&state, &mut inbound, terminal, &reason).await;
    }

    /// Dispatch one inbound message.
    ///
    /// Returns `Err(reason)` only when the session's own channel has
    /// become unreachable and the loop must shut down.
    async fn handle_message(&self, message: InboundMessage) -> std::result::Result<(), String> {
        let line = message.content.to_lowercase();
        let ctx = SessionContext {
            channel: self.channel.clone(),
            owner: self.owner.clone(),
            origin: self.origin.clone(),
            message,
            chat: Arc::clone(&self.chat),
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
        };

        match self.table.dispatch(ctx, &line).await {
            Ok(()) => Ok(()),
            Err(err) => match self.report_command_error(err).await {
                Ok(()) => Ok(()),
                Err(report_err) => {
                    warn!(channel = %self.channel, error = %report_err, "session channel unreachable");
                    Err("channel unreachable".to_string())
                }
            },
        }
    }

    /// Map a classified command error to a user-facing message.
    ///
    /// Internal detail is logged, never shown, except for business-level
    /// errors which are rendered with their domain meaning.
    async fn report_command_error(&self, err: Error) -> Result<()> {
        let notice = match &err {
            Error::UnknownCommand => "Unknown command.".to_string(),
            Error::InvalidArguments(hint) => {
                format!("That command does not support those arguments: {hint}")
            }
            Error::AlreadyJoined => "You are already enrolled in that course.".to_string(),
            Error::NotJoined => "You are not enrolled in that course.".to_string(),
            Error::Compensation { .. } => {
                // Inconsistent external/local state; must stand out in the logs.
                error!(channel = %self.channel, error = %err, "compensation failure, state may be inconsistent");
                "Something went wrong while executing your command. \
                 If this keeps happening, please contact an administrator."
                    .to_string()
            }
            Error::Provisioning { .. } | Error::Persistence(_) => {
                error!(channel = %self.channel, error = %err, "command failed against external collaborator");
                "Something went wrong while executing your command. Please try again later."
                    .to_string()
            }
            other => {
                error!(channel = %self.channel, error = %other, "error while executing a command");
                "Uh oh! An error occurred while executing your command. \
                 If this issue persists please file an error report."
                    .to_string()
            }
        };
        self.chat
            .send_message(&self.channel, &notice)
            .await
            .map_err(Error::from)
    }

    /// Tear the session down. Runs exactly once, at loop exit.
    async fn cleanup(
        &self,
        state: &watch::Sender<SessionState>,
        inbound: &mut mpsc::UnboundedReceiver<InboundMessage>,
        terminal: SessionState,
        reason: &str,
    ) {
        // Deregister before publishing the terminal state, so an observer
        // that sees a terminal state can rely on delivery being refused.
        match self.registry.remove(&self.channel) {
            Ok(Some(_)) => {}
            Ok(None) => warn!(channel = %self.channel, "session was not in the registry at cleanup"),
            Err(err) => error!(channel = %self.channel, error = %err, "failed to deregister session"),
        }

        let _ = state.send(terminal);

        // No further sends are possible once the queue is closed; drain
        // whatever raced in before deregistration.
        inbound.close();
        while inbound.try_recv().is_ok() {}

        let notice = format!("Session is now closed.\nReason: {reason}");
        if let Err(err) = self.chat.send_message(&self.channel, &notice).await {
            debug!(channel = %self.channel, error = %err, "failed to send closing notice");
        }

        info!(channel = %self.channel, state = ?terminal, reason, "session finished");
    }
}
