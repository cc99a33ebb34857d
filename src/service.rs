//! Message dispatcher and top-level service glue.
//!
//! Routes every inbound transport message either into an existing
//! session's queue (direct channels) or through guild-level command
//! handling that may spawn new sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::catalog::CatalogIndex;
use crate::chat::ChatClient;
use crate::commands::course::{admin_commands, course_commands};
use crate::commands::guild::{guild_commands, GuildCommandContext};
use crate::commands::CommandTable;
use crate::config::Config;
use crate::error::Error;
use crate::model::{ChannelId, GuildContext, GuildId, UserId};
use crate::session::{InboundMessage, OpenedSession, SessionEngine, SessionRegistry};
use crate::store::CourseStore;
use crate::Result;

/// Direct-channel command that closes the session gracefully.
pub const CLOSE_COMMAND: &str = "!close";
/// Direct-channel command that force-kills the session.
pub const KILL_COMMAND: &str = "!kill";

const NO_SESSION_NOTICE: &str = "There is currently no active session on this channel. \
Please go to a server I administer to start a new session.";

const ADMIN_GREETING: &str = "Started an admin session.";

const EDIT_GREETING: &str = "Hello! I can help you manage your courses. \
Just enter these commands (without `!`):\n\
`search <terms>` to search the catalog\n\
`join <id>` to enroll in a course\n\
`leave <id>` to leave a course\n\
`list` to see your courses";

struct GuildEntry {
    ctx: GuildContext,
    table: Arc<CommandTable<GuildCommandContext>>,
}

/// The bot core: dispatcher, session engine, and guild table.
pub struct Service {
    chat: Arc<dyn ChatClient>,
    store: Arc<dyn CourseStore>,
    engine: SessionEngine,
    registry: Arc<SessionRegistry>,
    guilds: RwLock<HashMap<GuildId, GuildEntry>>,
}

impl Service {
    /// Assemble a service from its collaborators and configuration.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        store: Arc<dyn CourseStore>,
        index: Arc<dyn CatalogIndex>,
        config: &Config,
    ) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new());
        let engine = SessionEngine::new(
            Arc::clone(&chat),
            Arc::clone(&store),
            index,
            Arc::clone(&registry),
            config.session.idle_timeout(),
        );
        Arc::new(Self {
            chat,
            store,
            engine,
            registry,
            guilds: RwLock::new(HashMap::new()),
        })
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The course store.
    pub fn store(&self) -> &Arc<dyn CourseStore> {
        &self.store
    }

    /// Send a message through the chat client.
    pub async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.chat
            .send_message(channel, text)
            .await
            .map_err(Error::from)
    }

    /// Register a guild the service will accept commands from.
    pub fn attach_guild(&self, ctx: GuildContext) -> Result<()> {
        info!(guild = %ctx.id, "guild attached");
        let mut guilds = self.guilds.write().map_err(|_| Error::LockPoisoned)?;
        guilds.insert(
            ctx.id.clone(),
            GuildEntry {
                ctx,
                table: Arc::new(guild_commands()),
            },
        );
        Ok(())
    }

    /// Open an admin session for `owner`.
    pub async fn open_admin_session(
        &self,
        owner: &UserId,
        origin: GuildContext,
    ) -> Result<OpenedSession> {
        self.engine
            .open(owner, Some(origin), Arc::new(admin_commands()), ADMIN_GREETING)
            .await
    }

    /// Open a course-edit session for `owner`.
    pub async fn open_course_session(
        &self,
        owner: &UserId,
        origin: GuildContext,
    ) -> Result<OpenedSession> {
        self.engine
            .open(owner, Some(origin), Arc::new(course_commands()), EDIT_GREETING)
            .await
    }

    /// Route one inbound transport message.
    pub async fn handle_message(self: &Arc<Self>, message: InboundMessage) -> Result<()> {
        if message.from_bot {
            return Ok(());
        }
        match message.guild {
            None => self.handle_direct(message).await,
            Some(_) => self.handle_guild(message).await,
        }
    }

    /// Direct messages either control or feed the session on the channel.
    async fn handle_direct(&self, message: InboundMessage) -> Result<()> {
        let trimmed = message.content.trim();
        if trimmed.eq_ignore_ascii_case(CLOSE_COMMAND) || trimmed.eq_ignore_ascii_case(KILL_COMMAND)
        {
            let kill = trimmed.eq_ignore_ascii_case(KILL_COMMAND);
            let reason = if kill {
                "killed at your request"
            } else {
                "closed at your request"
            };
            return match self.registry.request_close(&message.channel, reason, kill) {
                Ok(()) => Ok(()),
                Err(Error::NoSuchSession(channel)) => self.send(&channel, NO_SESSION_NOTICE).await,
                Err(err) => Err(err),
            };
        }

        let channel = message.channel.clone();
        if !self.registry.deliver(&channel, message)? {
            return self.send(&channel, NO_SESSION_NOTICE).await;
        }
        Ok(())
    }

    /// Guild messages run through the guild's command table when prefixed.
    async fn handle_guild(self: &Arc<Self>, message: InboundMessage) -> Result<()> {
        let Some(guild_id) = message.guild.clone() else {
            return Ok(());
        };
        let (ctx, table) = {
            let guilds = self.guilds.read().map_err(|_| Error::LockPoisoned)?;
            let Some(entry) = guilds.get(&guild_id) else {
                debug!(guild = %guild_id, "message from unattached guild ignored");
                return Ok(());
            };
            (entry.ctx.clone(), Arc::clone(&entry.table))
        };

        let Some(line) = message.content.strip_prefix(&ctx.command_prefix) else {
            return Ok(());
        };
        let line = line.to_string();

        let command_ctx = GuildCommandContext {
            service: Arc::clone(self),
            guild: ctx,
            message,
        };
        match table.dispatch(command_ctx, &line).await {
            Ok(()) => Ok(()),
            // Non-command chatter and re-opened sessions are business as
            // usual at guild level; the user was already notified where
            // it matters.
            Err(Error::UnknownCommand) => Ok(()),
            Err(Error::SessionAlreadyActive(channel)) => {
                debug!(%channel, "session open refused, channel occupied");
                Ok(())
            }
            Err(err) => {
                warn!(guild = %guild_id, error = %err, "guild command failed");
                Ok(())
            }
        }
    }
}
