//! Chat platform client seam.
//!
//! The bot core never talks to a concrete platform SDK directly. Everything
//! it needs from the platform (role and channel CRUD, membership grants,
//! direct channels, message sends) goes through [`ChatClient`], so the
//! session engine and the enrollment saga can be exercised against test
//! doubles.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChannelId, GuildId, PermissionOverwrite, RoleId, UserId};

/// Error raised by a chat platform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ChatError(String);

impl ChatError {
    /// Create a new chat error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for chat platform calls.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Operations the core requires from the chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Create a role in a guild and return its identity.
    async fn create_role(&self, guild: &GuildId, name: &str) -> ChatResult<RoleId>;

    /// Delete a role from a guild.
    async fn delete_role(&self, guild: &GuildId, role: &RoleId) -> ChatResult<()>;

    /// Create a text channel with the given permission overwrites,
    /// optionally under a parent category channel.
    async fn create_channel(
        &self,
        guild: &GuildId,
        name: &str,
        parent: Option<&ChannelId>,
        overwrites: &[PermissionOverwrite],
    ) -> ChatResult<ChannelId>;

    /// Delete a channel.
    async fn delete_channel(&self, channel: &ChannelId) -> ChatResult<()>;

    /// Grant a user a role.
    async fn add_member_role(
        &self,
        guild: &GuildId,
        user: &UserId,
        role: &RoleId,
    ) -> ChatResult<()>;

    /// Revoke a role from a user.
    async fn remove_member_role(
        &self,
        guild: &GuildId,
        user: &UserId,
        role: &RoleId,
    ) -> ChatResult<()>;

    /// Resolve (or open) the direct channel for a user.
    async fn open_direct_channel(&self, user: &UserId) -> ChatResult<ChannelId>;

    /// Send a text message to a channel.
    async fn send_message(&self, channel: &ChannelId, text: &str) -> ChatResult<()>;
}
