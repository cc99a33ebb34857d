//! Guild-level commands: the entry points that spawn sessions.

use std::sync::Arc;

use crate::model::GuildContext;
use crate::service::Service;
use crate::session::InboundMessage;
use crate::Result;

use super::CommandTable;

/// Context handed to guild command handlers.
#[derive(Clone)]
pub struct GuildCommandContext {
    /// The running service.
    pub service: Arc<Service>,
    /// Guild the command was issued in.
    pub guild: GuildContext,
    /// The triggering message.
    pub message: InboundMessage,
}

/// Command set dispatched on prefixed guild messages.
pub fn guild_commands() -> CommandTable<GuildCommandContext> {
    let mut table = CommandTable::new();
    table.register("session admin", cmd_admin_session);
    table.register("edit", cmd_edit_session);
    table.register("ping", cmd_ping);
    table
}

async fn cmd_admin_session(ctx: GuildCommandContext, _args: Vec<String>) -> Result<()> {
    let allowed = ctx.guild.admin_user.as_ref() == Some(&ctx.message.author);
    if !allowed {
        return ctx
            .service
            .send(&ctx.message.channel, "Access denied.")
            .await;
    }
    ctx.service
        .open_admin_session(&ctx.message.author, ctx.guild.clone())
        .await
        .map(|_| ())
}

async fn cmd_edit_session(ctx: GuildCommandContext, _args: Vec<String>) -> Result<()> {
    ctx.service
        .open_course_session(&ctx.message.author, ctx.guild.clone())
        .await
        .map(|_| ())
}

async fn cmd_ping(ctx: GuildCommandContext, _args: Vec<String>) -> Result<()> {
    ctx.service.send(&ctx.message.channel, "Pong!").await
}
