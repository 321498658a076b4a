//! Implements the `/stop` command.
//!
//! This stops all bot actions, clears the queue, and disconnects the
//! bot from the current voice channel.

use tracing::instrument;

use crate::data::GetData;
use crate::BotError;
use crate::Context;

/// Stop the bot, delete the queue, and leave the call.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn stop(ctx: Context<'_>) -> Result<(), BotError> {
    // Stopping twice is harmless, so no session is not an error.
    if let Some(session) = ctx.existing_session().await? {
        session.stop().await?;
        ctx.data().sessions.remove(&session).await;
    }

    ctx.reply("Queue deleted.").await?;
    Ok(())
}
