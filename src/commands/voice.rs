//! Implements the `/join`, `/summon` and `/leave` commands.

use tracing::instrument;

use super::connected_session;
use super::ensure_free;
use crate::data::GetData;
use crate::lib::call;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Join your voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn join(ctx: Context<'_>) -> Result<(), BotError> {
    let channel = call::author_channel(&ctx)?;
    let session = ctx.session().await?;
    ensure_free(&session, channel)?;

    session.join(channel).await?;
    ctx.reply(format!("Joined <#{channel}>.")).await?;
    Ok(())
}

/// Bring the bot to a voice channel, even if it's busy elsewhere.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn summon(
    ctx: Context<'_>,
    #[description = "Channel to join, defaults to yours"]
    #[channel_types("Voice", "Stage")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), BotError> {
    let channel = match channel {
        Some(channel) => channel.id,
        None => call::author_channel(&ctx)?,
    };

    let session = ctx.session().await?;
    session.join(channel).await?;
    ctx.reply(format!("Moved to <#{channel}>.")).await?;
    Ok(())
}

/// Clear the queue and leave the voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn leave(ctx: Context<'_>) -> Result<(), BotError> {
    let session = connected_session(&ctx).await?;

    session.stop().await?;
    ctx.data().sessions.remove(&session).await;

    ctx.reply("Bye!").await?;
    Ok(())
}
