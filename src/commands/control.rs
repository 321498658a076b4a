//! Playback controls: `/pause`, `/resume`, `/volume` and `/loop`.

use tracing::instrument;

use super::playing_session;
use crate::error::UserError;
use crate::BotError;
use crate::Context;

/// Pause the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn pause(ctx: Context<'_>) -> Result<(), BotError> {
    let session = playing_session(&ctx).await?;

    let reply = if session.pause().await? {
        "Paused."
    } else {
        "Already paused."
    };
    ctx.reply(reply).await?;
    Ok(())
}

/// Resume the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn resume(ctx: Context<'_>) -> Result<(), BotError> {
    let session = playing_session(&ctx).await?;

    let reply = if session.resume().await? {
        "Resumed."
    } else {
        "Not paused."
    };
    ctx.reply(reply).await?;
    Ok(())
}

/// Change the volume, starting with the next track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent, from 0 to 100"] volume: i64,
) -> Result<(), BotError> {
    let fraction = volume_fraction(volume)?;
    let session = playing_session(&ctx).await?;

    session.set_volume(fraction);
    ctx.reply(format!("Volume set to {volume}%.")).await?;
    Ok(())
}

/// Replay the current track until turned off.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn loop_(ctx: Context<'_>) -> Result<(), BotError> {
    let session = playing_session(&ctx).await?;

    let reply = if session.toggle_loop() {
        "Looping the current track."
    } else {
        "Stopped looping."
    };
    ctx.reply(reply).await?;
    Ok(())
}

/// Percent to the `0.0 - 1.0` a session takes.
fn volume_fraction(percent: i64) -> Result<f32, UserError> {
    match u8::try_from(percent) {
        Ok(percent) if percent <= 100 => Ok(f32::from(percent) / 100.0),
        _ => Err(UserError::VolumeOutOfRange(percent)),
    }
}
