//! Implements the `/skip` command.
//!
//! The requester of the current track skips it right away. Anyone else
//! votes, and the track is skipped once enough votes are in.

use tracing::instrument;

use super::playing_session;
use crate::error::PreconditionError;
use crate::error::SessionError;
use crate::error::UserError;
use crate::player::SkipOutcome;
use crate::BotError;
use crate::Context;

/// Skips the current audio track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn skip(ctx: Context<'_>) -> Result<(), BotError> {
    let session = playing_session(&ctx).await?;
    let title = session.current().map(|item| item.to_string());

    let outcome = match session.vote_skip(ctx.author().id) {
        Ok(outcome) => outcome,
        // The track ended between the check and the vote.
        Err(PreconditionError::NothingPlaying) => Err(UserError::NotPlaying)?,
        Err(e) => Err(SessionError::from(e))?,
    };

    let reply = match outcome {
        SkipOutcome::Skipped => format!("Skipped {}.", title.unwrap_or_default()),
        SkipOutcome::Voted { votes, required } => {
            format!("Skip vote added, currently at **{votes}/{required}**.")
        }
        SkipOutcome::AlreadyVoted => Err(UserError::AlreadyVoted)?,
    };

    ctx.reply(reply).await?;
    Ok(())
}
