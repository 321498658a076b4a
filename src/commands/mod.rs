//! Bot commands.

mod control;
mod play;
mod queue;
mod skip;
mod stop;
mod voice;

use std::sync::Arc;

use crate::data::GetData;
use crate::error::UserError;
use crate::player::GuildSession;
use crate::serenity::ChannelId;
use crate::BotError;
use crate::Context;
use crate::Data;

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, BotError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        play::play(),
        voice::join(),
        voice::summon(),
        voice::leave(),
        stop::stop(),
        skip::skip(),
        control::pause(),
        control::resume(),
        control::volume(),
        control::loop_(),
        queue::queue(),
        queue::now(),
        queue::shuffle(),
        queue::remove(),
    ]
}

/// The guild's session, if something is playing on it.
async fn playing_session(ctx: &Context<'_>) -> Result<Arc<GuildSession>, BotError> {
    match ctx.existing_session().await? {
        Some(session) if session.is_playing() => Ok(session),
        _ => Err(UserError::NotPlaying.into()),
    }
}

/// The guild's session, if there is a voice connection.
async fn connected_session(ctx: &Context<'_>) -> Result<Arc<GuildSession>, BotError> {
    match ctx.existing_session().await? {
        Some(session) if session.channel().is_some() => Ok(session),
        _ => Err(UserError::BotNotInVoice.into()),
    }
}

/// Refuse to be pulled out of another channel.
fn ensure_free(session: &GuildSession, channel: ChannelId) -> Result<(), UserError> {
    match session.channel() {
        Some(current) if current != channel => Err(UserError::AlreadyInVoice),
        _ => Ok(()),
    }
}
