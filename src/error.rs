//! Error types.
//!
//! [BotError] is what every command returns. [UserError] is the subset that is
//! shown to users as a short reply instead of being reported as a bug.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Top level error of the bot.
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("Check failed: {}", reason.as_deref().unwrap_or("no reason given"))]
    CheckFailed { reason: Option<String> },

    #[error("Command panicked: {}", payload.as_deref().unwrap_or("no payload"))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },

    #[error("Missing from setup: {reason}")]
    MissingFromSetup { reason: String },

    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    #[error(transparent)]
    Join(#[from] songbird::error::JoinError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Errors caused by how the bot was used. These are expected and only shown to the user.
#[derive(Error, Debug)]
pub enum UserError {
    #[error("This command requires a subcommand: {subcmds}")]
    MissingSubcommand { subcmds: String },

    #[error("Could not understand the arguments{}", input.as_ref().map(|i| format!(": `{i}`")).unwrap_or_default())]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {} seconds.", remaining_cooldown.as_secs().max(1))]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I am missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You are missing permissions{}", missing_permissions.map(|p| format!(": {p}")).unwrap_or_default())]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },

    #[error("Only the bot owner can use this command.")]
    NotOwner,

    #[error("This command can't be used in DM channels.")]
    GuildOnly,

    #[error("This command only works in DM channels.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,

    #[error("Not in a server.")]
    NotInGuild,

    #[error("You are not connected to any voice channel.")]
    NotInVoice,

    #[error("I'm not connected to any voice channel.")]
    BotNotInVoice,

    #[error("I'm already in another voice channel.")]
    AlreadyInVoice,

    #[error("I'm not playing anything at the moment.")]
    NotPlaying,

    #[error("Empty queue.")]
    EmptyQueue,

    #[error("You have already voted to skip this track.")]
    AlreadyVoted,

    #[error("Volume must be between 0 and 100, got {0}.")]
    VolumeOutOfRange(i64),

    #[error("Page {page} doesn't exist, there are {pages} pages.")]
    PageOutOfRange { page: usize, pages: usize },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors while reading `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },

    #[error(transparent)]
    IoError(std::io::Error),
}

/// Failures of a queue mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("There is no track at position {}, the queue has {len} tracks.", index + 1)]
    IndexOutOfRange { index: usize, len: usize },
}

/// Failures of turning a query into a playable track.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0}")]
    NotFound(String),

    #[error("Error while fetching: {0}")]
    FetchError(String),
}

/// Failures reported by the voice transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Not connected to a voice channel.")]
    NotConnected,

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Playback ended without reporting back.")]
    SignalDropped,
}

/// An operation was called in a state that doesn't allow it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Nothing is playing.")]
    NothingPlaying,

    #[error("The player has already stopped.")]
    Stopped,
}

/// Failures of [GuildSession](crate::player::GuildSession) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// Core errors reach users through [UserError].
macro_rules! user_facing {
    ($($error:ty),*) => {
        $(
            impl From<$error> for BotError {
                fn from(error: $error) -> Self {
                    BotError::UserError(error.into())
                }
            }
        )*
    };
}

user_facing!(QueueError, ResolveError, SessionError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_range_is_one_based_for_users() {
        let err = QueueError::IndexOutOfRange { index: 4, len: 3 };
        assert_eq!(
            err.to_string(),
            "There is no track at position 5, the queue has 3 tracks."
        );
    }

    #[test]
    fn user_error_wraps_core_errors() {
        let err: UserError = ResolveError::NotFound("nope".to_string()).into();
        assert_eq!(err.to_string(), "nope");

        let err: BotError = UserError::from(SessionError::from(PreconditionError::Stopped)).into();
        assert!(matches!(err, BotError::UserError(UserError::Session(_))));
    }
}
