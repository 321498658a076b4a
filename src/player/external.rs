//! Things a [GuildSession](super::GuildSession) talks to but doesn't implement.
//!
//! The bot uses the implementations in [crate::lib]; tests use in-memory fakes.

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::PlaybackItem;
use super::StreamSource;
use crate::error::ResolveError;
use crate::error::VoiceError;
use crate::serenity::ChannelId;
use crate::serenity::UserId;

/// Fired exactly once per [VoiceTransport::play] call, when the stream ends,
/// is stopped, or fails.
pub type OnFinished = oneshot::Sender<Result<(), VoiceError>>;

/// A guild's voice connection.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Connect to a voice channel.
    async fn connect(&self, channel: ChannelId) -> Result<(), VoiceError>;

    /// Move an existing connection to another channel.
    async fn move_to(&self, channel: ChannelId) -> Result<(), VoiceError>;

    /// Leave the voice channel.
    async fn disconnect(&self) -> Result<(), VoiceError>;

    /// Start playing `source` at `volume` (0.0 - 1.0).
    ///
    /// An `Err` means nothing started and `on_finished` was dropped.
    async fn play(
        &self,
        source: &StreamSource,
        volume: f32,
        on_finished: OnFinished,
    ) -> Result<(), VoiceError>;

    async fn pause(&self) -> Result<(), VoiceError>;

    async fn resume(&self) -> Result<(), VoiceError>;

    /// Stop the active stream, which fires its [OnFinished].
    async fn stop(&self) -> Result<(), VoiceError>;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;
}

/// Tells users what the session is doing.
/// Failures are logged by the implementation and never reach the session.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// A track started.
    async fn now_playing(&self, item: &PlaybackItem);

    /// A track failed while nobody was waiting on a command.
    async fn playback_failed(&self, item: &PlaybackItem, error: &VoiceError);
}

/// Turns a user's query into a playable track.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(
        &self,
        query: &str,
        requester: UserId,
        channel: ChannelId,
    ) -> Result<PlaybackItem, ResolveError>;
}
