//! Per-guild music playback: tracks, queues, and the sessions that play them.

mod external;
mod queue;
mod registry;
mod session;
mod track;

#[cfg(test)]
mod testing;

pub use external::Announcer;
pub use external::OnFinished;
pub use external::Resolve;
pub use external::VoiceTransport;
pub use queue::TrackQueue;
pub use registry::SessionRegistry;
pub use session::GuildSession;
pub use session::PlaybackSettings;
pub use session::SessionParts;
pub use session::SessionState;
pub use session::SkipOutcome;
pub use track::PlaybackItem;
pub use track::StreamSource;
