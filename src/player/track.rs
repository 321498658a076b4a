//! A resolved track waiting in a queue, or playing.

use std::fmt::Display;
use std::time::Duration;

use crate::lib::format_duration;
use crate::serenity::ChannelId;
use crate::serenity::UserId;

/// Where the voice transport gets audio from.
///
/// Kept as a locator rather than an open stream so the same track can be
/// started again when looping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    /// Url the transport should open.
    pub url: String,
}

/// A single resolved track plus who asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackItem {
    /// Title of the track.
    pub title: String,
    /// Name of the uploader.
    pub uploader: String,
    /// Url to the uploader's page.
    pub uploader_url: Option<String>,
    /// Length of the track.
    pub duration: Duration,
    /// Url to a thumbnail.
    pub thumbnail: Option<String>,
    /// Url to the page the track was found on.
    pub webpage_url: String,
    /// Audio to play.
    pub source: StreamSource,
    /// The user that queued this track.
    pub requester: UserId,
    /// The text channel the track was requested from; notifications go here.
    pub channel: ChannelId,
}

impl PlaybackItem {
    /// Duration in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// One line used in queue listings.
    pub fn queue_line(&self, position: usize) -> String {
        let duration = format_duration(&self.duration);
        format!("`{position}.` [**{}**]({}) {duration}", self.title, self.webpage_url)
    }
}

impl Display for PlaybackItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "**{}** by **{}**", self.title, self.uploader)
    }
}
