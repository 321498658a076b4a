//! Posts playback updates to the text channel a track was requested from.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::CreateEmbed;
use serenity::CreateMessage;
use serenity::Mentionable;

use super::spell_duration;
use crate::error::VoiceError;
use crate::player::Announcer;
use crate::player::PlaybackItem;
use crate::serenity;

/// The card shown when a track starts, and by `/now`.
pub fn now_playing_embed(item: &PlaybackItem) -> CreateEmbed {
    let uploader = match &item.uploader_url {
        Some(url) => format!("[{}]({url})", item.uploader),
        None => item.uploader.clone(),
    };

    let embed = CreateEmbed::new()
        .title("Now Playing!")
        .description(format!("```css\n{}\n```", item.title))
        .colour(serenity::Colour::BLURPLE)
        .field("Duration", spell_duration(&item.duration), true)
        .field("Requested by", item.requester.mention().to_string(), true)
        .field("Uploader", uploader, true)
        .field("URL", format!("[Click]({})", item.webpage_url), true);

    match &item.thumbnail {
        Some(url) => embed.thumbnail(url),
        None => embed,
    }
}

/// [Announcer] that sends messages with serenity's http client.
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn send(&self, item: &PlaybackItem, message: CreateMessage) {
        if let Err(e) = item.channel.send_message(&self.http, message).await {
            tracing::warn!("Failed to post to channel {}: {e}", item.channel);
        }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn now_playing(&self, item: &PlaybackItem) {
        let message = CreateMessage::new().embed(now_playing_embed(item));
        self.send(item, message).await;
    }

    async fn playback_failed(&self, item: &PlaybackItem, error: &VoiceError) {
        let message = CreateMessage::new().content(format!("Couldn't play {item}: {error}"));
        self.send(item, message).await;
    }
}
