//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use reqwest::Client;
use serenity::UserId;

use crate::error::UserError;
use crate::lib::announce::ChannelAnnouncer;
use crate::lib::call;
use crate::lib::call::SongbirdVoice;
use crate::player::GuildSession;
use crate::player::PlaybackSettings;
use crate::player::Resolve;
use crate::player::SessionParts;
use crate::player::SessionRegistry;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// The data kept between shards
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Per-Guild playback
    pub sessions: SessionRegistry,
    /// Turns `/play` queries into tracks
    pub resolver: Arc<dyn Resolve>,
    /// Settings new sessions start with
    pub playback: PlaybackSettings,
    /// Tracks per page of `/queue`
    pub queue_page_size: usize,
}

impl Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("notify_list", &self.notify_list)
            .field("sessions", &self.sessions)
            .field("playback", &self.playback)
            .field("queue_page_size", &self.queue_page_size)
            .finish_non_exhaustive()
    }
}

/// Key to store a [Client] in a [TypeMapKey](serenity::prelude::TypeMapKey)
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get a [Client] and the guild's [GuildSession].
pub trait GetData {
    /// Returns a [Client].
    async fn http_client(&self) -> Result<Client, BotError>;
    /// Returns the guild's session, starting one if needed. Errors if not in a guild.
    async fn session(&self) -> Result<Arc<GuildSession>, BotError>;
    /// Returns the guild's session without starting one.
    async fn existing_session(&self) -> Result<Option<Arc<GuildSession>>, UserError>;
}

impl GetData for Context<'_> {
    async fn http_client(&self) -> Result<Client, BotError> {
        self.serenity_context()
            .data
            .read()
            .await
            .get::<HttpKey>()
            // Client internally uses an Arc, so this is cheap to clone
            .cloned()
            .ok_or(BotError::MissingFromSetup {
                reason: "Expecting http client.".to_string(),
            })
    }

    async fn session(&self) -> Result<Arc<GuildSession>, BotError> {
        let guild_id = self.guild_id().ok_or(UserError::GuildOnly)?;

        // Gathered up front, the registry lock isn't held across awaits.
        let manager = call::get_manager(self).await?;
        let http = self.http_client().await?;
        let discord_http = self.serenity_context().http.clone();
        let settings = self.data().playback;

        let make = move || SessionParts {
            transport: Arc::new(SongbirdVoice::new(manager, guild_id, http)),
            announcer: Arc::new(ChannelAnnouncer::new(discord_http)),
            settings,
        };

        Ok(self.data().sessions.get_or_create(guild_id, make).await)
    }

    async fn existing_session(&self) -> Result<Option<Arc<GuildSession>>, UserError> {
        let guild_id = self.guild_id().ok_or(UserError::GuildOnly)?;
        let session = self.data().sessions.get(guild_id).await;

        // A session that idled out is as good as none.
        Ok(session.filter(|session| !session.is_stopped()))
    }
}
