//! Manages [voice calls](songbird::Call).
//!
//! [SongbirdVoice] is the [VoiceTransport] the bot uses. Track end and track error
//! events are turned into the one-shot finish signal a session waits on.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::error::JoinError;
use songbird::input::Input;
use songbird::input::YoutubeDl;
use songbird::tracks::PlayMode;
use songbird::tracks::TrackHandle;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use songbird::TrackEvent;
use tracing::instrument;

use crate::error::UserError;
use crate::error::VoiceError;
use crate::player::OnFinished;
use crate::player::StreamSource;
use crate::player::VoiceTransport;
use crate::serenity::ChannelId;
use crate::serenity::GuildId;
use crate::BotError;
use crate::Context;

/// Convenience type alias for [songbird::Songbird].
pub type Manager = Arc<songbird::Songbird>;

/// Get the [Manager] from [Context]
pub async fn get_manager(ctx: &Context<'_>) -> Result<Manager, BotError> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(BotError::MissingFromSetup {
            reason: "Expecting songbird manager.".to_string(),
        })
}

/// Find the voice channel the author of the command is in.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id()))]
pub fn author_channel(ctx: &Context<'_>) -> Result<ChannelId, UserError> {
    let author = ctx.author();
    let guild = ctx.guild().ok_or(UserError::NotInGuild)?;

    guild
        .voice_states
        .get(&author.id)
        .and_then(|vs| vs.channel_id)
        .ok_or(UserError::NotInVoice)
}

/// A started track, numbered so stale events can tell it isn't theirs.
#[derive(Clone)]
struct ActiveTrack {
    id: u64,
    handle: TrackHandle,
}

/// The slot of the track being played. Shared with that track's event handlers.
type TrackSlot = Arc<Mutex<Option<ActiveTrack>>>;

/// A guild's voice connection through [songbird].
pub struct SongbirdVoice {
    manager: Manager,
    guild_id: GuildId,
    /// Used by [YoutubeDl] to fetch streams.
    http: reqwest::Client,
    track: TrackSlot,
    paused: Arc<AtomicBool>,
    /// Id of the next track started.
    next_id: AtomicU64,
}

impl SongbirdVoice {
    pub fn new(manager: Manager, guild_id: GuildId, http: reqwest::Client) -> Self {
        Self {
            manager,
            guild_id,
            http,
            track: Default::default(),
            paused: Default::default(),
            next_id: AtomicU64::new(0),
        }
    }

    fn current_track(&self) -> Option<TrackHandle> {
        self.track.lock().as_ref().map(|active| active.handle.clone())
    }

    async fn join(&self, channel: ChannelId) -> Result<(), VoiceError> {
        tracing::info!("Joining channel {channel} in guild {}.", self.guild_id);
        self.manager
            .join(self.guild_id, channel)
            .await
            .map(|_call| ())
            .map_err(|e| VoiceError::Connect(e.to_string()))
    }
}

#[async_trait]
impl VoiceTransport for SongbirdVoice {
    async fn connect(&self, channel: ChannelId) -> Result<(), VoiceError> {
        self.join(channel).await
    }

    async fn move_to(&self, channel: ChannelId) -> Result<(), VoiceError> {
        // Joining while connected moves the call.
        self.join(channel).await
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        tracing::info!("Leaving voice in guild {}.", self.guild_id);
        self.track.lock().take();
        self.paused.store(false, Ordering::Release);

        match self.manager.remove(self.guild_id).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(e) => Err(VoiceError::Connect(e.to_string())),
        }
    }

    async fn play(
        &self,
        source: &StreamSource,
        volume: f32,
        on_finished: OnFinished,
    ) -> Result<(), VoiceError> {
        let call = self
            .manager
            .get(self.guild_id)
            .ok_or(VoiceError::NotConnected)?;

        let input: Input = YoutubeDl::new(self.http.clone(), source.url.clone()).into();
        let handle = call.lock().await.play_input(input);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Filled before the events are registered so an early end can clear it.
        *self.track.lock() = Some(ActiveTrack {
            id,
            handle: handle.clone(),
        });
        self.paused.store(false, Ordering::Release);

        if let Err(e) = watch_track(&handle, id, volume, on_finished, &self.track) {
            // Don't leave a track playing that nobody waits on.
            self.track.lock().take();
            let _ = handle.stop();
            return Err(e);
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), VoiceError> {
        if let Some(track) = self.current_track() {
            track.pause().map_err(control_error)?;
            self.paused.store(true, Ordering::Release);
        }
        Ok(())
    }

    async fn resume(&self) -> Result<(), VoiceError> {
        if let Some(track) = self.current_track() {
            track.play().map_err(control_error)?;
            self.paused.store(false, Ordering::Release);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), VoiceError> {
        let track = self.track.lock().take();
        self.paused.store(false, Ordering::Release);

        match track {
            Some(track) => track.handle.stop().map_err(control_error),
            None => Ok(()),
        }
    }

    fn is_playing(&self) -> bool {
        self.track.lock().is_some() && !self.paused.load(Ordering::Acquire)
    }

    fn is_paused(&self) -> bool {
        self.track.lock().is_some() && self.paused.load(Ordering::Acquire)
    }
}

/// Set the volume and register the events that fire `on_finished`.
fn watch_track(
    handle: &TrackHandle,
    id: u64,
    volume: f32,
    on_finished: OnFinished,
    slot: &TrackSlot,
) -> Result<(), VoiceError> {
    handle.set_volume(volume).map_err(control_error)?;

    // Whichever of the two events comes first fires the signal.
    let on_finished = Arc::new(Mutex::new(Some(on_finished)));
    for event in [TrackEvent::End, TrackEvent::Error] {
        let handler = TrackFinished {
            on_finished: on_finished.clone(),
            slot: slot.clone(),
            track: id,
        };
        handle
            .add_event(Event::Track(event), handler)
            .map_err(control_error)?;
    }
    Ok(())
}

fn control_error(e: songbird::error::ControlError) -> VoiceError {
    VoiceError::Playback(e.to_string())
}

/// Fire a track's finish signal when it ends or errors.
struct TrackFinished {
    /// Shared by the end and error handlers of one track.
    on_finished: Arc<Mutex<Option<OnFinished>>>,
    /// Cleared if it still holds this track.
    slot: TrackSlot,
    track: u64,
}

#[async_trait]
impl EventHandler for TrackFinished {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let result = match ctx {
            EventContext::Track(tracks) => tracks
                .iter()
                .find_map(|(state, _)| match &state.playing {
                    PlayMode::Errored(e) => Some(Err(VoiceError::Playback(format!("{e:?}")))),
                    _ => None,
                })
                .unwrap_or(Ok(())),
            _ => Ok(()),
        };

        {
            let mut slot = self.slot.lock();
            if slot.as_ref().map(|active| active.id) == Some(self.track) {
                *slot = None;
            }
        }

        let on_finished = self.on_finished.lock().take();
        if let Some(on_finished) = on_finished {
            if on_finished.send(result).is_err() {
                tracing::debug!("Track finished after its session stopped.");
            }
        }

        Some(Event::Cancel)
    }
}
