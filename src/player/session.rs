//! The playback state machine of a single guild.
//!
//! Each [GuildSession] owns a background drain loop that takes tracks from the
//! [TrackQueue] and plays them one at a time. The loop is the only writer of the
//! current track. Commands talk to it through the queue, a few flags, and the
//! voice transport (stopping a stream is what wakes the loop up).

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::Announcer;
use super::PlaybackItem;
use super::TrackQueue;
use super::VoiceTransport;
use crate::error::PreconditionError;
use crate::error::SessionError;
use crate::error::VoiceError;
use crate::serenity::ChannelId;
use crate::serenity::GuildId;
use crate::serenity::UserId;

/// How long an empty queue is waited on before the session stops itself.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);
/// Distinct votes needed to skip someone else's track.
pub const DEFAULT_SKIP_QUORUM: usize = 3;
/// Volume used until someone changes it.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Tunables of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub idle_timeout: Duration,
    pub skip_quorum: usize,
    /// 0.0 - 1.0
    pub default_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            skip_quorum: DEFAULT_SKIP_QUORUM,
            default_volume: DEFAULT_VOLUME,
        }
    }
}

/// Everything needed to start a [GuildSession].
pub struct SessionParts {
    pub transport: Arc<dyn VoiceTransport>,
    pub announcer: Arc<dyn Announcer>,
    pub settings: PlaybackSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for something to be queued.
    Idle,
    Playing,
    Paused,
    /// The drain loop is gone and the voice connection released. Terminal.
    Stopped,
}

/// Result of a skip vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The track was skipped, either by its requester or by reaching quorum.
    Skipped,
    /// The vote was counted but quorum isn't reached yet.
    Voted { votes: usize, required: usize },
    /// This user already voted for the current track.
    AlreadyVoted,
}

/// The track being played, and the signal that skips it.
struct Current {
    item: PlaybackItem,
    /// Only ever skips this track, even if it's still starting or has just ended.
    skip: CancellationToken,
}

/// State shared between the session handle and its drain loop.
struct Shared {
    guild_id: GuildId,
    queue: TrackQueue,
    /// Only written by the drain loop while it runs.
    current: Mutex<Option<Current>>,
    looping: AtomicBool,
    volume: Mutex<f32>,
    skip_votes: Mutex<HashSet<UserId>>,
    /// The voice channel we're connected to, if any.
    channel: Mutex<Option<ChannelId>>,
    transport: Arc<dyn VoiceTransport>,
    announcer: Arc<dyn Announcer>,
    settings: PlaybackSettings,
    /// Cancelled once the session is stopped, for whatever reason.
    stopped: CancellationToken,
    /// Cancelled once the session makes no more voice calls.
    released: CancellationToken,
}

/// Playback state of one guild.
pub struct GuildSession {
    #[allow(clippy::missing_docs_in_private_items)]
    shared: Arc<Shared>,
    /// Handle of the drain loop, taken on [GuildSession::stop].
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl GuildSession {
    /// Create a session and start its drain loop. Must be called within a tokio runtime.
    pub fn start(guild_id: GuildId, parts: SessionParts) -> Self {
        let SessionParts {
            transport,
            announcer,
            settings,
        } = parts;

        let shared = Arc::new(Shared {
            guild_id,
            queue: TrackQueue::new(),
            current: Mutex::new(None),
            looping: AtomicBool::new(false),
            volume: Mutex::new(clamp_volume(settings.default_volume)),
            skip_votes: Mutex::new(HashSet::new()),
            channel: Mutex::new(None),
            transport,
            announcer,
            settings,
            stopped: CancellationToken::new(),
            released: CancellationToken::new(),
        });

        tracing::info!("Starting playback session for guild {guild_id}.");
        let drain_task = tokio::spawn(run_drain_loop(shared.clone()));

        Self {
            shared,
            drain_task: Mutex::new(Some(drain_task)),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.shared.guild_id
    }

    /// Tracks waiting to be played.
    pub fn queue(&self) -> &TrackQueue {
        &self.shared.queue
    }

    /// The voice channel the session is connected to.
    pub fn channel(&self) -> Option<ChannelId> {
        *self.shared.channel.lock()
    }

    /// Clone of the track being played.
    pub fn current(&self) -> Option<PlaybackItem> {
        let current = self.shared.current.lock();
        current.as_ref().map(|current| current.item.clone())
    }

    /// Connected and a track is current.
    pub fn is_playing(&self) -> bool {
        self.channel().is_some() && self.shared.current.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.is_cancelled()
    }

    /// Completes once the session has stopped.
    pub async fn stopped(&self) {
        self.shared.stopped.cancelled().await
    }

    /// Stopped and done with the voice connection.
    pub(super) fn is_released(&self) -> bool {
        self.shared.released.is_cancelled()
    }

    /// Completes once the session is done with the voice connection.
    pub(super) async fn released(&self) {
        self.shared.released.cancelled().await
    }

    pub fn state(&self) -> SessionState {
        if self.is_stopped() {
            SessionState::Stopped
        } else if self.shared.current.lock().is_none() {
            SessionState::Idle
        } else if self.shared.transport.is_paused() {
            SessionState::Paused
        } else {
            SessionState::Playing
        }
    }

    /// Connect to `channel`, moving the connection if already connected elsewhere.
    #[instrument(skip(self), fields(guild = %self.shared.guild_id))]
    pub async fn join(&self, channel: ChannelId) -> Result<(), SessionError> {
        self.ensure_running()?;

        match self.channel() {
            Some(current) if current == channel => return Ok(()),
            Some(_) => self.shared.transport.move_to(channel).await?,
            None => self.shared.transport.connect(channel).await?,
        }
        *self.shared.channel.lock() = Some(channel);
        Ok(())
    }

    /// Add a track to the back of the queue. Returns the new queue length.
    pub async fn enqueue(&self, item: PlaybackItem) -> Result<usize, SessionError> {
        self.ensure_running()?;

        tracing::debug!("Queueing '{}' in guild {}.", item.title, self.shared.guild_id);
        self.shared.queue.push_back(item).await;
        Ok(self.shared.queue.len().await)
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Acquire)
    }

    /// Whether the current track replays instead of the queue advancing.
    pub fn set_loop(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Release);
    }

    /// Flip looping, returning the new value.
    pub fn toggle_loop(&self) -> bool {
        !self.shared.looping.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn volume(&self) -> f32 {
        *self.shared.volume.lock()
    }

    /// Set the volume used for the next track started. Returns the stored (clamped) value.
    pub fn set_volume(&self, volume: f32) -> f32 {
        let volume = clamp_volume(volume);
        *self.shared.volume.lock() = volume;
        volume
    }

    /// Skip the current track so the drain loop moves on.
    /// Returns `false` if nothing was playing.
    #[instrument(skip(self), fields(guild = %self.shared.guild_id))]
    pub fn skip(&self) -> bool {
        self.shared.skip_votes.lock().clear();

        match self.playing_track() {
            Some((_, skip)) => {
                skip.cancel();
                true
            }
            None => false,
        }
    }

    /// Vote to skip the current track.
    ///
    /// The requester of the track skips right away, anyone else adds a vote.
    pub fn vote_skip(&self, voter: UserId) -> Result<SkipOutcome, PreconditionError> {
        let (requester, skip) = self
            .playing_track()
            .ok_or(PreconditionError::NothingPlaying)?;

        if voter == requester {
            tracing::info!("Requester {voter} skipped their track.");
            self.shared.skip_votes.lock().clear();
            skip.cancel();
            return Ok(SkipOutcome::Skipped);
        }

        let votes = {
            let mut votes = self.shared.skip_votes.lock();
            if !votes.insert(voter) {
                return Ok(SkipOutcome::AlreadyVoted);
            }
            votes.len()
        };

        let required = self.shared.settings.skip_quorum;
        if votes >= required {
            tracing::info!("Skip vote reached {votes}/{required}.");
            self.shared.skip_votes.lock().clear();
            skip.cancel();
            Ok(SkipOutcome::Skipped)
        } else {
            Ok(SkipOutcome::Voted { votes, required })
        }
    }

    /// Requester and skip signal of the current track, if connected.
    fn playing_track(&self) -> Option<(UserId, CancellationToken)> {
        if self.channel().is_none() {
            return None;
        }
        let current = self.shared.current.lock();
        current
            .as_ref()
            .map(|current| (current.item.requester, current.skip.clone()))
    }

    /// Pause the stream. Returns `false` if there was nothing to pause.
    pub async fn pause(&self) -> Result<bool, SessionError> {
        if self.is_playing() && self.shared.transport.is_playing() {
            self.shared.transport.pause().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Resume a paused stream. Returns `false` if nothing was paused.
    pub async fn resume(&self) -> Result<bool, SessionError> {
        if self.is_playing() && self.shared.transport.is_paused() {
            self.shared.transport.resume().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Clear the queue, end the drain loop, stop the stream, and leave the voice channel.
    ///
    /// The registry entry should be removed afterwards.
    #[instrument(skip(self), fields(guild = %self.shared.guild_id))]
    pub async fn stop(&self) -> Result<(), SessionError> {
        tracing::info!("Stopping playback session.");
        self.shared.stopped.cancel();

        let drain_task = self.drain_task.lock().take();
        if let Some(task) = drain_task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Drain loop panicked: {e}");
                }
            }
        }

        // The drain loop has ended, so nothing else writes `current` now.
        *self.shared.current.lock() = None;
        let released = self.shared.release().await;
        self.shared.released.cancel();
        released?;
        Ok(())
    }

    /// End the drain loop without touching the voice connection.
    pub(super) fn cancel(&self) {
        self.shared.stopped.cancel();
        self.shared.released.cancel();
    }

    fn ensure_running(&self) -> Result<(), PreconditionError> {
        if self.is_stopped() {
            Err(PreconditionError::Stopped)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for GuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildSession")
            .field("guild_id", &self.shared.guild_id)
            .field("state", &self.state())
            .field("looping", &self.is_looping())
            .field("channel", &self.channel())
            .finish()
    }
}

impl Drop for GuildSession {
    fn drop(&mut self) {
        if !self.shared.stopped.is_cancelled() {
            tracing::warn!(
                "Session for guild {} dropped without being stopped.",
                self.shared.guild_id
            );
            self.shared.stopped.cancel();
            self.shared.released.cancel();
        }
    }
}

/// Body of the background task, ends when the session is stopped.
async fn run_drain_loop(shared: Arc<Shared>) {
    let stopped = shared.stopped.clone();
    tokio::select! {
        _ = stopped.cancelled() => {
            tracing::debug!("Drain loop for guild {} cancelled.", shared.guild_id);
            return;
        }
        _ = shared.drain() => {}
    }

    // Idled out. Stopped first so nothing is queued while leaving.
    shared.stopped.cancel();
    if let Err(e) = shared.release().await {
        tracing::warn!("Failed to release voice after idling: {e}");
    }
    shared.released.cancel();
}

impl Shared {
    /// Play tracks until idle for too long. Returns once idle.
    async fn drain(&self) {
        let mut last: Option<PlaybackItem> = None;

        loop {
            let replay = last.take().filter(|_| self.looping.load(Ordering::Acquire));
            let item = match replay {
                Some(item) => {
                    tracing::debug!("Replaying '{}'.", item.title);
                    item
                }
                None => {
                    let next = self.queue.pop_front_blocking();
                    match tokio::time::timeout(self.settings.idle_timeout, next).await {
                        Ok(item) => item,
                        Err(_) => {
                            tracing::info!(
                                "Nothing queued in guild {} for {:?}, stopping.",
                                self.guild_id,
                                self.settings.idle_timeout
                            );
                            return;
                        }
                    }
                }
            };

            if self.play_through(&item).await {
                last = Some(item);
            }
        }
    }

    /// Make `item` current and wait for it to end.
    /// Returns `true` if it ended on its own (not skipped, no error).
    async fn play_through(&self, item: &PlaybackItem) -> bool {
        let skip = CancellationToken::new();
        self.skip_votes.lock().clear();
        *self.current.lock() = Some(Current {
            item: item.clone(),
            skip: skip.clone(),
        });

        let volume = *self.volume.lock();
        let (on_finished, finished) = oneshot::channel();

        let result = match self.transport.play(&item.source, volume, on_finished).await {
            Ok(()) => {
                // Skipped while starting, no point in announcing it.
                if !skip.is_cancelled() {
                    tracing::info!("Now playing '{}' in guild {}.", item.title, self.guild_id);
                    self.announcer.now_playing(item).await;
                }
                self.wait_for_end(finished, &skip).await
            }
            Err(e) => Err(e),
        };

        *self.current.lock() = None;
        let skipped = skip.is_cancelled();

        match result {
            Ok(()) => {
                tracing::debug!("Finished '{}' (skipped: {skipped}).", item.title);
                !skipped
            }
            Err(error) => {
                tracing::warn!("Playback of '{}' failed, moving on: {error}", item.title);
                self.announcer.playback_failed(item, &error).await;
                false
            }
        }
    }

    /// Wait for the stream's finish signal, stopping the stream first if `skip` fires.
    async fn wait_for_end(
        &self,
        mut finished: oneshot::Receiver<Result<(), VoiceError>>,
        skip: &CancellationToken,
    ) -> Result<(), VoiceError> {
        tokio::select! {
            result = &mut finished => return result.unwrap_or(Err(VoiceError::SignalDropped)),
            _ = skip.cancelled() => {}
        }

        if let Err(e) = self.transport.stop().await {
            tracing::warn!("Failed to stop a skipped track: {e}");
            return Ok(());
        }
        // The stream is gone once the transport reports back. Its result doesn't matter.
        let _ = finished.await;
        Ok(())
    }

    /// Clear the queue, stop the stream, and leave the voice channel.
    async fn release(&self) -> Result<(), VoiceError> {
        self.queue.clear().await;

        let stop = if self.transport.is_playing() || self.transport.is_paused() {
            self.transport.stop().await
        } else {
            Ok(())
        };

        let channel = self.channel.lock().take();
        let leave = match channel {
            Some(_) => self.transport.disconnect().await,
            None => Ok(()),
        };

        stop.and(leave)
    }
}

/// Keep a volume within 0.0 - 1.0.
fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::player::testing::next_announcement;
    use crate::player::testing::Announcement;
    use crate::player::testing::FakeAnnouncer;
    use crate::player::testing::FakeVoice;
    use crate::player::track::fixtures::item;

    type Announcements = tokio::sync::mpsc::UnboundedReceiver<Announcement>;

    async fn joined_session() -> (GuildSession, Arc<FakeVoice>, Announcements) {
        let voice = Arc::new(FakeVoice::default());
        let (session, announcements) = joined_session_on(voice.clone()).await;
        (session, voice, announcements)
    }

    async fn joined_session_on(voice: Arc<FakeVoice>) -> (GuildSession, Announcements) {
        let (announcer, announcements) = FakeAnnouncer::new();
        let session = GuildSession::start(
            GuildId::new(7),
            SessionParts {
                transport: voice.clone(),
                announcer,
                settings: PlaybackSettings::default(),
            },
        );
        session.join(ChannelId::new(100)).await.unwrap();
        (session, announcements)
    }

    fn playing(title: &str) -> Announcement {
        Announcement::NowPlaying(title.to_string())
    }

    #[tokio::test]
    async fn requester_skip_moves_to_next_track() {
        let (session, voice, mut announcements) = joined_session().await;

        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 2)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));
        assert_eq!(session.current().unwrap().title, "A");
        assert_eq!(session.state(), SessionState::Playing);

        let outcome = session.vote_skip(UserId::new(2)).unwrap();
        assert_eq!(outcome, SkipOutcome::Voted { votes: 1, required: 3 });

        let outcome = session.vote_skip(UserId::new(1)).unwrap();
        assert_eq!(outcome, SkipOutcome::Skipped);

        assert_eq!(next_announcement(&mut announcements).await, playing("B"));
        assert_eq!(session.current().unwrap().title, "B");
        assert_eq!(voice.played(), ["A", "B"]);

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn third_distinct_vote_skips() {
        let (session, _voice, mut announcements) = joined_session().await;

        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        let first = session.vote_skip(UserId::new(2)).unwrap();
        assert_eq!(first, SkipOutcome::Voted { votes: 1, required: 3 });
        let second = session.vote_skip(UserId::new(3)).unwrap();
        assert_eq!(second, SkipOutcome::Voted { votes: 2, required: 3 });
        let again = session.vote_skip(UserId::new(3)).unwrap();
        assert_eq!(again, SkipOutcome::AlreadyVoted);
        assert_eq!(session.current().unwrap().title, "A");
        let third = session.vote_skip(UserId::new(4)).unwrap();
        assert_eq!(third, SkipOutcome::Skipped);

        assert_eq!(next_announcement(&mut announcements).await, playing("B"));
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn votes_reset_for_the_next_track() {
        let (session, voice, mut announcements) = joined_session().await;

        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        session.vote_skip(UserId::new(2)).unwrap();
        session.vote_skip(UserId::new(3)).unwrap();
        voice.finish(Ok(()));
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));

        let outcome = session.vote_skip(UserId::new(4)).unwrap();
        assert_eq!(outcome, SkipOutcome::Voted { votes: 1, required: 3 });
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn skip_needs_something_playing() {
        let (session, voice, _announcements) = joined_session().await;

        let err = session.vote_skip(UserId::new(1)).unwrap_err();
        assert_eq!(err, PreconditionError::NothingPlaying);
        assert!(!session.skip());
        assert!(voice.played().is_empty());
        assert_eq!(session.state(), SessionState::Idle);

        session.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn idles_out_after_timeout() {
        let (session, voice, _announcements) = joined_session().await;

        tokio::time::sleep(DEFAULT_IDLE_TIMEOUT - Duration::from_secs(1)).await;
        assert!(!session.is_stopped());

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::time::timeout(Duration::from_secs(1), session.stopped())
            .await
            .expect("session should stop after idling");

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(voice.disconnects(), 1);
        assert_eq!(session.channel(), None);

        let err = session.enqueue(item("late", 1)).await.unwrap_err();
        assert_eq!(err, SessionError::Precondition(PreconditionError::Stopped));
    }

    #[tokio::test]
    async fn loop_replays_until_turned_off() {
        let (session, voice, mut announcements) = joined_session().await;

        session.enqueue(item("A", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        assert!(session.toggle_loop());
        voice.finish(Ok(()));
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));
        voice.finish(Ok(()));
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        session.enqueue(item("B", 1)).await.unwrap();
        session.set_loop(false);
        voice.finish(Ok(()));
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));

        assert_eq!(voice.played(), ["A", "A", "A", "B"]);
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn skip_while_looping_advances() {
        let (session, voice, mut announcements) = joined_session().await;

        session.set_loop(true);
        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        assert!(session.skip());
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));
        assert_eq!(voice.played(), ["A", "B"]);
        session.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn skip_lands_while_the_track_is_starting() {
        let voice = Arc::new(FakeVoice::slow(Duration::from_millis(200)));
        let (session, mut announcements) = joined_session_on(voice.clone()).await;

        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.current().unwrap().title, "A");
        assert!(!voice.is_playing());
        assert!(session.skip());

        // A is stopped as soon as it starts, and never announced.
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));
        assert_eq!(voice.played(), ["A", "B"]);
        assert_eq!(session.current().unwrap().title, "B");
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn skip_of_an_ended_track_leaves_the_next_alone() {
        let (session, voice, mut announcements) = joined_session().await;

        for name in ["A", "B", "C"] {
            session.enqueue(item(name, 1)).await.unwrap();
        }
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        // Grabbed before A ends, fired after B started.
        let (_, stale) = session.playing_track().unwrap();
        voice.finish(Ok(()));
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));
        stale.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.current().unwrap().title, "B");
        assert!(voice.is_playing());
        assert_eq!(voice.played(), ["A", "B"]);
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failures_dont_stall_the_queue() {
        let (session, voice, mut announcements) = joined_session().await;

        session.enqueue(item("A", 1)).await.unwrap();
        session.enqueue(item("B", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        voice.finish(Err(VoiceError::Playback("boom".to_string())));
        assert_eq!(
            next_announcement(&mut announcements).await,
            Announcement::Failed("A".to_string())
        );
        assert_eq!(next_announcement(&mut announcements).await, playing("B"));

        // A track that can't even start is reported and skipped too.
        voice.fail_next_play(VoiceError::Playback("unplayable".to_string()));
        session.enqueue(item("C", 1)).await.unwrap();
        session.enqueue(item("D", 1)).await.unwrap();
        voice.finish(Ok(()));
        assert_eq!(
            next_announcement(&mut announcements).await,
            Announcement::Failed("C".to_string())
        );
        assert_eq!(next_announcement(&mut announcements).await, playing("D"));

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn volume_applies_to_next_track() {
        let (session, voice, mut announcements) = joined_session().await;

        assert_eq!(session.volume(), DEFAULT_VOLUME);
        assert_eq!(session.set_volume(1.7), 1.0);
        assert_eq!(session.set_volume(0.2), 0.2);

        session.enqueue(item("A", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));
        assert_eq!(voice.volumes(), [0.2]);

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn pause_and_resume_only_when_it_makes_sense() {
        let (session, _voice, mut announcements) = joined_session().await;

        assert!(!session.pause().await.unwrap());
        assert!(!session.resume().await.unwrap());

        session.enqueue(item("A", 1)).await.unwrap();
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        assert!(!session.resume().await.unwrap());
        assert!(session.pause().await.unwrap());
        assert_eq!(session.state(), SessionState::Paused);
        assert!(!session.pause().await.unwrap());

        assert!(session.resume().await.unwrap());
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.current().unwrap().title, "A");

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_clears_and_disconnects() {
        let (session, voice, mut announcements) = joined_session().await;

        for name in ["A", "B", "C"] {
            session.enqueue(item(name, 1)).await.unwrap();
        }
        assert_eq!(next_announcement(&mut announcements).await, playing("A"));

        session.stop().await.unwrap();

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.queue().is_empty().await);
        assert_eq!(session.current(), None);
        assert_eq!(voice.disconnects(), 1);
        assert!(!voice.is_playing());
        assert_eq!(voice.played(), ["A"]);
    }

    #[tokio::test]
    async fn join_moves_between_channels() {
        let (session, voice, _announcements) = joined_session().await;

        session.join(ChannelId::new(100)).await.unwrap();
        session.join(ChannelId::new(200)).await.unwrap();

        assert_eq!(session.channel(), Some(ChannelId::new(200)));
        assert_eq!(
            voice.connections(),
            [ChannelId::new(100), ChannelId::new(200)]
        );
        session.stop().await.unwrap();
    }
}
