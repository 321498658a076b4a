//! In-memory collaborators for driving sessions in tests.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::Announcer;
use super::OnFinished;
use super::PlaybackItem;
use super::PlaybackSettings;
use super::SessionParts;
use super::StreamSource;
use super::VoiceTransport;
use crate::error::VoiceError;
use crate::serenity::ChannelId;

/// A voice connection that records what it's asked to do.
/// Streams only end when a test calls [FakeVoice::finish] or the session stops them.
#[derive(Default)]
pub struct FakeVoice {
    /// How long starting a stream and disconnecting take.
    delay: Duration,
    connections: Mutex<Vec<ChannelId>>,
    disconnects: AtomicUsize,
    plays: Mutex<Vec<(StreamSource, f32)>>,
    pending: Mutex<Option<OnFinished>>,
    playing: AtomicBool,
    paused: AtomicBool,
    fail_next: Mutex<Option<VoiceError>>,
}

impl FakeVoice {
    /// A connection where `play` and `disconnect` take `delay` to complete.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    async fn lag(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// End the active stream with `result`. Returns `false` if nothing was playing.
    pub fn finish(&self, result: Result<(), VoiceError>) -> bool {
        self.playing.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        let pending = self.pending.lock().take();
        match pending {
            Some(on_finished) => {
                // The session may already be gone.
                let _ = on_finished.send(result);
                true
            }
            None => false,
        }
    }

    /// Make the next `play` call fail before starting.
    pub fn fail_next_play(&self, error: VoiceError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Titles of every stream started, in order. Relies on the fixture url layout.
    pub fn played(&self) -> Vec<String> {
        self.plays
            .lock()
            .iter()
            .map(|(source, _)| source.url.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    /// Volume of every stream started, in order.
    pub fn volumes(&self) -> Vec<f32> {
        self.plays.lock().iter().map(|(_, volume)| *volume).collect()
    }

    /// Channels connected or moved to, in order.
    pub fn connections(&self) -> Vec<ChannelId> {
        self.connections.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::Acquire)
    }
}

#[async_trait]
impl VoiceTransport for FakeVoice {
    async fn connect(&self, channel: ChannelId) -> Result<(), VoiceError> {
        self.connections.lock().push(channel);
        Ok(())
    }

    async fn move_to(&self, channel: ChannelId) -> Result<(), VoiceError> {
        self.connections.lock().push(channel);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.lag().await;
        self.disconnects.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn play(
        &self,
        source: &StreamSource,
        volume: f32,
        on_finished: OnFinished,
    ) -> Result<(), VoiceError> {
        let failure = self.fail_next.lock().take();
        if let Some(error) = failure {
            return Err(error);
        }

        self.lag().await;
        self.plays.lock().push((source.clone(), volume));
        *self.pending.lock() = Some(on_finished);
        self.playing.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    async fn pause(&self) -> Result<(), VoiceError> {
        self.playing.store(false, Ordering::Release);
        self.paused.store(true, Ordering::Release);
        Ok(())
    }

    async fn resume(&self) -> Result<(), VoiceError> {
        self.paused.store(false, Ordering::Release);
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop(&self) -> Result<(), VoiceError> {
        self.finish(Ok(()));
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

/// What a [FakeAnnouncer] was told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    NowPlaying(String),
    Failed(String),
}

/// Forwards announcements to a channel so tests can wait on them.
pub struct FakeAnnouncer {
    events: mpsc::UnboundedSender<Announcement>,
}

impl FakeAnnouncer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Announcement>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), receiver)
    }
}

#[async_trait]
impl Announcer for FakeAnnouncer {
    async fn now_playing(&self, item: &PlaybackItem) {
        let _ = self.events.send(Announcement::NowPlaying(item.title.clone()));
    }

    async fn playback_failed(&self, item: &PlaybackItem, _error: &VoiceError) {
        let _ = self.events.send(Announcement::Failed(item.title.clone()));
    }
}

/// Wait (bounded) for the next announcement.
pub async fn next_announcement(
    announcements: &mut mpsc::UnboundedReceiver<Announcement>,
) -> Announcement {
    tokio::time::timeout(Duration::from_secs(5), announcements.recv())
        .await
        .expect("timed out waiting for an announcement")
        .expect("announcer dropped")
}

/// Parts backed by a fresh [FakeVoice]; announcements are discarded.
pub fn fake_parts() -> (SessionParts, Arc<FakeVoice>) {
    let voice = Arc::new(FakeVoice::default());
    let (announcer, _) = FakeAnnouncer::new();
    let parts = SessionParts {
        transport: voice.clone(),
        announcer,
        settings: PlaybackSettings::default(),
    };
    (parts, voice)
}
