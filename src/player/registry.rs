//! Keeps one [GuildSession] per guild.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::GuildSession;
use super::SessionParts;
use crate::serenity::GuildId;

/// Map of guild to its playback session.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    #[allow(clippy::missing_docs_in_private_items)]
    sessions: Arc<Mutex<HashMap<GuildId, Arc<GuildSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the guild's running session, starting one with `make` if there is none.
    ///
    /// A stopped session (e.g. idled out) is replaced, once it has left voice.
    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        make: impl FnOnce() -> SessionParts,
    ) -> Arc<GuildSession> {
        loop {
            let leaving = {
                let mut sessions = self.sessions.lock().await;

                match sessions.get(&guild_id) {
                    Some(session) if !session.is_stopped() => return session.clone(),
                    // Joining now would race its disconnect, the guild has one voice call.
                    Some(session) if !session.is_released() => session.clone(),
                    previous => {
                        if previous.is_some() {
                            tracing::debug!("Replacing stopped session of guild {guild_id}.");
                        }
                        let session = Arc::new(GuildSession::start(guild_id, make()));
                        sessions.insert(guild_id, session.clone());
                        return session;
                    }
                }
            };

            tracing::debug!("Waiting for the old session of guild {guild_id} to leave voice.");
            leaving.released().await;
        }
    }

    /// The guild's session, if it has one.
    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<GuildSession>> {
        let sessions = self.sessions.lock().await;
        sessions.get(&guild_id).cloned()
    }

    /// Detach `session`, if it's still the one registered for its guild.
    /// Returns `false` if it was already removed or replaced.
    ///
    /// Should be called after [GuildSession::stop]. Otherwise the drain loop is
    /// cancelled here, but the voice connection is left as is.
    pub async fn remove(&self, session: &Arc<GuildSession>) -> bool {
        let guild_id = session.guild_id();
        let removed = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(&guild_id) {
                Some(registered) if Arc::ptr_eq(registered, session) => {
                    sessions.remove(&guild_id);
                    true
                }
                _ => false,
            }
        };

        if !session.is_stopped() {
            tracing::warn!("Removed running session of guild {guild_id}, cancelling it.");
            session.cancel();
        }
        removed
    }

    /// Number of sessions, stopped ones included.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Stop and remove every session.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = {
            let mut map = self.sessions.lock().await;
            map.drain().map(|(_, session)| session).collect()
        };

        tracing::info!("Stopping {} playback sessions.", sessions.len());
        let results = futures::future::join_all(sessions.iter().map(|s| s.stop())).await;

        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("Failed to stop session of guild {}: {e}", session.guild_id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use std::time::Duration;

    use super::*;
    use crate::player::testing::fake_parts;
    use crate::player::testing::FakeAnnouncer;
    use crate::player::testing::FakeVoice;
    use crate::player::PlaybackSettings;
    use crate::serenity::ChannelId;

    #[tokio::test]
    async fn one_session_per_guild() {
        let registry = SessionRegistry::new();

        let first = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;
        let again = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;
        let other = registry.get_or_create(GuildId::new(2), || fake_parts().0).await;

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len().await, 2);

        registry.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_a_session() {
        let registry = SessionRegistry::new();
        let created = Arc::new(AtomicUsize::new(0));

        let calls = (0..16).map(|_| {
            let registry = registry.clone();
            let created = created.clone();
            tokio::spawn(async move {
                registry
                    .get_or_create(GuildId::new(1), || {
                        created.fetch_add(1, Ordering::SeqCst);
                        fake_parts().0
                    })
                    .await
            })
        });
        let sessions: Vec<_> = futures::future::join_all(calls)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn stopped_sessions_are_replaced() {
        let registry = SessionRegistry::new();

        let first = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;
        first.stop().await.unwrap();
        let second = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!second.is_stopped());
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn remove_cancels_the_drain_loop() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;

        assert!(registry.remove(&session).await);
        assert!(session.is_stopped());
        assert!(registry.get(GuildId::new(1)).await.is_none());
        assert!(!registry.remove(&session).await);
    }

    #[tokio::test]
    async fn late_removal_leaves_the_replacement_alone() {
        let registry = SessionRegistry::new();

        let old = registry.get_or_create(GuildId::new(1), || fake_parts().0).await;
        old.stop().await.unwrap();

        let (parts, voice) = fake_parts();
        let fresh = registry.get_or_create(GuildId::new(1), || parts).await;
        fresh.join(ChannelId::new(10)).await.unwrap();

        assert!(!registry.remove(&old).await);
        assert!(!fresh.is_stopped());
        assert_eq!(registry.len().await, 1);
        let registered = registry.get(GuildId::new(1)).await.unwrap();
        assert!(Arc::ptr_eq(&registered, &fresh));
        assert_eq!(voice.disconnects(), 0);

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn join_during_stop_waits_for_the_old_session_to_leave() {
        let registry = SessionRegistry::new();
        let guild = GuildId::new(1);

        let old_voice = Arc::new(FakeVoice::slow(Duration::from_millis(500)));
        let old_parts = SessionParts {
            transport: old_voice.clone(),
            announcer: FakeAnnouncer::new().0,
            settings: PlaybackSettings::default(),
        };
        let old = registry.get_or_create(guild, || old_parts).await;
        old.join(ChannelId::new(10)).await.unwrap();

        // `/stop` in one task, `/join` in this one.
        let stopping = tokio::spawn({
            let registry = registry.clone();
            let old = old.clone();
            async move {
                old.stop().await.unwrap();
                registry.remove(&old).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(old.is_stopped());
        assert!(!old.is_released());

        let (parts, fresh_voice) = fake_parts();
        let fresh = registry.get_or_create(guild, || parts).await;

        assert_eq!(old_voice.disconnects(), 1);
        assert!(!Arc::ptr_eq(&old, &fresh));
        fresh.join(ChannelId::new(10)).await.unwrap();

        // Whichever of the two got the registry lock first, the fresh session stays.
        stopping.await.unwrap();
        assert!(!fresh.is_stopped());
        let registered = registry.get(guild).await.unwrap();
        assert!(Arc::ptr_eq(&registered, &fresh));
        assert_eq!(fresh_voice.disconnects(), 0);
        assert_eq!(fresh_voice.connections(), [ChannelId::new(10)]);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_every_connection() {
        let registry = SessionRegistry::new();
        let mut voices = Vec::new();

        for guild in 1..=3 {
            let (parts, voice) = fake_parts();
            voices.push(voice);
            let session = registry.get_or_create(GuildId::new(guild), || parts).await;
            session.join(ChannelId::new(guild * 10)).await.unwrap();
        }

        registry.shutdown().await;

        assert_eq!(registry.len().await, 0);
        assert!(voices.iter().all(|voice| voice.disconnects() == 1));
    }
}
