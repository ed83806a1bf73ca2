// ============================================================
// Layer 1 — Session Store
// ============================================================
// Maps the session id in the URL (/s/{id}) to its ChatSession.
//
// The map lock is only held to insert, look up, or remove; the
// per-session Mutex is what a handler holds while it works, so
// one session handles one event at a time while other sessions
// carry on.
//
// Every lookup stamps the session as seen. evict_idle() drops
// sessions nobody has touched for longer than the TTL, together
// with their document text and transcript. A session whose lock
// is held (an answer is being generated) is never evicted.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::session::{ChatSession, SessionServices};

pub type SharedSession = Arc<Mutex<ChatSession>>;

struct Entry {
    session:   SharedSession,
    last_seen: Instant,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new Empty session and return its id
    pub fn create(&self, services: SessionServices) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            session:   Arc::new(Mutex::new(ChatSession::new(services))),
            last_seen: Instant::now(),
        };
        let live = {
            let mut sessions = self.write();
            sessions.insert(id, entry);
            sessions.len()
        };
        tracing::info!("Session {} created ({} live)", id, live);
        id
    }

    /// Look up a session and mark it as seen now
    pub fn get(&self, id: Uuid) -> Option<SharedSession> {
        let mut sessions = self.write();
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    /// Drop a session; returns false if it did not exist
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.write().remove(&id).is_some();
        if removed {
            tracing::info!("Session {} disposed", id);
        }
        removed
    }

    /// Drop every session idle for at least `ttl`; returns how many
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.write();
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_seen) >= ttl;
            let busy = entry.session.try_lock().is_err();
            if idle && !busy {
                tracing::debug!("Session {} expired", id);
                return false;
            }
            true
        });

        before - sessions.len()
    }

    pub fn live(&self) -> usize {
        self.read().len()
    }

    // A panic while holding the map lock cannot leave the map
    // half-updated, so a poisoned lock is still safe to use
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Evict idle sessions every `period` until the task is dropped
pub async fn sweep_idle(store: SessionStore, ttl: Duration, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = store.evict_idle(ttl);
        if evicted > 0 {
            tracing::info!("Expired {} idle sessions ({} live)", evicted, store.live());
        }
    }
}
