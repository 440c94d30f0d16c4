use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use portfolio_core::{update, AppState, AppViewModel, Effect, Msg};
use portfolio_engine::{Completer, CompletionEngine};
use site_logging::{site_debug, site_info};
use uuid::Uuid;

pub type SessionId = Uuid;

/// Chat state for one page view.
pub struct Session {
    state: Mutex<AppState>,
    engine: CompletionEngine,
    last_seen: Mutex<Instant>,
}

impl Session {
    fn new(completer: Arc<dyn Completer>) -> Self {
        Self {
            state: Mutex::new(AppState::new()),
            engine: CompletionEngine::new(completer),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Applies `msg` to the session state and returns the resulting effects.
    pub fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = lock(&self.state);
        let state = std::mem::take(&mut *guard);
        let (state, effects) = update(state, msg);
        *guard = state;
        effects
    }

    pub fn view(&self) -> AppViewModel {
        lock(&self.state).view()
    }

    pub(crate) fn engine(&self) -> &CompletionEngine {
        &self.engine
    }

    fn touch(&self, now: Instant) {
        *lock(&self.last_seen) = now;
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*lock(&self.last_seen))
    }
}

/// In-memory sessions, bounded by an idle TTL and a maximum count.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    completer: Arc<dyn Completer>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(completer: Arc<dyn Completer>, ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            completer,
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn create(&self) -> (SessionId, Arc<Session>) {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);
        self.evict_expired(&mut sessions, now);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .max_by_key(|(_, session)| session.idle_for(now))
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    site_debug!("Evicting least recently used session {}", id);
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(self.completer.clone()));
        sessions.insert(id, session.clone());
        site_info!("Session {} created ({} live)", id, sessions.len());
        (id, session)
    }

    /// Returns a live session and refreshes its idle timer.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);
        let session = sessions.get(id)?.clone();
        if session.idle_for(now) >= self.ttl {
            site_debug!("Session {} expired", id);
            sessions.remove(id);
            return None;
        }
        session.touch(now);
        Some(session)
    }

    /// Resumes the session named by a raw id, or starts a fresh one.
    pub fn resume_or_create(&self, raw_id: Option<&str>) -> (SessionId, Arc<Session>) {
        let resumed = raw_id
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .and_then(|id| self.get(&id).map(|session| (id, session)));
        match resumed {
            Some(found) => found,
            None => self.create(),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, sessions: &mut HashMap<SessionId, Arc<Session>>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) < self.ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            site_info!("Evicted {} expired session(s)", evicted);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
