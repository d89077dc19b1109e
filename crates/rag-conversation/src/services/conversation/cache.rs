use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sysinfo::System;
use tracing::{debug, info, warn};

use crate::config::ConversationConfig;
use crate::utils::error::{ConversationError, ConversationResult};

use super::session::Session;
use super::types::SessionId;

/// A session behind its own lock: writers are serialized per session,
/// readers see a consistent snapshot.
pub type SharedSession = Arc<RwLock<Session>>;

const MAX_ID_ATTEMPTS: usize = 8;

/// Capacity settings applied to every session the store creates
#[derive(Debug, Clone)]
pub struct StoreLimits {
    pub max_history: usize,
    pub context_window: usize,
    /// 0 = unlimited
    pub max_sessions: usize,
    pub memory_limit_percent: f64,
}

impl From<&ConversationConfig> for StoreLimits {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            max_history: config.max_history,
            context_window: config.context_window,
            max_sessions: config.max_sessions,
            memory_limit_percent: config.memory_limit_percent,
        }
    }
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self::from(&ConversationConfig::default())
    }
}

/// Thread-safe in-memory session store.
/// The map only guards membership; each session carries its own lock.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<DashMap<SessionId, SharedSession>>,
    /// Live sessions plus creations in flight; bounded by `max_sessions`
    slots: Arc<AtomicUsize>,
    system: Arc<Mutex<System>>,
    limits: StoreLimits,
}

impl SessionStore {
    pub fn new(limits: StoreLimits) -> Self {
        info!(
            "Initializing session store: max_history={}, context_window={}, max_sessions={}",
            limits.max_history, limits.context_window, limits.max_sessions
        );
        Self {
            storage: Arc::new(DashMap::new()),
            slots: Arc::new(AtomicUsize::new(0)),
            system: Arc::new(Mutex::new(System::new())),
            limits,
        }
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.storage.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn require(&self, session_id: &str) -> ConversationResult<SharedSession> {
        self.get(session_id)
            .ok_or_else(|| ConversationError::NotFound(session_id.to_string()))
    }

    /// Return the session under `session_id`, creating an empty one if absent.
    /// The boolean reports whether it was created.
    pub fn get_or_create(&self, session_id: &str) -> ConversationResult<(SharedSession, bool)> {
        if let Some(existing) = self.get(session_id) {
            return Ok((existing, false));
        }

        if let Err(e) = self.reserve_slot() {
            // Another caller may have created it meanwhile
            return self.get(session_id).map(|existing| (existing, false)).ok_or(e);
        }

        match self.storage.entry(session_id.to_string()) {
            Entry::Occupied(entry) => {
                self.release_slot();
                Ok((entry.get().clone(), false))
            }
            Entry::Vacant(entry) => {
                let session = self.new_session(session_id.to_string(), self.limits.context_window);
                entry.insert(session.clone());
                debug!("Created session {}", session_id);
                Ok((session, true))
            }
        }
    }

    /// Create an empty session under a freshly generated id
    pub fn create_generated(&self, context_window: usize) -> ConversationResult<(SessionId, SharedSession)> {
        self.reserve_slot()?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let session_id = generate_session_id();
            if let Entry::Vacant(entry) = self.storage.entry(session_id.clone()) {
                let session = self.new_session(session_id.clone(), context_window);
                entry.insert(session.clone());
                debug!("Created session {}", session_id);
                return Ok((session_id, session));
            }
            warn!("Generated session id {} collided, retrying", session_id);
        }

        self.release_slot();
        Err(ConversationError::ResourceExhausted(
            "could not allocate a unique session id".to_string(),
        ))
    }

    /// Remove a session and mark it deleted for any in-flight holder
    pub fn remove(&self, session_id: &str) -> Option<SharedSession> {
        let (_, session) = self.storage.remove(session_id)?;
        self.release_slot();
        session.write().deleted = true;
        Some(session)
    }

    /// Every live session, in no particular order
    pub fn sessions(&self) -> Vec<SharedSession> {
        self.storage.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Whether a new session could be created right now
    pub fn ensure_capacity(&self) -> ConversationResult<()> {
        let max_sessions = self.limits.max_sessions;
        if max_sessions > 0 && self.slots.load(Ordering::Acquire) >= max_sessions {
            return Err(session_limit_reached(max_sessions));
        }
        self.check_memory()
    }

    /// Claim room for one new session. Must be paired with an insert or
    /// with `release_slot`.
    fn reserve_slot(&self) -> ConversationResult<()> {
        self.check_memory()?;

        let max_sessions = self.limits.max_sessions;
        let mut current = self.slots.load(Ordering::Acquire);
        loop {
            if max_sessions > 0 && current >= max_sessions {
                return Err(session_limit_reached(max_sessions));
            }
            match self.slots.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn release_slot(&self) {
        self.slots.fetch_sub(1, Ordering::AcqRel);
    }

    fn check_memory(&self) -> ConversationResult<()> {
        let usage_percent = self.memory_usage_percent();
        if usage_percent >= self.limits.memory_limit_percent {
            warn!("Memory usage at {:.2}%, rejecting new session", usage_percent);
            return Err(ConversationError::ResourceExhausted(format!(
                "memory usage at {:.2}%",
                usage_percent
            )));
        }
        Ok(())
    }

    /// Cache statistics for monitoring
    pub fn stats(&self) -> StoreStats {
        let mut sys = self.system.lock();
        sys.refresh_memory();

        let total = sys.total_memory();
        let used = sys.used_memory();
        StoreStats {
            active_sessions: self.len(),
            memory_usage_mb: used / 1024 / 1024,
            memory_total_mb: total / 1024 / 1024,
            memory_usage_percent: percent(used, total),
        }
    }

    fn memory_usage_percent(&self) -> f64 {
        let mut sys = self.system.lock();
        sys.refresh_memory();
        percent(sys.used_memory(), sys.total_memory())
    }

    fn new_session(&self, session_id: SessionId, context_window: usize) -> SharedSession {
        Arc::new(RwLock::new(Session::new(
            session_id,
            self.limits.max_history,
            context_window,
        )))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

/// Store statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub active_sessions: usize,
    pub memory_usage_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f64,
}

fn session_limit_reached(max_sessions: usize) -> ConversationError {
    warn!("Session limit reached ({}), rejecting new session", max_sessions);
    ConversationError::ResourceExhausted(format!("session limit of {} reached", max_sessions))
}

/// `session_<YYYYmmdd_HHMMSS>_<8 hex>`: creation time plus 32 random bits
pub fn generate_session_id() -> SessionId {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix: u32 = rand::rng().random();
    format!("session_{}_{:08x}", timestamp, suffix)
}

// Unknown totals (some sandboxes report 0) count as no pressure
fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn unlimited() -> StoreLimits {
        StoreLimits {
            memory_limit_percent: 101.0,
            ..StoreLimits::default()
        }
    }

    #[test]
    fn test_store_basic_operations() {
        let store = SessionStore::new(unlimited());

        let (session, created) = store.get_or_create("abc").unwrap();
        assert!(created);
        assert_eq!(session.read().session_id(), "abc");
        assert_eq!(store.len(), 1);

        let (_, created) = store.get_or_create("abc").unwrap();
        assert!(!created);
        assert_eq!(store.len(), 1);

        let removed = store.remove("abc").unwrap();
        assert!(removed.read().deleted);
        assert!(store.is_empty());
        assert!(store.get("abc").is_none());
    }

    #[test]
    fn test_require_missing_is_not_found() {
        let store = SessionStore::new(unlimited());
        assert!(matches!(store.require("nope"), Err(ConversationError::NotFound(_))));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let store = SessionStore::new(unlimited());
        let mut ids = HashSet::new();
        for _ in 0..200 {
            let (id, _) = store.create_generated(3).unwrap();
            assert!(id.starts_with("session_"));
            assert!(ids.insert(id));
        }
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_concurrent_generated_ids_do_not_collide() {
        let store = SessionStore::new(unlimited());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        store.create_generated(3).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_session_cap_is_resource_exhausted() {
        let store = SessionStore::new(StoreLimits {
            max_sessions: 2,
            ..unlimited()
        });

        store.get_or_create("a").unwrap();
        store.get_or_create("b").unwrap();
        assert!(matches!(
            store.get_or_create("c"),
            Err(ConversationError::ResourceExhausted(_))
        ));
        // Existing ids still resolve at the cap
        assert!(store.get_or_create("a").is_ok());
    }

    #[test]
    fn test_session_cap_holds_under_concurrent_creation() {
        for _ in 0..50 {
            let store = SessionStore::new(StoreLimits {
                max_sessions: 1,
                ..unlimited()
            });
            let barrier = std::sync::Barrier::new(8);

            let created = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..8)
                    .map(|i| {
                        let store = &store;
                        let barrier = &barrier;
                        scope.spawn(move || {
                            barrier.wait();
                            if i % 2 == 0 {
                                store.create_generated(3).is_ok()
                            } else {
                                store.get_or_create(&format!("s{}", i)).is_ok()
                            }
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap())
                    .filter(|ok| *ok)
                    .count()
            });

            assert_eq!(created, 1);
            assert_eq!(store.len(), 1);
        }
    }

    #[test]
    fn test_removal_frees_a_slot() {
        let store = SessionStore::new(StoreLimits {
            max_sessions: 1,
            ..unlimited()
        });

        store.get_or_create("a").unwrap();
        assert!(store.get_or_create("b").is_err());
        store.remove("a").unwrap();
        assert!(store.get_or_create("b").is_ok());
        assert!(store.ensure_capacity().is_err());
    }

    #[test]
    fn test_memory_guard_rejects_new_sessions() {
        let store = SessionStore::new(StoreLimits {
            memory_limit_percent: 0.0,
            ..StoreLimits::default()
        });
        assert!(matches!(
            store.create_generated(3),
            Err(ConversationError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_stats() {
        let store = SessionStore::new(unlimited());
        store.get_or_create("a").unwrap();
        let stats = store.stats();
        assert_eq!(stats.active_sessions, 1);
        assert!(stats.memory_usage_percent >= 0.0);
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3].len(), 8);
    }
}
