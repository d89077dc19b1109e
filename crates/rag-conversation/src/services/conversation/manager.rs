use tracing::{debug, info, warn};

use crate::config::ConversationConfig;
use crate::utils::error::{ConversationError, ConversationResult};

use super::cache::{SessionStore, SharedSession, StoreLimits, StoreStats};
use super::query_enhancer::QueryEnhancer;
use super::session::{validate_context_window, Session};
use super::types::{ConversationSnapshot, ConversationSummary, Exchange, PreparedQuery, SessionId};

/// Entry point to the conversation core, shared by the HTTP handlers and the
/// interactive CLI.
///
/// Every mutation of a session runs under that session's write lock for the
/// whole logical operation; reads take the read lock and return copies.
pub struct ConversationManager {
    store: SessionStore,
    enhancer: QueryEnhancer,
}

impl ConversationManager {
    pub fn new(config: &ConversationConfig) -> Self {
        Self::with_parts(
            SessionStore::new(StoreLimits::from(config)),
            QueryEnhancer::new(config.follow_up_template.clone()),
        )
    }

    pub fn with_parts(store: SessionStore, enhancer: QueryEnhancer) -> Self {
        Self { store, enhancer }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Return `session_id` if given (creating it when absent), otherwise
    /// create a session under a freshly generated id.
    pub fn resolve_session(&self, session_id: Option<&str>) -> ConversationResult<SessionId> {
        match session_id {
            Some(id) => {
                let id = non_empty_id(id)?;
                let (_, created) = self.store.get_or_create(id)?;
                if created {
                    info!("Session {} created", id);
                }
                Ok(id.to_string())
            }
            None => {
                let (id, _) = self.store.create_generated(self.store.limits().context_window)?;
                info!("Session {} created", id);
                Ok(id)
            }
        }
    }

    /// Enhance a raw question with the session's recent history.
    /// Creates the session on first reference.
    pub fn prepare_query(&self, session_id: &str, raw_question: &str) -> ConversationResult<PreparedQuery> {
        if raw_question.trim().is_empty() {
            return Err(ConversationError::InvalidArgument("question must not be empty".to_string()));
        }

        let shared = self.live_session(session_id)?;
        let session = shared.read();
        if session.deleted {
            return Err(ConversationError::NotFound(session_id.to_string()));
        }

        let prepared = self.enhancer.enhance(raw_question, &session);
        debug!(
            "Prepared query for {}: context_used={}, follow_up={}",
            session_id, prepared.context_used, prepared.follow_up
        );
        Ok(prepared)
    }

    /// Append one exchange. Returns the turn number, i.e. the log length
    /// after capacity enforcement. Creates the session on first reference.
    pub fn record_turn(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
        sources: Vec<String>,
    ) -> ConversationResult<usize> {
        if question.trim().is_empty() {
            return Err(ConversationError::InvalidArgument("question must not be empty".to_string()));
        }

        let shared = self.live_session(session_id)?;
        let mut session = shared.write();
        if session.deleted {
            return Err(ConversationError::NotFound(session_id.to_string()));
        }

        let turn_number = session.append(question.to_string(), answer.to_string(), sources);
        debug!("Recorded turn {} in session {}", turn_number, session_id);
        Ok(turn_number)
    }

    pub fn get_history(&self, session_id: &str) -> ConversationResult<Vec<Exchange>> {
        self.read_existing(session_id, Session::exchanges)
    }

    /// Transcript of the last `n` exchanges (session window when `None`)
    pub fn get_context(&self, session_id: &str, n: Option<usize>) -> ConversationResult<String> {
        self.read_existing(session_id, |session| session.context(n))
    }

    pub fn last_question(&self, session_id: &str) -> ConversationResult<String> {
        self.read_existing(session_id, |session| session.last_question().to_string())
    }

    pub fn last_answer(&self, session_id: &str) -> ConversationResult<String> {
        self.read_existing(session_id, |session| session.last_answer().to_string())
    }

    pub fn context_window(&self, session_id: &str) -> ConversationResult<usize> {
        self.read_existing(session_id, Session::context_window)
    }

    /// Empty the log; the id stays valid for new turns
    pub fn clear(&self, session_id: &str) -> ConversationResult<()> {
        self.write_existing(session_id, Session::reset)?;
        info!("Session {} cleared", session_id);
        Ok(())
    }

    pub fn delete(&self, session_id: &str) -> ConversationResult<()> {
        self.store
            .remove(session_id)
            .ok_or_else(|| ConversationError::NotFound(session_id.to_string()))?;
        info!("Session {} deleted", session_id);
        Ok(())
    }

    /// Clear for the single-active-session variant: the old session is
    /// dropped and an empty one under a new id takes its place.
    pub fn rotate(&self, session_id: &str) -> ConversationResult<SessionId> {
        let context_window = self.read_existing(session_id, Session::context_window)?;

        let (new_id, _) = self.store.create_generated(context_window)?;
        if self.store.remove(session_id).is_none() {
            // Deleted concurrently: undo the replacement
            self.store.remove(&new_id);
            return Err(ConversationError::NotFound(session_id.to_string()));
        }
        info!("Session {} rotated to {}", session_id, new_id);
        Ok(new_id)
    }

    pub fn set_context_window(&self, session_id: &str, n: usize) -> ConversationResult<()> {
        validate_context_window(n)?;
        self.write_existing(session_id, |session| session.set_context_window(n))??;
        debug!("Session {} context window set to {}", session_id, n);
        Ok(())
    }

    pub fn export(&self, session_id: &str) -> ConversationResult<ConversationSnapshot> {
        self.read_existing(session_id, Session::snapshot)
    }

    /// Restore a snapshot, overwriting any session under the same id
    pub fn import(&self, snapshot: ConversationSnapshot) -> ConversationResult<SessionId> {
        validate_snapshot(&snapshot)?;
        let ConversationSnapshot {
            session_id, history, ..
        } = snapshot;

        let shared = self.live_session(&session_id)?;
        let mut session = shared.write();
        if session.deleted {
            return Err(ConversationError::NotFound(session_id));
        }

        let dropped = session.restore(history);
        if dropped > 0 {
            warn!(
                "Snapshot for {} exceeded max_history, dropped {} oldest exchanges",
                session_id, dropped
            );
        }

        info!("Session {} imported with {} exchanges", session_id, session.len());
        Ok(session_id)
    }

    /// Parse and import a JSON snapshot
    pub fn import_json(&self, raw: &str) -> ConversationResult<SessionId> {
        let snapshot: ConversationSnapshot = serde_json::from_str(raw)
            .map_err(|e| ConversationError::InvalidFormat(e.to_string()))?;
        self.import(snapshot)
    }

    /// All sessions, ordered by id
    pub fn list_sessions(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .store
            .sessions()
            .iter()
            .map(|shared| shared.read())
            .filter(|session| !session.deleted)
            .map(|session| session.summary())
            .collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        summaries
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    fn live_session(&self, session_id: &str) -> ConversationResult<SharedSession> {
        let id = non_empty_id(session_id)?;
        let (shared, created) = self.store.get_or_create(id)?;
        if created {
            info!("Session {} created", id);
        }
        Ok(shared)
    }

    fn read_existing<T>(&self, session_id: &str, f: impl FnOnce(&Session) -> T) -> ConversationResult<T> {
        let shared = self.store.require(session_id)?;
        let session = shared.read();
        if session.deleted {
            return Err(ConversationError::NotFound(session_id.to_string()));
        }
        Ok(f(&session))
    }

    fn write_existing<T>(&self, session_id: &str, f: impl FnOnce(&mut Session) -> T) -> ConversationResult<T> {
        let shared = self.store.require(session_id)?;
        let mut session = shared.write();
        if session.deleted {
            return Err(ConversationError::NotFound(session_id.to_string()));
        }
        Ok(f(&mut session))
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(&ConversationConfig::default())
    }
}

fn non_empty_id(session_id: &str) -> ConversationResult<&str> {
    if session_id.trim().is_empty() {
        return Err(ConversationError::InvalidArgument("session_id must not be empty".to_string()));
    }
    Ok(session_id)
}

fn validate_snapshot(snapshot: &ConversationSnapshot) -> ConversationResult<()> {
    if snapshot.session_id.trim().is_empty() {
        return Err(ConversationError::InvalidFormat("session_id is empty".to_string()));
    }

    if let Some(position) = snapshot.history.iter().position(|e| e.question.trim().is_empty()) {
        return Err(ConversationError::InvalidFormat(format!(
            "exchange {} has an empty question",
            position + 1
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn manager() -> ConversationManager {
        let config = ConversationConfig {
            memory_limit_percent: 101.0,
            ..ConversationConfig::default()
        };
        ConversationManager::new(&config)
    }

    #[test]
    fn test_resolve_session() {
        let manager = manager();

        let generated = manager.resolve_session(None).unwrap();
        assert!(generated.starts_with("session_"));

        assert_eq!(manager.resolve_session(Some("chat-1")).unwrap(), "chat-1");
        manager.record_turn("chat-1", "q", "a", vec![]).unwrap();
        // Existing id comes back unchanged, history intact
        assert_eq!(manager.resolve_session(Some("chat-1")).unwrap(), "chat-1");
        assert_eq!(manager.get_history("chat-1").unwrap().len(), 1);

        assert!(matches!(
            manager.resolve_session(Some("  ")),
            Err(ConversationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_capacity_invariant_through_manager() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();

        for i in 1..=15 {
            let turn = manager.record_turn(&id, &format!("q{}", i), "a", vec![]).unwrap();
            assert!(turn <= 10);
        }

        let history = manager.get_history(&id).unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history.first().unwrap().question, "q6");
        assert_eq!(history.last().unwrap().question, "q15");
    }

    #[test]
    fn test_prepare_query_flow() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();

        let first = manager.prepare_query(&id, "Apa itu Python?").unwrap();
        assert_eq!(first.enhanced_question, "Apa itu Python?");
        assert!(!first.context_used);

        manager
            .record_turn(&id, "Apa itu Python?", "Bahasa pemrograman", vec!["python.pdf".to_string()])
            .unwrap();

        let second = manager.prepare_query(&id, "Berikan contoh").unwrap();
        assert_eq!(
            second.enhanced_question,
            "Based on the previous question 'Apa itu Python?', Berikan contoh"
        );
        assert!(second.context_used);

        // Raw question is what gets recorded
        manager.record_turn(&id, "Berikan contoh", "print('hi')", vec![]).unwrap();
        assert_eq!(manager.last_question(&id).unwrap(), "Berikan contoh");
        assert_eq!(manager.last_answer(&id).unwrap(), "print('hi')");
    }

    #[test]
    fn test_empty_question_rejected() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();
        assert!(matches!(
            manager.prepare_query(&id, "   "),
            Err(ConversationError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.record_turn(&id, "", "a", vec![]),
            Err(ConversationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let manager = manager();
        assert!(matches!(manager.get_history("ghost"), Err(ConversationError::NotFound(_))));
        assert!(matches!(manager.clear("ghost"), Err(ConversationError::NotFound(_))));
        assert!(matches!(manager.delete("ghost"), Err(ConversationError::NotFound(_))));
        assert!(matches!(manager.export("ghost"), Err(ConversationError::NotFound(_))));
        assert!(matches!(
            manager.set_context_window("ghost", 3),
            Err(ConversationError::NotFound(_))
        ));
    }

    #[test]
    fn test_clear_resets_but_does_not_destroy() {
        let manager = manager();
        let id = manager.resolve_session(Some("keep")).unwrap();
        manager.record_turn(&id, "q1", "a1", vec![]).unwrap();

        manager.clear(&id).unwrap();
        assert!(manager.get_history(&id).unwrap().is_empty());

        assert_eq!(manager.record_turn(&id, "q2", "a2", vec![]).unwrap(), 1);
        assert_eq!(manager.get_history(&id).unwrap()[0].question, "q2");
    }

    #[test]
    fn test_delete_then_lookup_fails() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();
        manager.delete(&id).unwrap();

        assert!(matches!(manager.get_history(&id), Err(ConversationError::NotFound(_))));
        assert!(matches!(manager.delete(&id), Err(ConversationError::NotFound(_))));
    }

    #[test]
    fn test_rotate_issues_new_id_and_drops_old() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();
        manager.set_context_window(&id, 5).unwrap();
        manager.record_turn(&id, "q", "a", vec![]).unwrap();
        let saved = manager.export(&id).unwrap();

        let rotated = manager.rotate(&id).unwrap();
        assert_ne!(rotated, id);
        assert!(manager.get_history(&rotated).unwrap().is_empty());
        assert_eq!(manager.context_window(&rotated).unwrap(), 5);
        assert!(matches!(manager.get_history(&id), Err(ConversationError::NotFound(_))));

        manager.record_turn(&rotated, "later", "a", vec![]).unwrap();
        assert_eq!(saved.history.len(), 1);
        assert_eq!(saved.history[0].question, "q");
    }

    #[test]
    fn test_rotate_unknown_is_not_found() {
        let manager = manager();
        assert!(matches!(
            manager.rotate("ghost"),
            Err(ConversationError::NotFound(id)) if id == "ghost"
        ));
        assert!(manager.list_sessions().is_empty());

        manager.resolve_session(Some("gone")).unwrap();
        manager.delete("gone").unwrap();
        assert!(matches!(manager.rotate("gone"), Err(ConversationError::NotFound(_))));
        assert!(manager.list_sessions().is_empty());
    }

    #[test]
    fn test_set_context_window_validation() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();

        assert!(matches!(
            manager.set_context_window(&id, 0),
            Err(ConversationError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.set_context_window(&id, 11),
            Err(ConversationError::InvalidArgument(_))
        ));
        assert_eq!(manager.context_window(&id).unwrap(), 3);

        for i in 0..6 {
            manager.record_turn(&id, &format!("q{}", i), "a", vec![]).unwrap();
        }
        manager.set_context_window(&id, 1).unwrap();
        assert_eq!(manager.get_context(&id, None).unwrap(), "Q1: q5\nA1: a");
        assert_eq!(manager.get_history(&id).unwrap().len(), 6);
    }

    #[test]
    fn test_export_import_round_trip() {
        let manager = manager();
        let id = manager.resolve_session(None).unwrap();
        manager.record_turn(&id, "q1", "a1", vec!["x.pdf".to_string()]).unwrap();
        manager.record_turn(&id, "q2", "a2", vec![]).unwrap();

        let snapshot = manager.export(&id).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();

        let other = self::manager();
        let restored_id = other.import_json(&json).unwrap();
        assert_eq!(restored_id, id);
        assert_eq!(other.get_history(&id).unwrap(), snapshot.history);
    }

    #[test]
    fn test_import_overwrites_existing() {
        let manager = manager();
        manager.record_turn("s", "old", "a", vec![]).unwrap();
        let snapshot = manager.export("s").unwrap();

        manager.record_turn("s", "newer", "b", vec![]).unwrap();
        manager.import(snapshot.clone()).unwrap();
        assert_eq!(manager.get_history("s").unwrap(), snapshot.history);
    }

    #[test]
    fn test_import_malformed_leaves_store_unchanged() {
        let manager = manager();
        manager.record_turn("s", "q", "a", vec![]).unwrap();

        let missing_history = r#"{"session_id":"s","saved_at":"2024-01-01T00:00:00"}"#;
        assert!(matches!(
            manager.import_json(missing_history),
            Err(ConversationError::InvalidFormat(_))
        ));

        let empty_id = r#"{"session_id":"","history":[],"saved_at":"2024-01-01T00:00:00"}"#;
        assert!(matches!(
            manager.import_json(empty_id),
            Err(ConversationError::InvalidFormat(_))
        ));

        assert!(matches!(manager.import_json("not json"), Err(ConversationError::InvalidFormat(_))));
        assert_eq!(manager.get_history("s").unwrap().len(), 1);
    }

    #[test]
    fn test_import_naive_timestamps() {
        let manager = manager();
        let raw = r#"{
            "session_id": "session_20240101_120000",
            "history": [
                {"question": "Apa itu Python?", "answer": "Bahasa", "sources": ["a.pdf"], "timestamp": "2024-01-01T12:00:01.123456"}
            ],
            "saved_at": "2024-01-01T12:05:00.000001"
        }"#;

        let id = manager.import_json(raw).unwrap();
        let prepared = manager.prepare_query(&id, "Berikan contoh").unwrap();
        assert_eq!(
            prepared.enhanced_question,
            "Based on the previous question 'Apa itu Python?', Berikan contoh"
        );
    }

    #[test]
    fn test_list_sessions() {
        let manager = manager();
        manager.record_turn("b", "q-b", "a", vec![]).unwrap();
        manager.resolve_session(Some("a")).unwrap();

        let list = manager.list_sessions();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].session_id, "a");
        assert_eq!(list[0].turn_count, 0);
        assert_eq!(list[1].last_question, "q-b");
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let manager = Arc::new(manager());
        let id = manager.resolve_session(None).unwrap();

        std::thread::scope(|scope| {
            for t in 0..2 {
                let manager = manager.clone();
                let id = id.clone();
                scope.spawn(move || {
                    manager.record_turn(&id, &format!("q{}", t), "a", vec![]).unwrap();
                });
            }
        });
        assert_eq!(manager.get_history(&id).unwrap().len(), 2);

        std::thread::scope(|scope| {
            for t in 0..8 {
                let manager = manager.clone();
                let id = id.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        let turn = manager.record_turn(&id, &format!("q{}-{}", t, i), "a", vec![]).unwrap();
                        assert!(turn <= 10);
                    }
                });
            }
        });
        assert_eq!(manager.get_history(&id).unwrap().len(), 10);
    }
}
