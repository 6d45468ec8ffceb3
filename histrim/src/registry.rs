//! Per-session histories behind one shared registry.
//!
//! **Interaction**: a host keeps one `SessionRegistry` (typically in an `Arc`) and routes every
//! call through [`SessionRegistry::with_session`]. Operations on one session are serialized by
//! its map entry; different sessions proceed in parallel.

use dashmap::DashMap;

use crate::compress::{CompactionConfig, MessageAnalyzer};
use crate::error::ConfigError;
use crate::session::ConversationHistory;

pub struct SessionRegistry {
    sessions: DashMap<String, ConversationHistory>,
    config: CompactionConfig,
    analyzer: MessageAnalyzer,
    token_limit: Option<usize>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .field("token_limit", &self.token_limit)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Registry whose new sessions start with `config` and the default analyzer.
    pub fn new(config: CompactionConfig) -> Result<Self, ConfigError> {
        Self::with_analyzer(config, MessageAnalyzer::default())
    }

    pub fn with_analyzer(
        config: CompactionConfig,
        analyzer: MessageAnalyzer,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            sessions: DashMap::new(),
            config: config.validated()?,
            analyzer,
            token_limit: None,
        })
    }

    /// Sessions created from now on compact themselves past `max_tokens`.
    pub fn with_token_limit(mut self, max_tokens: Option<usize>) -> Self {
        self.token_limit = max_tokens;
        self
    }

    /// Runs `f` with exclusive access to the session `id`, creating it on first use.
    ///
    /// Do not call back into the registry from inside `f` for the same id.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut ConversationHistory) -> R) -> R {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            return f(entry.value_mut());
        }
        let mut entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(session = id, "session created");
            self.new_session()
        });
        f(entry.value_mut())
    }

    /// Removes a session and returns its history.
    pub fn remove(&self, id: &str) -> Option<ConversationHistory> {
        self.sessions.remove(id).map(|(_, history)| history)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session ids, in no particular order.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    fn new_session(&self) -> ConversationHistory {
        let mut history =
            ConversationHistory::from_parts(self.config.clone(), self.analyzer.clone());
        history.set_token_limit(self.token_limit);
        history
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::message::RawItem;

    use super::*;

    #[test]
    fn sessions_are_isolated() {
        let registry = SessionRegistry::new(CompactionConfig::default()).unwrap();
        registry.with_session("a", |h| {
            h.record_items(vec![RawItem::new("user", "for a")]).unwrap();
        });
        registry.with_session("b", |h| {
            h.record_items(vec![
                RawItem::new("user", "for b"),
                RawItem::new("user", "again"),
            ])
            .unwrap();
        });
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.with_session("a", |h| h.len()), 1);
        assert_eq!(registry.with_session("b", |h| h.len()), 2);
        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.items()[0].content, "for a");
        assert!(!registry.contains("a"));
    }

    /// **Scenario**: concurrent appends to one session get distinct, gap-free indices.
    #[test]
    fn concurrent_appends_keep_indices_unique() {
        let registry = Arc::new(SessionRegistry::new(CompactionConfig::default()).unwrap());
        std::thread::scope(|scope| {
            for t in 0..4 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        registry.with_session("shared", |h| {
                            h.record_items(vec![RawItem::new("user", format!("t{} m{}", t, i))])
                                .unwrap();
                        });
                    }
                });
            }
        });
        let indices: Vec<u64> =
            registry.with_session("shared", |h| h.items().iter().map(|m| m.original_index).collect());
        assert_eq!(indices, (0..200).collect::<Vec<u64>>());
    }

    #[test]
    fn sessions_inherit_token_limit() {
        let registry = SessionRegistry::new(CompactionConfig {
            minimum_messages: 2,
            ..Default::default()
        })
        .unwrap()
        .with_token_limit(Some(20));
        let evicted = registry.with_session("s", |h| {
            assert_eq!(h.token_limit(), Some(20));
            for i in 0..8 {
                h.record_items(vec![RawItem::new("user", format!("message number {}", i))])
                    .unwrap();
            }
            assert!(h.total_tokens() <= 20);
            h.take_auto_evicted()
        });
        assert!(!evicted.is_empty());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = SessionRegistry::new(CompactionConfig {
            minimum_messages: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::MinimumMessages(0));
    }
}
