//! Bundle of the three per-message strategies (tokenizer, scorer, classifier).
//!
//! Shared by the history store, the pruning engine and the compression engine so all of
//! them derive message fields the same way.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::message::{Message, MessageKind, Role};

use super::essential::EssentialClassifier;
use super::importance::ImportanceScorer;
use super::tokens::{HeuristicTokenizer, Tokenizer};

#[derive(Clone)]
pub struct MessageAnalyzer {
    pub tokenizer: Arc<dyn Tokenizer>,
    pub scorer: ImportanceScorer,
    pub classifier: EssentialClassifier,
}

impl Default for MessageAnalyzer {
    fn default() -> Self {
        Self::new(
            Arc::new(HeuristicTokenizer::default()),
            ImportanceScorer::default(),
            EssentialClassifier::default(),
        )
    }
}

impl std::fmt::Debug for MessageAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageAnalyzer")
            .field("scorer", &self.scorer)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl MessageAnalyzer {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        scorer: ImportanceScorer,
        classifier: EssentialClassifier,
    ) -> Self {
        Self {
            tokenizer,
            scorer,
            classifier,
        }
    }

    /// Replaces the tokenizer, e.g. with a client for an exact tokenizer service.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Builds a message with every derived field computed from `content` and `role`.
    pub fn build(
        &self,
        original_index: u64,
        role: Role,
        content: String,
        timestamp: DateTime<Utc>,
    ) -> Message {
        let mut message = Message {
            original_index,
            role,
            content,
            timestamp,
            importance: 0.0,
            essential: false,
            token_count: 0,
            kind: MessageKind::SystemResponse,
            compressed: false,
        };
        self.refresh(&mut message);
        message
    }

    /// Recomputes derived fields after `content` changed (merge, compression).
    pub fn refresh(&self, message: &mut Message) {
        message.token_count = self.tokenizer.estimate(&message.content);
        message.importance = self.scorer.score(message);
        message.essential = self.classifier.is_essential(message);
        message.kind = MessageKind::classify(message.role, &message.content);
    }

    pub fn tokens(&self, messages: &[Message]) -> usize {
        self.tokenizer.estimate_messages(messages)
    }
}
