//! Host-facing conversation history: record, optimize, truncate, export.
//!
//! [`ConversationHistory`] wires a [`HistoryStore`] to the pruning and compression engines
//! under one explicit [`CompactionConfig`]. Every mutation goes through `&mut self`, so a
//! single owner (or [`SessionRegistry`](crate::SessionRegistry)) serializes a session.
//!
//! With a token limit set, every record call that leaves the history over the limit runs
//! [`ConversationHistory::optimize_history`] with that limit; the evicted messages wait in
//! [`ConversationHistory::take_auto_evicted`] until the host archives them.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::compress::{
    BudgetStatus, CompactionConfig, CompactionOutcome, CompressionEngine, CompressionOrder,
    ImportanceLevel, MessageAnalyzer, PruningEngine, keep_last,
};
use crate::error::{CompactionError, ConfigError, InvalidItem, RecordError, RejectedItem};
use crate::history::{AppendSummary, HistoryStore};
use crate::message::{Message, NewMessage, RawItem, Role};

/// Usage statistics for a history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_messages: usize,
    pub total_tokens: usize,
    /// Budget the utilization is measured against, when one was given.
    pub max_tokens: Option<usize>,
    pub utilization_percentage: Option<u32>,
    pub compressed_messages: usize,
    pub essential_messages: usize,
    pub high_importance_messages: usize,
    pub medium_importance_messages: usize,
    pub low_importance_messages: usize,
    pub next_index: u64,
}

enum Target {
    Ratio,
    Absolute(usize),
}

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    store: HistoryStore,
    analyzer: Arc<MessageAnalyzer>,
    config: CompactionConfig,
    token_limit: Option<usize>,
    auto_evicted: Vec<Message>,
}

impl ConversationHistory {
    /// History with the default tokenizer, scorer and classifier.
    pub fn new(config: CompactionConfig) -> Result<Self, ConfigError> {
        Self::with_analyzer(config, MessageAnalyzer::default())
    }

    /// History with custom strategies, e.g. an exact tokenizer.
    pub fn with_analyzer(
        config: CompactionConfig,
        analyzer: MessageAnalyzer,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_parts(config.validated()?, analyzer))
    }

    /// History that compacts itself to `max_tokens` whenever a record call exceeds it.
    pub fn with_token_limit(
        config: CompactionConfig,
        max_tokens: usize,
    ) -> Result<Self, ConfigError> {
        let mut history = Self::new(config)?;
        history.token_limit = Some(max_tokens);
        Ok(history)
    }

    /// History from an already validated config.
    pub(crate) fn from_parts(config: CompactionConfig, analyzer: MessageAnalyzer) -> Self {
        let analyzer = Arc::new(analyzer);
        Self {
            store: HistoryStore::new(analyzer.clone()),
            analyzer,
            config,
            token_limit: None,
            auto_evicted: Vec::new(),
        }
    }

    /// Builds a history from legacy items, recording them `batch_size` at a time.
    ///
    /// Rejected items are returned with their position in `items`.
    pub fn migrate_from(
        items: Vec<RawItem>,
        batch_size: usize,
        config: CompactionConfig,
    ) -> Result<(Self, Vec<RejectedItem>), ConfigError> {
        let mut history = Self::new(config)?;
        let mut rejected = Vec::new();
        let batch_size = batch_size.max(1);
        let mut offset = 0;
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            let batch: Vec<RawItem> = items.by_ref().take(batch_size).collect();
            let len = batch.len();
            if let Err(RecordError::InvalidInput { rejected: r, .. }) = history.record_items(batch)
            {
                rejected.extend(r.into_iter().map(|mut item| {
                    item.index += offset;
                    item
                }));
            }
            offset += len;
        }
        tracing::info!(
            messages = history.store.len(),
            rejected = rejected.len(),
            "history migrated"
        );
        Ok((history, rejected))
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CompactionConfig) -> Result<(), ConfigError> {
        self.config = config.validated()?;
        Ok(())
    }

    pub fn analyzer(&self) -> &MessageAnalyzer {
        &self.analyzer
    }

    pub fn token_limit(&self) -> Option<usize> {
        self.token_limit
    }

    /// Sets or clears the automatic compaction limit. Takes effect on the next record call.
    pub fn set_token_limit(&mut self, max_tokens: Option<usize>) {
        self.token_limit = max_tokens;
    }

    /// Messages evicted by automatic compaction since the last call, in eviction order.
    pub fn take_auto_evicted(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.auto_evicted)
    }

    /// Validates and appends items (with assistant merge), then enforces the token limit.
    ///
    /// Valid items are appended even when others in the same call fail; the error then
    /// carries the count appended and every rejected position.
    pub fn record_items(&mut self, items: Vec<RawItem>) -> Result<AppendSummary, RecordError> {
        let mut summary = AppendSummary::default();
        let mut rejected = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match validate_item(item) {
                Ok(message) => {
                    if self.store.append_one(message) {
                        summary.merged += 1;
                    } else {
                        summary.appended += 1;
                    }
                }
                Err(reason) => {
                    tracing::debug!(index, %reason, "item rejected");
                    rejected.push(RejectedItem { index, reason });
                }
            }
        }
        self.enforce_token_limit()?;
        if rejected.is_empty() {
            Ok(summary)
        } else {
            Err(RecordError::InvalidInput {
                appended: summary.accepted(),
                rejected,
            })
        }
    }

    /// Appends already validated messages, then enforces the token limit.
    pub fn record_messages<I>(&mut self, messages: I) -> Result<AppendSummary, CompactionError>
    where
        I: IntoIterator<Item = NewMessage>,
    {
        let summary = self.store.append(messages);
        self.enforce_token_limit()?;
        Ok(summary)
    }

    fn enforce_token_limit(&mut self) -> Result<(), CompactionError> {
        let limit = match self.token_limit {
            Some(limit) if self.store.total_tokens() > limit => limit,
            _ => return Ok(()),
        };
        tracing::debug!(
            limit,
            tokens = self.store.total_tokens(),
            "token limit exceeded, compacting"
        );
        let outcome = self.optimize_history(limit)?;
        self.auto_evicted.extend(outcome.evicted);
        Ok(())
    }

    /// Prunes to an absolute token ceiling, runs the configured compression pass and
    /// replaces the stored history with the result.
    pub fn optimize_history(
        &mut self,
        max_tokens: usize,
    ) -> Result<CompactionOutcome, CompactionError> {
        self.run(Target::Absolute(max_tokens))
    }

    /// Same as [`optimize_history`](Self::optimize_history) with the target derived from
    /// `target_reduction_ratio`.
    pub fn compact(&mut self) -> Result<CompactionOutcome, CompactionError> {
        self.run(Target::Ratio)
    }

    /// Truncates to the last `n` messages without scoring; returns the evicted messages.
    pub fn keep_last_messages(&mut self, n: usize) -> Result<Vec<Message>, CompactionError> {
        let (kept, evicted) = keep_last(self.store.snapshot(), n);
        self.store.replace(kept)?;
        tracing::debug!(kept = n, evicted = evicted.len(), "history truncated");
        Ok(evicted)
    }

    /// Runs only the compression pass over non-essential messages outside the recent window.
    pub fn compress(&mut self) -> Result<usize, CompactionError> {
        self.config.validate()?;
        let mut working = self.store.snapshot().to_vec();
        let recent_start = working.len().saturating_sub(self.config.minimum_messages);
        let count = CompressionEngine::new(&self.analyzer).compress_where(
            &mut working,
            &self.config,
            |pos, _| pos < recent_start,
        );
        self.store.replace(working)?;
        Ok(count)
    }

    /// Ordered copy of the current history.
    pub fn items(&self) -> Vec<Message> {
        self.store.snapshot().to_vec()
    }

    pub fn snapshot(&self) -> &[Message] {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.store.total_tokens()
    }

    /// Usage statistics; utilization is reported against `max_tokens` when given.
    pub fn stats(&self, max_tokens: Option<usize>) -> HistoryStats {
        let messages = self.store.snapshot();
        let total_tokens = self.store.total_tokens();
        let scorer = &self.analyzer.scorer;
        let mut stats = HistoryStats {
            total_messages: messages.len(),
            total_tokens,
            max_tokens,
            utilization_percentage: max_tokens
                .filter(|max| *max > 0)
                .map(|max| (total_tokens as u64 * 100 / max as u64) as u32),
            compressed_messages: 0,
            essential_messages: 0,
            high_importance_messages: 0,
            medium_importance_messages: 0,
            low_importance_messages: 0,
            next_index: self.store.next_index(),
        };
        for m in messages {
            if m.compressed {
                stats.compressed_messages += 1;
            }
            if m.essential {
                stats.essential_messages += 1;
            }
            match scorer.level(m.importance) {
                ImportanceLevel::High => stats.high_importance_messages += 1,
                ImportanceLevel::Medium => stats.medium_importance_messages += 1,
                ImportanceLevel::Low => stats.low_importance_messages += 1,
            }
        }
        stats
    }

    fn run(&mut self, target: Target) -> Result<CompactionOutcome, CompactionError> {
        self.config.validate()?;
        let config = &self.config;
        let analyzer = self.analyzer.as_ref();
        let original = self.store.snapshot();
        let tokens_before = analyzer.tokens(original);
        let target_tokens = match target {
            Target::Ratio => config.target_tokens(tokens_before),
            Target::Absolute(max) => max,
        };

        let compressor = CompressionEngine::new(analyzer);
        let mut working = original.to_vec();
        let mut compressed = 0;
        if config.compression_order == CompressionOrder::BeforePruning {
            let recent_start = working.len().saturating_sub(config.minimum_messages);
            compressed +=
                compressor.compress_where(&mut working, config, |pos, _| pos < recent_start);
        }

        let mut outcome =
            PruningEngine::new(analyzer).compact_to_budget(&working, target_tokens, config)?;

        if config.compression_order == CompressionOrder::AfterPruning {
            let selected = &outcome.selected_from_remainder;
            compressed += compressor.compress_where(&mut outcome.messages, config, |_, m| {
                selected.contains(&m.original_index)
            });
        }

        if compressed > 0 {
            // Archive the uncompressed originals of anything evicted.
            let evicted: BTreeSet<u64> =
                outcome.evicted.iter().map(|m| m.original_index).collect();
            outcome.evicted = original
                .iter()
                .filter(|m| evicted.contains(&m.original_index))
                .cloned()
                .collect();
            outcome.tokens_after = analyzer.tokens(&outcome.messages);
            if outcome.status.is_unreachable() && outcome.tokens_after <= target_tokens {
                outcome.status = BudgetStatus::Met;
            }
        }
        outcome.compressed = compressed;
        outcome.tokens_before = tokens_before;

        self.store.replace(outcome.messages.clone())?;
        tracing::info!(
            messages = outcome.messages.len(),
            evicted = outcome.evicted.len(),
            compressed,
            tokens_before,
            tokens_after = outcome.tokens_after,
            target_tokens,
            "history compacted"
        );
        Ok(outcome)
    }
}

fn validate_item(item: RawItem) -> Result<NewMessage, InvalidItem> {
    let role = item.role.ok_or(InvalidItem::MissingRole)?;
    let role = Role::parse(&role).ok_or(InvalidItem::UnknownRole(role))?;
    let content = item.content.ok_or(InvalidItem::MissingContent)?;
    let mut message = NewMessage::new(role, content);
    if let Some(ts) = item.timestamp {
        message.timestamp = ts;
    }
    Ok(message)
}
