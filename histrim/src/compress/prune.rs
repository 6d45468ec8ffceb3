//! Budget-constrained pruning: select a subsequence of a history that fits a token target.
//!
//! Essential messages and the most recent `minimum_messages` are always kept. The rest
//! (the remainder) is ranked by importance and taken greedily while it fits the budget
//! left after the protected sets reserve theirs. Output order is always `original_index`
//! order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::ConfigError;
use crate::message::Message;

use super::analyzer::MessageAnalyzer;
use super::config::{BudgetReservation, CompactionConfig};

/// Whether a compaction reached its token target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    /// History was already within the target; nothing changed.
    AlreadyWithin,
    /// Output fits the target.
    Met,
    /// Protected messages alone exceed the target; output keeps them and nothing else
    /// from the remainder, or still sits above target.
    Unreachable {
        target_tokens: usize,
        reserved_tokens: usize,
    },
}

impl BudgetStatus {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Result of one compaction pass.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// Kept messages in `original_index` order.
    pub messages: Vec<Message>,
    /// Dropped messages in `original_index` order; hand these to an archive.
    pub evicted: Vec<Message>,
    /// Indices of messages kept from the remainder (neither essential nor recent).
    pub selected_from_remainder: BTreeSet<u64>,
    /// Messages shortened by the compression pass that accompanied this compaction.
    pub compressed: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub target_tokens: usize,
    pub status: BudgetStatus,
}

impl CompactionOutcome {
    fn unchanged(history: &[Message], tokens: usize, target_tokens: usize) -> Self {
        Self {
            messages: history.to_vec(),
            evicted: Vec::new(),
            selected_from_remainder: BTreeSet::new(),
            compressed: 0,
            tokens_before: tokens,
            tokens_after: tokens,
            target_tokens,
            status: BudgetStatus::AlreadyWithin,
        }
    }
}

/// Selects budget-respecting subsequences of a history.
#[derive(Debug, Clone, Copy)]
pub struct PruningEngine<'a> {
    analyzer: &'a MessageAnalyzer,
}

impl<'a> PruningEngine<'a> {
    pub fn new(analyzer: &'a MessageAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Prunes to `floor(tokens * (1 - target_reduction_ratio))`.
    pub fn compact(
        &self,
        history: &[Message],
        config: &CompactionConfig,
    ) -> Result<CompactionOutcome, ConfigError> {
        config.validate()?;
        let current = self.analyzer.tokens(history);
        let target = config.target_tokens(current);
        Ok(self.select(history, current, target, config))
    }

    /// Prunes to an absolute token ceiling.
    pub fn compact_to_budget(
        &self,
        history: &[Message],
        max_tokens: usize,
        config: &CompactionConfig,
    ) -> Result<CompactionOutcome, ConfigError> {
        config.validate()?;
        let current = self.analyzer.tokens(history);
        Ok(self.select(history, current, max_tokens, config))
    }

    fn select(
        &self,
        history: &[Message],
        current: usize,
        target: usize,
        config: &CompactionConfig,
    ) -> CompactionOutcome {
        if current <= target {
            tracing::debug!(current, target, "history within budget, no pruning");
            return CompactionOutcome::unchanged(history, current, target);
        }

        let tokenizer = self.analyzer.tokenizer.as_ref();
        let recent_start = history.len().saturating_sub(config.minimum_messages);

        let mut essential_tokens = 0usize;
        let mut recent_tokens = 0usize;
        let mut union_tokens = 0usize;
        let mut protected = BTreeSet::new();
        let mut remainder = Vec::new();
        for (pos, m) in history.iter().enumerate() {
            let tokens = tokenizer.estimate(&m.content);
            let is_essential = self.analyzer.classifier.is_essential(m);
            let is_recent = pos >= recent_start;
            if is_essential {
                essential_tokens += tokens;
            }
            if is_recent {
                recent_tokens += tokens;
            }
            if is_essential || is_recent {
                union_tokens += tokens;
                protected.insert(m.original_index);
            } else {
                remainder.push((m, tokens));
            }
        }

        let reserved = match config.budget_reservation {
            BudgetReservation::Max => essential_tokens.max(recent_tokens),
            BudgetReservation::Union => union_tokens,
            BudgetReservation::Additive => essential_tokens + recent_tokens,
        };
        let available = target as i64 - reserved as i64;
        tracing::debug!(
            current,
            target,
            essential_tokens,
            recent_tokens,
            reserved,
            available,
            remainder = remainder.len(),
            "pruning partition"
        );

        let mut selected = BTreeSet::new();
        if available > 0 {
            let mut ranked: Vec<(f64, &Message, usize)> = remainder
                .into_iter()
                .map(|(m, tokens)| (self.analyzer.scorer.score(m), m, tokens))
                .collect();
            ranked.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(Ordering::Equal)
                    .then(a.1.original_index.cmp(&b.1.original_index))
            });
            let budget = available as usize;
            let mut used = 0usize;
            for (_, m, tokens) in ranked {
                if used + tokens <= budget {
                    used += tokens;
                    selected.insert(m.original_index);
                }
            }
        }

        let mut messages = Vec::with_capacity(protected.len() + selected.len());
        let mut evicted = Vec::new();
        for m in history {
            if protected.contains(&m.original_index) || selected.contains(&m.original_index) {
                messages.push(m.clone());
            } else {
                evicted.push(m.clone());
            }
        }
        let tokens_after = self.analyzer.tokens(&messages);
        let status = if tokens_after <= target {
            BudgetStatus::Met
        } else {
            tracing::warn!(
                target,
                reserved,
                tokens_after,
                "token target unreachable without dropping protected messages"
            );
            BudgetStatus::Unreachable {
                target_tokens: target,
                reserved_tokens: reserved,
            }
        };
        tracing::info!(
            before = history.len(),
            after = messages.len(),
            tokens_before = current,
            tokens_after,
            "history pruned"
        );

        CompactionOutcome {
            messages,
            evicted,
            selected_from_remainder: selected,
            compressed: 0,
            tokens_before: current,
            tokens_after,
            target_tokens: target,
            status,
        }
    }
}

/// Keeps the last `n` messages unconditionally; returns `(kept, evicted)`.
pub fn keep_last(history: &[Message], n: usize) -> (Vec<Message>, Vec<Message>) {
    let split = history.len().saturating_sub(n);
    let (old, recent) = history.split_at(split);
    (recent.to_vec(), old.to_vec())
}
