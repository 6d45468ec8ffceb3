//! Subcommand bodies, independent of argument parsing and of where output goes.

use histrim::{
    Archive, BudgetStatus, CompactionConfig, ConversationHistory, ImportanceLevel, MessageKind,
    RawItem, RecordError, Role,
};
use serde::Serialize;

use crate::error::CliError;

/// What to do with a loaded history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ratio-based compaction.
    Compact,
    /// Compaction to an absolute token ceiling.
    Optimize { max_tokens: usize },
    /// Keep the last `keep` messages.
    Truncate { keep: usize },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Optimize { .. } => "optimize",
            Self::Truncate { .. } => "truncate",
        }
    }
}

/// Summary of one run, printed as one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub action: &'static str,
    pub messages_before: usize,
    pub messages_after: usize,
    pub evicted: usize,
    pub compressed: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    /// Evicted while loading, by the token limit.
    pub auto_evicted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetStatus>,
    pub archived: usize,
}

/// Builds a history from log items, compacting to `token_limit` when the log exceeds it.
///
/// Invalid items are logged and skipped, or fail the load when `strict`. Returns the history
/// and the number of rejected items.
pub fn load_history(
    items: Vec<RawItem>,
    config: CompactionConfig,
    token_limit: Option<usize>,
    strict: bool,
) -> Result<(ConversationHistory, usize), CliError> {
    let mut history = ConversationHistory::new(config)?;
    history.set_token_limit(token_limit);
    match history.record_items(items) {
        Ok(_) => Ok((history, 0)),
        Err(err @ RecordError::InvalidInput { .. }) if strict => Err(err.into()),
        Err(RecordError::InvalidInput { rejected, .. }) => {
            for r in &rejected {
                tracing::warn!(line = r.index + 1, reason = %r.reason, "session record skipped");
            }
            Ok((history, rejected.len()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Applies `action`; messages evicted by it, or earlier by the token limit, are handed to
/// `archive` when one is given.
pub fn run_action(
    history: &mut ConversationHistory,
    action: Action,
    archive: Option<&dyn Archive>,
) -> Result<RunReport, CliError> {
    let auto_evicted = history.take_auto_evicted();
    let messages_before = history.len();
    let tokens_before = history.total_tokens();

    let (evicted, compressed, target_tokens, budget) = match action {
        Action::Compact | Action::Optimize { .. } => {
            let outcome = match action {
                Action::Optimize { max_tokens } => history.optimize_history(max_tokens)?,
                _ => history.compact()?,
            };
            (
                outcome.evicted,
                outcome.compressed,
                Some(outcome.target_tokens),
                Some(outcome.status),
            )
        }
        Action::Truncate { keep } => (history.keep_last_messages(keep)?, 0, None, None),
    };

    let mut archived = 0;
    if let Some(archive) = archive {
        for batch in [&auto_evicted, &evicted] {
            if !batch.is_empty() {
                archive.archive(batch)?;
                archived += batch.len();
            }
        }
    }

    Ok(RunReport {
        action: action.name(),
        messages_before,
        messages_after: history.len(),
        evicted: evicted.len(),
        compressed,
        tokens_before,
        tokens_after: history.total_tokens(),
        auto_evicted: auto_evicted.len(),
        target_tokens,
        budget,
        archived,
    })
}

/// Per-message scoring view, one JSON line each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub index: u64,
    pub role: Role,
    pub importance: f64,
    pub level: ImportanceLevel,
    pub essential: bool,
    pub kind: MessageKind,
    pub tokens: usize,
}

pub fn score_rows(history: &ConversationHistory) -> Vec<ScoreRow> {
    let scorer = &history.analyzer().scorer;
    history
        .snapshot()
        .iter()
        .map(|m| ScoreRow {
            index: m.original_index,
            role: m.role,
            importance: m.importance,
            level: scorer.level(m.importance),
            essential: m.essential,
            kind: m.kind,
            tokens: m.token_count,
        })
        .collect()
}
