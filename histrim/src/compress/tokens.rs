//! Token estimation.
//!
//! [`Tokenizer`] is the seam for a real tokenizer service; [`HeuristicTokenizer`] is the
//! built-in stand-in (~3.5 characters per token).

use crate::message::Message;

/// Characters per token used by [`HeuristicTokenizer::default`].
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Counts tokens in text. Implementations must be pure and deterministic, and a prefix of a
/// text never counts more tokens than the whole text.
pub trait Tokenizer: Send + Sync {
    /// Token count of `text`.
    fn estimate(&self, text: &str) -> usize;

    /// Token count of any text with `chars` characters, when it depends on length alone.
    ///
    /// Lets callers size candidate texts without building them.
    fn estimate_chars(&self, _chars: usize) -> Option<usize> {
        None
    }

    /// Sum of per-message content estimates.
    fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate(&m.content)).sum()
    }
}

/// Heuristic tokenizer: `ceil(chars / chars_per_token)`.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenizer {
    pub chars_per_token: f64,
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn estimate(&self, text: &str) -> usize {
        chars_to_tokens(text.chars().count(), self.chars_per_token)
    }

    fn estimate_chars(&self, chars: usize) -> Option<usize> {
        Some(chars_to_tokens(chars, self.chars_per_token))
    }
}

fn chars_to_tokens(chars: usize, chars_per_token: f64) -> usize {
    if chars == 0 {
        return 0;
    }
    (chars as f64 / chars_per_token).ceil() as usize
}
