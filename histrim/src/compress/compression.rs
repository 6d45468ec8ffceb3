//! Lossy compression of verbose, low-importance messages.
//!
//! Keeps the leading `compression_keep_fraction` of a message's words and appends
//! [`COMPRESSION_MARKER`]. A compression is only applied when it removes at least
//! `minimum_compression_ratio` of the message's estimated tokens and leaves the content
//! strictly shorter; essential messages are never touched.

use crate::message::Message;

use super::analyzer::MessageAnalyzer;
use super::config::CompactionConfig;

/// Appended to every compressed message.
pub const COMPRESSION_MARKER: &str = "[Compressed]";

/// `1 - compressed / original`, in estimated tokens. Zero when `original` is zero.
pub fn compression_ratio(original_tokens: usize, compressed_tokens: usize) -> f64 {
    if original_tokens == 0 {
        return 0.0;
    }
    1.0 - compressed_tokens as f64 / original_tokens as f64
}

#[derive(Debug, Clone, Copy)]
pub struct CompressionEngine<'a> {
    analyzer: &'a MessageAnalyzer,
}

impl<'a> CompressionEngine<'a> {
    pub fn new(analyzer: &'a MessageAnalyzer) -> Self {
        Self { analyzer }
    }

    /// True when `message` is long enough, unimportant enough and not essential.
    pub fn qualifies(&self, message: &Message, config: &CompactionConfig) -> bool {
        message.chars() > config.compression_length_threshold
            && !self.analyzer.classifier.is_essential(message)
            && self.analyzer.scorer.score(message) < config.compression_importance_cutoff
    }

    /// Returns the compressed replacement, or `None` when compression does not apply.
    ///
    /// The replacement keeps `original_index`, role and timestamp; derived fields are
    /// recomputed and `compressed` is set.
    pub fn compress(&self, message: &Message, config: &CompactionConfig) -> Option<Message> {
        if !self.qualifies(message, config) {
            return None;
        }
        let tokenizer = self.analyzer.tokenizer.as_ref();
        let original_tokens = tokenizer.estimate(&message.content);
        let words: Vec<&str> = message.content.split_whitespace().collect();
        // Small epsilon so e.g. 300 * 0.35 floors to 105, not 104.
        let initial = ((words.len() as f64 * config.compression_keep_fraction) + 1e-9).floor()
            as usize;
        let initial = initial.min(words.len());

        // prefix_chars[k]: characters of the first k words, each followed by one space.
        let mut prefix_chars = Vec::with_capacity(words.len() + 1);
        prefix_chars.push(0usize);
        for w in &words {
            let last = prefix_chars[prefix_chars.len() - 1];
            prefix_chars.push(last + w.chars().count() + 1);
        }
        let marker_chars = COMPRESSION_MARKER.chars().count();
        let meets_ratio = |keep: usize| {
            let tokens = tokenizer
                .estimate_chars(prefix_chars[keep] + marker_chars)
                .unwrap_or_else(|| tokenizer.estimate(&render(&words[..keep])));
            compression_ratio(original_tokens, tokens) >= config.minimum_compression_ratio
        };

        // The ratio only falls as words are kept, so search for the largest passing prefix.
        if !meets_ratio(0) {
            tracing::debug!(
                index = message.original_index,
                "compression cannot reach minimum ratio, skipped"
            );
            return None;
        }
        let (mut lo, mut hi) = (0, initial);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if meets_ratio(mid) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let keep = lo;
        let content = render(&words[..keep]);
        if content.chars().count() >= message.chars() {
            return None;
        }

        let mut out = message.clone();
        out.content = content;
        self.analyzer.refresh(&mut out);
        out.compressed = true;
        tracing::debug!(
            index = message.original_index,
            words_before = words.len(),
            words_after = keep,
            tokens_before = original_tokens,
            tokens_after = out.token_count,
            "message compressed"
        );
        Some(out)
    }

    /// Compresses, in place, every message for which `select` returns true.
    ///
    /// Order and indices are unchanged. Returns the number of messages compressed.
    pub fn compress_where<F>(
        &self,
        messages: &mut [Message],
        config: &CompactionConfig,
        mut select: F,
    ) -> usize
    where
        F: FnMut(usize, &Message) -> bool,
    {
        let mut count = 0;
        for (pos, slot) in messages.iter_mut().enumerate() {
            if !select(pos, slot) {
                continue;
            }
            if let Some(replacement) = self.compress(slot, config) {
                *slot = replacement;
                count += 1;
            }
        }
        count
    }
}

fn render(words: &[&str]) -> String {
    if words.is_empty() {
        COMPRESSION_MARKER.to_string()
    } else {
        format!("{} {}", words.join(" "), COMPRESSION_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;

    use crate::compress::tokens::{HeuristicTokenizer, Tokenizer};
    use crate::message::Role;

    use super::*;

    /// Heuristic tokenizer that counts full-text estimates; `length_only` toggles the
    /// character-count shortcut.
    struct CountingTokenizer {
        inner: HeuristicTokenizer,
        length_only: bool,
        text_calls: AtomicUsize,
    }

    impl CountingTokenizer {
        fn new(length_only: bool) -> Arc<Self> {
            Arc::new(Self {
                inner: HeuristicTokenizer::default(),
                length_only,
                text_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.text_calls.load(Ordering::SeqCst)
        }
    }

    impl Tokenizer for CountingTokenizer {
        fn estimate(&self, text: &str) -> usize {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.estimate(text)
        }

        fn estimate_chars(&self, chars: usize) -> Option<usize> {
            if self.length_only {
                self.inner.estimate_chars(chars)
            } else {
                None
            }
        }
    }

    /// Leading third of long words, then short ones: the keep fraction alone misses the
    /// minimum ratio by a wide margin.
    fn front_loaded(words: usize) -> String {
        let long = words * 35 / 100;
        let mut out: Vec<String> = (0..long).map(|_| "q".repeat(30)).collect();
        out.extend((long..words).map(|_| "zz".to_string()));
        out.join(" ")
    }

    fn build(a: &MessageAnalyzer, role: Role, content: String) -> Message {
        a.build(3, role, content, Utc::now())
    }

    /// Scores 0.5: +0.3 for "config", -0.1 for length over 1000 chars.
    fn three_hundred_words() -> String {
        let mut words = vec!["config".to_string()];
        words.extend((1..300).map(|_| "alpha".to_string()));
        words.join(" ")
    }

    /// **Scenario**: 300 words, score 0.5, threshold 200, keep 0.35 -> 105 words + marker.
    #[test]
    fn keeps_leading_fraction_of_words() {
        let a = MessageAnalyzer::default();
        let m = build(&a, Role::Assistant, three_hundred_words());
        assert!((a.scorer.score(&m) - 0.5).abs() < 1e-9);
        let config = CompactionConfig::default();
        let out = CompressionEngine::new(&a).compress(&m, &config).unwrap();

        assert!(out.content.ends_with(COMPRESSION_MARKER));
        let kept = out.content.trim_end_matches(COMPRESSION_MARKER).split_whitespace().count();
        assert_eq!(kept, 105);
        assert!(out.content.starts_with("config alpha"));
        assert!(out.content.len() < m.content.len());
        assert!(out.compressed);
        assert_eq!(out.original_index, m.original_index);
        assert_eq!(out.role, m.role);
        assert_eq!(out.timestamp, m.timestamp);
        assert!(compression_ratio(m.token_count, out.token_count) >= 0.6);
    }

    #[test]
    fn short_messages_are_left_alone() {
        let a = MessageAnalyzer::default();
        let m = build(&a, Role::User, "x ".repeat(100).trim_end().to_string()); // 199 chars
        assert!(CompressionEngine::new(&a)
            .compress(&m, &CompactionConfig::default())
            .is_none());
    }

    #[test]
    fn important_messages_are_left_alone() {
        let a = MessageAnalyzer::default();
        // config (+0.3) + code (+0.25) = 0.85 >= cutoff 0.7
        let content = format!("config fn {}", "word ".repeat(80));
        let m = build(&a, Role::User, content);
        assert!(CompressionEngine::new(&a)
            .compress(&m, &CompactionConfig::default())
            .is_none());
    }

    /// **Scenario**: essential messages are never compressed, even with a permissive cutoff.
    #[test]
    fn essential_messages_are_never_compressed() {
        let a = MessageAnalyzer::default();
        let content = format!("ERROR: {}", "detail ".repeat(80));
        let m = build(&a, Role::User, content);
        let config = CompactionConfig {
            compression_importance_cutoff: 2.0,
            ..Default::default()
        };
        assert!(CompressionEngine::new(&a).compress(&m, &config).is_none());
    }

    /// **Scenario**: when the keep fraction alone misses the minimum ratio, more words are dropped.
    #[test]
    fn drops_extra_words_to_reach_minimum_ratio() {
        let a = MessageAnalyzer::default();
        let m = build(&a, Role::User, "lorem ".repeat(60).trim_end().to_string());
        let config = CompactionConfig {
            compression_keep_fraction: 0.8,
            minimum_compression_ratio: 0.6,
            ..Default::default()
        };
        let out = CompressionEngine::new(&a).compress(&m, &config).unwrap();
        let kept = out.content.trim_end_matches(COMPRESSION_MARKER).split_whitespace().count();
        assert!(kept < 48, "kept {} words", kept);
        assert!(compression_ratio(m.token_count, out.token_count) >= 0.6);
    }

    /// **Scenario**: one huge word keeps zero words and becomes just the marker.
    #[test]
    fn single_long_word_becomes_marker() {
        let a = MessageAnalyzer::default();
        let m = build(&a, Role::User, "z".repeat(500));
        let out = CompressionEngine::new(&a)
            .compress(&m, &CompactionConfig::default())
            .unwrap();
        assert_eq!(out.content, COMPRESSION_MARKER);
    }

    #[test]
    fn unreachable_ratio_skips_compression() {
        let a = MessageAnalyzer::default();
        // 12 chars over a 10 char threshold: even the bare marker saves nothing.
        let m = build(&a, Role::User, "abcdefghijkl".to_string());
        let config = CompactionConfig {
            compression_length_threshold: 10,
            ..Default::default()
        };
        assert!(CompressionEngine::new(&a).compress(&m, &config).is_none());
    }

    #[test]
    fn compress_where_respects_selector() {
        let a = MessageAnalyzer::default();
        let mut msgs = vec![
            build(&a, Role::User, "q ".repeat(150)),
            build(&a, Role::User, "r ".repeat(150)),
        ];
        let config = CompactionConfig::default();
        let n = CompressionEngine::new(&a).compress_where(&mut msgs, &config, |pos, _| pos == 1);
        assert_eq!(n, 1);
        assert!(!msgs[0].compressed);
        assert!(msgs[1].compressed);
    }

    /// **Scenario**: a length-only tokenizer sizes every candidate without rendering it, so
    /// full-text estimates stay constant as the message grows.
    #[test]
    fn candidate_search_does_not_rescan_text() {
        let config = CompactionConfig::default();
        let mut calls = Vec::new();
        for words in [2_000, 20_000] {
            let tokenizer = CountingTokenizer::new(true);
            let a = MessageAnalyzer::default().with_tokenizer(tokenizer.clone());
            let m = build(&a, Role::User, front_loaded(words));
            let before = tokenizer.calls();
            let out = CompressionEngine::new(&a).compress(&m, &config).unwrap();
            assert!(compression_ratio(m.token_count, out.token_count) >= 0.6);
            calls.push(tokenizer.calls() - before);
        }
        assert_eq!(calls[0], calls[1]);
        assert!(calls[0] <= 2, "{} text estimates", calls[0]);
    }

    /// **Scenario**: a text-only tokenizer gets a logarithmic number of candidate estimates
    /// and the same result as the length shortcut.
    #[test]
    fn text_only_tokenizer_matches_length_shortcut() {
        let config = CompactionConfig::default();
        let content = front_loaded(4_000);

        let fast = MessageAnalyzer::default();
        let expected = CompressionEngine::new(&fast)
            .compress(&build(&fast, Role::User, content.clone()), &config)
            .unwrap();

        let tokenizer = CountingTokenizer::new(false);
        let slow = MessageAnalyzer::default().with_tokenizer(tokenizer.clone());
        let m = build(&slow, Role::User, content);
        let before = tokenizer.calls();
        let out = CompressionEngine::new(&slow).compress(&m, &config).unwrap();
        assert_eq!(out.content, expected.content);
        // 1400 initial words -> at most 11 bisection steps, plus the empty prefix,
        // the original and the refresh.
        assert!(tokenizer.calls() - before <= 14, "{}", tokenizer.calls() - before);
    }

    #[test]
    fn ratio_of_empty_original_is_zero() {
        assert_eq!(compression_ratio(0, 0), 0.0);
        assert!((compression_ratio(10, 4) - 0.6).abs() < 1e-9);
    }
}
