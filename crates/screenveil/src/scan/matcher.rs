//! Span matching over text.
//!
//! The [`Matcher`] applies the configured patterns to a text string and
//! returns an ordered, non-overlapping list of classified spans. Overlap
//! resolution is deterministic: the span with the earliest start offset
//! wins; ties are broken by pattern precedence, then by match length.

use regex::Regex;
use tracing::debug;

use super::patterns::{builtin_patterns, PatternKind, ScanPattern};

/// Default mask character for terminal output, one per masked character.
const MASK_CHAR: char = '\u{2588}'; // full block

/// A classified match within a text string.
///
/// Offsets are byte positions into the scanned text; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset one past the last matched byte.
    pub end: usize,
    /// Classification of the matched text.
    pub kind: PatternKind,
}

impl MatchSpan {
    /// The matched substring of `text`.
    ///
    /// `text` must be the same string the span was produced from.
    #[must_use]
    pub fn matched<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Length of the matched region in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty (never produced by the matcher).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Configuration for the matcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Pattern kinds to apply. Kinds not listed contribute no spans.
    pub enabled_kinds: Vec<PatternKind>,

    /// Additional user-supplied regex patterns. Matches are classified as
    /// [`PatternKind::Pii`] and rank below all built-ins in precedence.
    pub custom_patterns: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            enabled_kinds: PatternKind::ALL.to_vec(),
            custom_patterns: Vec::new(),
        }
    }
}

/// Applies sensitive-data patterns to text, producing classified spans.
#[derive(Debug)]
pub struct Matcher {
    patterns: Vec<ScanPattern>,
    custom_regexes: Vec<Regex>,
}

impl Matcher {
    /// Create a matcher with all built-in patterns enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&MatcherConfig::default())
    }

    /// Create a matcher from the given configuration.
    ///
    /// Invalid custom regexes are logged and skipped; they never fail
    /// matcher construction.
    #[must_use]
    pub fn with_config(config: &MatcherConfig) -> Self {
        let patterns = builtin_patterns()
            .into_iter()
            .filter(|p| config.enabled_kinds.contains(&p.kind))
            .collect();

        let custom_regexes = config
            .custom_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Invalid custom regex pattern");
                    None
                }
            })
            .collect();

        Self {
            patterns,
            custom_regexes,
        }
    }

    /// Number of active patterns (built-in plus custom).
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len() + self.custom_regexes.len()
    }

    /// Find all sensitive spans in `text`.
    ///
    /// The result is sorted by start offset and contains no overlapping
    /// spans. Arbitrary input never panics; an empty result is a normal
    /// outcome.
    #[must_use]
    pub fn find_spans(&self, text: &str) -> Vec<MatchSpan> {
        if text.is_empty() {
            return Vec::new();
        }

        // (span, precedence index) for every raw match
        let mut candidates: Vec<(MatchSpan, usize)> = Vec::new();

        for (priority, pattern) in self.patterns.iter().enumerate() {
            for m in pattern.find_all(text) {
                candidates.push((
                    MatchSpan {
                        start: m.start(),
                        end: m.end(),
                        kind: pattern.kind,
                    },
                    priority,
                ));
            }
        }

        let custom_base = self.patterns.len();
        for (i, regex) in self.custom_regexes.iter().enumerate() {
            for m in regex.find_iter(text) {
                candidates.push((
                    MatchSpan {
                        start: m.start(),
                        end: m.end(),
                        kind: PatternKind::Pii,
                    },
                    custom_base + i,
                ));
            }
        }

        // Earliest start wins; precedence then length break ties.
        candidates.sort_by(|(a, ap), (b, bp)| {
            a.start
                .cmp(&b.start)
                .then(ap.cmp(bp))
                .then(b.end.cmp(&a.end))
        });

        let mut spans: Vec<MatchSpan> = Vec::new();
        for (span, _) in candidates {
            let overlaps = spans.last().is_some_and(|last| span.start < last.end);
            if overlaps {
                debug!(start = span.start, kind = %span.kind, "Dropping overlapped span");
            } else {
                spans.push(span);
            }
        }

        spans
    }

    /// Check whether `text` contains any sensitive span.
    #[must_use]
    pub fn contains_sensitive(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(text))
            || self.custom_regexes.iter().any(|r| r.is_match(text))
    }

    /// Mask every sensitive span in `text`.
    ///
    /// With `placeholder` set, each span is replaced by the placeholder;
    /// otherwise each character of the span becomes a block character,
    /// preserving the visual length of the line.
    #[must_use]
    pub fn mask(&self, text: &str, placeholder: Option<&str>) -> String {
        let spans = self.find_spans(text);
        if spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for span in &spans {
            out.push_str(&text[cursor..span.start]);
            match placeholder {
                Some(p) => out.push_str(p),
                None => {
                    for _ in span.matched(text).chars() {
                        out.push(MASK_CHAR);
                    }
                }
            }
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_span_covers_exact_substring() {
        let matcher = Matcher::new();
        let text = "Contact us at test@example.com for support";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 14);
        assert_eq!(spans[0].matched(text), "test@example.com");
        assert_eq!(spans[0].kind, PatternKind::Email);
    }

    #[test]
    fn test_credit_card_span_covers_full_number() {
        let matcher = Matcher::new();
        let text = "Card: 4532-1234-5678-9010";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].matched(text), "4532-1234-5678-9010");
        assert_eq!(spans[0].kind, PatternKind::CreditCard);
    }

    #[test]
    fn test_api_key_span() {
        let matcher = Matcher::new();
        let text = "Use API key: api_key_1234567890abcdefghijklmnopqrst";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert!(spans[0].matched(text).starts_with("api_key_"));
        assert_eq!(spans[0].kind, PatternKind::ApiKey);
    }

    #[test]
    fn test_revenue_span() {
        let matcher = Matcher::new();
        let text = "Total revenue: $1,234.56";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].matched(text), "$1,234.56");
        assert_eq!(spans[0].kind, PatternKind::Revenue);
    }

    #[test]
    fn test_multiple_spans_ordered_by_start() {
        let matcher = Matcher::new();
        let text = "Email a@example.com, card 4532 1234 5678 9010, total $99";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 3);
        assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));
        assert_eq!(spans[0].kind, PatternKind::Email);
        assert_eq!(spans[1].kind, PatternKind::CreditCard);
        assert_eq!(spans[2].kind, PatternKind::Revenue);
    }

    #[test]
    fn test_spans_never_overlap() {
        let matcher = Matcher::new();
        // Account prefix followed by enough digits to also look like an
        // account number reference inside other matches
        let text = "account: 12345678 and 123-45-6789 and account no. 4532123456789010";

        let spans = matcher.find_spans(text);

        for w in spans.windows(2) {
            assert!(w[0].end <= w[1].start, "overlap: {w:?}");
        }
    }

    #[test]
    fn test_earliest_match_wins_on_overlap() {
        let matcher = Matcher::new();
        // The email match starts at 0 and swallows the key token that
        // begins at offset 4
        let text = "abc.token_12345678901234567890@example.com";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, PatternKind::Email);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].matched(text), text);
    }

    #[test]
    fn test_precedence_breaks_same_start_ties() {
        let matcher = Matcher::new();
        // Both the apiKey and email patterns match starting at offset 0;
        // apiKey ranks higher in the precedence list
        let text = "token_12345678901234567890@example.com";

        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, PatternKind::ApiKey);
        assert_eq!(spans[0].matched(text), "token_12345678901234567890");
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let matcher = Matcher::new();

        assert!(matcher.find_spans("").is_empty());
        assert!(matcher.find_spans("   \n\t  ").is_empty());
        assert!(matcher.find_spans("no secrets here").is_empty());
        // Non-ASCII input must not panic
        assert!(matcher.find_spans("héllo wörld 漢字").is_empty());
    }

    #[test]
    fn test_disabled_kind_contributes_no_spans() {
        let config = MatcherConfig {
            enabled_kinds: vec![PatternKind::CreditCard],
            ..Default::default()
        };
        let matcher = Matcher::with_config(&config);

        let text = "test@example.com and 4532-1234-5678-9010";
        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, PatternKind::CreditCard);
    }

    #[test]
    fn test_no_kinds_enabled() {
        let config = MatcherConfig {
            enabled_kinds: Vec::new(),
            ..Default::default()
        };
        let matcher = Matcher::with_config(&config);

        assert!(matcher.find_spans("test@example.com").is_empty());
        assert_eq!(matcher.pattern_count(), 0);
    }

    #[test]
    fn test_custom_pattern_classified_as_pii() {
        let config = MatcherConfig {
            custom_patterns: vec![r"\bSECRET-\d{4}\b".to_string()],
            ..Default::default()
        };
        let matcher = Matcher::with_config(&config);

        let text = "code SECRET-1234 here";
        let spans = matcher.find_spans(text);

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].matched(text), "SECRET-1234");
        assert_eq!(spans[0].kind, PatternKind::Pii);
    }

    #[test]
    fn test_invalid_custom_pattern_skipped() {
        let config = MatcherConfig {
            custom_patterns: vec![r"\bvalid\b".to_string(), r"[invalid".to_string()],
            ..Default::default()
        };
        let matcher = Matcher::with_config(&config);

        // Built-ins plus the one valid custom pattern
        assert_eq!(matcher.pattern_count(), PatternKind::ALL.len() + 1);
    }

    #[test]
    fn test_contains_sensitive() {
        let matcher = Matcher::new();

        assert!(matcher.contains_sensitive("mail me: a@b.co"));
        assert!(!matcher.contains_sensitive("nothing to see"));
    }

    #[test]
    fn test_mask_with_blocks_preserves_length() {
        let matcher = Matcher::new();
        let text = "Contact us at test@example.com for support";

        let masked = matcher.mask(text, None);

        assert_eq!(masked.chars().count(), text.chars().count());
        assert!(!masked.contains("test@example.com"));
        assert!(masked.starts_with("Contact us at "));
        assert!(masked.ends_with(" for support"));
    }

    #[test]
    fn test_mask_with_placeholder() {
        let matcher = Matcher::new();
        let text = "SSN: 123-45-6789 end";

        let masked = matcher.mask(text, Some("[HIDDEN]"));

        assert_eq!(masked, "SSN: [HIDDEN] end");
    }

    #[test]
    fn test_mask_clean_text_unchanged() {
        let matcher = Matcher::new();
        let text = "nothing sensitive";

        assert_eq!(matcher.mask(text, None), text);
    }

    #[test]
    fn test_match_span_len() {
        let span = MatchSpan {
            start: 5,
            end: 12,
            kind: PatternKind::Email,
        };
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
    }
}
