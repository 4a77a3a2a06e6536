//! Sensitive-data classification.
//!
//! This module turns text into classified match spans:
//!
//! - **Patterns**: a fixed, ordered set of named regular expressions (email,
//!   credit card, API key, revenue amount, account number, generic PII).
//!   The list order is the documented precedence used to resolve overlaps.
//!
//! - **Matcher**: applies the enabled patterns to a string and returns
//!   ordered, non-overlapping spans; also provides terminal-friendly
//!   masking for the CLI.
//!
//! # Example
//!
//! ```
//! use screenveil::scan::{Matcher, PatternKind};
//!
//! let matcher = Matcher::new();
//! let text = "Contact us at test@example.com for support";
//!
//! let spans = matcher.find_spans(text);
//! assert_eq!(spans.len(), 1);
//! assert_eq!(spans[0].matched(text), "test@example.com");
//! assert_eq!(spans[0].kind, PatternKind::Email);
//! ```

mod matcher;
mod patterns;

pub use matcher::{MatchSpan, Matcher, MatcherConfig};
pub use patterns::{builtin_patterns, PatternKind, ScanPattern};
