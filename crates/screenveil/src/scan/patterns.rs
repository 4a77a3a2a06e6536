//! Built-in sensitive-data patterns.
//!
//! This module provides the pre-defined regex patterns used to classify
//! substrings of page text as sensitive. The order of [`builtin_patterns`]
//! is the documented precedence list: when two matches overlap, the pattern
//! that appears earlier in this list wins.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classification assigned to a matched span.
///
/// Serialized names (`email`, `creditCard`, `apiKey`, `revenue`,
/// `accountNumber`, `pii`) double as the per-kind toggle keys in persisted
/// settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    /// Email addresses.
    Email,
    /// Payment card numbers (16 digits in 4-digit groups).
    CreditCard,
    /// API key tokens (`sk_live_`, `pk_live_`, `api_key_`, `token_`).
    ApiKey,
    /// Currency amounts (revenue figures).
    Revenue,
    /// Account number references.
    AccountNumber,
    /// Generic PII (SSN-shaped identifiers).
    Pii,
}

impl PatternKind {
    /// All kinds, in no particular order.
    pub const ALL: [Self; 6] = [
        Self::Email,
        Self::CreditCard,
        Self::ApiKey,
        Self::Revenue,
        Self::AccountNumber,
        Self::Pii,
    ];

    /// The serialized (camelCase) name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::CreditCard => "creditCard",
            Self::ApiKey => "apiKey",
            Self::Revenue => "revenue",
            Self::AccountNumber => "accountNumber",
            Self::Pii => "pii",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled sensitive-data pattern.
#[derive(Debug)]
pub struct ScanPattern {
    /// Classification assigned to matches of this pattern.
    pub kind: PatternKind,

    /// Description of what this pattern matches.
    pub description: &'static str,

    /// The compiled regex.
    regex: Regex,
}

impl ScanPattern {
    /// Create a new scan pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid. Built-in patterns are
    /// covered by tests; use [`regex::Regex::new`] directly for
    /// user-supplied patterns.
    #[must_use]
    pub fn new(kind: PatternKind, description: &'static str, pattern: &str) -> Self {
        Self {
            kind,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the text matches this pattern anywhere.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Find all matches in the text.
    pub fn find_all<'a>(
        &self,
        text: &'a str,
    ) -> impl Iterator<Item = regex::Match<'a>> + use<'a, '_> {
        self.regex.find_iter(text)
    }
}

/// Get all built-in patterns, in precedence order.
///
/// Earlier entries take priority when overlapping matches start at the same
/// offset.
#[must_use]
pub fn builtin_patterns() -> Vec<ScanPattern> {
    vec![
        ScanPattern::new(
            PatternKind::ApiKey,
            "API key tokens prefixed sk_live_, pk_live_, api_key_, or token_",
            r"\b(?:sk_live_|pk_live_|api_key_|token_)[A-Za-z0-9]{20,}\b",
        ),
        ScanPattern::new(
            PatternKind::CreditCard,
            "16-digit card numbers in 4-digit groups with optional separators",
            r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
        ),
        ScanPattern::new(
            PatternKind::Email,
            "Email addresses",
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        ),
        ScanPattern::new(
            PatternKind::AccountNumber,
            "Account number references (account #/number/no. followed by digits)",
            r"(?i)\baccount\s*(?:#|number|no\.?)?\s*:?\s*\d{6,12}\b",
        ),
        ScanPattern::new(
            PatternKind::Pii,
            "SSN-shaped identifiers (XXX-XX-XXXX)",
            r"\b\d{3}-\d{2}-\d{4}\b",
        ),
        ScanPattern::new(
            PatternKind::Revenue,
            "Currency amounts ($ plus digits/commas with optional cents)",
            r"\$[\d,]+(?:\.\d{2})?",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_for(kind: PatternKind) -> ScanPattern {
        builtin_patterns()
            .into_iter()
            .find(|p| p.kind == kind)
            .unwrap()
    }

    #[test]
    fn test_pattern_kind_as_str() {
        assert_eq!(PatternKind::Email.as_str(), "email");
        assert_eq!(PatternKind::CreditCard.as_str(), "creditCard");
        assert_eq!(PatternKind::ApiKey.as_str(), "apiKey");
        assert_eq!(PatternKind::Revenue.as_str(), "revenue");
        assert_eq!(PatternKind::AccountNumber.as_str(), "accountNumber");
        assert_eq!(PatternKind::Pii.as_str(), "pii");
    }

    #[test]
    fn test_pattern_kind_serde_round_trip() {
        for kind in PatternKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            let back: PatternKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_email_pattern_matches() {
        let pattern = pattern_for(PatternKind::Email);

        assert!(pattern.matches("test@example.com"));
        assert!(pattern.matches("Reach us: support+billing@sub.example.co"));
        assert!(!pattern.matches("not-an-email"));
        assert!(!pattern.matches("missing@tld"));
    }

    #[test]
    fn test_credit_card_pattern_matches() {
        let pattern = pattern_for(PatternKind::CreditCard);

        assert!(pattern.matches("4532-1234-5678-9010"));
        assert!(pattern.matches("4532 1234 5678 9010"));
        assert!(pattern.matches("4532123456789010"));
        assert!(!pattern.matches("4532-1234-5678"));
        assert!(!pattern.matches("regular text"));
    }

    #[test]
    fn test_api_key_pattern_matches() {
        let pattern = pattern_for(PatternKind::ApiKey);

        assert!(pattern.matches("sk_live_1234567890abcdefghij"));
        assert!(pattern.matches("pk_live_abcdefghij1234567890"));
        assert!(pattern.matches("api_key_1234567890abcdefghijklmnopqrst"));
        assert!(pattern.matches("token_abcdefghijklmnopqrstu"));
        // Suffix shorter than 20 alphanumerics
        assert!(!pattern.matches("sk_live_short"));
        assert!(!pattern.matches("sk_test_1234567890abcdefghij"));
    }

    #[test]
    fn test_revenue_pattern_matches() {
        let pattern = pattern_for(PatternKind::Revenue);

        assert!(pattern.matches("$1,234.56"));
        assert!(pattern.matches("$999"));
        assert!(pattern.matches("Total: $12,000,000"));
        assert!(!pattern.matches("1234.56"));
        assert!(!pattern.matches("USD 1234"));
    }

    #[test]
    fn test_account_number_pattern_matches() {
        let pattern = pattern_for(PatternKind::AccountNumber);

        assert!(pattern.matches("Account #12345678"));
        assert!(pattern.matches("account number: 123456"));
        assert!(pattern.matches("ACCOUNT NO. 987654321"));
        assert!(!pattern.matches("account #123"));
        assert!(!pattern.matches("no account here"));
    }

    #[test]
    fn test_pii_pattern_matches() {
        let pattern = pattern_for(PatternKind::Pii);

        assert!(pattern.matches("123-45-6789"));
        assert!(pattern.matches("SSN is 123-45-6789 okay"));
        assert!(!pattern.matches("123456789"));
        assert!(!pattern.matches("123-456-789"));
    }

    #[test]
    fn test_pattern_find_all() {
        let pattern = pattern_for(PatternKind::Email);

        let text = "a@example.com and b@example.org";
        let matches: Vec<_> = pattern.find_all(text).collect();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].as_str(), "a@example.com");
        assert_eq!(matches[1].as_str(), "b@example.org");
    }

    #[test]
    fn test_builtin_patterns_cover_all_kinds() {
        let patterns = builtin_patterns();
        assert_eq!(patterns.len(), PatternKind::ALL.len());
        for kind in PatternKind::ALL {
            assert!(patterns.iter().any(|p| p.kind == kind));
        }
    }

    #[test]
    fn test_builtin_patterns_have_descriptions() {
        for pattern in builtin_patterns() {
            assert!(!pattern.description.is_empty());
        }
    }

    #[test]
    fn test_api_key_precedes_email() {
        // Precedence order resolves overlap conflicts deterministically
        let patterns = builtin_patterns();
        let api_idx = patterns
            .iter()
            .position(|p| p.kind == PatternKind::ApiKey)
            .unwrap();
        let email_idx = patterns
            .iter()
            .position(|p| p.kind == PatternKind::Email)
            .unwrap();
        assert!(api_idx < email_idx);
    }
}
