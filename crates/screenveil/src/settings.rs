//! Persisted user settings.
//!
//! [`Settings`] is the schema stored in the settings table: whether the
//! shield is enabled at all, the blur intensity, auto-enable on share
//! start, the in-page indicator toggle, and a per-classification map of
//! which data types get blurred. Field names serialize in camelCase, the
//! shape the settings were always persisted in.

use serde::{Deserialize, Serialize};

use crate::scan::{MatcherConfig, PatternKind};

/// Per-classification blur toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataTypes {
    /// Blur email addresses.
    pub email: bool,
    /// Blur payment card numbers.
    pub credit_card: bool,
    /// Blur API key tokens.
    pub api_key: bool,
    /// Blur currency amounts.
    pub revenue: bool,
    /// Blur account number references.
    pub account_number: bool,
    /// Blur generic PII.
    pub pii: bool,
}

impl Default for DataTypes {
    fn default() -> Self {
        Self {
            email: true,
            credit_card: true,
            api_key: true,
            revenue: true,
            account_number: true,
            pii: true,
        }
    }
}

impl DataTypes {
    /// Whether the given classification is enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: PatternKind) -> bool {
        match kind {
            PatternKind::Email => self.email,
            PatternKind::CreditCard => self.credit_card,
            PatternKind::ApiKey => self.api_key,
            PatternKind::Revenue => self.revenue,
            PatternKind::AccountNumber => self.account_number,
            PatternKind::Pii => self.pii,
        }
    }

    /// Enable or disable a classification.
    pub fn set(&mut self, kind: PatternKind, enabled: bool) {
        match kind {
            PatternKind::Email => self.email = enabled,
            PatternKind::CreditCard => self.credit_card = enabled,
            PatternKind::ApiKey => self.api_key = enabled,
            PatternKind::Revenue => self.revenue = enabled,
            PatternKind::AccountNumber => self.account_number = enabled,
            PatternKind::Pii => self.pii = enabled,
        }
    }

    /// The enabled classifications, in no particular order.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<PatternKind> {
        PatternKind::ALL
            .into_iter()
            .filter(|&k| self.is_enabled(k))
            .collect()
    }
}

/// Persisted settings, read at startup and written on change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Master switch; when off, no blurring happens at all.
    pub enabled: bool,
    /// Blur radius in pixels for wrapper styles.
    pub blur_intensity: u32,
    /// Automatically enable blur when a screen share starts.
    pub auto_enable: bool,
    /// Show the in-page "protection active" indicator.
    pub show_indicator: bool,
    /// Which classifications get blurred.
    pub data_types: DataTypes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_intensity: 10,
            auto_enable: true,
            show_indicator: true,
            data_types: DataTypes::default(),
        }
    }
}

impl Settings {
    /// Build a matcher configuration from these settings.
    ///
    /// `custom_patterns` come from the ambient configuration, not from the
    /// persisted settings.
    #[must_use]
    pub fn matcher_config(&self, custom_patterns: &[String]) -> MatcherConfig {
        MatcherConfig {
            enabled_kinds: self.data_types.enabled_kinds(),
            custom_patterns: custom_patterns.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert_eq!(settings.blur_intensity, 10);
        assert!(settings.auto_enable);
        assert!(settings.show_indicator);
        assert_eq!(settings.data_types, DataTypes::default());
    }

    #[test]
    fn test_all_data_types_default_on() {
        let types = DataTypes::default();
        for kind in PatternKind::ALL {
            assert!(types.is_enabled(kind), "{kind} should default on");
        }
    }

    #[test]
    fn test_data_types_set() {
        let mut types = DataTypes::default();
        types.set(PatternKind::Revenue, false);

        assert!(!types.is_enabled(PatternKind::Revenue));
        assert!(types.is_enabled(PatternKind::Email));
        assert_eq!(types.enabled_kinds().len(), PatternKind::ALL.len() - 1);
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"blurIntensity\":10"));
        assert!(json.contains("\"autoEnable\":true"));
        assert!(json.contains("\"showIndicator\":true"));
        assert!(json.contains("\"dataTypes\""));
        assert!(json.contains("\"creditCard\":true"));
        assert!(json.contains("\"apiKey\":true"));
        assert!(json.contains("\"accountNumber\":true"));
    }

    #[test]
    fn test_settings_deserialize_persisted_shape() {
        let json = r#"{
            "enabled": true,
            "blurIntensity": 10,
            "autoEnable": true,
            "showIndicator": true,
            "dataTypes": {
                "email": true,
                "creditCard": true,
                "apiKey": true,
                "revenue": true,
                "accountNumber": true,
                "pii": true
            }
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.blur_intensity, 10);
        assert!(settings.data_types.pii);
    }

    #[test]
    fn test_settings_round_trip() {
        let mut settings = Settings::default();
        settings.blur_intensity = 15;
        settings.data_types.set(PatternKind::Pii, false);

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_matcher_config_respects_toggles() {
        let mut settings = Settings::default();
        settings.data_types.set(PatternKind::Email, false);
        settings.data_types.set(PatternKind::Revenue, false);

        let config = settings.matcher_config(&[]);
        assert!(!config.enabled_kinds.contains(&PatternKind::Email));
        assert!(!config.enabled_kinds.contains(&PatternKind::Revenue));
        assert!(config.enabled_kinds.contains(&PatternKind::CreditCard));
    }

    #[test]
    fn test_matcher_config_carries_custom_patterns() {
        let settings = Settings::default();
        let config = settings.matcher_config(&[r"\bX-\d+\b".to_string()]);
        assert_eq!(config.custom_patterns.len(), 1);
    }
}
