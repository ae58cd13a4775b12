//! Offer data structure.

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder for a text field the source did not provide.
pub const SENTINEL: &str = "N/A";

/// Placeholder for an unrecognised sport category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Timestamp layout shared by items and history records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn sentinel() -> String {
    SENTINEL.to_string()
}

fn unknown_category() -> String {
    UNKNOWN_CATEGORY.to_string()
}

/// Treat an explicit `null` like a missing field.
fn sentinel_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(sentinel))
}

fn unknown_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_category))
}

/// One boosted offer observed on the source page.
///
/// Serialized field names follow the persisted history layout. The aliases
/// accept older snake_case history files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Sport name (e.g. "Soccer")
    #[serde(
        default = "unknown_category",
        deserialize_with = "unknown_if_null",
        alias = "sport"
    )]
    pub category: String,

    /// Market name (e.g. "Winner")
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null")]
    pub market: String,

    /// Free-text description of the boost
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null")]
    pub details: String,

    /// Match or subject line (e.g. "A vs B")
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null", alias = "match")]
    pub subject: String,

    /// Odds before the boost
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null", alias = "odds_old")]
    pub old_value: String,

    /// Boosted odds
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null", alias = "odds_new")]
    pub new_value: String,

    /// When the offer was observed
    #[serde(default = "sentinel", deserialize_with = "sentinel_if_null", rename = "timestamp")]
    pub observed_at: String,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            category: unknown_category(),
            market: sentinel(),
            details: sentinel(),
            subject: sentinel(),
            old_value: sentinel(),
            new_value: sentinel(),
            observed_at: timestamp_now(),
        }
    }
}

impl Item {
    /// Whether both identity-critical fields were resolved.
    pub fn has_identity(&self) -> bool {
        is_resolved(&self.subject) && is_resolved(&self.market)
    }

    /// Format the item for display using a template.
    ///
    /// Supported placeholders:
    /// - `{category}`, `{subject}`, `{market}`, `{details}`
    /// - `{old_value}`, `{new_value}`, `{observed_at}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{category}", &self.category)
            .replace("{subject}", &self.subject)
            .replace("{market}", &self.market)
            .replace("{details}", &self.details)
            .replace("{old_value}", &self.old_value)
            .replace("{new_value}", &self.new_value)
            .replace("{observed_at}", &self.observed_at)
    }
}

/// Whether a field holds a real value rather than a placeholder.
pub fn is_resolved(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item {
            category: "Soccer".to_string(),
            market: "Winner".to_string(),
            details: "Boost".to_string(),
            subject: "A vs B".to_string(),
            old_value: "1,50".to_string(),
            new_value: "1,80".to_string(),
            observed_at: "2026-01-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn test_format() {
        let item = sample_item();
        let result = item.format("{subject} [{market}] {old_value} -> {new_value}");
        assert_eq!(result, "A vs B [Winner] 1,50 -> 1,80");
    }

    #[test]
    fn test_identity_requires_subject_and_market() {
        let mut item = sample_item();
        assert!(item.has_identity());

        item.market = SENTINEL.to_string();
        assert!(!item.has_identity());

        item.market = "Winner".to_string();
        item.subject = "   ".to_string();
        assert!(!item.has_identity());
    }

    #[test]
    fn test_missing_fields_default_to_sentinels() {
        let item: Item = serde_json::from_str(r#"{"subject": "A vs B"}"#).unwrap();
        assert_eq!(item.market, SENTINEL);
        assert_eq!(item.new_value, SENTINEL);
        assert_eq!(item.category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_legacy_keys_accepted() {
        let json = r#"{
            "sport": "Tennis",
            "match": "X vs Y",
            "market": "To Win",
            "details": "Both sets",
            "odds_old": "2,00",
            "odds_new": "2,50",
            "timestamp": "2025-06-01 10:00:00"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, "Tennis");
        assert_eq!(item.subject, "X vs Y");
        assert_eq!(item.old_value, "2,00");
        assert_eq!(item.new_value, "2,50");
        assert_eq!(item.observed_at, "2025-06-01 10:00:00");
    }
}
