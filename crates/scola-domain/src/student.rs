//! Students and their embedded subscription ledger.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurring monthly charge for one subscribed subject.
///
/// Older records stored `true` instead of a price to mean "enrolled, price
/// unknown"; those load as [`SubscriptionEntry::LegacyUnpriced`] and never
/// contribute revenue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawSubscriptionValue", into = "RawSubscriptionValue")]
pub enum SubscriptionEntry {
    Priced(f64),
    LegacyUnpriced,
}

impl SubscriptionEntry {
    pub fn monthly_amount(&self) -> f64 {
        match self {
            SubscriptionEntry::Priced(amount) if amount.is_finite() => *amount,
            SubscriptionEntry::Priced(_) | SubscriptionEntry::LegacyUnpriced => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSubscriptionValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl From<RawSubscriptionValue> for SubscriptionEntry {
    fn from(value: RawSubscriptionValue) -> Self {
        match value {
            RawSubscriptionValue::Number(amount) => SubscriptionEntry::Priced(amount),
            RawSubscriptionValue::Text(text) => match text.trim().parse::<f64>() {
                Ok(amount) if amount.is_finite() => SubscriptionEntry::Priced(amount),
                _ => SubscriptionEntry::LegacyUnpriced,
            },
            RawSubscriptionValue::Flag(_) => SubscriptionEntry::LegacyUnpriced,
        }
    }
}

impl From<SubscriptionEntry> for RawSubscriptionValue {
    fn from(entry: SubscriptionEntry) -> Self {
        match entry {
            SubscriptionEntry::Priced(amount) => RawSubscriptionValue::Number(amount),
            SubscriptionEntry::LegacyUnpriced => RawSubscriptionValue::Flag(true),
        }
    }
}

/// Subject name to recurring monthly price.
pub type SubscriptionMap = BTreeMap<String, SubscriptionEntry>;

/// Aggregation root for recurring revenue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub subscriptions: SubscriptionMap,
    pub registered_at: NaiveDateTime,
}

impl Student {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        level: impl Into<String>,
        registered_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            level: level.into(),
            subscriptions: SubscriptionMap::new(),
            registered_at,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Sum of priced subscriptions; legacy placeholders count as zero.
    pub fn recurring_amount(&self) -> f64 {
        self.subscriptions
            .values()
            .map(SubscriptionEntry::monthly_amount)
            .sum()
    }

    pub fn subscription(&self, subject: &str) -> Option<&SubscriptionEntry> {
        self.subscriptions
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(subject.trim()))
            .map(|(_, entry)| entry)
    }
}
