//! Catalog rows mapping (category, level, subject) to a unit price.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One priced offering in the catalog. Soft-deleted through `active`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingEntry {
    pub id: Uuid,
    pub category: String,
    pub level: String,
    pub subject: String,
    pub price: f64,
    #[serde(default = "PricingEntry::default_active")]
    pub active: bool,
}

impl PricingEntry {
    pub fn new(
        category: impl Into<String>,
        level: impl Into<String>,
        subject: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            level: level.into(),
            subject: subject.into(),
            price,
            active: true,
        }
    }

    /// Case-insensitive comparison on the catalog key.
    pub fn matches(&self, category: &str, level: &str, subject: &str) -> bool {
        self.category.trim().eq_ignore_ascii_case(category.trim())
            && self.level.trim().eq_ignore_ascii_case(level.trim())
            && self.subject.trim().eq_ignore_ascii_case(subject.trim())
    }

    pub fn key(&self) -> (String, String, String) {
        (
            self.category.trim().to_lowercase(),
            self.level.trim().to_lowercase(),
            self.subject.trim().to_lowercase(),
        )
    }

    pub fn default_active() -> bool {
        true
    }
}

