//! Catalog of recurring subscription rates.

use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use scola_domain::{PricingEntry, SchoolLedger};

use crate::error::{require_amount, require_text};
use crate::CoreError;

/// Lookup and maintenance helpers for the pricing catalog.
pub struct PricingService;

impl PricingService {
    /// Price of the active entry for the triple, or 0 when nothing matches.
    pub fn lookup(ledger: &SchoolLedger, category: &str, level: &str, subject: &str) -> f64 {
        ledger
            .pricing
            .iter()
            .find(|entry| entry.active && entry.matches(category, level, subject))
            .map(|entry| entry.price)
            .unwrap_or(0.0)
    }

    /// Creates or reactivates the entry for the triple and sets its price.
    pub fn upsert(ledger: &mut SchoolLedger, entry: PricingEntry) -> Result<Uuid, CoreError> {
        require_text("category", &entry.category)?;
        require_text("level", &entry.level)?;
        require_text("subject", &entry.subject)?;
        require_amount("price", entry.price, true)?;

        if let Some(existing) = ledger
            .pricing
            .iter_mut()
            .find(|row| row.matches(&entry.category, &entry.level, &entry.subject))
        {
            existing.price = entry.price;
            existing.active = true;
            let id = existing.id;
            ledger.touch();
            info!(%id, price = entry.price, "pricing entry updated");
            return Ok(id);
        }

        let mut entry = entry;
        entry.active = true;
        let id = entry.id;
        info!(%id, subject = %entry.subject, price = entry.price, "pricing entry created");
        ledger.pricing.push(entry);
        ledger.touch();
        Ok(id)
    }

    /// Soft-deletes the entry; past enrollments keep their copied amounts.
    pub fn deactivate(ledger: &mut SchoolLedger, id: Uuid) -> Result<(), CoreError> {
        let entry = ledger
            .pricing
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(CoreError::PricingEntryNotFound(id))?;
        entry.active = false;
        ledger.touch();
        info!(%id, "pricing entry deactivated");
        Ok(())
    }

    pub fn list_active(ledger: &SchoolLedger) -> Vec<&PricingEntry> {
        ledger.pricing.iter().filter(|entry| entry.active).collect()
    }

    /// Lower-cased subject names offered by active entries.
    pub fn subject_vocabulary(ledger: &SchoolLedger) -> BTreeSet<String> {
        ledger
            .pricing
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.subject.trim().to_lowercase())
            .collect()
    }
}
