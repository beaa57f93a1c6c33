//! Per-student recurring subscriptions and the recurring revenue they imply.

use tracing::info;
use uuid::Uuid;

use scola_domain::{SchoolLedger, SubscriptionEntry, SubscriptionMap};

use crate::error::{require_amount, require_text};
use crate::CoreError;

/// Maintains the subscription map embedded on each student.
///
/// Subject names are free text and are not checked against the pricing
/// catalog; the map is authoritative for revenue.
pub struct SubscriptionService;

impl SubscriptionService {
    /// Replaces the student's whole subscription map.
    pub fn set_subscriptions(
        ledger: &mut SchoolLedger,
        student_id: Uuid,
        subscriptions: SubscriptionMap,
    ) -> Result<(), CoreError> {
        for (subject, entry) in &subscriptions {
            validate_entry(subject, entry)?;
        }
        let student = ledger
            .student_mut(student_id)
            .ok_or(CoreError::StudentNotFound(student_id))?;
        student.subscriptions = subscriptions;
        let subjects = student.subscriptions.len();
        ledger.touch();
        info!(%student_id, subjects, "subscriptions replaced");
        Ok(())
    }

    pub fn set_subscription(
        ledger: &mut SchoolLedger,
        student_id: Uuid,
        subject: &str,
        entry: SubscriptionEntry,
    ) -> Result<(), CoreError> {
        validate_entry(subject, &entry)?;
        let student = ledger
            .student_mut(student_id)
            .ok_or(CoreError::StudentNotFound(student_id))?;
        student
            .subscriptions
            .insert(subject.trim().to_string(), entry);
        ledger.touch();
        Ok(())
    }

    /// Removes a subject; returns the entry that was stored, if any.
    pub fn remove_subscription(
        ledger: &mut SchoolLedger,
        student_id: Uuid,
        subject: &str,
    ) -> Result<Option<SubscriptionEntry>, CoreError> {
        let student = ledger
            .student_mut(student_id)
            .ok_or(CoreError::StudentNotFound(student_id))?;
        let removed = student.subscriptions.remove(subject.trim());
        ledger.touch();
        Ok(removed)
    }

    pub fn student_recurring_revenue(
        ledger: &SchoolLedger,
        student_id: Uuid,
    ) -> Result<f64, CoreError> {
        ledger
            .student(student_id)
            .map(|student| student.recurring_amount())
            .ok_or(CoreError::StudentNotFound(student_id))
    }

    /// Monthly recurring revenue across every student, recomputed from scratch.
    pub fn recurring_revenue(ledger: &SchoolLedger) -> f64 {
        ledger
            .students
            .iter()
            .map(|student| student.recurring_amount())
            .sum()
    }
}

fn validate_entry(subject: &str, entry: &SubscriptionEntry) -> Result<(), CoreError> {
    require_text("subject", subject)?;
    if let SubscriptionEntry::Priced(amount) = entry {
        require_amount("subscription price", *amount, true)?;
    }
    Ok(())
}
