//! Outbox of derived records owed by upstream business events.
//!
//! Recorders append a [`CascadeEvent`] in the same write as the record that
//! owes it. Events are applied afterwards, possibly more than once; applying
//! is idempotent and failures are kept on the event for retry and
//! reconciliation instead of being dropped.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use scola_domain::{CascadeEvent, CascadeKind, CascadeStatus, SchoolLedger};

use crate::payment_service::PaymentService;
use crate::storage::ledger_warnings;
use crate::CoreError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Everything an operator should look at before trusting the ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub failed: Vec<CascadeEvent>,
    pub pending: Vec<CascadeEvent>,
    /// Positive enrollments with neither a derived payment nor an open event.
    pub unpaid_enrollments: Vec<Uuid>,
    pub warnings: Vec<String>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.pending.is_empty()
            && self.unpaid_enrollments.is_empty()
            && self.warnings.is_empty()
    }
}

pub struct CascadeService;

impl CascadeService {
    pub fn enqueue_enrollment_payment(
        ledger: &mut SchoolLedger,
        enrollment_id: Uuid,
        now: NaiveDateTime,
    ) -> Uuid {
        let event = CascadeEvent::new(CascadeKind::EnrollmentPayment { enrollment_id }, now);
        let id = event.id;
        ledger.outbox.push(event);
        ledger.touch();
        id
    }

    pub fn has_open_event(ledger: &SchoolLedger, enrollment_id: Uuid) -> bool {
        ledger
            .outbox
            .iter()
            .any(|event| event.is_pending() && event.enrollment_id() == Some(enrollment_id))
    }

    /// Identifiers of events still waiting to be applied, oldest first.
    pub fn pending(ledger: &SchoolLedger) -> Vec<Uuid> {
        let mut events: Vec<&CascadeEvent> =
            ledger.outbox.iter().filter(|event| event.is_pending()).collect();
        events.sort_by_key(|event| event.created_at);
        events.into_iter().map(|event| event.id).collect()
    }

    /// Creates the derived record for a pending event and marks it completed.
    ///
    /// Returns the identifier of the produced record. Applying an event that
    /// already completed returns its recorded output without writing.
    pub fn apply(
        ledger: &mut SchoolLedger,
        event_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Uuid, CoreError> {
        let event = ledger
            .cascade_event(event_id)
            .cloned()
            .ok_or(CoreError::CascadeEventNotFound(event_id))?;
        match (event.status, event.produced_id) {
            (CascadeStatus::Completed, Some(produced)) => return Ok(produced),
            (CascadeStatus::Failed, _) => {
                return Err(CoreError::Validation(format!(
                    "cascade event {event_id} has already failed"
                )))
            }
            _ => {}
        }

        let produced = match event.kind {
            CascadeKind::EnrollmentPayment { enrollment_id } => {
                PaymentService::record_from_enrollment(ledger, enrollment_id, now)?.id
            }
        };
        if let Some(event) = ledger.cascade_event_mut(event_id) {
            event.complete(produced, now);
        }
        ledger.touch();
        info!(%event_id, %produced, "cascade applied");
        Ok(produced)
    }

    /// Records a failed attempt and returns the event's resulting status.
    pub fn record_failure(
        ledger: &mut SchoolLedger,
        event_id: Uuid,
        error: &str,
        max_attempts: u32,
        now: NaiveDateTime,
    ) -> Result<CascadeStatus, CoreError> {
        let event = ledger
            .cascade_event_mut(event_id)
            .ok_or(CoreError::CascadeEventNotFound(event_id))?;
        event.fail_attempt(error, max_attempts, now);
        let status = event.status;
        let attempts = event.attempts;
        ledger.touch();
        warn!(%event_id, attempts, %status, error, "cascade attempt failed");
        Ok(status)
    }

    /// Re-opens a failed event so the next processing pass retries it.
    pub fn requeue(ledger: &mut SchoolLedger, event_id: Uuid) -> Result<(), CoreError> {
        let event = ledger
            .cascade_event_mut(event_id)
            .ok_or(CoreError::CascadeEventNotFound(event_id))?;
        if event.status == CascadeStatus::Failed {
            event.status = CascadeStatus::Pending;
            event.attempts = 0;
        }
        ledger.touch();
        Ok(())
    }

    pub fn reconciliation_report(ledger: &SchoolLedger) -> ReconciliationReport {
        let failed = ledger
            .outbox
            .iter()
            .filter(|event| event.status == CascadeStatus::Failed)
            .cloned()
            .collect();
        let pending = ledger
            .outbox
            .iter()
            .filter(|event| event.is_pending())
            .cloned()
            .collect();
        let unpaid_enrollments = ledger
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.amount > 0.0)
            .filter(|enrollment| {
                PaymentService::derived_from(ledger, enrollment.id).is_none()
                    && !ledger.outbox.iter().any(|event| {
                        event.enrollment_id() == Some(enrollment.id)
                            && event.status != CascadeStatus::Completed
                    })
            })
            .map(|enrollment| enrollment.id)
            .collect();
        ReconciliationReport {
            failed,
            pending,
            unpaid_enrollments,
            warnings: ledger_warnings(ledger),
        }
    }
}
