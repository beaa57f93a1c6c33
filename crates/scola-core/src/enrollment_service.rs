//! One-time enrollment events and the payments they owe.

use chrono::NaiveDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use scola_domain::{
    CascadeStatus, Enrollment, EnrollmentKind, EnrollmentPatch, ReportingPeriod, SchoolLedger,
};

use crate::cascade_service::CascadeService;
use crate::error::{require_amount, require_text};
use crate::pricing_service::PricingService;
use crate::CoreError;

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub kind: EnrollmentKind,
    pub category: String,
    pub amount: f64,
    pub date: Option<NaiveDateTime>,
    pub note: Option<String>,
}

impl NewEnrollment {
    pub fn new(
        student_id: Uuid,
        kind: EnrollmentKind,
        category: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            student_id,
            kind,
            category: category.into(),
            amount,
            date: None,
            note: None,
        }
    }
}

/// Outcome of recording an enrollment.
#[derive(Debug, Clone)]
pub struct RecordedEnrollment {
    pub enrollment: Enrollment,
    /// Outbox event owing the derived payment, when `amount > 0`.
    pub cascade_event_id: Option<Uuid>,
}

pub struct EnrollmentService;

impl EnrollmentService {
    /// Appends the enrollment and, for a positive amount, a pending payment cascade.
    pub fn record(
        ledger: &mut SchoolLedger,
        request: NewEnrollment,
        now: NaiveDateTime,
    ) -> Result<RecordedEnrollment, CoreError> {
        require_text("category", &request.category)?;
        require_amount("amount", request.amount, true)?;
        if ledger.student(request.student_id).is_none() {
            return Err(CoreError::StudentNotFound(request.student_id));
        }
        Self::check_category(ledger, request.kind, &request.category);

        let enrollment = Enrollment::new(
            request.student_id,
            request.kind,
            request.category.trim(),
            request.amount,
            request.date.unwrap_or(now),
        )
        .with_note(request.note);
        ledger.enrollments.push(enrollment.clone());
        ledger.touch();
        info!(
            id = %enrollment.id,
            student_id = %enrollment.student_id,
            kind = %enrollment.kind,
            amount = enrollment.amount,
            "enrollment recorded"
        );

        let cascade_event_id = if enrollment.amount > 0.0 {
            Some(CascadeService::enqueue_enrollment_payment(
                ledger,
                enrollment.id,
                now,
            ))
        } else {
            None
        };

        Ok(RecordedEnrollment {
            enrollment,
            cascade_event_id,
        })
    }

    /// Applies a staff correction. Already-derived payments are left untouched.
    pub fn correct(
        ledger: &mut SchoolLedger,
        id: Uuid,
        patch: EnrollmentPatch,
        now: NaiveDateTime,
    ) -> Result<Enrollment, CoreError> {
        if let Some(category) = patch.category.as_deref() {
            require_text("category", category)?;
        }
        if let Some(amount) = patch.amount {
            require_amount("amount", amount, true)?;
        }
        let enrollment = ledger
            .enrollment_mut(id)
            .ok_or(CoreError::EnrollmentNotFound(id))?;
        if let Some(kind) = patch.kind {
            enrollment.kind = kind;
        }
        if let Some(category) = patch.category {
            enrollment.category = category.trim().to_string();
        }
        if let Some(amount) = patch.amount {
            enrollment.amount = amount;
        }
        if let Some(date) = patch.date {
            enrollment.date = date;
        }
        if let Some(note) = patch.note {
            enrollment.note = note;
        }
        let updated = enrollment.clone();
        ledger.touch();

        let owes_payment = updated.amount > 0.0
            && crate::PaymentService::derived_from(ledger, id).is_none()
            && !CascadeService::has_open_event(ledger, id);
        if owes_payment {
            CascadeService::enqueue_enrollment_payment(ledger, id, now);
        }
        info!(%id, "enrollment corrected");
        Ok(updated)
    }

    /// Deletes the enrollment and cancels any cascade still owed for it.
    ///
    /// Historical aggregates change retroactively.
    pub fn remove(ledger: &mut SchoolLedger, id: Uuid) -> Result<Enrollment, CoreError> {
        let index = ledger
            .enrollments
            .iter()
            .position(|enrollment| enrollment.id == id)
            .ok_or(CoreError::EnrollmentNotFound(id))?;
        let removed = ledger.enrollments.remove(index);
        // Completed events outlive their enrollment.
        ledger.outbox.retain(|event| {
            event.status == CascadeStatus::Completed || event.enrollment_id() != Some(id)
        });
        ledger.touch();
        info!(%id, "enrollment removed");
        Ok(removed)
    }

    pub fn list_for_student(ledger: &SchoolLedger, student_id: Uuid) -> Vec<&Enrollment> {
        ledger
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.student_id == student_id)
            .collect()
    }

    /// Enrollments of `kind` dated inside `period`.
    pub fn in_period<'a>(
        ledger: &'a SchoolLedger,
        kind: EnrollmentKind,
        period: &'a ReportingPeriod,
    ) -> impl Iterator<Item = &'a Enrollment> + 'a {
        ledger
            .enrollments
            .iter()
            .filter(move |enrollment| enrollment.kind == kind && period.contains(enrollment.date))
    }

    /// Support categories outside the catalog's subjects are accepted but logged.
    fn check_category(ledger: &SchoolLedger, kind: EnrollmentKind, category: &str) {
        if kind != EnrollmentKind::Support {
            return;
        }
        let vocabulary = PricingService::subject_vocabulary(ledger);
        if !vocabulary.is_empty() && !vocabulary.contains(&category.trim().to_lowercase()) {
            warn!(category, "support enrollment category is not a catalog subject");
        }
    }
}
