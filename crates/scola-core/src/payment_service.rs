//! Receipts recorded against students, each mirrored by one income row.

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use scola_domain::{
    Payment, PaymentMethod, SchoolLedger, TransactionKind, TUITION_PAYMENT_CATEGORY,
};

use crate::error::require_amount;
use crate::transaction_service::{NewTransaction, TransactionService};
use crate::CoreError;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub date: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub source_enrollment_id: Option<Uuid>,
}

impl NewPayment {
    pub fn new(student_id: Uuid, amount: f64, method: PaymentMethod) -> Self {
        Self {
            student_id,
            amount,
            method,
            date: None,
            note: None,
            source_enrollment_id: None,
        }
    }
}

pub struct PaymentService;

impl PaymentService {
    /// Records the payment and its `Tuition Payment` income row in one write.
    ///
    /// Nothing is written when either record is rejected.
    pub fn record(
        ledger: &mut SchoolLedger,
        request: NewPayment,
        now: NaiveDateTime,
    ) -> Result<Payment, CoreError> {
        require_amount("amount", request.amount, false)?;
        let student_name = ledger
            .student(request.student_id)
            .map(|student| student.full_name())
            .ok_or(CoreError::StudentNotFound(request.student_id))?;

        let mut payment = Payment::new(
            request.student_id,
            request.amount,
            request.method,
            request.date.unwrap_or(now),
        );
        payment.note = request.note;
        payment.source_enrollment_id = request.source_enrollment_id;

        let mut income = NewTransaction::new(
            TransactionKind::Income,
            payment.amount,
            TUITION_PAYMENT_CATEGORY,
        );
        income.description = Some(format!(
            "Payment from {} ({})",
            student_name, payment.method
        ));
        income.date = Some(payment.date);
        income.source_event_id = Some(payment.id);
        TransactionService::append(ledger, income, now)?;

        info!(
            id = %payment.id,
            student_id = %payment.student_id,
            amount = payment.amount,
            method = %payment.method,
            "payment recorded"
        );
        ledger.payments.push(payment.clone());
        ledger.touch();
        Ok(payment)
    }

    /// Creates the cash payment owed by a positive-amount enrollment.
    ///
    /// Idempotent: returns the existing payment if one was already derived.
    pub fn record_from_enrollment(
        ledger: &mut SchoolLedger,
        enrollment_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Payment, CoreError> {
        if let Some(existing) = Self::derived_from(ledger, enrollment_id) {
            return Ok(existing.clone());
        }
        let enrollment = ledger
            .enrollment(enrollment_id)
            .cloned()
            .ok_or(CoreError::EnrollmentNotFound(enrollment_id))?;

        let mut request =
            NewPayment::new(enrollment.student_id, enrollment.amount, PaymentMethod::Cash);
        request.date = Some(enrollment.date);
        request.note = Some(enrollment.payment_note());
        request.source_enrollment_id = Some(enrollment.id);
        Self::record(ledger, request, now)
    }

    pub fn derived_from(ledger: &SchoolLedger, enrollment_id: Uuid) -> Option<&Payment> {
        ledger
            .payments
            .iter()
            .find(|payment| payment.source_enrollment_id == Some(enrollment_id))
    }

    pub fn list_for_student(ledger: &SchoolLedger, student_id: Uuid) -> Vec<&Payment> {
        ledger
            .payments
            .iter()
            .filter(|payment| payment.student_id == student_id)
            .collect()
    }
}
