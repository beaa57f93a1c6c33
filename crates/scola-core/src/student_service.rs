//! Student registration and removal.

use chrono::NaiveDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use scola_domain::{
    Enrollment, EnrollmentKind, PaymentMethod, SchoolLedger, Student, SubscriptionMap,
};

use crate::cascade_service::CascadeService;
use crate::error::{require_amount, require_text};
use crate::payment_service::{NewPayment, PaymentService};
use crate::subscription_service::SubscriptionService;
use crate::CoreError;

pub const DEFAULT_FEE_CATEGORY: &str = "Inscription";

/// One-time registration fee charged when the student is created.
#[derive(Debug, Clone)]
pub struct InitialFee {
    pub amount: f64,
    pub kind: EnrollmentKind,
    pub category: String,
    pub note: Option<String>,
}

impl InitialFee {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            kind: EnrollmentKind::Support,
            category: DEFAULT_FEE_CATEGORY.to_string(),
            note: None,
        }
    }
}

/// Money handed over at registration.
#[derive(Debug, Clone)]
pub struct InitialDeposit {
    pub amount: f64,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentRegistration {
    pub first_name: String,
    pub last_name: String,
    pub level: String,
    pub subscriptions: SubscriptionMap,
    pub registered_at: Option<NaiveDateTime>,
    pub initial_fee: Option<InitialFee>,
    pub deposit: Option<InitialDeposit>,
}

impl StudentRegistration {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            level: level.into(),
            ..Self::default()
        }
    }
}

/// Records written by a registration.
#[derive(Debug, Clone)]
pub struct RegisteredStudent {
    pub student: Student,
    pub fee_enrollment_id: Option<Uuid>,
    pub deposit_payment_id: Option<Uuid>,
    /// Outbox event for a fee charged without a deposit.
    pub fee_cascade_event_id: Option<Uuid>,
}

pub struct StudentService;

impl StudentService {
    /// Creates the student with its optional fee enrollment and deposit payment.
    ///
    /// All records land together or not at all: `ledger` is left unchanged
    /// when any step is rejected.
    pub fn register(
        ledger: &mut SchoolLedger,
        registration: StudentRegistration,
        now: NaiveDateTime,
    ) -> Result<RegisteredStudent, CoreError> {
        require_text("first_name", &registration.first_name)?;
        require_text("last_name", &registration.last_name)?;

        let mut draft = ledger.clone();
        let registered_at = registration.registered_at.unwrap_or(now);
        let student = Student::new(
            registration.first_name.trim(),
            registration.last_name.trim(),
            registration.level.trim(),
            registered_at,
        );
        let student_id = draft.add_student(student);
        SubscriptionService::set_subscriptions(&mut draft, student_id, registration.subscriptions)?;

        let fee_enrollment = match registration.initial_fee {
            Some(fee) => {
                require_text("category", &fee.category)?;
                require_amount("initial fee", fee.amount, true)?;
                let enrollment = Enrollment::new(
                    student_id,
                    fee.kind,
                    fee.category.trim(),
                    fee.amount,
                    registered_at,
                )
                .with_note(fee.note);
                draft.enrollments.push(enrollment.clone());
                Some(enrollment)
            }
            None => None,
        };

        let mut fee_cascade_event_id = None;
        let deposit_payment_id = match registration.deposit {
            Some(deposit) => {
                let mut request = NewPayment::new(student_id, deposit.amount, deposit.method);
                request.date = Some(registered_at);
                request.note = deposit.note;
                request.source_enrollment_id = fee_enrollment.as_ref().map(|fee| fee.id);
                Some(PaymentService::record(&mut draft, request, now)?.id)
            }
            None => {
                if let Some(fee) = fee_enrollment.as_ref().filter(|fee| fee.amount > 0.0) {
                    fee_cascade_event_id =
                        Some(CascadeService::enqueue_enrollment_payment(&mut draft, fee.id, now));
                }
                None
            }
        };

        let student = draft
            .student(student_id)
            .cloned()
            .ok_or(CoreError::StudentNotFound(student_id))?;
        *ledger = draft;
        info!(%student_id, name = %student.full_name(), "student registered");
        Ok(RegisteredStudent {
            student,
            fee_enrollment_id: fee_enrollment.map(|fee| fee.id),
            deposit_payment_id,
            fee_cascade_event_id,
        })
    }

    /// Removes the student and its group memberships.
    ///
    /// Enrollments, payments and transactions are kept and become orphans;
    /// they still count toward historical aggregates.
    pub fn remove(ledger: &mut SchoolLedger, student_id: Uuid) -> Result<Student, CoreError> {
        let index = ledger
            .students
            .iter()
            .position(|student| student.id == student_id)
            .ok_or(CoreError::StudentNotFound(student_id))?;
        let removed = ledger.students.remove(index);
        for group in &mut ledger.groups {
            group.student_ids.retain(|id| *id != student_id);
        }
        ledger.touch();

        let orphans = ledger
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.student_id == student_id)
            .count()
            + ledger
                .payments
                .iter()
                .filter(|payment| payment.student_id == student_id)
                .count();
        if orphans > 0 {
            warn!(%student_id, orphans, "student removed with dependent records");
        }
        info!(%student_id, "student removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scola_domain::{SubscriptionEntry, TransactionKind};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn registration() -> StudentRegistration {
        let mut registration = StudentRegistration::new("Sara", "Haddad", "College");
        registration
            .subscriptions
            .insert("Math".into(), SubscriptionEntry::Priced(100.0));
        registration.initial_fee = Some(InitialFee::new(50.0));
        registration.deposit = Some(InitialDeposit {
            amount: 50.0,
            method: PaymentMethod::Cash,
            note: None,
        });
        registration
    }

    #[test]
    fn registration_writes_student_fee_deposit_and_income() {
        let mut ledger = SchoolLedger::new("Registration");
        let registered = StudentService::register(&mut ledger, registration(), now()).unwrap();

        assert_eq!(ledger.students.len(), 1);
        assert_eq!(ledger.enrollments.len(), 1);
        assert_eq!(ledger.payments.len(), 1);
        assert_eq!(ledger.transactions.len(), 1);
        assert_eq!(ledger.transactions[0].kind, TransactionKind::Income);
        assert!(ledger.outbox.is_empty());
        assert_eq!(
            ledger.payments[0].source_enrollment_id,
            registered.fee_enrollment_id
        );
        assert_eq!(ledger.enrollments[0].category, DEFAULT_FEE_CATEGORY);
    }

    #[test]
    fn rejected_deposit_leaves_ledger_untouched() {
        let mut ledger = SchoolLedger::new("Registration");
        let mut registration = registration();
        registration.deposit = Some(InitialDeposit {
            amount: -5.0,
            method: PaymentMethod::Cash,
            note: None,
        });
        let err = StudentService::register(&mut ledger, registration, now())
            .expect_err("negative deposit");
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(ledger.students.is_empty());
        assert!(ledger.enrollments.is_empty());
        assert!(ledger.payments.is_empty());
        assert!(ledger.transactions.is_empty());
    }

    #[test]
    fn unpaid_fee_is_queued_for_cascade() {
        let mut ledger = SchoolLedger::new("Registration");
        let mut registration = registration();
        registration.deposit = None;
        let registered = StudentService::register(&mut ledger, registration, now()).unwrap();
        assert_eq!(ledger.outbox.len(), 1);
        assert_eq!(registered.fee_cascade_event_id, Some(ledger.outbox[0].id));
        assert!(ledger.payments.is_empty());
    }

    #[test]
    fn removal_keeps_ledger_history() {
        let mut ledger = SchoolLedger::new("Registration");
        let registered = StudentService::register(&mut ledger, registration(), now()).unwrap();
        StudentService::remove(&mut ledger, registered.student.id).unwrap();
        assert!(ledger.students.is_empty());
        assert_eq!(ledger.enrollments.len(), 1);
        assert_eq!(ledger.transactions.len(), 1);

        let err = StudentService::remove(&mut ledger, registered.student.id)
            .expect_err("already removed");
        assert!(matches!(err, CoreError::StudentNotFound(_)));
    }
}
