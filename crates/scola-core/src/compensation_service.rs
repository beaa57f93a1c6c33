//! Projected teacher payouts and recorded salary disbursements.

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use scola_domain::{
    CompensationPolicy, SchoolLedger, Teacher, Transaction, TransactionKind,
    TEACHER_SALARY_CATEGORY,
};

use crate::transaction_service::{NewTransaction, TransactionService};
use crate::CoreError;

/// Flat estimates used where no real hours or revenue figures exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionAssumptions {
    /// 2 hours a week over 4 weeks.
    pub hours_per_group_per_month: f64,
    pub revenue_per_student: f64,
}

impl Default for ProjectionAssumptions {
    fn default() -> Self {
        Self {
            hours_per_group_per_month: 8.0,
            revenue_per_student: 500.0,
        }
    }
}

/// Counts a projection depends on, taken from the teacher's active groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeacherWorkload {
    pub active_groups: usize,
    pub students: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherProjection {
    pub teacher_id: Uuid,
    pub name: String,
    pub policy: CompensationPolicy,
    pub workload: TeacherWorkload,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedExpenses {
    pub per_teacher: Vec<TeacherProjection>,
    pub total: f64,
}

pub struct CompensationService;

impl CompensationService {
    /// Monthly liability estimate for one policy. Never posted to the ledger.
    pub fn project(
        policy: &CompensationPolicy,
        workload: TeacherWorkload,
        assumptions: &ProjectionAssumptions,
    ) -> f64 {
        match *policy {
            CompensationPolicy::Fixed { monthly_amount } => monthly_amount,
            CompensationPolicy::Hourly { hourly_rate } => {
                workload.active_groups as f64 * assumptions.hours_per_group_per_month * hourly_rate
            }
            CompensationPolicy::Percentage { commission_percent } => {
                let estimated_revenue = workload.students as f64 * assumptions.revenue_per_student;
                estimated_revenue * commission_percent / 100.0
            }
        }
    }

    pub fn workload(ledger: &SchoolLedger, teacher_id: Uuid) -> TeacherWorkload {
        ledger
            .groups_for_teacher(teacher_id)
            .filter(|group| group.active)
            .fold(TeacherWorkload::default(), |acc, group| TeacherWorkload {
                active_groups: acc.active_groups + 1,
                students: acc.students + group.student_ids.len(),
            })
    }

    pub fn project_monthly_expense(
        ledger: &SchoolLedger,
        teacher_id: Uuid,
        assumptions: &ProjectionAssumptions,
    ) -> Result<TeacherProjection, CoreError> {
        let teacher = ledger
            .teacher(teacher_id)
            .ok_or(CoreError::TeacherNotFound(teacher_id))?;
        Ok(Self::projection_for(ledger, teacher, assumptions))
    }

    /// Sums the projection over every teacher.
    pub fn project_all(
        ledger: &SchoolLedger,
        assumptions: &ProjectionAssumptions,
    ) -> ProjectedExpenses {
        let per_teacher: Vec<TeacherProjection> = ledger
            .teachers
            .iter()
            .map(|teacher| Self::projection_for(ledger, teacher, assumptions))
            .collect();
        let total = per_teacher.iter().map(|projection| projection.amount).sum();
        ProjectedExpenses { per_teacher, total }
    }

    /// Records an actual payout as an expense row.
    pub fn pay_salary(
        ledger: &mut SchoolLedger,
        teacher_id: Uuid,
        amount: f64,
        date: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<Transaction, CoreError> {
        let name = ledger
            .teacher(teacher_id)
            .map(|teacher| teacher.name.clone())
            .ok_or(CoreError::TeacherNotFound(teacher_id))?;
        let mut request =
            NewTransaction::new(TransactionKind::Expense, amount, TEACHER_SALARY_CATEGORY);
        request.description = Some(format!("Salary payout to {name}"));
        request.date = date;
        request.source_event_id = Some(teacher_id);
        let txn = TransactionService::append(ledger, request, now)?;
        info!(%teacher_id, amount, "salary paid");
        Ok(txn)
    }

    fn projection_for(
        ledger: &SchoolLedger,
        teacher: &Teacher,
        assumptions: &ProjectionAssumptions,
    ) -> TeacherProjection {
        let workload = Self::workload(ledger, teacher.id);
        TeacherProjection {
            teacher_id: teacher.id,
            name: teacher.name.clone(),
            policy: teacher.compensation,
            workload,
            amount: Self::project(&teacher.compensation, workload, assumptions),
        }
    }
}
