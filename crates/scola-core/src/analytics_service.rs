//! Read models consumed by dashboards.
//!
//! Recognized revenue (subscriptions plus one-time support fees) and actual
//! cash movement are computed independently and always exposed under
//! separate fields. Every figure is recomputed from the ledger on each call.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use scola_domain::{
    Enrollment, EnrollmentKind, Group, PeriodStats, ReportingPeriod, SchoolLedger,
    TransactionKind, TEACHER_SALARY_CATEGORY,
};

use crate::compensation_service::{CompensationService, ProjectionAssumptions};
use crate::enrollment_service::EnrollmentService;
use crate::subscription_service::SubscriptionService;
use crate::transaction_service::TransactionService;
use crate::CoreError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenueSummary {
    pub period: ReportingPeriod,
    pub recurring_revenue: f64,
    pub enrollment_revenue: f64,
    pub monthly_revenue: f64,
    pub cash_flow: PeriodStats,
    pub projected_teacher_expense: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentEnrollment {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    /// `None` once the student has been removed.
    pub student_name: Option<String>,
    pub kind: EnrollmentKind,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StudentAnalytics {
    pub total_students: usize,
    pub total_enrollments: usize,
    pub total_revenue: f64,
    pub recent_enrollments: Vec<RecentEnrollment>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PaymentAnalytics {
    pub total_received_month: f64,
    pub total_expenses: f64,
    pub total_income: f64,
    /// Projected liability, not a recorded expense.
    pub teacher_expenses: f64,
    pub other_expenses: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupPerformance {
    pub group_id: Uuid,
    pub name: String,
    pub subject: String,
    pub active: bool,
    pub students: usize,
    pub sessions: usize,
    pub attendance_rate: f64,
    pub monthly_revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeacherReport {
    pub teacher_id: Uuid,
    pub name: String,
    pub period: ReportingPeriod,
    pub total_students: usize,
    pub total_groups: usize,
    pub total_sessions: usize,
    pub attendance_rate: f64,
    pub monthly_revenue: f64,
    pub group_performance: Vec<GroupPerformance>,
}

pub struct AnalyticsService;

impl AnalyticsService {
    /// Recurring subscription revenue plus support fees dated in `period`.
    ///
    /// The fee is additive: a student registered this month contributes both
    /// the fee and the first month of every subscription.
    pub fn monthly_revenue(ledger: &SchoolLedger, period: &ReportingPeriod) -> f64 {
        SubscriptionService::recurring_revenue(ledger) + Self::enrollment_revenue(ledger, period)
    }

    pub fn enrollment_revenue(ledger: &SchoolLedger, period: &ReportingPeriod) -> f64 {
        EnrollmentService::in_period(ledger, EnrollmentKind::Support, period)
            .map(|enrollment| enrollment.amount)
            .sum()
    }

    /// Actual income and expense recorded in the transaction ledger.
    pub fn cash_flow_stats(ledger: &SchoolLedger, period: &ReportingPeriod) -> PeriodStats {
        TransactionService::stats_for_range(ledger, period)
    }

    pub fn revenue_summary(
        ledger: &SchoolLedger,
        period: &ReportingPeriod,
        assumptions: &ProjectionAssumptions,
    ) -> RevenueSummary {
        let recurring_revenue = SubscriptionService::recurring_revenue(ledger);
        let enrollment_revenue = Self::enrollment_revenue(ledger, period);
        RevenueSummary {
            period: *period,
            recurring_revenue,
            enrollment_revenue,
            monthly_revenue: recurring_revenue + enrollment_revenue,
            cash_flow: Self::cash_flow_stats(ledger, period),
            projected_teacher_expense: CompensationService::project_all(ledger, assumptions).total,
        }
    }

    pub fn student_analytics(
        ledger: &SchoolLedger,
        period: &ReportingPeriod,
        recent_limit: usize,
    ) -> StudentAnalytics {
        let mut recent: Vec<&Enrollment> = ledger.enrollments.iter().collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        let recent_enrollments = recent
            .into_iter()
            .take(recent_limit)
            .map(|enrollment| RecentEnrollment {
                enrollment_id: enrollment.id,
                student_id: enrollment.student_id,
                student_name: ledger
                    .student(enrollment.student_id)
                    .map(|student| student.full_name()),
                kind: enrollment.kind,
                category: enrollment.category.clone(),
                amount: enrollment.amount,
                date: enrollment.date,
            })
            .collect();

        StudentAnalytics {
            total_students: ledger.students.len(),
            total_enrollments: ledger.enrollments.len(),
            total_revenue: Self::monthly_revenue(ledger, period),
            recent_enrollments,
        }
    }

    pub fn payment_analytics(
        ledger: &SchoolLedger,
        period: &ReportingPeriod,
        assumptions: &ProjectionAssumptions,
    ) -> PaymentAnalytics {
        let month = Self::cash_flow_stats(ledger, period);
        let salaries: f64 = ledger
            .transactions
            .iter()
            .filter(|txn| {
                txn.kind == TransactionKind::Expense
                    && period.contains(txn.date)
                    && txn.category == TEACHER_SALARY_CATEGORY
            })
            .map(|txn| txn.amount)
            .sum();

        PaymentAnalytics {
            total_received_month: month.income,
            total_expenses: month.expense,
            total_income: TransactionService::lifetime_income(ledger),
            teacher_expenses: CompensationService::project_all(ledger, assumptions).total,
            other_expenses: month.expense - salaries,
        }
    }

    /// Workload, attendance and subscription revenue for one teacher's groups.
    pub fn teacher_report(
        ledger: &SchoolLedger,
        teacher_id: Uuid,
        period: &ReportingPeriod,
    ) -> Result<TeacherReport, CoreError> {
        let teacher = ledger
            .teacher(teacher_id)
            .ok_or(CoreError::TeacherNotFound(teacher_id))?;

        let mut distinct_students = BTreeSet::new();
        let mut total_sessions = 0;
        let mut marks = 0;
        let mut present = 0;
        let mut group_performance = Vec::new();

        for group in ledger.groups_for_teacher(teacher_id) {
            distinct_students.extend(group.student_ids.iter().copied());
            let (sessions, group_marks, group_present) = attendance_for(ledger, group, period);
            total_sessions += sessions;
            marks += group_marks;
            present += group_present;
            group_performance.push(GroupPerformance {
                group_id: group.id,
                name: group.name.clone(),
                subject: group.subject.clone(),
                active: group.active,
                students: group.student_ids.len(),
                sessions,
                attendance_rate: rate(group_present, group_marks),
                monthly_revenue: group_revenue(ledger, group),
            });
        }

        Ok(TeacherReport {
            teacher_id,
            name: teacher.name.clone(),
            period: *period,
            total_students: distinct_students.len(),
            total_groups: group_performance.len(),
            total_sessions,
            attendance_rate: rate(present, marks),
            monthly_revenue: group_performance
                .iter()
                .map(|group| group.monthly_revenue)
                .sum(),
            group_performance,
        })
    }
}

/// Sessions held in `period`, attendance marks taken, and marks present.
fn attendance_for(
    ledger: &SchoolLedger,
    group: &Group,
    period: &ReportingPeriod,
) -> (usize, usize, usize) {
    ledger
        .sessions
        .iter()
        .filter(|session| session.group_id == group.id && period.contains(session.held_at))
        .fold((0, 0, 0), |(sessions, marks, present), session| {
            (
                sessions + 1,
                marks + session.attendance.len(),
                present + session.present_count(),
            )
        })
}

/// What the group's students pay each month for the group's subject.
fn group_revenue(ledger: &SchoolLedger, group: &Group) -> f64 {
    group
        .student_ids
        .iter()
        .filter_map(|id| ledger.student(*id))
        .filter_map(|student| student.subscription(&group.subject))
        .map(|entry| entry.monthly_amount())
        .sum()
}

fn rate(present: usize, marks: usize) -> f64 {
    if marks == 0 {
        0.0
    } else {
        present as f64 * 100.0 / marks as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scola_domain::{CompensationPolicy, Session, Student, SubscriptionEntry, Teacher};

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn student_with(ledger: &mut SchoolLedger, subject: &str, price: f64) -> Uuid {
        let mut student = Student::new("Rania", "Kaci", "College", at(1, 10));
        student
            .subscriptions
            .insert(subject.into(), SubscriptionEntry::Priced(price));
        ledger.add_student(student)
    }

    #[test]
    fn training_fees_are_not_monthly_revenue() {
        let mut ledger = SchoolLedger::new("Analytics");
        let student_id = student_with(&mut ledger, "Math", 100.0);
        ledger.enrollments.push(Enrollment::new(
            student_id,
            EnrollmentKind::Training,
            "Robotics",
            300.0,
            at(3, 4),
        ));
        ledger.enrollments.push(Enrollment::new(
            student_id,
            EnrollmentKind::Support,
            "Math",
            40.0,
            at(3, 5),
        ));
        let period = ReportingPeriod::month_containing(at(3, 15));
        assert_eq!(AnalyticsService::monthly_revenue(&ledger, &period), 140.0);
    }

    #[test]
    fn recent_enrollments_are_newest_first_and_limited() {
        let mut ledger = SchoolLedger::new("Analytics");
        let student_id = student_with(&mut ledger, "Math", 100.0);
        for day in 1..=7 {
            ledger.enrollments.push(Enrollment::new(
                student_id,
                EnrollmentKind::Support,
                "Math",
                10.0,
                at(4, day),
            ));
        }
        let period = ReportingPeriod::month_containing(at(4, 1));
        let analytics = AnalyticsService::student_analytics(&ledger, &period, 5);
        assert_eq!(analytics.total_enrollments, 7);
        assert_eq!(analytics.recent_enrollments.len(), 5);
        assert_eq!(analytics.recent_enrollments[0].date, at(4, 7));
        assert_eq!(analytics.total_revenue, 170.0);
    }

    #[test]
    fn teacher_report_rolls_up_groups_and_attendance() {
        let mut ledger = SchoolLedger::new("Analytics");
        let first = student_with(&mut ledger, "Math", 120.0);
        let second = student_with(&mut ledger, "Physics", 90.0);
        let teacher_id = ledger.add_teacher(Teacher::new(
            "Mourad",
            CompensationPolicy::Hourly { hourly_rate: 80.0 },
        ));
        let math =
            ledger.add_group(Group::new("M1", "math", teacher_id).with_students([first, second]));
        ledger.add_group(Group::new("P1", "Physics", teacher_id).with_students([second]));
        ledger.add_session(Session::new(math, at(5, 6)).mark(first, true).mark(second, false));
        ledger.add_session(Session::new(math, at(5, 13)).mark(first, true).mark(second, true));
        ledger.add_session(Session::new(math, at(6, 3)).mark(first, false));

        let period = ReportingPeriod::month_containing(at(5, 1));
        let report = AnalyticsService::teacher_report(&ledger, teacher_id, &period).unwrap();
        assert_eq!(report.total_students, 2);
        assert_eq!(report.total_groups, 2);
        assert_eq!(report.total_sessions, 2);
        assert_eq!(report.attendance_rate, 75.0);
        // 120 from the math group (second student has no math), 90 from physics.
        assert_eq!(report.monthly_revenue, 210.0);
        assert_eq!(report.group_performance[1].attendance_rate, 0.0);
    }

    #[test]
    fn teacher_report_for_unknown_teacher_fails() {
        let ledger = SchoolLedger::new("Analytics");
        let period = ReportingPeriod::month_containing(at(5, 1));
        let err = AnalyticsService::teacher_report(&ledger, Uuid::new_v4(), &period)
            .expect_err("unknown teacher");
        assert!(matches!(err, CoreError::TeacherNotFound(_)));
    }
}
