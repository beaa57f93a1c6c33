use std::hint::black_box;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{criterion_group, criterion_main, Criterion};
use scola_ledger::{
    scola_core::{AnalyticsService, ProjectionAssumptions},
    scola_domain::{
        AttendanceMark, CompensationPolicy, Enrollment, EnrollmentKind, Group, Payment,
        PaymentMethod, ReportingPeriod, SchoolLedger, Session, Student, SubscriptionEntry,
        Teacher, Transaction, TransactionKind,
    },
};
use uuid::Uuid;

const SUBJECTS: [&str; 4] = ["Math", "Physics", "French", "English"];

fn origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .expect("date")
        .and_hms_opt(8, 0, 0)
        .expect("time")
}

/// A year of activity: `students` learners spread over 20 groups of one teacher.
fn build_ledger(students: usize) -> (SchoolLedger, Uuid) {
    let mut ledger = SchoolLedger::new("bench");
    let teacher_id = ledger.add_teacher(Teacher::new(
        "Bench Teacher",
        CompensationPolicy::Percentage {
            commission_percent: 30.0,
        },
    ));
    let mut groups: Vec<Group> = (0..20)
        .map(|i| Group::new(format!("G{i}"), SUBJECTS[i % SUBJECTS.len()], teacher_id))
        .collect();

    for i in 0..students {
        let joined = origin() + Duration::hours(i as i64 * 7 % 8_000);
        let mut student = Student::new(format!("S{i}"), "Bench", "Lycee", joined);
        let subject = SUBJECTS[i % SUBJECTS.len()];
        student
            .subscriptions
            .insert(subject.into(), SubscriptionEntry::Priced(80.0 + (i % 5) as f64 * 10.0));
        let student_id = ledger.add_student(student);
        groups[i % groups.len()].student_ids.push(student_id);

        let enrollment = Enrollment::new(
            student_id,
            EnrollmentKind::Support,
            "Inscription",
            50.0,
            joined,
        );
        let mut payment = Payment::new(student_id, 50.0, PaymentMethod::Cash, joined);
        payment.source_enrollment_id = Some(enrollment.id);
        ledger.enrollments.push(enrollment);
        ledger.payments.push(payment);
        ledger
            .transactions
            .push(Transaction::new(TransactionKind::Income, 50.0, "Tuition Payment", joined));
    }

    for (idx, group) in groups.into_iter().enumerate() {
        let members = group.student_ids.clone();
        let group_id = ledger.add_group(group);
        for week in 0..52 {
            let held_at = origin() + Duration::days(week * 7) + Duration::hours(idx as i64);
            let mut session = Session::new(group_id, held_at);
            session.attendance = members
                .iter()
                .enumerate()
                .map(|(n, student_id)| AttendanceMark {
                    student_id: *student_id,
                    present: (n + week as usize) % 4 != 0,
                })
                .collect();
            ledger.add_session(session);
        }
    }
    (ledger, teacher_id)
}

fn bench_aggregation(c: &mut Criterion) {
    let (ledger, teacher_id) = build_ledger(5_000);
    let period = ReportingPeriod::month_containing(origin() + Duration::days(150));
    let assumptions = ProjectionAssumptions::default();

    c.bench_function("monthly_revenue_5k", |b| {
        b.iter(|| AnalyticsService::monthly_revenue(black_box(&ledger), &period))
    });
    c.bench_function("payment_analytics_5k", |b| {
        b.iter(|| AnalyticsService::payment_analytics(black_box(&ledger), &period, &assumptions))
    });
    c.bench_function("teacher_report_5k", |b| {
        b.iter(|| {
            let report = AnalyticsService::teacher_report(black_box(&ledger), teacher_id, &period)
                .expect("teacher report");
            assert_eq!(report.total_groups, 20);
        })
    });
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
