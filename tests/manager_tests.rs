mod common;

use chrono::NaiveDate;
use common::{at, setup_flaky_manager, setup_manager};
use scola_ledger::{
    scola_core::{InitialDeposit, InitialFee, NewTransaction, StudentRegistration},
    scola_domain::{
        AttendanceMark, CompensationPolicy, Group, PaymentMethod, PricingEntry, Session,
        SubscriptionEntry, Teacher, TransactionKind,
    },
    SchoolError, SchoolLedgerManager,
};
use uuid::Uuid;

fn enrolled(manager: &SchoolLedgerManager, first: &str, subject: &str, price: f64) -> Uuid {
    let mut registration = StudentRegistration::new(first, "Benali", "Lycee");
    registration
        .subscriptions
        .insert(subject.into(), SubscriptionEntry::Priced(price));
    manager
        .register_student(registration)
        .expect("register student")
        .student
        .id
}

#[test]
fn pricing_catalog_round_trip() {
    let manager = setup_manager(at(2024, 9, 1, 8));
    let id = manager
        .upsert_pricing(PricingEntry::new("Support", "Lycee", "Math", 1200.0))
        .expect("upsert pricing");

    assert_eq!(manager.lookup_price("Support", "Lycee", "Math").expect("lookup"), 1200.0);
    assert_eq!(manager.lookup_price("Support", "Lycee", "Physics").expect("lookup"), 0.0);

    manager.deactivate_pricing(id).expect("deactivate");
    assert_eq!(manager.lookup_price("Support", "Lycee", "Math").expect("lookup"), 0.0);
    assert!(manager.active_pricing().expect("active pricing").is_empty());
}

#[test]
fn teacher_report_covers_groups_sessions_and_attendance() {
    let manager = setup_manager(at(2024, 3, 20, 10));
    let amina = enrolled(&manager, "Amina", "Math", 100.0);
    let yanis = enrolled(&manager, "Yanis", "Math", 120.0);
    let teacher_id = manager
        .add_teacher(Teacher::new(
            "Mme Khelifi",
            CompensationPolicy::Hourly { hourly_rate: 100.0 },
        ))
        .expect("add teacher");
    let group_id = manager
        .add_group(Group::new("Terminale A", "Math", teacher_id).with_students([amina, yanis]))
        .expect("add group");

    let mut session = Session::new(group_id, at(2024, 3, 5, 14));
    session.attendance = vec![
        AttendanceMark { student_id: amina, present: true },
        AttendanceMark { student_id: yanis, present: false },
    ];
    manager.record_session(session).expect("record session");
    let mut earlier = Session::new(group_id, at(2024, 2, 26, 14));
    earlier.attendance = vec![AttendanceMark { student_id: amina, present: true }];
    manager.record_session(earlier).expect("record session");

    let report = manager.teacher_report(teacher_id, None).expect("teacher report");
    assert_eq!(report.total_students, 2);
    assert_eq!(report.total_groups, 1);
    assert_eq!(report.total_sessions, 1);
    assert_eq!(report.attendance_rate, 50.0);
    assert_eq!(report.monthly_revenue, 220.0);

    let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let wide = manager
        .teacher_report(teacher_id, Some((from, to)))
        .expect("ranged report");
    assert_eq!(wide.total_sessions, 2);

    let projection = manager
        .project_teacher_expense(teacher_id)
        .expect("projection");
    assert_eq!(projection.amount, 800.0);
}

#[test]
fn teacher_report_rejects_unknown_teacher_and_inverted_range() {
    let manager = setup_manager(at(2024, 3, 20, 10));
    let err = manager
        .teacher_report(Uuid::new_v4(), None)
        .expect_err("unknown teacher");
    assert!(matches!(err, SchoolError::NotFound(_)), "{err:?}");

    let teacher_id = manager
        .add_teacher(Teacher::new(
            "M. Saadi",
            CompensationPolicy::Fixed { monthly_amount: 30000.0 },
        ))
        .expect("add teacher");
    let from = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let err = manager
        .teacher_report(teacher_id, Some((from, to)))
        .expect_err("inverted range");
    assert!(matches!(err, SchoolError::Validation(_)), "{err:?}");
}

#[test]
fn groups_and_sessions_need_existing_owners() {
    let manager = setup_manager(at(2024, 3, 20, 10));
    let err = manager
        .add_group(Group::new("Orphans", "Math", Uuid::new_v4()))
        .expect_err("unknown teacher");
    assert!(matches!(err, SchoolError::NotFound(_)));

    let err = manager
        .record_session(Session::new(Uuid::new_v4(), at(2024, 3, 1, 9)))
        .expect_err("unknown group");
    assert!(matches!(err, SchoolError::Validation(_)));
}

#[test]
fn salary_payouts_split_from_other_expenses() {
    let manager = setup_manager(at(2024, 4, 25, 17));
    let teacher_id = manager
        .add_teacher(Teacher::new(
            "M. Saadi",
            CompensationPolicy::Fixed { monthly_amount: 30000.0 },
        ))
        .expect("add teacher");

    let salary = manager
        .pay_salary(teacher_id, 30000.0, None)
        .expect("pay salary");
    assert_eq!(salary.kind, TransactionKind::Expense);
    assert_eq!(salary.category, "Teacher Salary");
    assert_eq!(salary.source_event_id, Some(teacher_id));

    let mut rent = NewTransaction::new(TransactionKind::Expense, 8000.0, "Rent");
    rent.date = Some(at(2024, 4, 2, 9));
    manager.append_transaction(rent).expect("append rent");

    let analytics = manager.payment_analytics().expect("payment analytics");
    assert_eq!(analytics.total_expenses, 38000.0);
    assert_eq!(analytics.other_expenses, 8000.0);
    assert_eq!(analytics.teacher_expenses, 30000.0);

    let projected = manager.projected_expenses().expect("projected");
    assert_eq!(projected.total, 30000.0);
    // Projections are never posted as transactions.
    assert_eq!(manager.list_transactions().expect("transactions").len(), 2);
}

#[test]
fn stats_for_range_rejects_inverted_dates() {
    let manager = setup_manager(at(2024, 4, 25, 17));
    let from = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let err = manager.stats_for_range(from, to).expect_err("inverted range");
    assert!(matches!(err, SchoolError::Validation(_)), "{err:?}");

    let stats = manager.stats_for_range(to, from).expect("stats");
    assert_eq!(stats.balance, 0.0);

    let err = manager
        .stats_for_range(to, NaiveDate::MAX)
        .expect_err("open-ended range");
    assert!(matches!(err, SchoolError::Validation(_)), "{err:?}");
}

#[test]
fn backup_and_restore_bring_back_removed_records() {
    let manager = setup_manager(at(2024, 5, 2, 9));
    let student_id = enrolled(&manager, "Nadia", "Physics", 90.0);

    let backup = manager.backup(Some("before cleanup")).expect("backup");
    manager.remove_student(student_id).expect("remove student");
    assert_eq!(manager.recurring_revenue().expect("revenue"), 0.0);

    let backups = manager.list_backups().expect("list backups");
    assert!(backups.iter().any(|info| info.id == backup.id));

    let restored = manager.restore_backup(&backup.id).expect("restore");
    assert_eq!(restored.students.len(), 1);
    assert_eq!(manager.recurring_revenue().expect("revenue"), 90.0);

    let err = manager.restore_backup("missing").expect_err("unknown backup");
    assert!(matches!(err, SchoolError::NotFound(_)));
}

#[test]
fn labelled_backups_outlive_automatic_snapshots() {
    let manager = setup_manager(at(2024, 5, 2, 9));
    enrolled(&manager, "Nadia", "Physics", 90.0);
    let labelled = manager.backup(Some("before term")).expect("backup");

    for day in 1..=8 {
        let mut rent = NewTransaction::new(TransactionKind::Expense, 100.0, "Rent");
        rent.date = Some(at(2024, 5, day, 9));
        manager.append_transaction(rent).expect("append rent");
    }

    let backups = manager.list_backups().expect("list backups");
    assert!(backups.iter().any(|info| info.id == labelled.id));

    manager.delete_backup(&labelled.id).expect("delete backup");
    let backups = manager.list_backups().expect("list backups");
    assert!(backups.iter().all(|info| info.id != labelled.id));

    let err = manager.delete_backup(&labelled.id).expect_err("already deleted");
    assert!(matches!(err, SchoolError::NotFound(_)));
}

#[test]
fn failed_registration_write_leaves_no_student() {
    let (manager, faults) = setup_flaky_manager(at(2024, 5, 2, 9));
    let mut registration = StudentRegistration::new("Walid", "Amrani", "College");
    registration.initial_fee = Some(InitialFee::new(50.0));
    registration.deposit = Some(InitialDeposit {
        amount: 50.0,
        method: PaymentMethod::BankTransfer,
        note: None,
    });

    faults.fail_save_in(1);
    let err = manager
        .register_student(registration)
        .expect_err("store failure surfaces");
    assert!(matches!(err, SchoolError::Storage(_)));

    let ledger = manager.snapshot().expect("snapshot");
    assert!(ledger.students.is_empty());
    assert!(ledger.enrollments.is_empty());
    assert!(ledger.payments.is_empty());
    assert!(ledger.transactions.is_empty());
}

#[test]
fn subscriptions_can_be_repriced_and_removed() {
    let manager = setup_manager(at(2024, 5, 2, 9));
    let student_id = enrolled(&manager, "Imene", "Math", 100.0);

    manager
        .set_subscription(student_id, "Physics", SubscriptionEntry::Priced(80.0))
        .expect("add physics");
    assert_eq!(manager.student_recurring_revenue(student_id).expect("revenue"), 180.0);

    manager
        .remove_subscription(student_id, "Math")
        .expect("remove math");
    assert_eq!(manager.recurring_revenue().expect("revenue"), 80.0);
}

#[test]
fn expense_breakdown_groups_current_month_by_category() {
    let manager = setup_manager(at(2024, 4, 25, 17));
    let expenses = [("Rent", 8000.0, 2), ("Supplies", 1200.0, 10), ("Supplies", 300.0, 20)];
    for (category, amount, day) in expenses {
        let mut request = NewTransaction::new(TransactionKind::Expense, amount, category);
        request.date = Some(at(2024, 4, day, 9));
        manager.append_transaction(request).expect("append expense");
    }
    let mut march = NewTransaction::new(TransactionKind::Expense, 999.0, "Rent");
    march.date = Some(at(2024, 3, 31, 9));
    manager.append_transaction(march).expect("append expense");

    let breakdown = manager.expense_breakdown().expect("breakdown");
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown["Rent"], 8000.0);
    assert_eq!(breakdown["Supplies"], 1500.0);
}
