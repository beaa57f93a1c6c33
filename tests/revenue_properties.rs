mod common;

use chrono::{Duration, NaiveDate};
use common::{at, json_storage, setup_manager};
use scola_ledger::{
    scola_core::{
        storage::LedgerStorage, time::FixedClock, InitialDeposit, InitialFee, NewEnrollment,
        NewPayment, StudentRegistration,
    },
    scola_domain::{EnrollmentKind, PaymentMethod, SchoolLedger, Student, SubscriptionEntry},
    ManagerSettings, SchoolLedgerManager,
};

fn registration(fee: f64, subject_price: f64) -> StudentRegistration {
    let mut registration = StudentRegistration::new("Amina", "Djebbar", "Lycee");
    registration
        .subscriptions
        .insert("Math".into(), SubscriptionEntry::Priced(subject_price));
    registration.initial_fee = Some(InitialFee::new(fee));
    registration.deposit = Some(InitialDeposit {
        amount: fee,
        method: PaymentMethod::Cash,
        note: None,
    });
    registration
}

#[test]
fn new_student_fee_adds_to_subscription_revenue() {
    let manager = setup_manager(at(2024, 9, 14, 10));
    manager
        .register_student(registration(50.0, 100.0))
        .expect("register student");

    assert_eq!(manager.monthly_revenue().expect("monthly revenue"), 150.0);
    let analytics = manager.student_analytics().expect("student analytics");
    assert_eq!(analytics.total_revenue, 150.0);
    assert_eq!(analytics.total_students, 1);

    // Recognized revenue and cash received stay distinct.
    let payments = manager.payment_analytics().expect("payment analytics");
    assert_eq!(payments.total_received_month, 50.0);
}

#[test]
fn fee_from_previous_month_is_not_monthly_revenue() {
    let manager = setup_manager(at(2024, 10, 2, 9));
    let mut late = registration(50.0, 100.0);
    late.registered_at = Some(at(2024, 9, 30, 18));
    manager.register_student(late).expect("register student");

    assert_eq!(manager.monthly_revenue().expect("monthly revenue"), 100.0);
}

#[test]
fn month_window_includes_last_millisecond_and_excludes_next_midnight() {
    let manager = setup_manager(at(2024, 2, 10, 12));
    let student = manager
        .register_student(StudentRegistration::new("Karim", "Ould", "College"))
        .expect("register student")
        .student;

    let last_instant = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap();
    let next_midnight = last_instant + Duration::milliseconds(1);
    for (date, amount) in [(last_instant, 70.0), (next_midnight, 500.0)] {
        let mut request = NewEnrollment::new(student.id, EnrollmentKind::Support, "Math", amount);
        request.date = Some(date);
        manager.record_enrollment(request).expect("record enrollment");
    }

    assert_eq!(manager.monthly_revenue().expect("monthly revenue"), 70.0);
    let cash = manager.cash_flow_stats().expect("cash flow");
    assert_eq!(cash.income, 70.0);
    assert_eq!(cash.balance, 70.0);
}

#[test]
fn monthly_income_equals_sum_of_recorded_payments() {
    let manager = setup_manager(at(2024, 5, 20, 16));
    let student = manager
        .register_student(StudentRegistration::new("Sofiane", "Meziane", "Lycee"))
        .expect("register student")
        .student;

    let amounts = [150.0, 75.5, 20.25, 310.0, 44.0];
    for (idx, amount) in amounts.iter().enumerate() {
        let mut request = NewPayment::new(student.id, *amount, PaymentMethod::Check);
        request.date = Some(at(2024, 5, idx as u32 + 1, 9));
        manager.record_payment(request).expect("record payment");
    }

    let stats = manager.cash_flow_stats().expect("cash flow");
    assert_eq!(stats.income, amounts.iter().sum::<f64>());
    assert_eq!(stats.expense, 0.0);
    let tuition_rows = manager
        .list_transactions()
        .expect("transactions")
        .into_iter()
        .filter(|txn| txn.category == "Tuition Payment")
        .count();
    assert_eq!(tuition_rows, amounts.len());
}

#[test]
fn legacy_boolean_subscription_contributes_zero() {
    let storage = json_storage();
    let mut ledger = SchoolLedger::new("school");
    let student = Student::new("Lyes", "Hamidi", "College", at(2023, 9, 1, 8));
    let student_id = ledger.add_student(student);
    let mut value = serde_json::to_value(&ledger).expect("serialize ledger");
    value["students"][0]["subscriptions"] = serde_json::json!({ "math": true, "physics": 80 });
    std::fs::write(storage.ledger_path("school"), value.to_string()).expect("write legacy ledger");
    assert!(storage.ledger_exists("school"));

    let manager = SchoolLedgerManager::new(Box::new(storage), ManagerSettings::default())
        .with_clock(FixedClock(at(2024, 1, 15, 10)));
    assert_eq!(manager.recurring_revenue().expect("recurring revenue"), 80.0);
    assert_eq!(
        manager
            .student_recurring_revenue(student_id)
            .expect("student revenue"),
        80.0
    );
    assert_eq!(manager.monthly_revenue().expect("monthly revenue"), 80.0);
}
