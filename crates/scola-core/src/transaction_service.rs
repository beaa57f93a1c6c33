//! Business logic helpers for the income/expense ledger.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use scola_domain::{PeriodStats, ReportingPeriod, SchoolLedger, Transaction, TransactionKind};

use crate::error::{require_amount, require_text};
use crate::CoreError;

/// Fields accepted when appending a ledger row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub source_event_id: Option<Uuid>,
}

impl NewTransaction {
    pub fn new(kind: TransactionKind, amount: f64, category: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            category: category.into(),
            description: None,
            date: None,
            source_event_id: None,
        }
    }
}

/// Append-only access to the transaction ledger and its period statistics.
pub struct TransactionService;

impl TransactionService {
    /// Appends a row; `now` stands in for a missing date.
    pub fn append(
        ledger: &mut SchoolLedger,
        request: NewTransaction,
        now: NaiveDateTime,
    ) -> Result<Transaction, CoreError> {
        require_amount("amount", request.amount, false)?;
        require_text("category", &request.category)?;

        let mut txn = Transaction::new(
            request.kind,
            request.amount,
            request.category.trim(),
            request.date.unwrap_or(now),
        )
        .with_description(request.description);
        txn.source_event_id = request.source_event_id;

        info!(
            id = %txn.id,
            kind = %txn.kind,
            amount = txn.amount,
            category = %txn.category,
            "transaction appended"
        );
        ledger.transactions.push(txn.clone());
        ledger.touch();
        Ok(txn)
    }

    pub fn list_all(ledger: &SchoolLedger) -> Vec<&Transaction> {
        ledger.transactions.iter().collect()
    }

    /// Removes a row for correction, returning it.
    pub fn delete_by_id(ledger: &mut SchoolLedger, id: Uuid) -> Result<Transaction, CoreError> {
        let index = ledger
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or(CoreError::TransactionNotFound(id))?;
        let removed = ledger.transactions.remove(index);
        ledger.touch();
        info!(%id, "transaction deleted");
        Ok(removed)
    }

    /// Income, expense and balance over transactions dated inside `period`.
    pub fn stats_for_range(ledger: &SchoolLedger, period: &ReportingPeriod) -> PeriodStats {
        let (income, expense) = ledger
            .transactions
            .iter()
            .filter(|txn| period.contains(txn.date))
            .fold((0.0, 0.0), |(income, expense), txn| match txn.kind {
                TransactionKind::Income => (income + txn.amount, expense),
                TransactionKind::Expense => (income, expense + txn.amount),
            });
        PeriodStats::from_parts(income, expense)
    }

    /// Expense totals per category inside `period`.
    pub fn expense_breakdown(
        ledger: &SchoolLedger,
        period: &ReportingPeriod,
    ) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for txn in ledger
            .transactions
            .iter()
            .filter(|txn| txn.kind == TransactionKind::Expense && period.contains(txn.date))
        {
            *totals.entry(txn.category.clone()).or_insert(0.0) += txn.amount;
        }
        totals
    }

    /// Income recorded over the ledger's whole history.
    pub fn lifetime_income(ledger: &SchoolLedger) -> f64 {
        ledger
            .transactions
            .iter()
            .filter(|txn| txn.is_income())
            .map(|txn| txn.amount)
            .sum()
    }
}
