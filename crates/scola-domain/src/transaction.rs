//! Append-only income and expense rows.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TUITION_PAYMENT_CATEGORY: &str = "Tuition Payment";
pub const TEACHER_SALARY_CATEGORY: &str = "Teacher Salary";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDateTime,
    /// Upstream record (payment, salary payout) this row was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            category: category.into(),
            description: None,
            date,
            source_event_id: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
/// Income, expense and balance over one reporting period.
pub struct PeriodStats {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl PeriodStats {
    pub fn from_parts(income: f64, expense: f64) -> Self {
        Self {
            income,
            expense,
            balance: income - expense,
        }
    }
}
