//! Cash and check receipts recorded against students.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Check,
    BankTransfer,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::BankTransfer => "bank transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Enrollment that produced this payment through the cascade, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_enrollment_id: Option<Uuid>,
}

impl Payment {
    pub fn new(student_id: Uuid, amount: f64, method: PaymentMethod, date: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            amount,
            method,
            date,
            note: None,
            source_enrollment_id: None,
        }
    }
}

