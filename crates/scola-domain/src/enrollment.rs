//! One-time enrollment events and their fees.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentKind {
    /// Academic support tied to a subject.
    Support,
    /// Vocational or extracurricular training.
    Training,
}

impl EnrollmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            EnrollmentKind::Support => "Support",
            EnrollmentKind::Training => "Training",
        }
    }
}

impl fmt::Display for EnrollmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub kind: EnrollmentKind,
    pub category: String,
    /// Fee copied at creation time, decoupled from later catalog changes.
    pub amount: f64,
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Enrollment {
    pub fn new(
        student_id: Uuid,
        kind: EnrollmentKind,
        category: impl Into<String>,
        amount: f64,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            kind,
            category: category.into(),
            amount,
            date,
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Note carried over to the derived payment.
    pub fn payment_note(&self) -> String {
        format!("{} enrollment - {}", self.kind.label(), self.category.trim())
    }
}

/// Staff correction applied to an existing enrollment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentPatch {
    pub kind: Option<EnrollmentKind>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDateTime>,
    pub note: Option<Option<String>>,
}
