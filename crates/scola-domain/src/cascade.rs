//! Durable outbox events describing derived records still to be created.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeKind {
    /// A positive-amount enrollment owes exactly one payment.
    EnrollmentPayment { enrollment_id: Uuid },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CascadeStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for CascadeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CascadeStatus::Pending => "Pending",
            CascadeStatus::Completed => "Completed",
            CascadeStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeEvent {
    pub id: Uuid,
    pub kind: CascadeKind,
    #[serde(default)]
    pub status: CascadeStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Record created when the event completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CascadeEvent {
    pub fn new(kind: CascadeKind, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: CascadeStatus::Pending,
            attempts: 0,
            last_error: None,
            produced_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == CascadeStatus::Pending
    }

    pub fn enrollment_id(&self) -> Option<Uuid> {
        match self.kind {
            CascadeKind::EnrollmentPayment { enrollment_id } => Some(enrollment_id),
        }
    }

    pub fn complete(&mut self, produced_id: Uuid, at: NaiveDateTime) {
        self.status = CascadeStatus::Completed;
        self.produced_id = Some(produced_id);
        self.last_error = None;
        self.updated_at = at;
    }

    /// Records a failed attempt; gives up once `max_attempts` is reached.
    pub fn fail_attempt(&mut self, error: impl Into<String>, max_attempts: u32, at: NaiveDateTime) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.into());
        self.updated_at = at;
        if self.attempts >= max_attempts.max(1) {
            self.status = CascadeStatus::Failed;
        }
    }
}
