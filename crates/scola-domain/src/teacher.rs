//! Teachers, their payout policies, and the groups they run.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompensationPolicy {
    Hourly { hourly_rate: f64 },
    Fixed { monthly_amount: f64 },
    Percentage { commission_percent: f64 },
}

impl CompensationPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            CompensationPolicy::Hourly { .. } => "Hourly",
            CompensationPolicy::Fixed { .. } => "Fixed",
            CompensationPolicy::Percentage { .. } => "Percentage",
        }
    }
}

impl fmt::Display for CompensationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub compensation: CompensationPolicy,
}

impl Teacher {
    pub fn new(name: impl Into<String>, compensation: CompensationPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            compensation,
        }
    }
}

/// A class taught by one teacher for one subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub teacher_id: Uuid,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default = "Group::default_active")]
    pub active: bool,
}

impl Group {
    pub fn new(name: impl Into<String>, subject: impl Into<String>, teacher_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            subject: subject.into(),
            teacher_id,
            student_ids: Vec::new(),
            active: true,
        }
    }

    pub fn with_students(mut self, student_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.student_ids.extend(student_ids);
        self
    }

    pub fn default_active() -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttendanceMark {
    pub student_id: Uuid,
    pub present: bool,
}

/// A held class session with its attendance sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub group_id: Uuid,
    pub held_at: NaiveDateTime,
    #[serde(default)]
    pub attendance: Vec<AttendanceMark>,
}

impl Session {
    pub fn new(group_id: Uuid, held_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            held_at,
            attendance: Vec::new(),
        }
    }

    pub fn mark(mut self, student_id: Uuid, present: bool) -> Self {
        self.attendance.push(AttendanceMark {
            student_id,
            present,
        });
        self
    }

    pub fn present_count(&self) -> usize {
        self.attendance.iter().filter(|mark| mark.present).count()
    }
}

