//! The persisted aggregate holding every ledger record for one school.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    cascade::CascadeEvent,
    enrollment::Enrollment,
    payment::Payment,
    pricing::PricingEntry,
    student::Student,
    teacher::{Group, Session, Teacher},
    transaction::Transaction,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolLedger {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub pricing: Vec<PricingEntry>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub outbox: Vec<CascadeEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "SchoolLedger::schema_version_default")]
    pub schema_version: u8,
}

impl SchoolLedger {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pricing: Vec::new(),
            students: Vec::new(),
            enrollments: Vec::new(),
            payments: Vec::new(),
            transactions: Vec::new(),
            teachers: Vec::new(),
            groups: Vec::new(),
            sessions: Vec::new(),
            outbox: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    pub fn add_student(&mut self, student: Student) -> Uuid {
        let id = student.id;
        self.students.push(student);
        self.touch();
        id
    }

    pub fn add_teacher(&mut self, teacher: Teacher) -> Uuid {
        let id = teacher.id;
        self.teachers.push(teacher);
        self.touch();
        id
    }

    pub fn add_group(&mut self, group: Group) -> Uuid {
        let id = group.id;
        self.groups.push(group);
        self.touch();
        id
    }

    pub fn add_session(&mut self, session: Session) -> Uuid {
        let id = session.id;
        self.sessions.push(session);
        self.touch();
        id
    }

    pub fn student(&self, id: Uuid) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn student_mut(&mut self, id: Uuid) -> Option<&mut Student> {
        self.students.iter_mut().find(|student| student.id == id)
    }

    pub fn teacher(&self, id: Uuid) -> Option<&Teacher> {
        self.teachers.iter().find(|teacher| teacher.id == id)
    }

    pub fn enrollment(&self, id: Uuid) -> Option<&Enrollment> {
        self.enrollments.iter().find(|enrollment| enrollment.id == id)
    }

    pub fn enrollment_mut(&mut self, id: Uuid) -> Option<&mut Enrollment> {
        self.enrollments
            .iter_mut()
            .find(|enrollment| enrollment.id == id)
    }

    pub fn payment(&self, id: Uuid) -> Option<&Payment> {
        self.payments.iter().find(|payment| payment.id == id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn cascade_event(&self, id: Uuid) -> Option<&CascadeEvent> {
        self.outbox.iter().find(|event| event.id == id)
    }

    pub fn cascade_event_mut(&mut self, id: Uuid) -> Option<&mut CascadeEvent> {
        self.outbox.iter_mut().find(|event| event.id == id)
    }

    /// Groups taught by `teacher_id`, active or not.
    pub fn groups_for_teacher(&self, teacher_id: Uuid) -> impl Iterator<Item = &Group> {
        self.groups
            .iter()
            .filter(move |group| group.teacher_id == teacher_id)
    }
}
