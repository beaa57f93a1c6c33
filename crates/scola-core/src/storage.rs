use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use scola_domain::SchoolLedger;

use crate::CoreError;

/// Describes a persisted backup artifact for a ledger.
#[derive(Debug, Clone)]
pub struct LedgerBackupInfo {
    pub ledger: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing ledgers and backups.
pub trait LedgerStorage: Send + Sync {
    fn save_ledger(&self, name: &str, ledger: &SchoolLedger) -> Result<(), CoreError>;
    fn load_ledger(&self, name: &str) -> Result<SchoolLedger, CoreError>;
    fn ledger_exists(&self, name: &str) -> bool;
    fn backup_ledger(
        &self,
        name: &str,
        ledger: &SchoolLedger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError>;
    fn delete_backup(&self, backup: &LedgerBackupInfo) -> Result<(), CoreError>;
    fn restore_backup(&self, backup: &LedgerBackupInfo) -> Result<SchoolLedger, CoreError>;
}

impl<S: LedgerStorage + ?Sized> LedgerStorage for Box<S> {
    fn save_ledger(&self, name: &str, ledger: &SchoolLedger) -> Result<(), CoreError> {
        (**self).save_ledger(name, ledger)
    }

    fn load_ledger(&self, name: &str) -> Result<SchoolLedger, CoreError> {
        (**self).load_ledger(name)
    }

    fn ledger_exists(&self, name: &str) -> bool {
        (**self).ledger_exists(name)
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &SchoolLedger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        (**self).backup_ledger(name, ledger, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        (**self).list_backups(name)
    }

    fn delete_backup(&self, backup: &LedgerBackupInfo) -> Result<(), CoreError> {
        (**self).delete_backup(backup)
    }

    fn restore_backup(&self, backup: &LedgerBackupInfo) -> Result<SchoolLedger, CoreError> {
        (**self).restore_backup(backup)
    }
}

/// Detects dangling references and other anomalies within a ledger snapshot.
pub fn ledger_warnings(ledger: &SchoolLedger) -> Vec<String> {
    let student_ids: HashSet<_> = ledger.students.iter().map(|s| s.id).collect();
    let teacher_ids: HashSet<_> = ledger.teachers.iter().map(|t| t.id).collect();
    let mut warnings = Vec::new();

    for enrollment in &ledger.enrollments {
        if !student_ids.contains(&enrollment.student_id) {
            warnings.push(format!(
                "enrollment {} references unknown student {}",
                enrollment.id, enrollment.student_id
            ));
        }
    }
    for payment in &ledger.payments {
        if !student_ids.contains(&payment.student_id) {
            warnings.push(format!(
                "payment {} references unknown student {}",
                payment.id, payment.student_id
            ));
        }
    }
    for group in &ledger.groups {
        if !teacher_ids.contains(&group.teacher_id) {
            warnings.push(format!(
                "group {} references unknown teacher {}",
                group.id, group.teacher_id
            ));
        }
    }

    let mut active_keys: HashMap<(String, String, String), usize> = HashMap::new();
    for entry in ledger.pricing.iter().filter(|entry| entry.active) {
        *active_keys.entry(entry.key()).or_default() += 1;
    }
    let mut duplicates: Vec<_> = active_keys
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicates.sort();
    for ((category, level, subject), count) in duplicates {
        warnings.push(format!(
            "pricing {category}/{level}/{subject} has {count} active entries"
        ));
    }
    warnings
}
