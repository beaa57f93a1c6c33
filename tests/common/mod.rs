#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use scola_ledger::{
    scola_core::{storage::LedgerBackupInfo, storage::LedgerStorage, time::FixedClock, CoreError},
    scola_domain::SchoolLedger,
    scola_storage_json::{JsonLedgerStorage, StoragePaths},
    ManagerSettings, SchoolLedgerManager,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> std::path::PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn json_storage() -> JsonLedgerStorage {
    let base = temp_base();
    JsonLedgerStorage::new(StoragePaths {
        ledger_root: base.join("ledgers"),
        backup_root: base.join("backups"),
    })
    .expect("create json storage")
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Manager over fresh JSON storage with its clock pinned to `now`.
pub fn setup_manager(now: NaiveDateTime) -> SchoolLedgerManager {
    SchoolLedgerManager::new(Box::new(json_storage()), ManagerSettings::default())
        .with_clock(FixedClock(now))
}

/// Switches the storage wrapped by [`FlakyStorage`] into failure modes.
#[derive(Clone, Default)]
pub struct Faults {
    saves: Arc<AtomicUsize>,
    failing_saves: Arc<Mutex<Vec<usize>>>,
    fail_loads: Arc<AtomicBool>,
}

impl Faults {
    /// Makes the `nth` save from now (1-based) fail.
    pub fn fail_save_in(&self, nth: usize) {
        let target = self.saves.load(Ordering::SeqCst) + nth;
        self.failing_saves
            .lock()
            .expect("lock faults")
            .push(target);
    }

    pub fn fail_loads(&self, enabled: bool) {
        self.fail_loads.store(enabled, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

/// JSON storage that fails chosen saves and loads on request.
pub struct FlakyStorage {
    inner: JsonLedgerStorage,
    faults: Faults,
}

impl FlakyStorage {
    pub fn new(inner: JsonLedgerStorage) -> (Self, Faults) {
        let faults = Faults::default();
        (
            Self {
                inner,
                faults: faults.clone(),
            },
            faults,
        )
    }
}

impl LedgerStorage for FlakyStorage {
    fn save_ledger(&self, name: &str, ledger: &SchoolLedger) -> Result<(), CoreError> {
        let count = self.faults.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .faults
            .failing_saves
            .lock()
            .expect("lock faults")
            .contains(&count)
        {
            return Err(CoreError::Storage("disk unavailable".into()));
        }
        self.inner.save_ledger(name, ledger)
    }

    fn load_ledger(&self, name: &str) -> Result<SchoolLedger, CoreError> {
        if self.faults.fail_loads.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("store offline".into()));
        }
        self.inner.load_ledger(name)
    }

    fn ledger_exists(&self, name: &str) -> bool {
        self.inner.ledger_exists(name)
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &SchoolLedger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        self.inner.backup_ledger(name, ledger, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        self.inner.list_backups(name)
    }

    fn delete_backup(&self, backup: &LedgerBackupInfo) -> Result<(), CoreError> {
        self.inner.delete_backup(backup)
    }

    fn restore_backup(&self, backup: &LedgerBackupInfo) -> Result<SchoolLedger, CoreError> {
        self.inner.restore_backup(backup)
    }
}

/// Manager over [`FlakyStorage`] plus the handle that controls its faults.
pub fn setup_flaky_manager(now: NaiveDateTime) -> (SchoolLedgerManager, Faults) {
    let (storage, faults) = FlakyStorage::new(json_storage());
    let manager = SchoolLedgerManager::new(Box::new(storage), ManagerSettings::default())
        .with_clock(FixedClock(now));
    (manager, faults)
}
