use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use scola_core::{
    storage::{LedgerBackupInfo, LedgerStorage},
    CoreError,
};
use scola_domain::SchoolLedger;
use tracing::{debug, warn};

const LEDGER_EXTENSION: &str = "json";
const BACKUP_DIR_SUFFIX: &str = "-backups";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
/// Label carried by the snapshots taken before every save.
pub const AUTOSAVE_LABEL: &str = "autosave";
/// Automatic snapshots kept per ledger; labelled backups are never pruned.
pub const DEFAULT_RETENTION: usize = 5;

/// Directories holding live ledgers and their backups.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub ledger_root: PathBuf,
    pub backup_root: PathBuf,
}

/// Filesystem-backed JSON persistence for school ledgers and their backups.
///
/// Every save replaces the file through a temporary sibling and a rename, so
/// a reader never observes a half-written ledger.
#[derive(Debug, Clone)]
pub struct JsonLedgerStorage {
    paths: StoragePaths,
    retention: usize,
}

impl JsonLedgerStorage {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.ledger_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        Ok(Self {
            paths,
            retention: retention.max(1),
        })
    }

    pub fn ledger_path(&self, name: &str) -> PathBuf {
        self.paths
            .ledger_root
            .join(format!("{}.{}", canonical_name(name), LEDGER_EXTENSION))
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.paths
            .backup_root
            .join(format!("{}{}", canonical_name(name), BACKUP_DIR_SUFFIX))
    }

    fn backup_file_name(name: &str, note: Option<&str>) -> String {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{}", canonical_name(name), timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        format!("{}.{}", stem, LEDGER_EXTENSION)
    }

    fn write_backup_file(
        &self,
        ledger: &SchoolLedger,
        name: &str,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let file_name = Self::backup_file_name(name, note);
        let path = dir.join(&file_name);
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &serialize_ledger(ledger)?)?;
        fs::rename(&tmp, &path)?;
        debug!(backup = %file_name, "ledger backup written");
        Ok(LedgerBackupInfo {
            ledger: canonical_name(name),
            id: file_name.clone(),
            created_at: parse_backup_timestamp(&file_name)
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            path,
        })
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let backup_path = dir.join(Self::backup_file_name(name, Some(AUTOSAVE_LABEL)));
        fs::copy(path, &backup_path)?;
        self.prune_autosaves(name)?;
        Ok(())
    }

    /// Keeps the newest `retention` automatic snapshots.
    fn prune_autosaves(&self, name: &str) -> Result<(), CoreError> {
        let autosaves = self
            .list_backups(name)?
            .into_iter()
            .filter(|entry| backup_note(&entry.id).as_deref() == Some(AUTOSAVE_LABEL));
        for entry in autosaves.skip(self.retention) {
            if let Err(err) = self.delete_backup(&entry) {
                warn!(backup = %entry.id, %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl LedgerStorage for JsonLedgerStorage {
    fn save_ledger(&self, name: &str, ledger: &SchoolLedger) -> Result<(), CoreError> {
        let path = self.ledger_path(name);
        self.backup_existing_file(name, &path)?;
        save_ledger_to_path(ledger, &path)
    }

    fn load_ledger(&self, name: &str) -> Result<SchoolLedger, CoreError> {
        let path = self.ledger_path(name);
        if !path.exists() {
            return Err(CoreError::Storage(format!(
                "ledger `{}` not found",
                canonical_name(name)
            )));
        }
        load_ledger_from_path(&path)
    }

    fn ledger_exists(&self, name: &str) -> bool {
        self.ledger_path(name).exists()
    }

    fn backup_ledger(
        &self,
        name: &str,
        ledger: &SchoolLedger,
        note: Option<&str>,
    ) -> Result<LedgerBackupInfo, CoreError> {
        self.write_backup_file(ledger, name, note)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<LedgerBackupInfo>, CoreError> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let ledger_slug = canonical_name(name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LEDGER_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(LedgerBackupInfo {
                    ledger: ledger_slug.clone(),
                    id: file_name.to_string(),
                    created_at: parse_backup_timestamp(file_name)
                        .map(|ts| ts.to_rfc3339())
                        .unwrap_or_default(),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by(|a, b| {
            parse_backup_timestamp(&b.id)
                .cmp(&parse_backup_timestamp(&a.id))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    fn delete_backup(&self, backup: &LedgerBackupInfo) -> Result<(), CoreError> {
        if backup.path.exists() {
            fs::remove_file(&backup.path)?;
        }
        Ok(())
    }

    fn restore_backup(&self, backup: &LedgerBackupInfo) -> Result<SchoolLedger, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let ledger = load_ledger_from_path(&backup.path)?;
        self.save_ledger(&backup.ledger, &ledger)?;
        Ok(ledger)
    }
}

/// Saves a ledger to an arbitrary path on disk.
pub fn save_ledger_to_path(ledger: &SchoolLedger, path: &Path) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_ledger(ledger)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a ledger from the provided filesystem path.
pub fn load_ledger_from_path(path: &Path) -> Result<SchoolLedger, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// File-system safe slug for a ledger name.
pub fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "ledger".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Position of the `<date>_<time>` pair inside a backup stem's segments.
fn timestamp_segments(name: &str) -> Option<(Vec<&str>, usize)> {
    let stem = name.strip_suffix(&format!(".{}", LEDGER_EXTENSION))?;
    let segments: Vec<&str> = stem.split('_').collect();
    let index = (1..segments.len())
        .rev()
        .find(|&idx| is_digits(segments[idx - 1], 8) && is_digits(segments[idx], 6))?;
    Some((segments, index))
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let (segments, index) = timestamp_segments(name)?;
    let raw = format!("{}{}", segments[index - 1], segments[index]);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn backup_note(name: &str) -> Option<String> {
    let (segments, index) = timestamp_segments(name)?;
    let note = segments[index + 1..].join("_");
    (!note.is_empty()).then_some(note)
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn serialize_ledger(ledger: &SchoolLedger) -> Result<String, CoreError> {
    serde_json::to_string_pretty(ledger).map_err(|err| CoreError::Serde(err.to_string()))
}
