use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

use crate::ConfigError;

/// Environment variable overriding the directory that holds config, ledgers and backups.
pub const HOME_ENV: &str = "SCOLA_HOME";

/// Stores operator preferences and ledger locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    /// Ledger name used by the CLI and the manager.
    #[serde(default = "Config::default_school_name")]
    pub school_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for ledgers. Defaults to `<home>/ledgers`.
    pub data_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for backups. Defaults to `<home>/backups`.
    pub backup_root: Option<PathBuf>,

    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default)]
    pub projection: ProjectionSettings,
    #[serde(default)]
    pub cascade: CascadeSettings,
    #[serde(default = "Config::default_recent_enrollments_limit")]
    pub recent_enrollments_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "fr-DZ".into(),
            currency: "DZD".into(),
            school_name: Self::default_school_name(),
            data_root: None,
            backup_root: None,
            backup_retention: Self::default_backup_retention(),
            projection: ProjectionSettings::default(),
            cascade: CascadeSettings::default(),
            recent_enrollments_limit: Self::default_recent_enrollments_limit(),
        }
    }
}

impl Config {
    pub fn default_school_name() -> String {
        "school".into()
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn default_recent_enrollments_limit() -> usize {
        5
    }

    /// `$SCOLA_HOME` when set, else a `scola` folder under the platform data directory.
    pub fn home_dir() -> PathBuf {
        if let Some(home) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return PathBuf::from(home);
        }
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scola")
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        match &self.data_root {
            Some(path) => path.clone(),
            None => Self::home_dir().join("ledgers"),
        }
    }

    pub fn resolve_backup_root(&self) -> PathBuf {
        match &self.backup_root {
            Some(path) => path.clone(),
            None => Self::home_dir().join("backups"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.school_name.trim().is_empty() {
            return Err(ConfigError::Invalid("school_name must not be empty".into()));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must be at least 1".into(),
            ));
        }
        if self.cascade.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "cascade.max_attempts must be at least 1".into(),
            ));
        }
        self.projection.validate()
    }
}

/// Flat assumptions behind teacher payout projections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectionSettings {
    #[serde(default = "ProjectionSettings::default_hours")]
    pub hours_per_group_per_month: f64,
    #[serde(default = "ProjectionSettings::default_revenue")]
    pub revenue_per_student: f64,
}

impl ProjectionSettings {
    fn default_hours() -> f64 {
        8.0
    }

    fn default_revenue() -> f64 {
        500.0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("projection.hours_per_group_per_month", self.hours_per_group_per_month),
            ("projection.revenue_per_student", self.revenue_per_student),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            hours_per_group_per_month: Self::default_hours(),
            revenue_per_student: Self::default_revenue(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CascadeSettings {
    /// Attempts before a cascade event is marked failed.
    #[serde(default = "CascadeSettings::default_max_attempts")]
    pub max_attempts: u32,
}

impl CascadeSettings {
    fn default_max_attempts() -> u32 {
        5
    }
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
        }
    }
}
