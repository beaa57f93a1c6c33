//! Compile-time build metadata emitted by `build.rs`.

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

pub static BUILD_INFO: Lazy<BuildInfo> = Lazy::new(|| BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    git_hash: env!("SCOLA_BUILD_HASH"),
    git_status: env!("SCOLA_BUILD_STATUS"),
    timestamp: env!("SCOLA_BUILD_TIMESTAMP"),
    target: env!("SCOLA_BUILD_TARGET"),
    profile: env!("SCOLA_BUILD_PROFILE"),
    rustc: env!("SCOLA_BUILD_RUSTC"),
});

impl BuildInfo {
    /// One-line summary, e.g. `scola_ledger 0.1.0 (abc1234, clean) release`.
    pub fn summary(&self) -> String {
        format!(
            "scola_ledger {} ({}, {}) {}",
            self.version, self.git_hash, self.git_status, self.profile
        )
    }
}
