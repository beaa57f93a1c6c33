#![doc(test(attr(deny(warnings))))]

//! Scola Ledger is the financial core of a school-administration app: pricing,
//! student subscriptions, enrollments, payments, the income/expense ledger,
//! teacher payout projections and the revenue dashboards built on them.

pub mod cli;
pub mod errors;
pub mod manager;
pub mod utils;

pub use errors::SchoolError;
pub use manager::{CascadeOutcome, CascadeRun, ManagerSettings, SchoolLedgerManager};
pub use scola_config;
pub use scola_core;
pub use scola_domain;
pub use scola_storage_json;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Scola ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
