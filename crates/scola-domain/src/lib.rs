//! scola-domain
//!
//! Pure domain models for the school ledger (pricing, students, enrollments,
//! payments, transactions, teachers, cascade events).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod cascade;
pub mod enrollment;
pub mod ledger;
pub mod payment;
pub mod period;
pub mod pricing;
pub mod student;
pub mod teacher;
pub mod transaction;

pub use cascade::*;
pub use enrollment::*;
pub use ledger::*;
pub use payment::*;
pub use period::*;
pub use pricing::*;
pub use student::*;
pub use teacher::*;
pub use transaction::*;
