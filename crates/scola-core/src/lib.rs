//! scola-core
//!
//! Business logic and services for the school ledger.
//! Depends on scola-domain. No CLI, no terminal I/O, no direct storage interactions.

pub mod analytics_service;
pub mod cascade_service;
pub mod compensation_service;
pub mod enrollment_service;
pub mod error;
pub mod payment_service;
pub mod pricing_service;
pub mod storage;
pub mod student_service;
pub mod subscription_service;
pub mod time;
pub mod transaction_service;


pub use analytics_service::*;
pub use cascade_service::*;
pub use compensation_service::*;
pub use enrollment_service::*;
pub use error::{CoreError, ErrorKind};
pub use payment_service::*;
pub use pricing_service::*;
pub use student_service::*;
pub use subscription_service::*;
pub use transaction_service::*;
