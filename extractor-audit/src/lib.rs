//! Extraction audit log.
//!
//! Every decision that is not "leave it to the BOM" is recorded here with the
//! module that caused it, so a human can review thousands of modules from
//! one report. A run may span several processes: each module pass flushes
//! its own fragment to the working store and the finalize step unions them.

mod key;
mod log;
mod render;

pub use key::{AuditCategory, AuditEntry, AuditFragment, AuditKey};
pub use log::AuditLog;
