//! Logging for the print server and the print agent.
//!
//! Both binaries call [`init`] first thing in `main`.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Install the tracing subscriber (format from `PRINTDESK_LOG_FORMAT`).
pub fn init() {
    tracing::init();
}
