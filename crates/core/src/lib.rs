//! `printdesk-core`: print job domain types.
//!
//! This crate contains **pure domain** primitives (no filesystem, no HTTP).

pub mod cache;
pub mod error;
pub mod id;
pub mod job;

pub use cache::TtlCache;
pub use error::DomainError;
pub use id::JobId;
pub use job::{Claim, JobStatus, PrintJob, StatusUpdate, PAYLOAD_EXTENSION};
