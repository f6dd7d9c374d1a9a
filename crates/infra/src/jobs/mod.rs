//! Print job storage.
//!
//! ## Design
//!
//! - One metadata record and at most one payload file per job
//! - No index: listing and "next queued" are full scans, O(n) per call
//! - `next` is observational; `claim_next` is the optional leased variant
//!
//! ## Components
//!
//! - `JobStore`: storage abstraction used by the HTTP layer
//! - `FileJobStore`: `<id>.json` + `<id>.pdf` files under a base directory
//! - `InMemoryJobStore`: same semantics without a filesystem (tests/benches)
//! - `run_blocking`: how async code calls a store (tokio blocking pool)

pub mod file;
pub mod store;

pub use file::FileJobStore;
pub use store::{run_blocking, InMemoryJobStore, JobStore, JobStoreError};
