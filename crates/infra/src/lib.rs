//! Infrastructure layer: job storage on disk, remote payload storage, config.

pub mod config;
pub mod jobs;
pub mod payload;

pub use config::{ConfigError, DropboxCredentials, ServerConfig};
pub use jobs::{run_blocking, FileJobStore, InMemoryJobStore, JobStore, JobStoreError};
pub use payload::{DropboxStore, PayloadStore, RemoteStore, RemoteStoreError, StoredPayload};
