//! Remote print agent: polls the print server, prints jobs locally and
//! reports the outcome.

pub mod client;
pub mod config;
pub mod error;
pub mod printer;
pub mod worker;

pub use client::PrintServerClient;
pub use config::{AgentConfig, ConfigError};
pub use error::AgentError;
pub use printer::{PrintCommand, PrintFailure};
pub use worker::{PrintAgent, PrintAgentHandle, Tick};
