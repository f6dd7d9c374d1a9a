//! HTTP API: print job submission, dequeue and status reporting.

pub mod app;
pub mod middleware;
