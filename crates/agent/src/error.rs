use std::path::PathBuf;

/// Failure of one agent step (poll, download, report).
///
/// Never fatal to the loop: the worker logs it and either reports the job as
/// failed or retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },
    #[error("{url} returned {status}: {body}")]
    Api { url: String, status: u16, body: String },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
