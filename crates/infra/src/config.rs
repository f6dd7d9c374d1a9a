//! Server configuration loading and representation.
//!
//! Everything comes from environment variables; empty values count as unset.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_PRINTS_DIR: &str = "./data/prints";
pub const DEFAULT_PRINTER: &str = "default";
/// Largest accepted upload body (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Refresh-token credentials for the remote upload path.
#[derive(Clone, PartialEq, Eq)]
pub struct DropboxCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for DropboxCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Job Store base directory.
    pub prints_dir: PathBuf,
    /// Shared secret expected in `X-Agent-Key`. `None` disables the check.
    pub agent_key: Option<String>,
    pub default_printer: String,
    /// Remote upload is attempted only when all three credentials are set.
    pub dropbox: Option<DropboxCredentials>,
    /// Request body limit for submissions; larger uploads get 413.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Local-only configuration rooted at `prints_dir` (dev/test).
    pub fn local(prints_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            prints_dir: prints_dir.into(),
            agent_key: None,
            default_printer: DEFAULT_PRINTER.to_string(),
            dropbox: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_agent_key(mut self, key: impl Into<String>) -> Self {
        self.agent_key = Some(key.into());
        self
    }

    pub fn with_default_printer(mut self, printer: impl Into<String>) -> Self {
        self.default_printer = printer.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_raw = get("PRINTDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "PRINTDESK_BIND",
            expected: "socket address",
            value: bind_raw.clone(),
        })?;

        let max_upload_bytes = match get("PRINTDESK_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PRINTDESK_MAX_UPLOAD_BYTES",
                expected: "number of bytes",
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let dropbox = match (
            get("DROPBOX_CLIENT_ID"),
            get("DROPBOX_CLIENT_SECRET"),
            get("DROPBOX_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(DropboxCredentials {
                client_id,
                client_secret,
                refresh_token,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            prints_dir: get("PRINTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PRINTS_DIR)),
            agent_key: get("PRINT_AGENT_KEY"),
            default_printer: get("DEFAULT_PRINTER_NAME").unwrap_or_else(|| DEFAULT_PRINTER.to_string()),
            dropbox,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg, ServerConfig::local(DEFAULT_PRINTS_DIR));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = from_pairs(&[("PRINT_AGENT_KEY", ""), ("DEFAULT_PRINTER_NAME", "  ")]).unwrap();
        assert_eq!(cfg.agent_key, None);
        assert_eq!(cfg.default_printer, DEFAULT_PRINTER);
    }

    #[test]
    fn remote_path_needs_all_credentials() {
        let partial = from_pairs(&[("DROPBOX_CLIENT_ID", "id"), ("DROPBOX_REFRESH_TOKEN", "rt")]).unwrap();
        assert!(partial.dropbox.is_none());

        let full = from_pairs(&[
            ("DROPBOX_CLIENT_ID", "id"),
            ("DROPBOX_CLIENT_SECRET", "secret"),
            ("DROPBOX_REFRESH_TOKEN", "rt"),
        ])
        .unwrap();
        let creds = full.dropbox.unwrap();
        assert_eq!(creds.client_id, "id");
        let debug = format!("{creds:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn upload_limit_is_configurable() {
        assert_eq!(from_pairs(&[]).unwrap().max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        let cfg = from_pairs(&[("PRINTDESK_MAX_UPLOAD_BYTES", "1048576")]).unwrap();
        assert_eq!(cfg.max_upload_bytes, 1024 * 1024);
        assert!(matches!(
            from_pairs(&[("PRINTDESK_MAX_UPLOAD_BYTES", "big")]),
            Err(ConfigError::Invalid { var: "PRINTDESK_MAX_UPLOAD_BYTES", .. })
        ));
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let err = from_pairs(&[("PRINTDESK_BIND", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PRINTDESK_BIND", .. }));
    }
}
