//! Agent configuration (environment variables, empty values count as unset).

use std::path::PathBuf;
use std::time::Duration;

use crate::printer::PrintCommand;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_PRINTER: &str = "default";
pub const DEFAULT_WORKDIR: &str = "./print-agent-tmp";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub server_url: String,
    /// Sleep after an empty poll or a failed step.
    pub poll_interval: Duration,
    /// Used when a job does not name a printer.
    pub printer_name: String,
    /// Where downloads land; failed jobs leave their file here.
    pub workdir: PathBuf,
    pub agent_key: Option<String>,
    pub print_command: PrintCommand,
    /// Lease jobs through `/prints/claim` instead of the observational dequeue.
    pub claim_mode: bool,
    pub agent_id: String,
}

impl AgentConfig {
    pub fn new(server_url: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            printer_name: DEFAULT_PRINTER.to_string(),
            workdir: workdir.into(),
            agent_key: None,
            print_command: PrintCommand::default(),
            claim_mode: false,
            agent_id: default_agent_id(None),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer_name = printer.into();
        self
    }

    pub fn with_agent_key(mut self, key: impl Into<String>) -> Self {
        self.agent_key = Some(key.into());
        self
    }

    pub fn with_print_command(mut self, command: PrintCommand) -> Self {
        self.print_command = command;
        self
    }

    pub fn with_claim_mode(mut self, agent_id: impl Into<String>) -> Self {
        self.claim_mode = true;
        self.agent_id = agent_id.into();
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let mut cfg = Self::new(
            get("PRINT_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            get("PRINT_AGENT_WORKDIR").unwrap_or_else(|| DEFAULT_WORKDIR.to_string()),
        );

        if let Some(raw) = get("POLL_INTERVAL_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "POLL_INTERVAL_MS",
                expected: "number of milliseconds",
                value: raw.clone(),
            })?;
            cfg.poll_interval = Duration::from_millis(ms);
        }

        if let Some(printer) = get("PRINTER_NAME") {
            cfg.printer_name = printer;
        }
        cfg.agent_key = get("PRINT_AGENT_KEY");

        if let Some(command) = get("PRINT_COMMAND").as_deref().and_then(PrintCommand::parse) {
            cfg.print_command = command;
        }

        if let Some(raw) = get("PRINT_AGENT_CLAIM") {
            cfg.claim_mode = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "PRINT_AGENT_CLAIM",
                        expected: "boolean",
                        value: raw,
                    });
                }
            };
        }

        cfg.agent_id = get("PRINT_AGENT_ID").unwrap_or_else(|| default_agent_id(get("HOSTNAME")));
        Ok(cfg)
    }
}

fn default_agent_id(hostname: Option<String>) -> String {
    match hostname {
        Some(host) => format!("agent-{host}"),
        None => format!("agent-{}", std::process::id()),
    }
}
