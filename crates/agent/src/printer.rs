//! Local OS print command.

use std::path::Path;

use tokio::process::Command;

/// Placeholder replaced with the printer name.
pub const PRINTER_PLACEHOLDER: &str = "{printer}";
/// Placeholder replaced with the downloaded file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Why a print did not succeed. The text ends up as the job's `lastMessage`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintFailure {
    #[error("failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{0}")]
    NonZeroExit(String),
}

/// Program plus argument template, e.g. `lp -d {printer} {file}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for PrintCommand {
    fn default() -> Self {
        Self {
            program: "lp".to_string(),
            args: vec!["-d".to_string(), PRINTER_PLACEHOLDER.to_string(), FILE_PLACEHOLDER.to_string()],
        }
    }
}

impl PrintCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Whitespace-split template. Blank input yields `None`.
    pub fn parse(template: &str) -> Option<Self> {
        let mut parts = template.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    pub fn render_args(&self, printer: &str, file: &Path) -> Vec<String> {
        let file = file.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(PRINTER_PLACEHOLDER, printer).replace(FILE_PLACEHOLDER, &file))
            .collect()
    }

    /// Run the command to completion. No timeout: a hung driver blocks here.
    pub async fn print(&self, printer: &str, file: &Path) -> Result<(), PrintFailure> {
        let args = self.render_args(printer, file);
        tracing::debug!(program = %self.program, ?args, "running print command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| PrintFailure::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let message = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("{} exited with {}", self.program, output.status)
        };
        Err(PrintFailure::NonZeroExit(message))
    }
}
