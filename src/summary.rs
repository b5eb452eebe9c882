//! Per-server summary for the downstream pipeline
//!
//! Every enabled server contributes one `{name, restart_service}` record;
//! the records are serialized as a single `servers=<json-array>` line that
//! the CI pipeline parses to build its deployment matrix. Emission goes
//! through [`SummarySink`] so the core stays free of environment lookups.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::{env, io};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::Result;

/// Environment variable naming the CI step-output file, when present
const STEP_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// One enabled server, as the downstream pipeline sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Server identifier
    pub name: String,
    /// Service to restart after deployment, empty when unset
    pub restart_service: String,
}

/// Records for every enabled server, in declaration order
#[must_use]
pub fn server_records(config: &Config) -> Vec<ServerRecord> {
    config
        .enabled_servers()
        .map(|(name, server)| ServerRecord {
            name: name.clone(),
            restart_service: server.restart_service.clone().unwrap_or_default(),
        })
        .collect()
}

/// Serialize the records as the `servers=<json-array>` summary line.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if serialization fails.
pub fn summary_line(records: &[ServerRecord]) -> Result<String> {
    Ok(format!("servers={}", serde_json::to_string(records)?))
}

/// Destination for the summary line
pub trait SummarySink {
    /// Deliver one summary line
    ///
    /// # Errors
    ///
    /// Returns an IO error if the sink cannot be written.
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

/// Sink printing to standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl SummarySink for StdoutSink {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")
    }
}

/// Sink appending to the CI step-output file
#[derive(Debug)]
pub struct StepOutputSink {
    path: PathBuf,
}

impl StepOutputSink {
    /// Sink for an explicit step-output file
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Sink for the file named by `GITHUB_OUTPUT`, if that variable is set
    #[must_use]
    pub fn from_env() -> Option<Self> {
        env::var_os(STEP_OUTPUT_ENV).map(|path| Self::new(PathBuf::from(path)))
    }
}

impl SummarySink for StepOutputSink {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}
