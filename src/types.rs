//! Core types and errors for sourcemap recovery.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that abort a recovery run.
#[derive(Error, Debug)]
pub enum SnatchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Source map reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Source map decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, SnatchError>;

/// Whether a source entry is written to disk or left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Write,
    Skip,
}

/// Why a path received its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// First-party source.
    FirstParty,
    /// Lives under `node_modules/`, with the package segment if one was found.
    NodeModules(Option<String>),
    /// Webpack runtime/bootstrap code.
    WebpackRuntime,
}

/// Verdict for a single declared source path. Depends on the path string only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDecision {
    pub path: String,
    pub verdict: Verdict,
    pub reason: Reason,
}

/// Statistics for one recovery run, serialized as `snatch-report.json`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Site URL the run started from.
    pub base_url: String,
    /// Location of the decoded map (`inline` for data URLs).
    pub map_url: String,
    /// RFC 3339 timestamp of when the report was finalized.
    pub timestamp: String,
    pub total_sources: usize,
    pub written_sources: usize,
    pub skipped_sources: usize,
    /// Package segments seen under `node_modules/`, first-seen order.
    pub possible_node_packages: Vec<String>,

    /// Entries without embedded content.
    #[serde(skip)]
    pub absent_content: usize,
    /// Entries whose write to disk failed.
    #[serde(skip)]
    pub failed_writes: usize,
    /// Successful writes that replaced a file written earlier in the run.
    #[serde(skip)]
    pub overwritten: usize,
    /// Image stubs written as placeholder text because the asset fetch failed.
    #[serde(skip)]
    pub asset_fallbacks: usize,
    #[serde(skip)]
    seen_packages: HashSet<String>,
}

impl RunReport {
    /// Start an empty report for a run.
    pub fn new(base_url: &str, map_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            map_url: map_url.to_string(),
            ..Default::default()
        }
    }

    /// Record a package segment, keeping first-seen order.
    pub fn add_package(&mut self, name: &str) {
        if self.seen_packages.insert(name.to_string()) {
            self.possible_node_packages.push(name.to_string());
        }
    }

    /// Stamp the report with the current time.
    pub fn finalize(&mut self) {
        self.timestamp =
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    }

    /// Whether every counted entry is accounted for.
    pub fn is_balanced(&self) -> bool {
        self.total_sources
            == self.written_sources + self.skipped_sources + self.absent_content + self.failed_writes
    }
}

/// Configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            user_agent: "Mozilla/5.0 (compatible; mapsnatch/0.1)".to_string(),
        }
    }
}
