//! Configuration handling for a recovery run.

use crate::types::{HttpConfig, Result, SnatchError};
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Name of the run report written into the output directory.
pub const REPORT_FILE_NAME: &str = "snatch-report.json";

/// Recover original source files from a deployed site's sourcemap.
#[derive(Parser, Debug, Clone)]
#[command(name = "mapsnatch")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the site to recover
    pub url: String,

    /// Output directory for recovered files
    #[arg(short, long, default_value = "recovered-files")]
    pub output: PathBuf,

    /// Enable verbose step logging
    #[arg(short, long)]
    pub debug: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Maximum retries for transport errors and 5xx responses
    #[arg(long, default_value = "2")]
    pub max_retries: u32,

    /// Custom User-Agent string
    #[arg(long, env = "MAPSNATCH_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl Config {
    /// Get HTTP configuration from the CLI config.
    pub fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout_secs: self.timeout,
            max_retries: self.max_retries,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    /// Parse the target, adding `https://` when no scheme was given.
    pub fn base_url(&self) -> Result<Url> {
        normalize_target(&self.url)
    }
}

/// Normalize a user-supplied target into an absolute URL.
pub fn normalize_target(target: &str) -> Result<Url> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(SnatchError::ConfigError("empty target URL".to_string()));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Ok(Url::parse(&with_scheme)?)
}
