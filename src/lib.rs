//! mapsnatch - recover original source trees from a deployed site's sourcemap.
//!
//! A run:
//! - Fetches the site's HTML and locates the main bundle
//! - Follows the bundle's `sourceMappingURL` directive to its sourcemap
//! - Writes every embedded first-party source under an output directory,
//!   leaving `node_modules/` and webpack runtime code out
//! - Records counts and candidate package names in `snatch-report.json`
//!
//! # Example
//!
//! ```no_run
//! use mapsnatch::discovery::HttpFetcher;
//! use mapsnatch::notify::ConsoleOutput;
//! use mapsnatch::pipeline::Pipeline;
//! use mapsnatch::types::HttpConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();
//!     let pipeline = Pipeline::new(fetcher, "recovered-files", ConsoleOutput::default());
//!     let base = url::Url::parse("https://example.com/").unwrap();
//!     let outcome = pipeline.run(&base).await.unwrap();
//!     println!("Recovered {} files", outcome.report.written_sources);
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod reconstruct;
pub mod types;

pub use config::Config;
pub use pipeline::{Pipeline, PipelineFailure, RunOutcome, Stage};
pub use types::{
    ClassificationDecision, HttpConfig, Reason, Result, RunReport, SnatchError, Verdict,
};
