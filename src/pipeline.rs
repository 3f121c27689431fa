//! Recovery pipeline: discovery chain, decode, reconstruction and report.

use crate::discovery::{extract_sourcemap_url, locate_main_script, Fetch, MapReference};
use crate::notify::{write_report, ConsoleOutput};
use crate::parser::SourceMapDocument;
use crate::reconstruct::Reconstructor;
use crate::types::{Result, RunReport, SnatchError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Map URL recorded in the report when the map was embedded in the script.
const INLINE_MAP_URL: &str = "inline";

/// Pipeline states, visited strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchHtml,
    LocateScript,
    FetchScript,
    ExtractMapRef,
    VerifyMapReachable,
    FetchMap,
    DecodeMap,
    Reconstruct,
    EmitReport,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchHtml => "fetch HTML",
            Stage::LocateScript => "locate main script",
            Stage::FetchScript => "fetch main script",
            Stage::ExtractMapRef => "extract sourcemap reference",
            Stage::VerifyMapReachable => "verify sourcemap reachable",
            Stage::FetchMap => "fetch sourcemap",
            Stage::DecodeMap => "decode sourcemap",
            Stage::Reconstruct => "reconstruct sources",
            Stage::EmitReport => "emit report",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a run, with the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub source: SnatchError,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub report_path: PathBuf,
}

/// Drives one recovery run against a site.
pub struct Pipeline<F: Fetch> {
    fetcher: F,
    output_dir: PathBuf,
    console: ConsoleOutput,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, output_dir: impl Into<PathBuf>, console: ConsoleOutput) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            console,
        }
    }

    pub fn console(&self) -> &ConsoleOutput {
        &self.console
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every stage in order. Nothing is written to disk before the map
    /// has been decoded.
    pub async fn run(&self, base_url: &Url) -> std::result::Result<RunOutcome, PipelineFailure> {
        self.console.print_start(base_url.as_str());

        self.enter(Stage::FetchHtml);
        let html = self.fetch_html(base_url).await.map_err(at(Stage::FetchHtml))?;

        self.enter(Stage::LocateScript);
        let script_url = locate_main_script(&html, base_url)
            .ok_or_else(|| {
                SnatchError::Discovery(format!(
                    "no script tag with \"main\" in its src on {}",
                    base_url
                ))
            })
            .map_err(at(Stage::LocateScript))?;
        self.console.print_progress(&format!("Main script: {}", script_url));

        self.enter(Stage::FetchScript);
        let script = self
            .fetch_text(&script_url, SnatchError::Discovery)
            .await
            .map_err(at(Stage::FetchScript))?;

        self.enter(Stage::ExtractMapRef);
        let reference = extract_sourcemap_url(&script, &script_url)
            .ok_or_else(|| {
                SnatchError::ReferenceNotFound(format!("no sourceMappingURL in {}", script_url))
            })
            .map_err(at(Stage::ExtractMapRef))?;

        let (map_url, raw_map) = match reference {
            MapReference::Remote(map_url) => {
                self.console.print_progress(&format!("Sourcemap: {}", map_url));

                self.enter(Stage::VerifyMapReachable);
                self.verify_reachable(&map_url)
                    .await
                    .map_err(at(Stage::VerifyMapReachable))?;

                self.enter(Stage::FetchMap);
                let response = self
                    .fetch_ok(&map_url, SnatchError::ReferenceNotFound)
                    .await
                    .map_err(at(Stage::FetchMap))?;
                (map_url.to_string(), response)
            }
            MapReference::Inline(content) => {
                self.console.print_progress("Sourcemap is inline, skipping download");
                (INLINE_MAP_URL.to_string(), content.into_bytes())
            }
        };

        self.enter(Stage::DecodeMap);
        let document = SourceMapDocument::decode(&raw_map).map_err(at(Stage::DecodeMap))?;
        drop(raw_map);
        self.console
            .print_progress(&format!("Decoded {} sources", document.len()));
        if self.console.is_debug() {
            for source in document.sources() {
                debug!("Declared source: {}", source);
            }
        }

        self.enter(Stage::Reconstruct);
        let mut report = RunReport::new(base_url.as_str(), &map_url);
        Reconstructor::new(&self.fetcher, base_url, &self.output_dir, &self.console)
            .run(document, &mut report)
            .await;

        self.enter(Stage::EmitReport);
        report.finalize();
        let report_path = write_report(&self.output_dir, &report).map_err(at(Stage::EmitReport))?;

        self.enter(Stage::Done);
        Ok(RunOutcome {
            report,
            report_path,
        })
    }

    fn enter(&self, stage: Stage) {
        debug!("Stage: {}", stage);
        self.console.print_progress(&format!("Stage: {}", stage));
    }

    async fn fetch_html(&self, base_url: &Url) -> Result<String> {
        self.fetch_text(base_url, SnatchError::Discovery).await
    }

    async fn fetch_text(&self, url: &Url, fail: fn(String) -> SnatchError) -> Result<String> {
        let body = self.fetch_ok(url, fail).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// GET `url`, mapping transport errors and non-2xx statuses through `fail`.
    async fn fetch_ok(&self, url: &Url, fail: fn(String) -> SnatchError) -> Result<Vec<u8>> {
        let response = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| fail(format!("could not fetch {}: {}", url, e)))?;

        if !response.is_success() {
            return Err(fail(format!("{} returned HTTP {}", url, response.status)));
        }

        Ok(response.body)
    }

    /// HEAD check before the full download. `405` means the server does not
    /// do HEAD, which says nothing about the map, so the run goes on.
    async fn verify_reachable(&self, map_url: &Url) -> Result<()> {
        let status = self.fetcher.head(map_url).await.map_err(|e| {
            SnatchError::ReferenceNotFound(format!("HEAD request to {} failed: {}", map_url, e))
        })?;

        match status {
            200..=299 => Ok(()),
            405 => {
                debug!("HEAD not allowed for {}, proceeding to GET", map_url);
                Ok(())
            }
            _ => Err(SnatchError::ReferenceNotFound(format!(
                "HEAD {} returned HTTP {}",
                map_url, status
            ))),
        }
    }
}

fn at(stage: Stage) -> impl FnOnce(SnatchError) -> PipelineFailure {
    move |source| PipelineFailure { stage, source }
}
