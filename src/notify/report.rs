//! Writes the run report into the output directory.

use crate::config::REPORT_FILE_NAME;
use crate::types::{Result, RunReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialize `report` to `<output_dir>/snatch-report.json`, creating the
/// directory if no source was written into it.
pub fn write_report(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let path = output_dir.join(REPORT_FILE_NAME);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;

    debug!("Report written to {}", path.display());
    Ok(path)
}
