//! Colored console output for recovery runs.

use crate::pipeline::PipelineFailure;
use crate::types::RunReport;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Console output handler. Step lines only appear in debug mode.
pub struct ConsoleOutput {
    debug: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Print run start message.
    pub fn print_start(&self, target: &str) {
        println!("{} Recovering: {}", "[*]".bright_blue(), target.bright_white());
    }

    /// Print a pipeline step (only in debug mode).
    pub fn print_progress(&self, message: &str) {
        if !self.debug {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print the terminal failure of a run.
    pub fn print_failure(&self, failure: &PipelineFailure) {
        eprintln!("{} {}", "[!]".red().bold(), failure.to_string().red());
    }

    /// Print run summary.
    pub fn print_summary(&self, report: &RunReport, report_path: &Path) {
        println!();
        println!("{}", "=== Recovery Summary ===".bright_cyan());
        println!("  Site:      {}", report.base_url);
        println!("  Map:       {}", report.map_url);
        println!("  Sources:   {}", report.total_sources);
        println!("  Written:   {}", report.written_sources.to_string().green());
        println!("  Skipped:   {}", report.skipped_sources);

        if report.absent_content > 0 {
            println!(
                "  {}",
                format!("No embedded content: {}", report.absent_content).yellow()
            );
        }
        if report.asset_fallbacks > 0 {
            println!(
                "  {}",
                format!("Image stubs kept as placeholders: {}", report.asset_fallbacks).yellow()
            );
        }
        if report.overwritten > 0 {
            println!(
                "  {}",
                format!("Overwritten by later entries: {}", report.overwritten).yellow()
            );
        }
        if report.failed_writes > 0 {
            println!(
                "  {}",
                format!("Failed writes: {}", report.failed_writes).red().bold()
            );
        }

        if !report.possible_node_packages.is_empty() {
            println!();
            println!("{}", "Possible node packages:".bright_cyan());
            for name in &report.possible_node_packages {
                println!("  - {}", name);
            }
        }

        println!();
        println!("  Report:    {}", report_path.display().to_string().dimmed());
        println!();
    }

    /// Create a progress bar. Disabled in debug mode, where step logs take over.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.debug {
            return None;
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(message.to_string());
        Some(pb)
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false)
    }
}
