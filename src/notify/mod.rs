//! Output module.
//!
//! This module handles:
//! - Colored console output
//! - The JSON run report

pub mod console;
pub mod report;

pub use console::ConsoleOutput;
pub use report::write_report;
