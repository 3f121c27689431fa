//! Main-script and sourcemap discovery.
//!
//! This module handles:
//! - HTTP fetching with explicit status handling
//! - Locating the main bundle in a page's script tags
//! - Extracting the sourcemap reference from a script body

pub mod fetcher;
pub mod script_locator;
pub mod sourcemap_ref;

pub use fetcher::{Fetch, FetchResponse, HttpFetcher};
pub use script_locator::locate_main_script;
pub use sourcemap_ref::{decode_inline_sourcemap, extract_sourcemap_url, MapReference};
