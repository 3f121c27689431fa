//! Locates the main bundle among a page's script tags.

use scraper::{Html, Selector};
use tracing::{debug, trace};
use url::Url;

/// Substring that marks the entry-point bundle in a script `src`.
const MAIN_MARKER: &str = "main";

/// Return the first `<script src>` (document order) whose raw value contains
/// `main`, resolved against `base_url`.
///
/// The match is case-sensitive and runs on the attribute as written, before
/// resolution. A value that cannot be resolved is passed over and scanning
/// continues with the next tag.
pub fn locate_main_script(html: &str, base_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script[src]").ok()?;

    for script in document.select(&selector) {
        let Some(src) = script.value().attr("src") else {
            continue;
        };

        if !src.contains(MAIN_MARKER) {
            trace!("Ignoring script: {}", src);
            continue;
        }

        match base_url.join(src.trim()) {
            Ok(url) => {
                debug!("Main script: {}", url);
                return Some(url);
            }
            Err(e) => debug!("Unresolvable script src {:?}: {}", src, e),
        }
    }

    None
}
