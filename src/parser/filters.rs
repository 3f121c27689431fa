//! Path policy for recovered sources.
//!
//! Everything here is a pure function of the source path (or, for image
//! stubs, of the embedded text), so verdicts are stable across runs.

use crate::types::{ClassificationDecision, Reason, Verdict};
use regex::Regex;
use std::path::{Path, PathBuf};

const NODE_MODULES_MARKER: &str = "node_modules/";
const WEBPACK_MARKER: &str = "webpack/";

/// Extensions treated as images that may be build-time asset stubs.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp"];

/// `__webpack_public_path__ + "static/media/logo.abc123.png"` (webpack 4)
/// and `__webpack_require__.p + "..."` (webpack 5).
const PLACEHOLDER_PATTERN: &str =
    r#"(?:__webpack_public_path__|__webpack_require__\.p)\s*\+\s*["']([^"']+)["']"#;

/// Decide whether a source path is written or skipped.
pub fn classify(path: &str) -> ClassificationDecision {
    let lower = path.to_lowercase();

    let (verdict, reason) = if lower.contains(NODE_MODULES_MARKER) {
        (Verdict::Skip, Reason::NodeModules(package_segment(path)))
    } else if lower.contains(WEBPACK_MARKER) {
        (Verdict::Skip, Reason::WebpackRuntime)
    } else {
        (Verdict::Write, Reason::FirstParty)
    };

    ClassificationDecision {
        path: path.to_string(),
        verdict,
        reason,
    }
}

/// The path component right after the first `node_modules/`, if it is
/// followed by another `/`.
pub fn package_segment(path: &str) -> Option<String> {
    let re = Regex::new(r"(?i)node_modules/([^/]+)/").ok()?;
    re.captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether the path has an image extension (case-insensitive).
pub fn is_image_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Hashed asset name referenced by a build-time public-path placeholder.
pub fn find_asset_placeholder(content: &str) -> Option<String> {
    let re = Regex::new(PLACEHOLDER_PATTERN).ok()?;
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Destination of a source path under `root`.
///
/// Strips a leading `scheme://` (e.g. `webpack://`), drops empty and `.`
/// segments and applies `..` lexically without climbing above `root`.
/// Returns `None` when nothing is left to name a file.
pub fn destination_for(root: &Path, source: &str) -> Option<PathBuf> {
    let relative = strip_scheme(source);

    let mut parts: Vec<&str> = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(parts.iter().fold(root.to_path_buf(), |acc, p| acc.join(p)))
}

fn strip_scheme(source: &str) -> &str {
    match source.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            rest
        }
        _ => source,
    }
}
