//! Extracts the `sourceMappingURL` directive from a script body.

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

/// Where a script's sourcemap lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapReference {
    /// A map to be fetched over HTTP(S).
    Remote(Url),
    /// A map embedded in the script as a `data:` URL, already decoded.
    Inline(String),
}

/// `//#` is current, `//@` the deprecated spelling. Captures the rest of the line.
const DIRECTIVE_PATTERN: &str = r"(?m)//[#@][ \t]*sourceMappingURL[ \t]*=(.*)$";

/// Find the first sourcemap directive in `content` and resolve it against
/// the script's own URL.
///
/// Returns `None` when there is no directive, the value is empty after
/// trimming, or the value cannot be resolved.
pub fn extract_sourcemap_url(content: &str, script_url: &Url) -> Option<MapReference> {
    let re = Regex::new(DIRECTIVE_PATTERN).ok()?;
    let caps = re.captures(content)?;
    let value = caps.get(1)?.as_str().trim();

    if value.is_empty() {
        debug!("Empty sourceMappingURL in {}", script_url);
        return None;
    }

    if value.starts_with("data:") {
        return decode_inline_sourcemap(value).map(MapReference::Inline);
    }

    match script_url.join(value) {
        Ok(url) => Some(MapReference::Remote(url)),
        Err(e) => {
            debug!("Unresolvable sourceMappingURL {:?}: {}", value, e);
            None
        }
    }
}

/// Decode the payload of a `data:` sourcemap URL.
///
/// Accepts `;base64,` payloads and plain percent-encoded JSON. A payload
/// that cannot be decoded is logged and treated as no reference.
pub fn decode_inline_sourcemap(data_url: &str) -> Option<String> {
    let rest = data_url.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        warn!("Inline sourcemap has no ',' before its payload");
        return None;
    };

    let is_base64 = header
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));

    if !is_base64 {
        return match urlencoding::decode(payload) {
            Ok(json) => Some(json.into_owned()),
            Err(e) => {
                warn!("Inline sourcemap is not valid percent-encoded UTF-8: {}", e);
                None
            }
        };
    }

    use base64::{engine::general_purpose::STANDARD, Engine};
    let bytes = match STANDARD.decode(payload.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Inline sourcemap is not valid base64: {}", e);
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Inline sourcemap is not UTF-8: {}", e);
            None
        }
    }
}
