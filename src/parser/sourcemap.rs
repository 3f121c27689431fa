//! Source map decoding into an ordered list of sources and embedded content.

use crate::types::{Result, SnatchError};
use sourcemap::{DecodedMap, SourceMap};
use tracing::debug;

/// One declared source with its embedded original text, if the map has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    pub content: Option<String>,
}

/// A decoded source map.
///
/// Sources keep the map's declaration order, duplicates included. The
/// underlying `sourcemap::SourceMap` is dropped as soon as the entries are
/// copied out, and the document itself is consumed by [`into_entries`].
///
/// [`into_entries`]: SourceMapDocument::into_entries
#[derive(Debug, Clone)]
pub struct SourceMapDocument {
    entries: Vec<SourceEntry>,
}

impl SourceMapDocument {
    /// Decode raw source map bytes.
    ///
    /// Fails when the bytes are not JSON, not a version 3 map, or the
    /// `sourcemap` crate rejects them. Indexed maps are flattened first.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        check_structure(raw)?;

        let decoded =
            sourcemap::decode_slice(raw).map_err(|e| SnatchError::Decode(e.to_string()))?;

        let entries = match decoded {
            DecodedMap::Regular(map) => collect_entries(&map),
            DecodedMap::Index(index) => {
                let flat = index
                    .flatten()
                    .map_err(|e| SnatchError::Decode(format!("cannot flatten indexed map: {}", e)))?;
                collect_entries(&flat)
            }
            DecodedMap::Hermes(hermes) => collect_entries(&hermes),
        };

        debug!("Decoded source map with {} sources", entries.len());
        Ok(Self { entries })
    }

    /// Declared source paths in order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Embedded content of the first entry declared under `path`.
    ///
    /// Lookup by path for callers holding a borrowed document. Duplicate
    /// paths only expose their first content here; the reconstruction pass
    /// uses [`into_entries`](Self::into_entries) to see every entry.
    pub fn content_for(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .and_then(|e| e.content.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the document, yielding entries in declaration order.
    pub fn into_entries(self) -> Vec<SourceEntry> {
        self.entries
    }
}

fn collect_entries(map: &SourceMap) -> Vec<SourceEntry> {
    map.sources()
        .enumerate()
        .map(|(i, source)| SourceEntry {
            path: source.to_string(),
            content: map.get_source_contents(i as u32).map(|c| c.to_string()),
        })
        .collect()
}

/// Reject documents that parse as JSON but are not source maps at all.
fn check_structure(raw: &[u8]) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| SnatchError::Decode(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| SnatchError::Decode("source map is not a JSON object".to_string()))?;

    if obj.get("version").and_then(|v| v.as_u64()) != Some(3) {
        return Err(SnatchError::Decode("missing or unsupported \"version\"".to_string()));
    }

    let has_sources = obj.get("sources").map_or(false, |v| v.is_array());
    let has_sections = obj.get("sections").map_or(false, |v| v.is_array());
    if !has_sources && !has_sections {
        return Err(SnatchError::Decode("no \"sources\" array".to_string()));
    }

    Ok(())
}
