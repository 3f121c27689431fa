//! Classification and reconstruction of decoded sources onto disk.

use crate::discovery::Fetch;
use crate::notify::ConsoleOutput;
use crate::parser::filters;
use crate::parser::{SourceEntry, SourceMapDocument};
use crate::types::{Reason, RunReport, Verdict};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use url::Url;

/// Writes first-party sources from a decoded map under an output root.
///
/// Entries are handled one at a time in declaration order, so counters and
/// the package list come out the same on every run against the same map.
pub struct Reconstructor<'a, F: Fetch> {
    fetcher: &'a F,
    base_url: &'a Url,
    output_dir: &'a Path,
    console: &'a ConsoleOutput,
}

impl<'a, F: Fetch> Reconstructor<'a, F> {
    pub fn new(
        fetcher: &'a F,
        base_url: &'a Url,
        output_dir: &'a Path,
        console: &'a ConsoleOutput,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            output_dir,
            console,
        }
    }

    /// Visit every entry of `document`, updating `report`. The document is
    /// consumed and dropped once the last entry has been handled.
    pub async fn run(&self, document: SourceMapDocument, report: &mut RunReport) {
        let entries = document.into_entries();
        report.total_sources = entries.len();

        let pb = self
            .console
            .create_progress_bar(entries.len() as u64, "Reconstructing");

        // Destinations written so far; a repeat is overwritten (last write wins).
        let mut written: HashSet<PathBuf> = HashSet::new();

        for entry in entries {
            self.process(entry, report, &mut written).await;
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    }

    async fn process(
        &self,
        entry: SourceEntry,
        report: &mut RunReport,
        written: &mut HashSet<PathBuf>,
    ) {
        let SourceEntry { path, content } = entry;

        let Some(content) = content else {
            warn!("No embedded content for {}, skipping", path);
            report.absent_content += 1;
            return;
        };

        let decision = filters::classify(&path);
        if decision.verdict == Verdict::Skip {
            trace!("Skipping {} ({:?})", path, decision.reason);
            report.skipped_sources += 1;
            if let Reason::NodeModules(Some(ref package)) = decision.reason {
                report.add_package(package);
            }
            return;
        }

        let Some(dest) = filters::destination_for(self.output_dir, &path) else {
            warn!("Source path {:?} names no file, not written", path);
            report.failed_writes += 1;
            return;
        };

        let bytes = if filters::is_image_path(&path) {
            self.image_bytes(&path, content, report).await
        } else {
            content.into_bytes()
        };

        match write_file(&dest, &bytes) {
            Ok(()) => {
                self.console.print_progress(&format!("Wrote {}", dest.display()));
                report.written_sources += 1;
                if !written.insert(dest.clone()) {
                    debug!("{} overwrote an earlier entry at {}", path, dest.display());
                    report.overwritten += 1;
                }
            }
            Err(e) => {
                warn!("Failed to write {}: {}", dest.display(), e);
                report.failed_writes += 1;
            }
        }
    }

    /// Bytes to write for an image-extension source: the fetched asset when
    /// the content is a placeholder stub, the text itself otherwise.
    async fn image_bytes(&self, path: &str, content: String, report: &mut RunReport) -> Vec<u8> {
        let Some(asset) = filters::find_asset_placeholder(&content) else {
            return content.into_bytes();
        };

        match self.fetch_asset(&asset).await {
            Some(bytes) => {
                debug!("Replaced stub {} with {} ({} bytes)", path, asset, bytes.len());
                bytes
            }
            None => {
                warn!("Keeping placeholder text for {}", path);
                report.asset_fallbacks += 1;
                content.into_bytes()
            }
        }
    }

    async fn fetch_asset(&self, asset: &str) -> Option<Vec<u8>> {
        let url = match self.base_url.join(asset) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot resolve asset {:?}: {}", asset, e);
                return None;
            }
        };

        match self.fetcher.get(&url).await {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                warn!("Asset {} returned HTTP {}", url, response.status);
                None
            }
            Err(e) => {
                warn!("Asset {} could not be fetched: {}", url, e);
                None
            }
        }
    }
}

/// Write `bytes` to `dest`, creating parent directories.
fn write_file(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::fetcher::stub::StubFetcher;
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn decode(json: &serde_json::Value) -> SourceMapDocument {
        SourceMapDocument::decode(json.to_string().as_bytes()).unwrap()
    }

    async fn reconstruct(
        fetcher: &StubFetcher,
        doc: SourceMapDocument,
        out: &Path,
    ) -> RunReport {
        let base = Url::parse("https://example.com/").unwrap();
        let console = ConsoleOutput::new(true);
        let mut report = RunReport::new(base.as_str(), "https://example.com/main.js.map");
        Reconstructor::new(fetcher, &base, out, &console)
            .run(doc, &mut report)
            .await;
        report
    }

    #[tokio::test]
    async fn test_first_party_written_dependencies_skipped() {
        let tmp = TempDir::new().unwrap();
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": [
                "src/App.js",
                "node_modules/react/index.js",
                "node_modules/react-dom/index.js",
                "node_modules/react/cjs/react.js",
                "webpack/bootstrap"
            ],
            "sourcesContent": ["app", "r", "rd", "r2", "boot"],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.total_sources, 5);
        assert_eq!(report.written_sources, 1);
        assert_eq!(report.skipped_sources, 4);
        assert_eq!(report.possible_node_packages, vec!["react", "react-dom"]);
        assert_eq!(fs::read_to_string(tmp.path().join("src/App.js")).unwrap(), "app");
        assert!(!tmp.path().join("node_modules").exists());
        assert!(!tmp.path().join("webpack").exists());
        assert!(report.is_balanced());
    }

    #[tokio::test]
    async fn test_absent_content_counted_only_in_total() {
        let tmp = TempDir::new().unwrap();
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/a.js", "src/b.js", "node_modules/x/y.js"],
            "sourcesContent": ["a", null, null],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.total_sources, 3);
        assert_eq!(report.written_sources, 1);
        assert_eq!(report.skipped_sources, 0);
        assert_eq!(report.absent_content, 2);
        assert!(report.possible_node_packages.is_empty());
        assert!(!tmp.path().join("src/b.js").exists());
        assert!(report.is_balanced());
    }

    #[tokio::test]
    async fn test_image_stub_replaced_by_asset() {
        let tmp = TempDir::new().unwrap();
        let stub = r#"module.exports = __webpack_public_path__ + "static/media/logo.abc123.png";"#;
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/assets/logo.png"],
            "sourcesContent": [stub],
            "mappings": ""
        }));
        let fetcher = StubFetcher::new().with(
            "https://example.com/static/media/logo.abc123.png",
            200,
            PNG_BYTES,
        );

        let report = reconstruct(&fetcher, doc, tmp.path()).await;

        assert_eq!(report.written_sources, 1);
        assert_eq!(report.asset_fallbacks, 0);
        assert_eq!(fs::read(tmp.path().join("src/assets/logo.png")).unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_image_stub_falls_back_to_placeholder() {
        let tmp = TempDir::new().unwrap();
        let stub = r#"module.exports = __webpack_public_path__ + "static/media/logo.abc123.png";"#;
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/assets/logo.png"],
            "sourcesContent": [stub],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.written_sources, 1);
        assert_eq!(report.asset_fallbacks, 1);
        assert_eq!(
            fs::read_to_string(tmp.path().join("src/assets/logo.png")).unwrap(),
            stub
        );
    }

    #[tokio::test]
    async fn test_inline_svg_written_verbatim() {
        let tmp = TempDir::new().unwrap();
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="4"/></svg>"#;
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/icons/dot.SVG"],
            "sourcesContent": [svg],
            "mappings": ""
        }));
        let fetcher = StubFetcher::new();

        let report = reconstruct(&fetcher, doc, tmp.path()).await;

        assert_eq!(report.written_sources, 1);
        assert!(fetcher.requests.borrow().is_empty());
        assert_eq!(fs::read_to_string(tmp.path().join("src/icons/dot.SVG")).unwrap(), svg);
    }

    #[tokio::test]
    async fn test_duplicate_destination_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["webpack:///src/a.js", "src/a.js"],
            "sourcesContent": ["first", "second"],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.written_sources, 2);
        assert_eq!(report.overwritten, 1);
        assert_eq!(fs::read_to_string(tmp.path().join("src/a.js")).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_failed_write_is_not_an_earlier_entry() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("src"), "blocker").unwrap();
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/a.js", "webpack:///src/a.js"],
            "sourcesContent": ["first", "second"],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.failed_writes, 2);
        assert_eq!(report.written_sources, 0);
        assert_eq!(report.overwritten, 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_recoverable() {
        let tmp = TempDir::new().unwrap();
        // A regular file where a directory is needed.
        fs::write(tmp.path().join("src"), "blocker").unwrap();
        let doc = decode(&serde_json::json!({
            "version": 3,
            "sources": ["src/a.js", "lib/b.js"],
            "sourcesContent": ["a", "b"],
            "mappings": ""
        }));

        let report = reconstruct(&StubFetcher::new(), doc, tmp.path()).await;

        assert_eq!(report.failed_writes, 1);
        assert_eq!(report.written_sources, 1);
        assert_eq!(fs::read_to_string(tmp.path().join("lib/b.js")).unwrap(), "b");
        assert!(report.is_balanced());
    }

    #[tokio::test]
    async fn test_repeat_runs_match() {
        let json = serde_json::json!({
            "version": 3,
            "sources": ["src/x.js", "node_modules/a/i.js", "node_modules/b/i.js", "node_modules/a/j.js"],
            "sourcesContent": ["x", "a", "b", "a2"],
            "mappings": ""
        });

        let first_dir = TempDir::new().unwrap();
        let second_dir = TempDir::new().unwrap();
        let first = reconstruct(&StubFetcher::new(), decode(&json), first_dir.path()).await;
        let second = reconstruct(&StubFetcher::new(), decode(&json), second_dir.path()).await;

        assert_eq!(first.total_sources, second.total_sources);
        assert_eq!(first.written_sources, second.written_sources);
        assert_eq!(first.skipped_sources, second.skipped_sources);
        assert_eq!(first.possible_node_packages, second.possible_node_packages);
        assert_eq!(first.possible_node_packages, vec!["a", "b"]);
    }
}
