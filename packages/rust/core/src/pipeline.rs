//! End-to-end `build` pipeline: sources → render → landing page → index → archive.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};
use uuid::Uuid;

use docsetkit_scanner::Markers;
use docsetkit_shared::{BuildConfig, FeedEntry, Result};
use docsetkit_storage::SearchIndex;

use crate::feed::{self, ArchiveInfo};
use crate::indexer::{self, DocumentCount};
use crate::install;
use crate::landing::{self, LandingTemplate, PageText};
use crate::layout::{self, PackageRoot};
use crate::render::Renderer;

/// Result of the `build` pipeline.
#[derive(Debug)]
pub struct BuildResult {
    /// The assembled package.
    pub package: PackageRoot,
    /// Entries indexed per document, in table order.
    pub documents: Vec<DocumentCount>,
    /// Rows in the search index.
    pub total_records: u64,
    /// Written archive.
    pub archive: ArchiveInfo,
    /// Path of the update feed.
    pub feed_path: PathBuf,
    /// Entry written to the feed.
    pub feed_entry: FeedEntry,
    /// Location of the installed copy, if an install was requested.
    pub installed_at: Option<PathBuf>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document's entries are committed.
    fn document_indexed(&self, file: &str, entries: usize, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_indexed(&self, _file: &str, _entries: usize, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full `build` pipeline.
///
/// 1. Reset the package layout
/// 2. Write `Info.plist` and `meta.json`
/// 3. Create the search index
/// 4. Render sources into `Documents/`
/// 5. Generate the landing page
/// 6. Index each document
/// 7. Archive the package and write the feed
/// 8. Install locally (optional)
///
/// Steps run strictly in order; the first error aborts the build and is
/// returned as-is. A partially built package is left on disk and discarded by
/// the next run.
#[instrument(skip_all, fields(name = %config.descriptor.name))]
pub async fn build_docset(
    config: &BuildConfig,
    renderer: &dyn Renderer,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let build_id = Uuid::now_v7();
    config.validate()?;

    info!(%build_id, output_root = %config.output_root.display(), "starting build pipeline");
    let markers = Markers::new(config.markers.iter().cloned());

    // --- Phase 1: Layout ---
    progress.phase("Preparing package layout");
    let package = layout::prepare_package(&config.output_root, &config.descriptor.name)?;
    layout::write_descriptor(&package, &config.descriptor)?;
    layout::write_package_meta(&package, &config.descriptor)?;

    // --- Phase 2: Index ---
    progress.phase("Creating search index");
    let index = SearchIndex::create(&package.index_path()).await?;

    // --- Phase 3: Render ---
    progress.phase("Rendering documents");
    renderer.render(&config.source_dir, &package.documents())?;

    // --- Phase 4: Landing page ---
    progress.phase("Generating landing page");
    let template = LandingTemplate::load(&config.template_path)?;
    let sections = landing::collect_sections(&package.documents(), &config.documents, &markers)?;
    let html = landing::render(
        &sections,
        &template,
        &PageText {
            title: config.page_title.clone(),
            subtitle: config.page_subtitle.clone(),
        },
    )?;
    landing::write_landing_page(&package, &html)?;

    // --- Phase 5: Index documents ---
    progress.phase("Indexing entries");
    let documents = indexer::index_documents(
        &index,
        &package.documents(),
        &config.documents,
        &markers,
        |count, current, total| {
            progress.document_indexed(&count.file, count.entries, current, total)
        },
    )
    .await?;
    let total_records = index.count().await?;
    index.close();

    // --- Phase 6: Publish ---
    progress.phase("Archiving package");
    let published = feed::publish(&package, &config.output_root, config.feed_base_url.as_ref())?;

    // --- Phase 7: Install ---
    let installed_at = match &config.install_dir {
        Some(dest) => {
            progress.phase("Installing package");
            Some(install::install(&package, dest)?)
        }
        None => None,
    };

    let result = BuildResult {
        package,
        documents,
        total_records,
        archive: published.archive,
        feed_path: published.feed_path,
        feed_entry: published.entry,
        installed_at,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        %build_id,
        records = result.total_records,
        version = %result.feed_entry.version,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use docsetkit_shared::{AppConfig, Category, DocsetError, DocumentSpec, IndexRecord};

    const TEMPLATE_PATH: &str = "../../../templates/landing.html";

    /// Writes fixed HTML documents instead of running a converter.
    struct FakeRenderer {
        documents: Vec<(&'static str, &'static str)>,
    }

    impl FakeRenderer {
        fn rapid_move() -> Self {
            Self {
                documents: vec![(
                    "g-code.html",
                    r#"<html><body><h2 id="gcode:G0">Rapid move</h2><p>G0 X1</p></body></html>"#,
                )],
            }
        }
    }

    impl Renderer for FakeRenderer {
        fn render(&self, _source_dir: &Path, output_dir: &Path) -> Result<()> {
            for (name, html) in &self.documents {
                std::fs::write(output_dir.join(name), html).unwrap();
            }
            Ok(())
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, _source_dir: &Path, _output_dir: &Path) -> Result<()> {
            Err(DocsetError::Render("asciidoctor exited with 1".into()))
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        indexed: Mutex<Vec<(String, usize, usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn document_indexed(&self, file: &str, entries: usize, current: usize, total: usize) {
            self.indexed
                .lock()
                .unwrap()
                .push((file.to_string(), entries, current, total));
        }
        fn done(&self, _result: &BuildResult) {}
    }

    /// Every path under `root` with file contents (empty for directories), sorted.
    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
                let bytes = if entry.file_type().is_file() {
                    std::fs::read(entry.path()).unwrap()
                } else {
                    Vec::new()
                };
                (relative, bytes)
            })
            .collect()
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dk-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config(tmp: &Path) -> BuildConfig {
        let mut config = BuildConfig::from_app_config(&AppConfig::default()).unwrap();
        config.source_dir = tmp.join("src");
        config.output_root = tmp.join("out");
        config.template_path = PathBuf::from(TEMPLATE_PATH);
        std::fs::create_dir_all(&config.source_dir).unwrap();
        std::fs::create_dir_all(&config.output_root).unwrap();
        config
    }

    #[tokio::test]
    async fn builds_a_complete_package() {
        let tmp = temp_dir();
        let config = test_config(&tmp);

        let result = build_docset(&config, &FakeRenderer::rapid_move(), &SilentProgress)
            .await
            .expect("build");

        let package = &result.package;
        assert_eq!(package.root(), tmp.join("out/Linuxcnc_GCode.docset"));
        assert!(package.info_plist_path().is_file());
        assert!(package.meta_path().is_file());
        assert!(result.archive.path.is_file());
        assert_eq!(result.feed_path, tmp.join("out/feed.xml"));
        assert!(result.installed_at.is_none());

        assert_eq!(result.total_records, 1);
        let counts: Vec<(&str, usize)> = result
            .documents
            .iter()
            .map(|d| (d.file.as_str(), d.entries))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("overview.html", 0),
                ("g-code.html", 1),
                ("m-code.html", 0),
                ("o-code.html", 0),
                ("other-code.html", 0),
            ]
        );

        let index = SearchIndex::create(&package.index_path()).await.unwrap();
        assert_eq!(
            index.records().await.unwrap(),
            vec![IndexRecord {
                name: "Rapid move".into(),
                category: Category::Command,
                path: "g-code.html#gcode:G0".into(),
            }]
        );
        index.close();

        let landing = std::fs::read_to_string(package.landing_page_path()).unwrap();
        assert!(landing.contains("G-code (1)"));
        assert!(landing.contains(r#"<a href="g-code.html#gcode:G0">Rapid move</a>"#));
        assert!(landing.contains(r#"<a href="overview.html">Open document</a>"#));
        let overview = landing.find("Overview (0)").unwrap();
        let g_code = landing.find("G-code (1)").unwrap();
        let other = landing.find("Other codes (0)").unwrap();
        assert!(overview < g_code && g_code < other);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn rebuilding_is_deterministic() {
        let tmp = temp_dir();
        let config = test_config(&tmp);
        let renderer = FakeRenderer::rapid_move();

        let first = build_docset(&config, &renderer, &SilentProgress).await.unwrap();
        let before = snapshot(first.package.root());
        assert!(
            before
                .iter()
                .any(|(path, _)| path.ends_with("Contents/Resources/docSet.dsidx"))
        );

        let stale = first.package.documents().join("stale.html");
        std::fs::write(&stale, "left over").unwrap();

        let second = build_docset(&config, &renderer, &SilentProgress).await.unwrap();
        assert_eq!(snapshot(second.package.root()), before);
        assert_eq!(second.archive.sha256, first.archive.sha256);
        assert_eq!(second.total_records, 1);
        assert!(!stale.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn reports_phases_in_order() {
        let tmp = temp_dir();
        let config = test_config(&tmp);
        let progress = RecordingProgress::default();

        build_docset(&config, &FakeRenderer::rapid_move(), &progress)
            .await
            .unwrap();

        let phases = progress.phases.lock().unwrap().clone();
        assert_eq!(
            phases,
            vec![
                "Preparing package layout",
                "Creating search index",
                "Rendering documents",
                "Generating landing page",
                "Indexing entries",
                "Archiving package",
            ]
        );

        let indexed = progress.indexed.lock().unwrap().clone();
        assert_eq!(indexed.len(), 5);
        assert_eq!(indexed[1], ("g-code.html".to_string(), 1, 2, 5));
        assert_eq!(indexed[4].2, 5);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn installs_when_requested() {
        let tmp = temp_dir();
        let mut config = test_config(&tmp);
        let dest = tmp.join("docsets");
        std::fs::create_dir_all(&dest).unwrap();
        config.install_dir = Some(dest.clone());

        let result = build_docset(&config, &FakeRenderer::rapid_move(), &SilentProgress)
            .await
            .unwrap();
        let installed = result.installed_at.expect("installed");
        assert_eq!(installed, dest.join("Linuxcnc_GCode.docset"));
        assert!(installed.join("Contents/Resources/docSet.dsidx").is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn renderer_failure_aborts_the_build() {
        let tmp = temp_dir();
        let config = test_config(&tmp);

        let err = build_docset(&config, &FailingRenderer, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsetError::Render(_)));
        assert!(!tmp.join("out/Linuxcnc_GCode.tgz").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_template_is_fatal() {
        let tmp = temp_dir();
        let mut config = test_config(&tmp);
        config.template_path = tmp.join("missing.html");

        let err = build_docset(&config, &FakeRenderer::rapid_move(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsetError::Resource { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn duplicate_entry_is_an_integrity_error() {
        let tmp = temp_dir();
        let config = test_config(&tmp);
        let renderer = FakeRenderer {
            documents: vec![(
                "m-code.html",
                r#"<h2 id="mcode:m3">M3</h2><div id="mcode:m3">M3</div>"#,
            )],
        };

        let err = build_docset(&config, &renderer, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_integrity(), "unexpected error: {err}");
        assert!(!tmp.join("out/feed.xml").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_touching_disk() {
        let tmp = temp_dir();
        let mut config = test_config(&tmp);
        config.documents = vec![
            DocumentSpec::new("g-code.html", "G-code", Category::Command),
            DocumentSpec::new("g-code.html", "G-code again", Category::Command),
        ];

        let err = build_docset(&config, &FakeRenderer::rapid_move(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsetError::Config { .. }));
        assert!(!tmp.join("out/Linuxcnc_GCode.docset").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
