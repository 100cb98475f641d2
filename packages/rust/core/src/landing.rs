//! Landing page generator.
//!
//! Renders `Documents/index.html`: one collapsible block per source document
//! listing its entries, or a single link to the document when it has none.
//! The block list is substituted into an [upon] template loaded from disk.
//!
//! Template variables:
//!
//! | Variable   | Content                              |
//! |------------|--------------------------------------|
//! | `title`    | page heading (escaped)               |
//! | `subtitle` | line under the heading (escaped)     |
//! | `sections` | rendered `<details>` blocks (markup) |

use std::fmt::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use upon::{Engine, Template};

use docsetkit_scanner::{Markers, scan_file};
use docsetkit_shared::{DocsetError, DocumentSection, DocumentSpec, Result};

use crate::layout::PackageRoot;
use crate::markup::escape;

/// Link text used when a document has no entries.
const FALLBACK_LINK_TEXT: &str = "Open document";

/// Heading text placed above the section list.
#[derive(Debug, Clone)]
pub struct PageText {
    pub title: String,
    pub subtitle: String,
}

/// A compiled landing page template.
pub struct LandingTemplate {
    engine: Engine<'static>,
    template: Template<'static>,
}

impl LandingTemplate {
    /// Read and compile the template at `path`.
    ///
    /// There is no built-in fallback: an unreadable file is a resource error.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| DocsetError::resource(path, format!("cannot read landing template: {e}")))?;
        Self::from_source(source).map_err(|e| match e {
            DocsetError::Template(message) => {
                DocsetError::Template(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Compile a template from an in-memory string.
    pub fn from_source(source: String) -> Result<Self> {
        let engine = Engine::new();
        let template = engine
            .compile(source)
            .map_err(|e| DocsetError::Template(e.to_string()))?;
        Ok(Self { engine, template })
    }

    fn render(&self, text: &PageText, sections_html: &str) -> Result<String> {
        self.template
            .render(
                &self.engine,
                upon::value! {
                    title: escape(&text.title),
                    subtitle: escape(&text.subtitle),
                    sections: sections_html,
                },
            )
            .to_string()
            .map_err(|e| DocsetError::Template(e.to_string()))
    }
}

/// Build one section per configured document from scan results.
pub fn collect_sections(
    documents_dir: &Path,
    docs: &[DocumentSpec],
    markers: &Markers,
) -> Result<Vec<DocumentSection>> {
    docs.iter()
        .map(|doc| {
            Ok(DocumentSection {
                title: doc.title.clone(),
                filename: doc.file.clone(),
                entries: scan_file(&documents_dir.join(&doc.file), markers)?,
            })
        })
        .collect()
}

/// Render the `<details>` block list for `sections`, in order.
///
/// A block is open by default iff it has entries.
pub fn render_sections(sections: &[DocumentSection]) -> String {
    let mut out = String::new();

    for section in sections {
        let count = section.entries.len();
        let open = if count > 0 { " open" } else { "" };
        // Writing into a String cannot fail.
        let _ = writeln!(out, "<details{open}>");
        let _ = writeln!(
            out,
            "  <summary>{} ({count})</summary>",
            escape(&section.title)
        );
        out.push_str("  <ul>\n");

        if section.entries.is_empty() {
            let _ = writeln!(
                out,
                "    <li><a href=\"{}\">{FALLBACK_LINK_TEXT}</a></li>",
                escape(&section.filename)
            );
        } else {
            for entry in &section.entries {
                let _ = writeln!(
                    out,
                    "    <li><a href=\"{}\">{}</a></li>",
                    escape(&entry.path()),
                    escape(&entry.name)
                );
            }
        }

        out.push_str("  </ul>\n</details>\n");
    }

    out
}

/// Render the full landing page.
#[instrument(skip_all, fields(sections = sections.len()))]
pub fn render(
    sections: &[DocumentSection],
    template: &LandingTemplate,
    text: &PageText,
) -> Result<String> {
    let blocks = render_sections(sections);
    let html = template.render(text, &blocks)?;
    debug!(len = html.len(), "landing page rendered");
    Ok(html)
}

/// Write the landing page into the package's `Documents/` directory.
pub fn write_landing_page(package: &PackageRoot, html: &str) -> Result<PathBuf> {
    let path = package.landing_page_path();
    std::fs::write(&path, html).map_err(|e| DocsetError::io(&path, e))?;
    info!(path = %path.display(), "wrote landing page");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
