//! HTML entry scanner.
//!
//! Finds addressable reference entries in rendered HTML documents. An entry is
//! an `<h2>` or `<div>` element whose `id` contains one of the configured
//! namespace markers (`gcode:`, `mcode:`, `ocode:` by default). The match is a
//! substring test anywhere in the identifier, not a prefix test.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use docsetkit_shared::{DocsetError, Entry, Result};

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Identifier substrings that classify an element as a reference entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers(Vec<String>);

impl Markers {
    /// Build a marker set, dropping empty strings (they would match everything).
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        )
    }

    /// Whether `id` contains any marker.
    pub fn matches(&self, id: &str) -> bool {
        self.0.iter().any(|marker| id.contains(marker.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new(["gcode:", "mcode:", "ocode:"])
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Elements that may carry an entry: level-2 headings and generic blocks with an id.
static ENTRY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2[id], div[id]").expect("entry selector"));

/// Scan an HTML string, returning entries in document order.
///
/// `document` is the file name recorded on each entry (the part before `#`
/// in the entry path).
pub fn scan_html(html: &str, document: &str, markers: &Markers) -> Vec<Entry> {
    let doc = Html::parse_document(html);

    doc.select(&ENTRY_SELECTOR)
        .filter_map(|el| {
            let id = el.value().id()?;
            if !markers.matches(id) {
                return None;
            }
            Some(Entry {
                name: el.text().collect::<String>().trim().to_string(),
                anchor: id.to_string(),
                document: document.to_string(),
            })
        })
        .collect()
}

/// Scan an HTML file from disk.
///
/// The file is re-read on every call. A missing file yields no entries and a
/// warning, so callers treat "absent" and "no entries" the same way; any other
/// read failure is an error.
#[instrument(skip(path, markers), fields(path = %path.display()))]
pub fn scan_file(path: &Path, markers: &Markers) -> Result<Vec<Entry>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("document not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(DocsetError::io(path, e)),
    };

    let html = String::from_utf8_lossy(&bytes);
    let entries = scan_html(&html, &document_name(path), markers);

    debug!(entries = entries.len(), "document scanned");
    Ok(entries)
}

/// File name component of `path`, used as the entry document.
fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A restartable scan over one document.
///
/// Each call to [`Scan::entries`] reads the document again; nothing is cached.
#[derive(Debug, Clone)]
pub struct Scan {
    path: PathBuf,
    markers: Markers,
}

impl Scan {
    pub fn new(path: impl Into<PathBuf>, markers: Markers) -> Self {
        Self {
            path: path.into(),
            markers,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document and iterate its entries.
    pub fn entries(&self) -> Result<std::vec::IntoIter<Entry>> {
        Ok(scan_file(&self.path, &self.markers)?.into_iter())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
