//! Core domain types for docset builds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DocsetError;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One indexable unit found inside a rendered HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Trimmed display text of the tagged element.
    pub name: String,
    /// The element's `id`, unique within its document.
    pub anchor: String,
    /// File name of the document containing the element (e.g. `g-code.html`).
    pub document: String,
}

impl Entry {
    /// Locator a viewer resolves relative to the `Documents` directory.
    pub fn path(&self) -> String {
        format!("{}#{}", self.document, self.anchor)
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Entry type label stored in the `type` column of the search index.
///
/// Uses the viewer's own vocabulary, so the string form is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Command,
    Guide,
    Section,
    Function,
    Keyword,
}

impl Category {
    /// The label written to the index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "Command",
            Self::Guide => "Guide",
            Self::Section => "Section",
            Self::Function => "Function",
            Self::Keyword => "Keyword",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = DocsetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Command" => Ok(Self::Command),
            "Guide" => Ok(Self::Guide),
            "Section" => Ok(Self::Section),
            "Function" => Ok(Self::Function),
            "Keyword" => Ok(Self::Keyword),
            other => Err(DocsetError::parse(format!("unknown entry category: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexRecord
// ---------------------------------------------------------------------------

/// A persisted search-index row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub name: String,
    pub category: Category,
    pub path: String,
}

impl IndexRecord {
    /// Build a record from a scanned entry and the category of its document.
    pub fn from_entry(entry: &Entry, category: Category) -> Self {
        Self {
            name: entry.name.clone(),
            category,
            path: entry.path(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentSection
// ---------------------------------------------------------------------------

/// Entries of one source document, grouped for the landing page.
#[derive(Debug, Clone)]
pub struct DocumentSection {
    /// Display label (e.g. `G-code`).
    pub title: String,
    /// Document file name, used for the fallback link.
    pub filename: String,
    /// Entries in document order; may be empty.
    pub entries: Vec<Entry>,
}

// ---------------------------------------------------------------------------
// PackageDescriptor
// ---------------------------------------------------------------------------

/// Identity metadata for a docset, serialized verbatim as `meta.json`.
///
/// Field order matters: it is the key order of the written JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Package name; also the bundle identifier and directory stem.
    pub name: String,
    /// Revision counter, starting at 0.
    pub revision: u32,
    /// Display title.
    pub title: String,
    /// Content version label (e.g. `Linuxcnc`).
    pub version: String,
}

// ---------------------------------------------------------------------------
// FeedEntry
// ---------------------------------------------------------------------------

/// Pointer to one published build: a version label and archive location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub version: String,
    pub url: String,
}

impl FeedEntry {
    /// Label format: UTC build time, e.g. `2026.10.18.142233`.
    pub const VERSION_FORMAT: &'static str = "%Y.%m.%d.%H%M%S";

    /// Entry stamped with the current UTC time.
    pub fn now(url: impl Into<String>) -> Self {
        Self::at(url, Utc::now())
    }

    /// Entry stamped with `built_at`.
    pub fn at(url: impl Into<String>, built_at: DateTime<Utc>) -> Self {
        Self {
            version: built_at.format(Self::VERSION_FORMAT).to_string(),
            url: url.into(),
        }
    }
}
