//! Docset directory layout and descriptor files.
//!
//! Creates the bundle structure a Dash-compatible viewer expects:
//! ```text
//! <output_root>/<name>.docset/
//! ├── meta.json
//! └── Contents/
//!     ├── Info.plist
//!     └── Resources/
//!         ├── docSet.dsidx
//!         └── Documents/
//!             ├── index.html
//!             └── *.html
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use docsetkit_shared::{DocsetError, PackageDescriptor, Result};

use crate::markup::escape;

/// File name of the generated landing page inside `Documents/`.
pub const LANDING_PAGE: &str = "index.html";

/// File name of the search index inside `Resources/`.
pub const INDEX_FILE: &str = "docSet.dsidx";

/// Paths of one docset bundle. Constructing it touches no files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    name: String,
    root: PathBuf,
}

impl PackageRoot {
    /// Locate `<output_root>/<name>.docset`.
    pub fn new(output_root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: output_root.join(format!("{name}.docset")),
        }
    }

    /// Package name (the `.docset` directory stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contents(&self) -> PathBuf {
        self.root.join("Contents")
    }

    pub fn resources(&self) -> PathBuf {
        self.contents().join("Resources")
    }

    /// Directory the renderer writes HTML into.
    pub fn documents(&self) -> PathBuf {
        self.resources().join("Documents")
    }

    pub fn index_path(&self) -> PathBuf {
        self.resources().join(INDEX_FILE)
    }

    pub fn info_plist_path(&self) -> PathBuf {
        self.contents().join("Info.plist")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn landing_page_path(&self) -> PathBuf {
        self.documents().join(LANDING_PAGE)
    }
}

/// Remove `path` if it exists, then create it (and its parents) empty.
///
/// Running it twice leaves the same clean state. Fails with an I/O error
/// naming the path when removal or creation is impossible.
pub fn reset_directory(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| DocsetError::io(path, e))?;
        debug!(path = %path.display(), "removed existing directory");
    }
    std::fs::create_dir_all(path).map_err(|e| DocsetError::io(path, e))?;
    Ok(())
}

/// Map a directory walk failure to an I/O error naming the offending path.
pub(crate) fn walk_error(err: walkdir::Error) -> DocsetError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    DocsetError::io(path, std::io::Error::from(err))
}

/// Discard any previous package called `name` and create a fresh layout.
#[instrument(skip(output_root), fields(output_root = %output_root.display()))]
pub fn prepare_package(output_root: &Path, name: &str) -> Result<PackageRoot> {
    let package = PackageRoot::new(output_root, name);

    reset_directory(package.root())?;
    let documents = package.documents();
    std::fs::create_dir_all(&documents).map_err(|e| DocsetError::io(&documents, e))?;

    info!(path = %package.root().display(), "package layout prepared");
    Ok(package)
}

/// Write `Contents/Info.plist`.
///
/// Overwrites an existing file; fails if `Contents/` is missing.
pub fn write_descriptor(package: &PackageRoot, descriptor: &PackageDescriptor) -> Result<()> {
    let path = package.info_plist_path();
    std::fs::write(&path, info_plist(descriptor)).map_err(|e| DocsetError::io(&path, e))?;
    debug!(path = %path.display(), "wrote Info.plist");
    Ok(())
}

/// Write the compact `meta.json` at the package root.
///
/// Overwrites an existing file; fails if the package root is missing.
pub fn write_package_meta(package: &PackageRoot, descriptor: &PackageDescriptor) -> Result<()> {
    let path = package.meta_path();
    let json = serde_json::to_string(descriptor)
        .map_err(|e| DocsetError::validation(format!("meta.json serialization failed: {e}")))?;
    std::fs::write(&path, json).map_err(|e| DocsetError::io(&path, e))?;
    debug!(path = %path.display(), "wrote meta.json");
    Ok(())
}

/// Render the property list for a descriptor.
fn info_plist(descriptor: &PackageDescriptor) -> String {
    let name = escape(&descriptor.name);
    let title = escape(&descriptor.title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>{name}</string>
    <key>CFBundleName</key>
    <string>{title}</string>
    <key>DocSetPlatformFamily</key>
    <string>{name}</string>
    <key>isDashDocset</key>
    <true/>
    <key>isJavaScriptEnabled</key>
    <false/>
    <key>dashIndexFilePath</key>
    <string>{LANDING_PAGE}</string>
</dict>
</plist>
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
