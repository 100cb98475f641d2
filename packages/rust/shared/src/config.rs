//! Application configuration for docsetkit.
//!
//! User config lives at `~/.docsetkit/docsetkit.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocsetError, Result};
use crate::types::{Category, PackageDescriptor};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsetkit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsetkit";

// ---------------------------------------------------------------------------
// Config structs (matching docsetkit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Package identity.
    #[serde(default)]
    pub package: PackageConfig,

    /// Input/output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External document renderer.
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Update feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Landing page text.
    #[serde(default)]
    pub landing: LandingConfig,

    /// Entry scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Rendered documents to index, in landing-page order.
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            package: PackageConfig::default(),
            paths: PathsConfig::default(),
            renderer: RendererConfig::default(),
            feed: FeedConfig::default(),
            landing: LandingConfig::default(),
            scanner: ScannerConfig::default(),
            documents: default_documents(),
        }
    }
}

/// `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Package name (`<name>.docset`, `<name>.tgz`).
    #[serde(default = "default_package_name")]
    pub name: String,

    /// Display title (defaults to the name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Content version label.
    #[serde(default = "default_content_version")]
    pub version: String,

    /// Revision counter written to `meta.json`.
    #[serde(default)]
    pub revision: u32,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: default_package_name(),
            title: None,
            version: default_content_version(),
            revision: 0,
        }
    }
}

fn default_package_name() -> String {
    "Linuxcnc_GCode".into()
}
fn default_content_version() -> String {
    "Linuxcnc".into()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the authoring-format sources.
    #[serde(default = "default_dot")]
    pub source_dir: String,

    /// Directory receiving `<name>.docset`, `<name>.tgz` and `feed.xml`.
    #[serde(default = "default_dot")]
    pub output_dir: String,

    /// Landing page template.
    #[serde(default = "default_template")]
    pub template: String,

    /// Viewer docset directory used by `--install` (platform default if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_dot(),
            output_dir: default_dot(),
            template: default_template(),
            install_dir: None,
        }
    }
}

fn default_dot() -> String {
    ".".into()
}
fn default_template() -> String {
    "templates/landing.html".into()
}

/// `[renderer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Renderer executable.
    #[serde(default = "default_renderer_program")]
    pub program: String,

    /// Extension of the source files handed to the renderer.
    #[serde(default = "default_source_extension")]
    pub extension: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            extension: default_source_extension(),
        }
    }
}

fn default_renderer_program() -> String {
    "asciidoctor".into()
}
fn default_source_extension() -> String {
    "adoc".into()
}

/// `[feed]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL the archive is served from. Unset means a local `file://` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// `[landing]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandingConfig {
    /// Page heading (defaults to the package title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Line under the heading (defaults to `<version> reference`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// `[scanner]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Identifier substrings that mark an element as a reference entry.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
        }
    }
}

fn default_markers() -> Vec<String> {
    vec!["gcode:".into(), "mcode:".into(), "ocode:".into()]
}

/// `[[documents]]` entry: one rendered document and its index category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// File name inside `Documents/` (e.g. `g-code.html`).
    pub file: String,
    /// Landing-page section title.
    pub title: String,
    /// Category assigned to every entry of this document.
    pub category: Category,
}

impl DocumentSpec {
    pub fn new(file: &str, title: &str, category: Category) -> Self {
        Self {
            file: file.into(),
            title: title.into(),
            category,
        }
    }
}

fn default_documents() -> Vec<DocumentSpec> {
    vec![
        DocumentSpec::new("overview.html", "Overview", Category::Guide),
        DocumentSpec::new("g-code.html", "G-code", Category::Command),
        DocumentSpec::new("m-code.html", "M-code", Category::Command),
        DocumentSpec::new("o-code.html", "O-code", Category::Guide),
        DocumentSpec::new("other-code.html", "Other codes", Category::Command),
    ]
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Package identity written to `Info.plist` and `meta.json`.
    pub descriptor: PackageDescriptor,
    /// Directory the renderer reads sources from.
    pub source_dir: PathBuf,
    /// Directory the package, archive and feed are written to.
    pub output_root: PathBuf,
    /// Landing page template file.
    pub template_path: PathBuf,
    /// Landing page heading.
    pub page_title: String,
    /// Landing page subheading.
    pub page_subtitle: String,
    /// Documents to index, in landing-page order.
    pub documents: Vec<DocumentSpec>,
    /// Identifier substrings recognized by the scanner.
    pub markers: Vec<String>,
    /// Base URL for the feed's archive link.
    pub feed_base_url: Option<Url>,
    /// Viewer directory to install the finished package into, if any.
    pub install_dir: Option<PathBuf>,
}

impl BuildConfig {
    /// Resolve a validated build configuration from the app config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let feed_base_url = config
            .feed
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| DocsetError::config(format!("invalid feed base_url '{raw}': {e}")))
            })
            .transpose()?;

        let title = config
            .package
            .title
            .clone()
            .unwrap_or_else(|| config.package.name.clone());

        let build = Self {
            descriptor: PackageDescriptor {
                name: config.package.name.clone(),
                revision: config.package.revision,
                title: title.clone(),
                version: config.package.version.clone(),
            },
            source_dir: PathBuf::from(&config.paths.source_dir),
            output_root: PathBuf::from(&config.paths.output_dir),
            template_path: PathBuf::from(&config.paths.template),
            page_title: config.landing.title.clone().unwrap_or(title),
            page_subtitle: config
                .landing
                .subtitle
                .clone()
                .unwrap_or_else(|| format!("{} reference", config.package.version)),
            documents: config.documents.clone(),
            markers: config.scanner.markers.clone(),
            feed_base_url,
            install_dir: config.paths.install_dir.as_ref().map(PathBuf::from),
        };
        build.validate()?;
        Ok(build)
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let name = &self.descriptor.name;
        if name.trim().is_empty() {
            return Err(DocsetError::config("package name must not be empty"));
        }
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(DocsetError::config(format!(
                "package name '{name}' must be a plain directory name"
            )));
        }
        if self.markers.iter().all(|m| m.is_empty()) {
            return Err(DocsetError::config("at least one scanner marker is required"));
        }
        if self.documents.is_empty() {
            return Err(DocsetError::config("no documents configured for indexing"));
        }

        let mut seen = HashSet::new();
        for doc in &self.documents {
            if !seen.insert(doc.file.as_str()) {
                return Err(DocsetError::config(format!(
                    "document '{}' is listed more than once",
                    doc.file
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsetkit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocsetError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsetkit/docsetkit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Default viewer docset directory (Zeal's data directory).
pub fn default_install_dir() -> Result<PathBuf> {
    let data = dirs::data_dir()
        .ok_or_else(|| DocsetError::config("could not determine user data directory"))?;
    Ok(data.join("Zeal").join("Zeal").join("docsets"))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsetError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocsetError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocsetError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocsetError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocsetError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
