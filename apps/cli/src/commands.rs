//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docsetkit_core::install::install;
use docsetkit_core::layout::PackageRoot;
use docsetkit_core::pipeline::{BuildResult, ProgressReporter, build_docset};
use docsetkit_core::render::CommandRenderer;
use docsetkit_scanner::{Markers, scan_file};
use docsetkit_shared::{
    AppConfig, BuildConfig, default_install_dir, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsetkit: build offline documentation bundles.
#[derive(Parser)]
#[command(
    name = "docsetkit",
    version,
    about = "Build Dash/Zeal docsets from rendered reference documentation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docsetkit/docsetkit.toml.
    #[arg(long, global = true, env = "DOCSETKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render, index and package a docset.
    Build(BuildArgs),

    /// Print the entries the scanner finds in an HTML file.
    Scan {
        /// Rendered HTML document.
        html: PathBuf,
    },

    /// Copy a built docset into a viewer's docset directory.
    Install {
        /// Path to a `<name>.docset` directory.
        docset: PathBuf,

        /// Destination directory (defaults to the configured or Zeal directory).
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `build`; each overrides the matching config value.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct BuildArgs {
    /// Package name (directory stem and bundle identifier).
    #[arg(long)]
    pub name: Option<String>,

    /// Directory containing the source documents.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output root for the package, archive and feed.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Landing page template.
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Renderer executable.
    #[arg(long)]
    pub renderer: Option<String>,

    /// Base URL the archive is published under.
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Install after building, optionally into DIR.
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub install: Option<Option<PathBuf>>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsetkit=info",
        1 => "docsetkit=debug",
        _ => "docsetkit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build(args) => cmd_build(config_path, args).await,
        Command::Scan { html } => cmd_scan(config_path, &html).await,
        Command::Install { docset, dest } => cmd_install(config_path, &docset, dest).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Merge `build` flags over the loaded config and resolve the build settings.
pub(crate) fn resolve_build_config(mut config: AppConfig, args: BuildArgs) -> Result<BuildConfig> {
    if let Some(name) = args.name {
        config.package.name = name;
    }
    if let Some(source) = args.source {
        config.paths.source_dir = source.to_string_lossy().into_owned();
    }
    if let Some(out) = args.out {
        config.paths.output_dir = out.to_string_lossy().into_owned();
    }
    if let Some(template) = args.template {
        config.paths.template = template.to_string_lossy().into_owned();
    }
    if let Some(program) = args.renderer {
        config.renderer.program = program;
    }
    if let Some(url) = args.feed_url {
        config.feed.base_url = Some(url);
    }

    let mut build = BuildConfig::from_app_config(&config)?;
    match args.install {
        Some(Some(dir)) => build.install_dir = Some(dir),
        Some(None) if build.install_dir.is_none() => {
            build.install_dir = Some(default_install_dir()?);
        }
        _ => {}
    }
    Ok(build)
}

async fn cmd_build(config_path: Option<&Path>, args: BuildArgs) -> Result<()> {
    let config = load(config_path)?;
    let renderer = CommandRenderer::new(
        args.renderer.as_deref().unwrap_or(&config.renderer.program),
        &config.renderer.extension,
    );
    let build = resolve_build_config(config, args)?;

    std::fs::create_dir_all(&build.output_root).map_err(|e| {
        eyre!(
            "cannot create output directory '{}': {e}",
            build.output_root.display()
        )
    })?;

    info!(
        name = %build.descriptor.name,
        source = %build.source_dir.display(),
        out = %build.output_root.display(),
        "building docset"
    );

    let reporter = CliProgress::new();
    let result = build_docset(&build, &renderer, &reporter).await;
    if result.is_err() {
        reporter.spinner.abandon();
    }
    let result = result?;

    println!();
    println!("  Docset built successfully!");
    println!("  Package: {}", result.package.root().display());
    for doc in &result.documents {
        println!("    {:<18} {:>4}  {}", doc.file, doc.entries, doc.category);
    }
    println!("  Records: {}", result.total_records);
    println!(
        "  Archive: {} ({} bytes)",
        result.archive.path.display(),
        result.archive.size
    );
    println!("  SHA-256: {}", result.archive.sha256);
    println!("  Feed:    {} ({})", result.feed_path.display(), result.feed_entry.version);
    if let Some(installed) = &result.installed_at {
        println!("  Installed: {}", installed.display());
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_scan(config_path: Option<&Path>, html: &Path) -> Result<()> {
    if !html.is_file() {
        return Err(eyre!("no such HTML file: '{}'", html.display()));
    }
    let config = load(config_path)?;
    let markers = Markers::new(config.scanner.markers);

    let entries = scan_file(html, &markers)?;
    info!(file = %html.display(), entries = entries.len(), "scanned document");

    for entry in &entries {
        println!("{}\t{}", entry.name, entry.path());
    }
    Ok(())
}

/// Package handle for an existing `<name>.docset` directory.
pub(crate) fn package_from_path(docset: &Path) -> Result<PackageRoot> {
    let is_docset = docset.extension().is_some_and(|ext| ext == "docset");
    let name = docset
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| is_docset && !s.is_empty())
        .ok_or_else(|| eyre!("'{}' is not a .docset directory", docset.display()))?;
    let parent = docset.parent().unwrap_or_else(|| Path::new(""));
    Ok(PackageRoot::new(parent, &name))
}

async fn cmd_install(
    config_path: Option<&Path>,
    docset: &Path,
    dest: Option<PathBuf>,
) -> Result<()> {
    let package = package_from_path(docset)?;
    let dest = match dest {
        Some(dest) => dest,
        None => match load(config_path)?.paths.install_dir {
            Some(dir) => PathBuf::from(dir),
            None => default_install_dir()?,
        },
    };

    let target = install(&package, &dest)?;
    println!("Installed {} to {}", package.name(), target.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_indexed(&self, file: &str, entries: usize, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Indexing [{current}/{total}] {file} ({entries} entries)"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
