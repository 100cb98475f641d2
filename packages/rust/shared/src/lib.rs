//! Shared types, error model, and configuration for docsetkit.
//!
//! This crate is the foundation depended on by all other docsetkit crates.
//! It provides:
//! - [`DocsetError`], the unified error type
//! - Domain types ([`Entry`], [`IndexRecord`], [`DocumentSection`], [`PackageDescriptor`])
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, DocumentSpec, FeedConfig, LandingConfig, PackageConfig, PathsConfig,
    RendererConfig, ScannerConfig, config_dir, config_file_path, default_install_dir, init_config,
    load_config, load_config_from,
};
pub use error::{DocsetError, Result};
pub use types::{Category, DocumentSection, Entry, FeedEntry, IndexRecord, PackageDescriptor};
