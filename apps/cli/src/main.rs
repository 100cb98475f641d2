//! docsetkit CLI: build offline documentation bundles for Dash and Zeal.
//!
//! Renders reference sources to HTML, indexes the tagged entries, and packages
//! the result with an archive and update feed.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
