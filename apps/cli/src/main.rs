//! osccat: Open Science Catalog generator and site publisher.
//!
//! Converts the OSC spreadsheets into a static STAC catalog, builds the
//! browser client against it, and publishes both to a hosting branch.

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
