//! autofat CLI

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use autofat::ops::HttpDownloader;
use autofat::util::SystemRunner;
use autofat::{BuildConfig, RunOptions};

mod cli;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("autofat=debug")
    } else {
        EnvFilter::new("autofat=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = BuildConfig::load_or_default(cli.config.as_deref())?;
    config.validate()?;

    let root = std::path::absolute(&cli.root)
        .with_context(|| format!("invalid root directory: {}", cli.root.display()))?;

    let mut opts = RunOptions::new(root);
    opts.verify = !cli.no_verify;

    let summary = autofat::run(&SystemRunner, &HttpDownloader, &config, &opts)?;

    for lib in &summary.libraries {
        eprintln!("    Finished `{}` ({}) -> {}", lib.library, lib.platform, lib.path.display());
    }

    Ok(())
}
