//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// autofat - build an autotools C library as fat static libraries for Apple platforms
///
/// With no arguments, builds libevent for iphonesimulator, iphoneos and macosx
/// into ./dependencies, using ./build as scratch space.
#[derive(Parser)]
#[command(name = "autofat")]
#[command(author, version, about)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Build configuration file (TOML); the built-in libevent matrix is used if omitted
    #[arg(long, env = "AUTOFAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the output and build directories are created in
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Skip checking merged libraries with `lipo -info`
    #[arg(long)]
    pub no_verify: bool,
}
