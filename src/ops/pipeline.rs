//! The complete build: discover, prepare, fetch, build every pair, merge.
//!
//! Stages run strictly in sequence and the first error ends the run.
//! Nothing is cleaned up on failure; the build and output directories are
//! left as they were for inspection.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::config::BuildConfig;
use crate::core::layout::Layout;
use crate::ops::build::{build_one, BuildContext, InheritedFlags};
use crate::ops::consolidate::{consolidate, verify_fat_library, MergedLibrary};
use crate::ops::errors::{Error, ToolchainError};
use crate::ops::fetch::{fetch_source, Downloader, FetchedSource};
use crate::ops::sdk::{discover_sdks, discover_toolchain, SdkMap, Toolchain};
use crate::ops::workspace::prepare_workspace;
use crate::util::process::CommandRunner;

/// Options that are about the environment of a run rather than what it builds.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the configured paths are resolved against
    pub root: PathBuf,

    /// PATH appended after the toolchain directories for child builds
    pub inherited_path: Option<OsString>,

    /// Compiler and linker flags prepended to the generated ones
    pub inherited_flags: InheritedFlags,

    /// Check every merged library with `lipo -info`
    pub verify: bool,
}

impl RunOptions {
    /// Options for a run rooted at `root`, inheriting this process's PATH.
    pub fn new(root: impl AsRef<Path>) -> Self {
        RunOptions {
            root: root.as_ref().to_path_buf(),
            inherited_path: std::env::var_os("PATH"),
            inherited_flags: InheritedFlags::from_env(),
            verify: true,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub layout: Layout,
    pub sdks: SdkMap,
    pub toolchain: Toolchain,
    pub source: FetchedSource,
    /// Install prefix of every (platform, arch) pair, in build order
    pub prefixes: Vec<PathBuf>,
    pub libraries: Vec<MergedLibrary>,
}

/// Run the whole pipeline.
pub fn run(
    runner: &dyn CommandRunner,
    downloader: &dyn Downloader,
    config: &BuildConfig,
    opts: &RunOptions,
) -> Result<RunSummary, Error> {
    let sdks = discover_sdks(runner, &config.platform_names())?;
    let toolchain = discover_toolchain(runner, &config.toolchain, opts.inherited_path.clone())?;

    let layout = Layout::new(&opts.root, config);
    prepare_workspace(&layout)?;

    let source = fetch_source(downloader, &config.source, &layout)?;

    let ctx = BuildContext {
        config,
        toolchain: &toolchain,
        layout: &layout,
        source_tree: &source.tree,
        inherited_flags: &opts.inherited_flags,
    };

    let mut prefixes = Vec::new();
    for (platform, arch) in config.pairs() {
        let sdk = sdks
            .get(&platform.name)
            .ok_or_else(|| ToolchainError::MissingSdk {
                missing: vec![platform.name.clone()],
                available: sdks.keys().cloned().collect(),
            })?;
        prefixes.push(build_one(runner, &ctx, platform, arch, &sdk.sdk_path)?);
    }

    let libraries = consolidate(runner, config, &layout)?;

    if opts.verify {
        for lib in &libraries {
            let found = verify_fat_library(runner, &lib.path, &lib.archs)?;
            tracing::debug!("{}: {}", lib.path.display(), found.join(" "));
        }
    }

    tracing::info!(
        "Done: {} libraries in {}",
        libraries.len(),
        layout.output_lib_dir().display()
    );

    Ok(RunSummary {
        layout,
        sdks,
        toolchain,
        source,
        prefixes,
        libraries,
    })
}
