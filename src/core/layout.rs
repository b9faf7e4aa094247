//! Directory layout of a run.
//!
//! ```text
//! <root>/
//! ├── dependencies/                    # output
//! │   ├── include/                     # merged public headers
//! │   └── lib/<platform>/<library>.a   # one fat library per platform
//! └── build/
//!     ├── src/
//!     │   ├── <name>-<version>.tar.gz  # cached download
//!     │   └── <name>-<version>/        # extracted tree, rebuilt each run
//!     └── built/
//!         └── <platform>-<arch>.sdk/   # per-pair install prefix
//! ```

use std::path::{Path, PathBuf};

use crate::core::config::{BuildConfig, SourceSpec};
use crate::core::platform::Arch;

/// Resolved absolute paths for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    output_dir: PathBuf,
    build_dir: PathBuf,
    src_dir: PathBuf,
    built_dir: PathBuf,
}

impl Layout {
    /// Resolve the configured paths against `root`.
    pub fn new(root: &Path, config: &BuildConfig) -> Self {
        let output_dir = root.join(&config.paths.output);
        let build_dir = root.join(&config.paths.build);
        Layout {
            src_dir: build_dir.join("src"),
            built_dir: build_dir.join("built"),
            output_dir,
            build_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Download cache and extraction directory.
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Parent of every per-pair install prefix.
    pub fn built_dir(&self) -> &Path {
        &self.built_dir
    }

    pub fn output_include_dir(&self) -> PathBuf {
        self.output_dir.join("include")
    }

    pub fn output_lib_dir(&self) -> PathBuf {
        self.output_dir.join("lib")
    }

    /// `<output>/lib/<platform>`
    pub fn platform_lib_dir(&self, platform: &str) -> PathBuf {
        self.output_lib_dir().join(platform)
    }

    /// `<build>/src/<name>-<version>.tar.gz`
    pub fn archive_path(&self, source: &SourceSpec) -> PathBuf {
        self.src_dir.join(source.archive_name())
    }

    /// `<build>/src/<name>-<version>`
    pub fn source_tree(&self, source: &SourceSpec) -> PathBuf {
        self.src_dir.join(source.dir_name())
    }

    /// `<build>/built/<platform>-<arch>.sdk`
    pub fn install_prefix(&self, platform: &str, arch: Arch) -> PathBuf {
        self.built_dir.join(format!("{}-{}.sdk", platform, arch))
    }

    /// Directories that must exist before anything is fetched.
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.output_include_dir(),
            self.src_dir.clone(),
            self.built_dir.clone(),
        ]
    }
}
