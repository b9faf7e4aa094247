//! Error taxonomy for the build pipeline.
//!
//! Every stage has its own error type. None of them is recovered from: the
//! first error aborts the run and is reported with the failing tool's output
//! attached verbatim.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A required SDK or tool is not available.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed with {}\n{stderr}", exit_code(.status))]
    QueryFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("could not parse the SDK list printed by `{command}`")]
    InvalidSdkList {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "required SDK not installed: {} (installed: {})",
        list(.missing),
        list(.available)
    )]
    MissingSdk {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("no C compiler found (tried {})", list(.tried))]
    CompilerNotFound { tried: Vec<String> },

    #[error("configured C compiler does not exist: {}", .path.display())]
    CompilerMissing { path: PathBuf },

    #[error("cannot build a search path from {}", .developer_dir.display())]
    InvalidSearchPath {
        developer_dir: PathBuf,
        #[source]
        source: std::env::JoinPathsError,
    },
}

/// The source archive could not be fetched or unpacked.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid download url `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to download {url}")]
    Transfer {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to download {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "checksum mismatch for {}:\n  expected: {expected}\n  actual:   {actual}",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {}", .archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive did not contain the expected directory {}", .path.display())]
    MissingSourceTree { path: PathBuf },
}

/// A step of the external configure/make build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Make,
    Install,
    Clean,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BuildStep::Configure => "configure",
            BuildStep::Make => "make",
            BuildStep::Install => "make install",
            BuildStep::Clean => "make clean",
        })
    }
}

/// One (platform, arch) build failed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to run {step} for {pair}: `{command}`")]
    Spawn {
        step: BuildStep,
        pair: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "{step} failed for {pair} with {}\ncommand: {command}\n{stdout}{stderr}",
        exit_code(.status)
    )]
    StepFailed {
        step: BuildStep,
        pair: String,
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to create install prefix {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-arch artifacts could not be merged into fat libraries.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("missing {arch} build of `{library}` for {platform}: {}", .path.display())]
    MissingArtifact {
        platform: String,
        arch: String,
        library: String,
        path: PathBuf,
    },

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "merging `{library}` for {platform} failed with {}\ncommand: {command}\n{stdout}{stderr}",
        exit_code(.status)
    )]
    MergeFailed {
        platform: String,
        library: String,
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("inspecting {} failed with {}\n{stderr}", .path.display(), exit_code(.status))]
    InspectFailed {
        path: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    #[error(
        "{} is missing architectures: {} (found: {})",
        .path.display(),
        list(.missing),
        list(.found)
    )]
    MissingSlice {
        path: PathBuf,
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("failed to copy headers from {} to {}", .from.display(), .to.display())]
    CopyHeaders {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The directory tree could not be created.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any pipeline failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn exit_code(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
