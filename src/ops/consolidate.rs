//! Merge per-architecture builds into per-platform fat libraries.
//!
//! Headers from every architecture are copied over one shared include
//! directory. They are expected to be identical across architectures for a
//! given release; if they were not, the last architecture copied would win.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::config::{BuildConfig, PlatformSpec};
use crate::core::layout::Layout;
use crate::core::platform::Arch;
use crate::ops::errors::ConsolidationError;
use crate::util::fs::{copy_dir_contents, ensure_dir};
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};

static LIPO_ARCHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:are|is architecture):\s*(.*?)\s*$").expect("static regex is valid")
});

/// One fat library written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedLibrary {
    pub platform: String,
    pub library: String,
    pub path: PathBuf,
    pub archs: Vec<Arch>,
}

/// Per-arch inputs for one (platform, library).
#[derive(Debug, Clone, PartialEq, Eq)]
struct MergePlan {
    platform: String,
    library: String,
    inputs: Vec<PathBuf>,
    archs: Vec<Arch>,
    output: PathBuf,
}

/// Copy headers and merge every expected library for every platform.
///
/// All per-arch inputs across the whole matrix are checked before anything is
/// written, so a missing artifact never leaves some platforms merged.
pub fn consolidate(
    runner: &dyn CommandRunner,
    config: &BuildConfig,
    layout: &Layout,
) -> Result<Vec<MergedLibrary>, ConsolidationError> {
    let plans = plan_merges(config, layout)?;

    tracing::info!("Copying headers and libraries");
    for platform in &config.platforms {
        copy_headers(platform, layout)?;
    }

    let mut merged = Vec::with_capacity(plans.len());
    for plan in plans {
        let dir = layout.platform_lib_dir(&plan.platform);
        ensure_dir(&dir).map_err(|source| ConsolidationError::Io {
            path: dir.clone(),
            source,
        })?;

        merge(runner, &plan)?;

        merged.push(MergedLibrary {
            platform: plan.platform,
            library: plan.library,
            path: plan.output,
            archs: plan.archs,
        });
    }

    Ok(merged)
}

/// Check that `path` carries a slice for every architecture in `archs`.
///
/// Returns the architectures `lipo -info` reported.
pub fn verify_fat_library(
    runner: &dyn CommandRunner,
    path: &Path,
    archs: &[Arch],
) -> Result<Vec<String>, ConsolidationError> {
    let cmd = ProcessBuilder::new("lipo").arg("-info").arg(path);
    let output = run(runner, &cmd)?;

    if !output.success() {
        return Err(ConsolidationError::InspectFailed {
            path: path.to_path_buf(),
            status: output.status,
            stderr: output.stderr,
        });
    }

    let found = parse_lipo_info(&output.stdout);
    let missing: Vec<String> = archs
        .iter()
        .map(|a| a.as_str())
        .filter(|a| !found.iter().any(|f| f.as_str() == *a))
        .map(String::from)
        .collect();

    if !missing.is_empty() {
        return Err(ConsolidationError::MissingSlice {
            path: path.to_path_buf(),
            missing,
            found,
        });
    }

    Ok(found)
}

/// Extract architecture names from `lipo -info` output.
///
/// Handles both `Architectures in the fat file: <f> are: x86_64 arm64` and
/// `Non-fat file: <f> is architecture: arm64`.
pub fn parse_lipo_info(stdout: &str) -> Vec<String> {
    LIPO_ARCHS
        .captures_iter(stdout)
        .filter_map(|c| c.get(1))
        .flat_map(|m| m.as_str().split_whitespace())
        .map(String::from)
        .collect()
}

fn plan_merges(config: &BuildConfig, layout: &Layout) -> Result<Vec<MergePlan>, ConsolidationError> {
    let mut plans = Vec::new();

    for platform in &config.platforms {
        for arch in &platform.archs {
            let include = layout.install_prefix(&platform.name, *arch).join("include");
            if !include.is_dir() {
                return Err(ConsolidationError::MissingArtifact {
                    platform: platform.name.clone(),
                    arch: arch.to_string(),
                    library: "include/".to_string(),
                    path: include,
                });
            }
        }

        for library in &config.libraries {
            let mut inputs = Vec::with_capacity(platform.archs.len());
            for arch in &platform.archs {
                let input = layout
                    .install_prefix(&platform.name, *arch)
                    .join("lib")
                    .join(library);
                if !input.is_file() {
                    return Err(ConsolidationError::MissingArtifact {
                        platform: platform.name.clone(),
                        arch: arch.to_string(),
                        library: library.clone(),
                        path: input,
                    });
                }
                inputs.push(input);
            }

            plans.push(MergePlan {
                platform: platform.name.clone(),
                library: library.clone(),
                inputs,
                archs: platform.archs.clone(),
                output: layout.platform_lib_dir(&platform.name).join(library),
            });
        }
    }

    Ok(plans)
}

fn copy_headers(platform: &PlatformSpec, layout: &Layout) -> Result<(), ConsolidationError> {
    let dest = layout.output_include_dir();

    for arch in &platform.archs {
        let from = layout.install_prefix(&platform.name, *arch).join("include");
        let copied = copy_dir_contents(&from, &dest).map_err(|source| ConsolidationError::CopyHeaders {
            from: from.clone(),
            to: dest.clone(),
            source,
        })?;
        tracing::debug!("Copied {} headers from {}", copied, from.display());
    }

    Ok(())
}

fn merge(runner: &dyn CommandRunner, plan: &MergePlan) -> Result<(), ConsolidationError> {
    let cmd = ProcessBuilder::new("lipo")
        .arg("-create")
        .args(&plan.inputs)
        .arg("-output")
        .arg(&plan.output);

    tracing::debug!("{}", cmd.display_command());
    let output = run(runner, &cmd)?;

    if !output.success() {
        return Err(ConsolidationError::MergeFailed {
            platform: plan.platform.clone(),
            library: plan.library.clone(),
            command: cmd.display_command(),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    tracing::info!("Merged {} for {}", plan.library, plan.platform);
    Ok(())
}

fn run(runner: &dyn CommandRunner, cmd: &ProcessBuilder) -> Result<CommandOutput, ConsolidationError> {
    runner.run(cmd).map_err(|source| ConsolidationError::Spawn {
        command: cmd.display_command(),
        source,
    })
}
