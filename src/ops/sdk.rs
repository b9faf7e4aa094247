//! SDK and toolchain discovery.
//!
//! SDK roots come from `xcodebuild -showsdks -json`; the developer directory
//! from `xcode-select -print-path`. Both are queried through the
//! [`CommandRunner`] so discovery can be tested off macOS.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::config::ToolchainSettings;
use crate::ops::errors::ToolchainError;
use crate::util::process::{find_executable, CommandOutput, CommandRunner, ProcessBuilder};

/// Compilers tried, in order, when none is configured.
const DEFAULT_COMPILERS: &[&str] = &["gcc", "clang"];

/// One entry of `xcodebuild -showsdks -json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkInfo {
    /// Platform identifier, e.g. `iphoneos`
    pub platform: String,

    /// Root of the SDK, passed to `-isysroot`
    pub sdk_path: PathBuf,

    #[serde(default)]
    pub sdk_version: Option<String>,

    #[serde(default)]
    pub canonical_name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

/// Resolved SDKs keyed by configured platform name.
pub type SdkMap = HashMap<String, SdkInfo>;

/// Host tools used to drive every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Active developer directory
    pub developer_dir: PathBuf,

    /// C compiler; `-arch` is appended per build
    pub cc: PathBuf,

    /// PATH for child builds: toolchain binaries first, then the inherited PATH
    pub search_path: String,
}

/// Parse the JSON array printed by `xcodebuild -showsdks -json`.
pub fn parse_sdk_list(json: &str) -> Result<Vec<SdkInfo>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Resolve the SDK root for every platform in `platform_names`.
///
/// Fails before anything is built if any platform is missing. Matching is
/// case-insensitive; when a platform is listed more than once the last entry
/// wins, which is the newest SDK in `xcodebuild`'s ordering.
pub fn discover_sdks(
    runner: &dyn CommandRunner,
    platform_names: &[&str],
) -> Result<SdkMap, ToolchainError> {
    let cmd = ProcessBuilder::new("xcodebuild").args(["-showsdks", "-json"]);
    let output = query(runner, &cmd)?;

    let sdks = parse_sdk_list(&output.stdout).map_err(|source| ToolchainError::InvalidSdkList {
        command: cmd.display_command(),
        source,
    })?;

    let mut found = SdkMap::new();
    for sdk in &sdks {
        if let Some(name) = platform_names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&sdk.platform))
        {
            found.insert(name.to_string(), sdk.clone());
        }
    }

    let missing: Vec<String> = platform_names
        .iter()
        .filter(|name| !found.contains_key(**name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        let mut available: Vec<String> = sdks.iter().map(|s| s.platform.clone()).collect();
        available.sort();
        available.dedup();
        return Err(ToolchainError::MissingSdk { missing, available });
    }

    for name in platform_names {
        if let Some(sdk) = found.get(*name) {
            tracing::info!("Found SDK {} at {}", name, sdk.sdk_path.display());
        }
    }

    Ok(found)
}

/// Locate the developer directory and C compiler, and compose the search
/// path child builds run with.
pub fn discover_toolchain(
    runner: &dyn CommandRunner,
    settings: &ToolchainSettings,
    inherited_path: Option<OsString>,
) -> Result<Toolchain, ToolchainError> {
    let cmd = ProcessBuilder::new("xcode-select").arg("-print-path");
    let output = query(runner, &cmd)?;
    let developer_dir = PathBuf::from(output.stdout.trim());

    let cc = resolve_compiler(settings)?;

    let mut dirs = vec![
        developer_dir.join("Toolchains/XcodeDefault.xctoolchain/usr/bin"),
        developer_dir.join("usr/bin"),
    ];
    if let Some(path) = inherited_path {
        dirs.extend(std::env::split_paths(&path));
    }
    let search_path = std::env::join_paths(dirs)
        .map_err(|source| ToolchainError::InvalidSearchPath {
            developer_dir: developer_dir.clone(),
            source,
        })?
        .to_string_lossy()
        .into_owned();

    tracing::debug!(
        "Toolchain: developer_dir={}, cc={}",
        developer_dir.display(),
        cc.display()
    );

    Ok(Toolchain {
        developer_dir,
        cc,
        search_path,
    })
}

fn resolve_compiler(settings: &ToolchainSettings) -> Result<PathBuf, ToolchainError> {
    if let Some(cc) = &settings.cc {
        if cc.exists() {
            return Ok(cc.clone());
        }
        return find_executable(&cc.to_string_lossy())
            .ok_or_else(|| ToolchainError::CompilerMissing { path: cc.clone() });
    }

    DEFAULT_COMPILERS
        .iter()
        .find_map(|name| find_executable(name))
        .ok_or_else(|| ToolchainError::CompilerNotFound {
            tried: DEFAULT_COMPILERS.iter().map(|s| s.to_string()).collect(),
        })
}

fn query(runner: &dyn CommandRunner, cmd: &ProcessBuilder) -> Result<CommandOutput, ToolchainError> {
    let output = runner.run(cmd).map_err(|source| ToolchainError::Spawn {
        command: cmd.display_command(),
        source,
    })?;

    if !output.success() {
        return Err(ToolchainError::QueryFailed {
            command: cmd.display_command(),
            status: output.status,
            stderr: output.stderr,
        });
    }

    Ok(output)
}
