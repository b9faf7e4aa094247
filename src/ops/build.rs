//! Per-(platform, arch) autotools build.
//!
//! Each pair runs `configure`, `make`, `make install` and `make clean` in the
//! shared source tree, installing into its own prefix under `built/`. The
//! compiler and search path are passed to every step as per-invocation
//! environment, so pairs never observe each other's settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::config::{BuildConfig, PlatformSpec};
use crate::core::layout::Layout;
use crate::core::platform::{min_version_flag, Arch};
use crate::ops::errors::{BuildError, BuildStep};
use crate::ops::sdk::Toolchain;
use crate::util::fs::ensure_dir;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Everything shared by the builds of one run.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a BuildConfig,
    pub toolchain: &'a Toolchain,
    pub layout: &'a Layout,
    /// Extracted source tree the builds run in
    pub source_tree: &'a Path,
    pub inherited_flags: &'a InheritedFlags,
}

/// `CFLAGS`, `CPPFLAGS` and `LDFLAGS` from the caller's environment.
///
/// `configure` arguments override the environment, so these are prepended to
/// the generated values instead of being left for `configure` to pick up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InheritedFlags {
    pub cflags: Option<String>,
    pub cppflags: Option<String>,
    pub ldflags: Option<String>,
}

impl InheritedFlags {
    /// Capture the flags set in this process's environment.
    pub fn from_env() -> Self {
        InheritedFlags {
            cflags: std::env::var("CFLAGS").ok(),
            cppflags: std::env::var("CPPFLAGS").ok(),
            ldflags: std::env::var("LDFLAGS").ok(),
        }
    }
}

fn with_inherited(inherited: Option<&str>, generated: String) -> String {
    match inherited.map(str::trim) {
        Some(flags) if !flags.is_empty() => format!("{} {}", flags, generated),
        _ => generated,
    }
}

/// Configure, build, install and clean one (platform, arch) pair.
///
/// Returns the install prefix. Any failing step aborts immediately; later
/// steps are not attempted.
pub fn build_one(
    runner: &dyn CommandRunner,
    ctx: &BuildContext<'_>,
    platform: &PlatformSpec,
    arch: Arch,
    sdk_path: &Path,
) -> Result<PathBuf, BuildError> {
    let pair = format!("{}-{}", platform.name, arch);
    let prefix = ctx.layout.install_prefix(&platform.name, arch);

    tracing::info!(
        "Building {} {} for {} {}",
        ctx.config.source.name,
        ctx.config.source.version,
        platform.name,
        arch
    );

    ensure_dir(&prefix).map_err(|source| BuildError::Io {
        path: prefix.clone(),
        source,
    })?;

    let env = build_env(ctx, platform, arch);
    let steps = [
        (BuildStep::Configure, configure_command(ctx, arch, &prefix, sdk_path)),
        (
            BuildStep::Make,
            make_command(ctx).arg(format!("-j{}", ctx.config.jobs)),
        ),
        (BuildStep::Install, make_command(ctx).arg("install")),
        (BuildStep::Clean, make_command(ctx).arg("clean")),
    ];

    for (step, cmd) in steps {
        run_step(runner, step, &pair, &cmd.envs(&env))?;
    }

    Ok(prefix)
}

/// Environment overrides for every step of one pair.
pub fn build_env(
    ctx: &BuildContext<'_>,
    platform: &PlatformSpec,
    arch: Arch,
) -> BTreeMap<String, String> {
    let mut cc = format!("{} -arch {}", ctx.toolchain.cc.display(), arch);
    if let Some(flag) = platform
        .min_version
        .as_deref()
        .and_then(|v| min_version_flag(&platform.name, v))
    {
        cc.push(' ');
        cc.push_str(&flag);
    }

    let mut env = BTreeMap::new();
    env.insert("CC".to_string(), cc);
    env.insert("PATH".to_string(), ctx.toolchain.search_path.clone());
    env
}

/// The `./configure` invocation for one pair.
pub fn configure_command(
    ctx: &BuildContext<'_>,
    arch: Arch,
    prefix: &Path,
    sdk_path: &Path,
) -> ProcessBuilder {
    let include = ctx.layout.output_include_dir();
    let sysroot = format!("-I{} -isysroot {}", include.display(), sdk_path.display());
    let inherited = ctx.inherited_flags;

    let ldflags = with_inherited(
        inherited.ldflags.as_deref(),
        format!("-L{}", ctx.layout.output_lib_dir().display()),
    );
    let cflags = with_inherited(
        inherited.cflags.as_deref(),
        format!("{} {}", ctx.config.opt_level, sysroot),
    );
    let cppflags = with_inherited(inherited.cppflags.as_deref(), sysroot);

    ProcessBuilder::new(ctx.source_tree.join("configure"))
        .cwd(ctx.source_tree)
        .args(&ctx.config.configure_flags)
        .arg(format!("--host={}", arch.host_triple()))
        .arg(format!("--prefix={}", prefix.display()))
        .arg(format!("LDFLAGS={}", ldflags))
        .arg(format!("CFLAGS={}", cflags))
        .arg(format!("CPPFLAGS={}", cppflags))
}

fn make_command(ctx: &BuildContext<'_>) -> ProcessBuilder {
    ProcessBuilder::new("make").cwd(ctx.source_tree)
}

fn run_step(
    runner: &dyn CommandRunner,
    step: BuildStep,
    pair: &str,
    cmd: &ProcessBuilder,
) -> Result<(), BuildError> {
    tracing::debug!("[{}] {}", pair, cmd.display_command());

    let output = runner.run(cmd).map_err(|source| BuildError::Spawn {
        step,
        pair: pair.to_string(),
        command: cmd.display_command(),
        source,
    })?;

    if !output.success() {
        return Err(BuildError::StepFailed {
            step,
            pair: pair.to_string(),
            command: cmd.display_command(),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(())
}
