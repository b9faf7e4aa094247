//! autofat - cross-compile an autotools C library for Apple platforms
//!
//! This crate drives an upstream library's own `configure`/`make` build once
//! per (platform, architecture) pair and merges the resulting static libraries
//! into one fat library per platform with `lipo`.

pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a fake command runner, a fake downloader and fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    config::{BuildConfig, PlatformSpec, SourceSpec},
    layout::Layout,
    platform::Arch,
};
pub use ops::errors::Error;
pub use ops::pipeline::{run, RunOptions, RunSummary};
