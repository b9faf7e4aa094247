//! Configuration, platform matrix and directory layout.

pub mod config;
pub mod layout;
pub mod platform;

pub use config::{BuildConfig, PlatformSpec, SourceSpec, ToolchainSettings};
pub use layout::Layout;
pub use platform::Arch;
