//! Shared utilities

pub mod fs;
pub mod hash;
pub mod process;

pub use process::{CommandOutput, CommandRunner, ProcessBuilder, SystemRunner};
