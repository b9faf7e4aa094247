//! Pipeline operations.

pub mod build;
pub mod consolidate;
pub mod errors;
pub mod fetch;
pub mod pipeline;
pub mod sdk;
pub mod workspace;

pub use build::{build_one, BuildContext, InheritedFlags};
pub use consolidate::{consolidate, verify_fat_library, MergedLibrary};
pub use fetch::{fetch_source, Downloader, FetchedSource, HttpDownloader};
pub use pipeline::{run, RunOptions, RunSummary};
pub use sdk::{discover_sdks, discover_toolchain, SdkInfo, SdkMap, Toolchain};
pub use workspace::prepare_workspace;
