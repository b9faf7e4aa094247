//! Workspace preparation.

use crate::core::layout::Layout;
use crate::ops::errors::WorkspaceError;
use crate::util::fs::ensure_dir;

/// Create the output, source and intermediate directories.
///
/// Existing directories and their contents are left untouched, so this is
/// safe to call on every run.
pub fn prepare_workspace(layout: &Layout) -> Result<(), WorkspaceError> {
    for dir in layout.required_dirs() {
        ensure_dir(&dir).map_err(|source| WorkspaceError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }

    tracing::debug!(
        "Workspace ready: output={}, build={}",
        layout.output_dir().display(),
        layout.build_dir().display()
    );
    Ok(())
}
