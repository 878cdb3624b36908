use courseloc_core::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copy `path` to a sibling `<name>.bak` before it gets overwritten.
/// Missing originals are fine (nothing to back up yet).
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let bak = path.with_file_name(format!("{file_name}.bak"));
    fs::copy(path, &bak)?;
    debug!("backup: {} -> {}", path.display(), bak.display());
    Ok(Some(bak))
}
