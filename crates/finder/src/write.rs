//! Replacing an expectation file on disk.

use crate::error::FinderError;
use std::io::Write;
use std::path::Path;

/// Write `content` to `path` through a temporary file in the same
/// directory, so readers see either the old or the new file.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), FinderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FinderError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| FinderError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| FinderError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| FinderError::io(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "rewrote expectation file");
    Ok(())
}
