//! Source directory scanning.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Extensions recognised as compilable firmware sources.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["c", "s"];

/// List the compilable sources that are direct children of `dir`.
///
/// The scan is non-recursive and preserves filesystem-enumeration order.
/// Callers capture the returned list in memory before opening any output
/// file, so a later failure cannot leave a half-written build description.
///
/// # Errors
///
/// Propagates any I/O error from reading the directory, including entries
/// whose names are not valid UTF-8.
pub fn scan(dir: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut sources = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if matches!(path.extension(), Some(ext) if SOURCE_EXTENSIONS.contains(&ext)) {
            sources.push(path.to_owned());
        }
    }
    tracing::debug!(count = sources.len(), dir = %dir, "captured source list");
    Ok(sources)
}
