use std::io::Write;
use std::path::Path;

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `data` to `dest` atomically: stage in a temp file collocated with
/// the destination, then rename over it.
pub fn write_atomic(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(data)?;
    staged.flush()?;
    staged
        .persist(dest)
        .map_err(|e| e.error)?;
    Ok(())
}

/// Move `src` over `dest` atomically. `src` must be on the same filesystem,
/// which holds for the collocated temp files this crate produces.
pub fn rename_atomic(src: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    std::fs::rename(src, dest)
}
