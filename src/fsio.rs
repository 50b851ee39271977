//! File access for the router: fresh reads and atomic whole-file rewrites.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read the target file, creating it empty (with parents) first when
/// `create` is set and it does not exist.
pub fn read_or_create(path: &Path, create: bool) -> Result<String> {
    if create && !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(path, "").with_context(|| format!("create {}", path.display()))?;
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Replace the file's content via a dot-tmp sibling and rename, so readers
/// never observe a partial write.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let tmp_path = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, content).with_context(|| format!("write {}", path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
