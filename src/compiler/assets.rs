use super::collect_all_files;
use crate::log;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Copy every file under `static_dir` into `output`, keeping relative paths.
///
/// A missing static directory copies nothing. Permissions are carried over;
/// failing to set them only logs a warning.
pub fn copy_static(static_dir: &Path, output: &Path) -> Result<usize> {
    if !static_dir.is_dir() {
        log!("assets"; "no static directory, skipping");
        return Ok(0);
    }

    let files = collect_all_files(static_dir)?;
    for source in &files {
        let rel = source
            .strip_prefix(static_dir)
            .with_context(|| format!("{} is not in {}", source.display(), static_dir.display()))?;
        copy_asset(source, &output.join(rel))?;
    }

    Ok(files.len())
}

fn copy_asset(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::copy(source, dest)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;

    let permissions = fs::metadata(source).map(|m| m.permissions());
    if let Err(err) = permissions.and_then(|p| fs::set_permissions(dest, p)) {
        log!("warn"; "could not preserve permissions of {}: {err}", dest.display());
    }

    Ok(())
}
