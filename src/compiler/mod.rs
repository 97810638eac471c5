//! Content compilation for static site generation.
//!
//! - **markdown**: Split frontmatter and render markdown bodies
//! - **meta**: Turn a parsed file into a `ContentItem`
//! - **collection**: Sort and group items for templates
//! - **layouts**: Compile layouts and choose one per item
//! - **pages**: Render item, home and listing pages
//! - **assets**: Copy static files
//!
//! # Build Flow
//!
//! ```text
//! content/**.md ──► parse_document() ──► ContentItem::build() ──► Collection::new()
//!                                                                        │
//! layouts/**.html ──► LayoutSet::load() ──────────────────────────► Renderer
//!                                                                        │
//!                                                                        ▼
//!                                                          <output>/**/index.html
//! ```

pub mod assets;
pub mod collection;
pub mod layouts;
pub mod markdown;
pub mod meta;
pub mod pages;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use assets::copy_static;
pub use collection::Collection;
pub use layouts::LayoutSet;
pub use markdown::parse_document;
pub use meta::ContentItem;
pub use pages::Renderer;

// ============================================================================
// Shared utilities
// ============================================================================

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all files from a directory recursively, in file-name order.
///
/// A missing `dir` yields no files. Any entry that cannot be read is an error.
pub fn collect_all_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }
        files.push(entry.into_path());
    }

    Ok(files)
}

/// Markdown files under `dir`, any case of the `.md` extension.
pub fn collect_content_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let files = collect_all_files(dir)?
        .into_iter()
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        })
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_all_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b/inner.txt"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files: Vec<_> = collect_all_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            files,
            [
                PathBuf::from("a.txt"),
                PathBuf::from("b/inner.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn test_collect_content_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        fs::write(dir.path().join("B.MD"), "").unwrap();
        fs::write(dir.path().join("image.png"), "").unwrap();
        fs::write(dir.path().join("md"), "").unwrap();

        let files = collect_content_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(collect_all_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let private = dir.path().join("private");
        fs::create_dir_all(&private).unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        fs::write(private.join("b.md"), "").unwrap();
        fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind root.
        if fs::read_dir(&private).is_ok() {
            fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = collect_content_files(dir.path());

        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to walk"));
    }
}
