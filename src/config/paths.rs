//! Centralized path resolution for the fixed project layout.
//!
//! ```text
//! <root>/
//! ├── content/            → SitePaths::content()
//! ├── layouts/            → SitePaths::layouts()
//! │   └── partials/       (shared layout fragments)
//! ├── static/             → SitePaths::static_dir()
//! ├── public/             → SitePaths::output()   (outputDir)
//! └── .public.staging/    → SitePaths::staging()  (build target before publish)
//! ```

use std::path::{Path, PathBuf};

pub const CONTENT_DIR: &str = "content";
pub const LAYOUTS_DIR: &str = "layouts";
pub const STATIC_DIR: &str = "static";

/// Resolved source and output directories for one site.
#[derive(Debug, Clone, Copy)]
pub struct SitePaths<'a> {
    root: &'a Path,
    output: &'a Path,
}

impl<'a> SitePaths<'a> {
    #[inline]
    pub const fn new(root: &'a Path, output: &'a Path) -> Self {
        Self { root, output }
    }

    #[inline]
    pub fn content(&self) -> PathBuf {
        self.root.join(CONTENT_DIR)
    }

    #[inline]
    pub fn layouts(&self) -> PathBuf {
        self.root.join(LAYOUTS_DIR)
    }

    #[inline]
    pub fn static_dir(&self) -> PathBuf {
        self.root.join(STATIC_DIR)
    }

    /// The published output directory (what the server reads).
    #[inline]
    pub const fn output(&self) -> &Path {
        self.output
    }

    /// Sibling directory a build renders into before it is published.
    ///
    /// `public` → `.public.staging`, next to `public`.
    pub fn staging(&self) -> PathBuf {
        self.sibling("staging")
    }

    /// Sibling directory the previous output is moved to during a swap.
    pub fn retired(&self) -> PathBuf {
        self.sibling("old")
    }

    /// Source directories watched in serve mode, in a fixed order.
    pub fn sources(&self) -> [PathBuf; 3] {
        [self.content(), self.layouts(), self.static_dir()]
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_owned());
        let parent = self.output.parent().unwrap_or(self.root);
        parent.join(format!(".{name}.{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_dirs() {
        let root = Path::new("/site");
        let output = root.join("public");
        let paths = SitePaths::new(root, &output);

        assert_eq!(paths.content(), PathBuf::from("/site/content"));
        assert_eq!(paths.layouts(), PathBuf::from("/site/layouts"));
        assert_eq!(paths.static_dir(), PathBuf::from("/site/static"));
    }

    #[test]
    fn test_staging_is_hidden_sibling() {
        let root = Path::new("/site");
        let output = PathBuf::from("/site/build/public");
        let paths = SitePaths::new(root, &output);

        assert_eq!(paths.staging(), PathBuf::from("/site/build/.public.staging"));
        assert_eq!(paths.retired(), PathBuf::from("/site/build/.public.old"));
    }
}
