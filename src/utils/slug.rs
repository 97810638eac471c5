//! Path-derived names: permalinks, fallback titles and heading ids.

use std::path::{Component, Path};

/// Canonical site-relative URL for a content file.
///
/// `rel_path` is relative to the content root. The extension is stripped,
/// separators become `/`, a trailing `.md` component collapses, and the result
/// always starts and ends with `/`.
///
/// | Relative path            | Permalink              |
/// |--------------------------|------------------------|
/// | `posts/hello-world.md`   | `/posts/hello-world/`  |
/// | `about.md`               | `/about/`              |
/// | `notes/draft.md.md`      | `/notes/draft/`        |
/// | `docs\guide\intro.md`    | `/docs/guide/intro/`   |
pub fn permalink(rel_path: &Path) -> String {
    let stripped = rel_path.with_extension("");
    let joined = stripped
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    let raw = format!("/{}/", joined.replace('\\', "/")).replacen(".md/", "/", 1);
    clean_url(&raw)
}

/// Collapse empty and `.` segments, keeping leading and trailing slashes.
fn clean_url(url: &str) -> String {
    let segments: Vec<&str> = url
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Fallback title from a file name: `my-page.md` → `My Page`.
pub fn title_from_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Heading id: lowercase alphanumerics joined by single hyphens.
pub fn heading_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true; // suppress leading hyphen
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
