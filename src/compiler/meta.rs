//! Content item metadata.
//!
//! `ContentItem` is the unit the rest of the pipeline works with: one per
//! markdown file, carrying the rendered body plus everything templates see as
//! `item` (or as entries of `site.items`).
//!
//! # Fields
//!
//! | Field          | Source                                    | Example                  |
//! |----------------|-------------------------------------------|--------------------------|
//! | `title`        | `title` in frontmatter, else file name     | `Hello`                  |
//! | `date`         | `date` in frontmatter, parsed              | `2024-01-05T00:00:00Z`   |
//! | `type`         | first directory segment, or `type` field   | `posts`                  |
//! | `permalink`    | path relative to `content/`                | `/posts/hello-world/`    |
//! | `summary`      | `summary` in frontmatter                   |                          |
//! | `layout`       | `layout` in frontmatter                    | `custom.html`            |
//! | `frontmatter`  | the whole metadata block                   |                          |
//! | `content_html` | rendered markdown body                     | `<h1 id="hi">Hi</h1>`    |

use super::markdown::Frontmatter;
use crate::{
    log,
    utils::{
        date::parse_date,
        slug::{permalink, title_from_file_name},
    },
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::{Component, Path};

/// Type assigned to files directly under the content root.
pub const ROOT_TYPE: &str = "page";

/// One rendered piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub title: String,
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Originating file, for diagnostics.
    pub source_path: String,
    pub permalink: String,
    /// Trusted HTML, inserted into pages unescaped.
    pub content_html: String,
    pub frontmatter: Frontmatter,
    pub summary: String,
    pub layout: String,
}

impl ContentItem {
    /// Build an item from a parsed file.
    ///
    /// `rel_path` is relative to the content root; `source_path` is only kept
    /// for messages. An unparsable `date` is logged and left unset.
    pub fn build(
        rel_path: &Path,
        source_path: &Path,
        frontmatter: Frontmatter,
        content_html: String,
    ) -> Self {
        let title = string_field(&frontmatter, "title")
            .map(str::to_owned)
            .unwrap_or_else(|| title_from_file_name(rel_path));

        let date = string_field(&frontmatter, "date").and_then(|raw| {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                log!("warn"; "{}: could not parse date `{raw}`", source_path.display());
            }
            parsed
        });

        let kind = string_field(&frontmatter, "type")
            .filter(|s| !s.is_empty())
            .map_or_else(|| type_from_path(rel_path), str::to_owned);

        let summary = string_field(&frontmatter, "summary")
            .unwrap_or_default()
            .to_owned();
        let layout = string_field(&frontmatter, "layout")
            .unwrap_or_default()
            .to_owned();

        Self {
            title,
            date,
            kind,
            source_path: source_path.display().to_string(),
            permalink: permalink(rel_path),
            content_html,
            frontmatter,
            summary,
            layout,
        }
    }
}

/// A frontmatter value, only if it is a string.
fn string_field<'a>(frontmatter: &'a Frontmatter, key: &str) -> Option<&'a str> {
    frontmatter.get(key).and_then(|v| v.as_str())
}

/// First directory segment under the content root, `page` at the root.
fn type_from_path(rel_path: &Path) -> String {
    rel_path
        .parent()
        .and_then(|parent| {
            parent.components().find_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
        })
        .unwrap_or_else(|| ROOT_TYPE.to_owned())
}
