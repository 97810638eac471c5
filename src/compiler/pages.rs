//! Page rendering: item pages, the home page and the posts listing.
//!
//! | Page          | Layout                 | Output                          | Context        |
//! |---------------|------------------------|---------------------------------|----------------|
//! | each item     | resolved per item      | `<out>/<permalink>/index.html`  | `site`, `item` |
//! | home          | `home.html` (required) | `<out>/index.html`              | `site`         |
//! | posts listing | `list-posts.html`      | `<out>/posts/index.html`        | `site`         |
//!
//! `site` carries the whole collection (`items`, `by_type`, `posts`,
//! `projects`) and `config` (`title`, `base_url`, `extra`).

use super::{
    collection::{Collection, POSTS_TYPE},
    layouts::{
        HOME_LAYOUT, LIST_POSTS_LAYOUT, LayoutError, LayoutSet, TemplateLookup, resolve_layout,
    },
    markdown::toml_to_json,
    meta::ContentItem,
};
use crate::{config::SiteConfig, log};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

const INDEX_FILE: &str = "index.html";

#[derive(Serialize)]
struct SiteContext<'a> {
    items: &'a [ContentItem],
    by_type: &'a BTreeMap<String, Vec<ContentItem>>,
    posts: &'a [ContentItem],
    projects: &'a [ContentItem],
    config: SiteSettings<'a>,
}

#[derive(Serialize)]
struct SiteSettings<'a> {
    title: &'a str,
    base_url: &'a str,
    extra: BTreeMap<&'a str, Value>,
}

/// Renders pages of one build into `output`.
///
/// The context is built once; item pages set `item` in it for the duration
/// of one render.
pub struct Renderer<'a> {
    layouts: &'a LayoutSet,
    context: tera::Context,
    output: &'a Path,
}

impl<'a> Renderer<'a> {
    pub fn new(
        layouts: &'a LayoutSet,
        collection: &Collection,
        config: &SiteConfig,
        output: &'a Path,
    ) -> Result<Self> {
        let site = SiteContext {
            items: &collection.items,
            by_type: &collection.by_type,
            posts: &collection.posts,
            projects: &collection.projects,
            config: SiteSettings {
                title: &config.site_title,
                base_url: &config.base_url,
                extra: config
                    .extra
                    .iter()
                    .map(|(k, v)| (k.as_str(), toml_to_json(v.clone())))
                    .collect(),
            },
        };

        let mut root = serde_json::Map::new();
        root.insert("site".into(), serde_json::to_value(&site)?);
        let context = tera::Context::from_value(Value::Object(root))
            .context("Failed to build template context")?;

        Ok(Self {
            layouts,
            context,
            output,
        })
    }

    /// Render one item at its permalink.
    pub fn render_item(&mut self, item: &ContentItem) -> Result<PathBuf> {
        let choice = resolve_layout(item, self.layouts)?;
        for downgrade in &choice.downgrades {
            log!(
                "warn";
                "layout `{}` not found for {}, using `{}`",
                downgrade.requested, item.source_path, downgrade.chosen
            );
        }

        let path = self.output.join(item.permalink.trim_matches('/')).join(INDEX_FILE);

        self.context.insert("item", item);
        let rendered = self.write(&choice.name, &self.context, &path);
        self.context.remove("item");

        rendered.with_context(|| format!("Failed to render {}", item.source_path))?;
        Ok(path)
    }

    /// Render `home.html` as the site index.
    pub fn render_home(&self) -> Result<PathBuf> {
        if !self.layouts.has_template(HOME_LAYOUT) {
            return Err(LayoutError::HomeMissing.into());
        }
        let path = self.output.join(INDEX_FILE);
        self.write(HOME_LAYOUT, &self.context, &path)
            .context("Failed to render home page")?;
        Ok(path)
    }

    /// Render `list-posts.html` at `/posts/`, `None` if there is no such layout.
    pub fn render_posts_listing(&self) -> Result<Option<PathBuf>> {
        if !self.layouts.has_template(LIST_POSTS_LAYOUT) {
            log!("warn"; "layout `{LIST_POSTS_LAYOUT}` not found, skipping posts listing");
            return Ok(None);
        }
        let path = self.output.join(POSTS_TYPE).join(INDEX_FILE);
        self.write(LIST_POSTS_LAYOUT, &self.context, &path)
            .context("Failed to render posts listing")?;
        Ok(Some(path))
    }

    /// Render fully in memory, then write, so a failed render leaves no file.
    fn write(&self, layout: &str, context: &tera::Context, path: &Path) -> Result<()> {
        let mut html = Vec::new();
        self.layouts.render(layout, context, &mut html)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
    }
}
