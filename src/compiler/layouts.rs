//! Layout templates: loading the template set and choosing a layout per item.
//!
//! Every `.html` file under `layouts/` is compiled into one [`LayoutSet`],
//! named by its path relative to `layouts/` with `/` separators:
//!
//! ```text
//! layouts/
//! ├── base.html              base.html              (Foundation, required)
//! ├── partials/header.html   partials/header.html   (Foundation)
//! ├── single.html            single.html            (Pages)
//! ├── single-post.html       single-post.html       (Pages)
//! ├── list-posts.html        list-posts.html        (Pages)
//! └── home.html              home.html              (Home, required)
//! ```
//!
//! Groups are compiled in dependency order so a template can always extend
//! or include the groups it depends on.

use super::{collect_all_files, meta::ContentItem};
use anyhow::{Context, Result};
use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
};
use tera::Tera;
use thiserror::Error;

pub const BASE_LAYOUT: &str = "base.html";
pub const HOME_LAYOUT: &str = "home.html";
pub const SINGLE_LAYOUT: &str = "single.html";
pub const SINGLE_POST_LAYOUT: &str = "single-post.html";
pub const LIST_POSTS_LAYOUT: &str = "list-posts.html";

/// Item type that prefers [`SINGLE_POST_LAYOUT`].
pub const POST_TYPE: &str = "post";

const PARTIALS_PREFIX: &str = "partials/";

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("base layout `{BASE_LAYOUT}` not found")]
    BaseMissing,

    #[error("home layout `{HOME_LAYOUT}` not found")]
    HomeMissing,
}

// ============================================================================
// Template Groups
// ============================================================================

/// Layout files compiled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateGroup {
    /// Root `base.html` and everything under `partials/`.
    Foundation,
    /// Every other layout except the home page.
    Pages,
    /// Root `home.html`.
    Home,
}

impl TemplateGroup {
    pub const ALL: [Self; 3] = [Self::Foundation, Self::Pages, Self::Home];

    /// Groups that must be compiled before this one.
    pub const fn depends_on(self) -> &'static [Self] {
        match self {
            Self::Foundation => &[],
            Self::Pages => &[Self::Foundation],
            Self::Home => &[Self::Foundation, Self::Pages],
        }
    }

    /// Group of a template, by its name relative to `layouts/`.
    pub fn classify(name: &str) -> Self {
        if name == BASE_LAYOUT || name.starts_with(PARTIALS_PREFIX) {
            Self::Foundation
        } else if name == HOME_LAYOUT {
            Self::Home
        } else {
            Self::Pages
        }
    }

    /// Topological order of the dependency graph (Kahn's algorithm).
    pub fn load_order() -> Vec<Self> {
        let mut order = Vec::with_capacity(Self::ALL.len());
        let mut pending: Vec<Self> = Self::ALL.to_vec();

        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|g| g.depends_on().iter().all(|dep| order.contains(dep)));
            match ready {
                Some(i) => order.push(pending.remove(i)),
                // The graph is fixed and acyclic; nothing left can be loaded.
                None => break,
            }
        }

        order
    }
}

impl fmt::Display for TemplateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Foundation => "base and partial",
            Self::Pages => "page",
            Self::Home => "home",
        })
    }
}

// ============================================================================
// Layout Set
// ============================================================================

/// Answers whether a named template exists.
pub trait TemplateLookup {
    fn has_template(&self, name: &str) -> bool;
}

impl TemplateLookup for [&str] {
    fn has_template(&self, name: &str) -> bool {
        self.iter().any(|n| *n == name)
    }
}

/// The compiled templates of one build.
pub struct LayoutSet {
    tera: Tera,
}

impl LayoutSet {
    /// Compile every `.html` file under `layouts_dir`.
    pub fn load(layouts_dir: &Path) -> Result<Self> {
        let mut files: Vec<(TemplateGroup, PathBuf, String)> = collect_all_files(layouts_dir)?
            .into_iter()
            .filter(|path| has_html_extension(path))
            .filter_map(|path| {
                let name = template_name(layouts_dir, &path)?;
                Some((TemplateGroup::classify(&name), path, name))
            })
            .collect();
        files.sort_by(|a, b| a.2.cmp(&b.2));

        if !files.iter().any(|(_, _, name)| name == BASE_LAYOUT) {
            return Err(LayoutError::BaseMissing)
                .with_context(|| format!("Failed to load layouts from {}", layouts_dir.display()));
        }

        let mut tera = Tera::default();
        // Every layout is HTML, whatever the case of its extension.
        tera.autoescape_on(vec![""]);

        for group in TemplateGroup::load_order() {
            let batch: Vec<(&Path, Option<&str>)> = files
                .iter()
                .filter(|(g, _, _)| *g == group)
                .map(|(_, path, name)| (path.as_path(), Some(name.as_str())))
                .collect();
            if batch.is_empty() {
                continue;
            }
            tera.add_template_files(batch)
                .with_context(|| format!("Failed to compile {group} layouts"))?;
        }

        Ok(Self { tera })
    }

    /// Render `name` with `context` into `out`.
    pub fn render(&self, name: &str, context: &tera::Context, out: impl Write) -> Result<()> {
        self.tera
            .render_to(name, context, out)
            .with_context(|| format!("Failed to render layout `{name}`"))
    }

    pub fn template_count(&self) -> usize {
        self.tera.get_template_names().count()
    }
}

impl TemplateLookup for LayoutSet {
    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

fn has_html_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

/// `layouts/partials/header.html` → `partials/header.html`.
fn template_name(layouts_dir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(layouts_dir).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

// ============================================================================
// Layout Resolution
// ============================================================================

/// A preferred template that did not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downgrade {
    pub requested: String,
    pub chosen: String,
}

/// The template to execute for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutChoice {
    pub name: String,
    pub downgrades: Vec<Downgrade>,
}

/// Pick the template for `item`.
///
/// Preference, highest first: the item's `layout`, `single-post.html` for
/// items of type `post`, `single.html`, then `base.html`. Every missing
/// preference that was passed over is reported as a [`Downgrade`].
pub fn resolve_layout<L>(item: &ContentItem, lookup: &L) -> Result<LayoutChoice, LayoutError>
where
    L: TemplateLookup + ?Sized,
{
    let mut preferences: Vec<&str> = Vec::with_capacity(3);
    if !item.layout.is_empty() {
        preferences.push(&item.layout);
    }
    if item.kind == POST_TYPE {
        preferences.push(SINGLE_POST_LAYOUT);
    }
    preferences.push(SINGLE_LAYOUT);

    let mut missed = Vec::new();
    let mut chosen = None;
    for name in preferences {
        if lookup.has_template(name) {
            chosen = Some(name);
            break;
        }
        missed.push(name);
    }

    let name = match chosen {
        Some(name) => name,
        None if lookup.has_template(BASE_LAYOUT) => BASE_LAYOUT,
        None => return Err(LayoutError::BaseMissing),
    };

    Ok(LayoutChoice {
        name: name.to_owned(),
        downgrades: missed
            .into_iter()
            .map(|requested| Downgrade {
                requested: requested.to_owned(),
                chosen: name.to_owned(),
            })
            .collect(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::markdown::Frontmatter;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn item(rel: &str, layout: Option<&str>) -> ContentItem {
        let mut fm = Frontmatter::new();
        if let Some(layout) = layout {
            fm.insert("layout".into(), Value::from(layout));
        }
        ContentItem::build(Path::new(rel), Path::new(rel), fm, String::new())
    }

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_load_order_respects_dependencies() {
        let order = TemplateGroup::load_order();
        assert_eq!(order.len(), TemplateGroup::ALL.len());
        for (i, group) in order.iter().enumerate() {
            for dep in group.depends_on() {
                let pos = order.iter().position(|g| g == dep).unwrap();
                assert!(pos < i, "{dep:?} must load before {group:?}");
            }
        }
        assert_eq!(order.first(), Some(&TemplateGroup::Foundation));
        assert_eq!(order.last(), Some(&TemplateGroup::Home));
    }

    #[test]
    fn test_classify() {
        assert_eq!(TemplateGroup::classify("base.html"), TemplateGroup::Foundation);
        assert_eq!(TemplateGroup::classify("partials/nav.html"), TemplateGroup::Foundation);
        assert_eq!(TemplateGroup::classify("home.html"), TemplateGroup::Home);
        assert_eq!(TemplateGroup::classify("single.html"), TemplateGroup::Pages);
        assert_eq!(TemplateGroup::classify("posts/base.html"), TemplateGroup::Pages);
    }

    #[test]
    fn test_resolve_default_single() {
        let set: &[&str] = &["base.html", "single.html"];
        let choice = resolve_layout(&item("about.md", None), set).unwrap();
        assert_eq!(choice.name, "single.html");
        assert!(choice.downgrades.is_empty());
    }

    #[test]
    fn test_resolve_post_prefers_single_post() {
        let set: &[&str] = &["base.html", "single.html", "single-post.html"];
        let choice = resolve_layout(&item("post/a.md", None), set).unwrap();
        assert_eq!(choice.name, "single-post.html");

        // The plural directory name is not the `post` type.
        let choice = resolve_layout(&item("posts/a.md", None), set).unwrap();
        assert_eq!(choice.name, "single.html");
    }

    #[test]
    fn test_resolve_post_without_single_post_downgrades() {
        let set: &[&str] = &["base.html", "single.html"];
        let choice = resolve_layout(&item("post/a.md", None), set).unwrap();
        assert_eq!(choice.name, "single.html");
        assert_eq!(
            choice.downgrades,
            vec![Downgrade {
                requested: "single-post.html".into(),
                chosen: "single.html".into()
            }]
        );
    }

    #[test]
    fn test_resolve_explicit_layout_overrides() {
        let set: &[&str] = &["base.html", "single.html", "single-post.html", "wide.html"];
        let choice = resolve_layout(&item("post/a.md", Some("wide.html")), set).unwrap();
        assert_eq!(choice.name, "wide.html");
        assert!(choice.downgrades.is_empty());
    }

    #[test]
    fn test_resolve_missing_explicit_layout_downgrades() {
        let set: &[&str] = &["base.html", "single.html"];
        let choice = resolve_layout(&item("a.md", Some("nope.html")), set).unwrap();
        assert_eq!(choice.name, "single.html");
        assert_eq!(choice.downgrades.len(), 1);
        assert_eq!(choice.downgrades[0].requested, "nope.html");
    }

    #[test]
    fn test_resolve_falls_back_to_base() {
        let set: &[&str] = &["base.html"];
        let choice = resolve_layout(&item("post/a.md", Some("x.html")), set).unwrap();
        assert_eq!(choice.name, "base.html");
        let requested: Vec<_> = choice.downgrades.iter().map(|d| d.requested.as_str()).collect();
        assert_eq!(requested, ["x.html", "single-post.html", "single.html"]);
        assert!(choice.downgrades.iter().all(|d| d.chosen == "base.html"));
    }

    #[test]
    fn test_resolve_without_base_fails() {
        let set: &[&str] = &["home.html"];
        assert!(matches!(
            resolve_layout(&item("a.md", None), set),
            Err(LayoutError::BaseMissing)
        ));
    }

    #[test]
    fn test_resolve_never_selects_absent_template() {
        let sets: [&[&str]; 3] = [
            &["base.html"],
            &["base.html", "single.html"],
            &["base.html", "single-post.html"],
        ];
        for set in sets {
            for it in [item("post/a.md", None), item("a.md", Some("z.html"))] {
                let choice = resolve_layout(&it, set).unwrap();
                assert!(set.has_template(&choice.name));
            }
        }
    }

    #[test]
    fn test_layout_set_load_and_render() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base.html", "<main>{% block body %}{% endblock %}</main>");
        write(dir.path(), "partials/nav.html", "<nav>{{ site_title }}</nav>");
        write(
            dir.path(),
            "single.html",
            "{% extends \"base.html\" %}{% block body %}{% include \"partials/nav.html\" %}{{ html | safe }}{% endblock %}",
        );
        write(dir.path(), "notes.txt", "ignored");

        let set = LayoutSet::load(dir.path()).unwrap();
        assert_eq!(set.template_count(), 3);
        assert!(set.has_template("partials/nav.html"));
        assert!(!set.has_template("notes.txt"));

        let mut ctx = tera::Context::new();
        ctx.insert("site_title", "A & B");
        ctx.insert("html", "<p>x</p>");
        let mut out = Vec::new();
        set.render("single.html", &ctx, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<main><nav>A &amp; B</nav><p>x</p></main>"
        );
    }

    #[test]
    fn test_layout_set_case_insensitive_extension() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base.html", "base");
        write(dir.path(), "Wide.HTML", "wide");

        let set = LayoutSet::load(dir.path()).unwrap();
        assert!(set.has_template("Wide.HTML"));
    }

    #[test]
    fn test_layout_set_requires_base() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "single.html", "x");
        let err = LayoutSet::load(dir.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<LayoutError>(),
            Some(LayoutError::BaseMissing)
        ));
    }

    #[test]
    fn test_nested_base_is_not_root_base() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/base.html", "x");
        assert!(LayoutSet::load(dir.path()).is_err());
    }

    #[test]
    fn test_layout_set_reports_syntax_errors() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base.html", "ok");
        write(dir.path(), "single.html", "{% if %}");
        let err = LayoutSet::load(dir.path()).err().unwrap();
        assert!(format!("{err:#}").contains("page layouts"));
    }
}
